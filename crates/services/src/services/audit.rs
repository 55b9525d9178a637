use db::{
    DBService,
    models::activity::{ActivityEvent, RecordActivityEvent},
    types::EventType,
};
use serde_json::{Map, Value};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use uuid::Uuid;

const AUDIT_QUEUE_CAPACITY: usize = 1024;

enum AuditMsg {
    Record(RecordActivityEvent),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget audit writer. Callers hand over an event and move on;
/// persistence happens on a dedicated task and its failures surface only
/// in the operational log, never to the caller.
#[derive(Clone)]
pub struct AuditService {
    tx: mpsc::Sender<AuditMsg>,
}

impl AuditService {
    pub fn spawn(db: DBService) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditMsg>(AUDIT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    AuditMsg::Record(data) => {
                        let event_id = Uuid::new_v4();
                        if let Err(err) = ActivityEvent::create(&db.conn, &data, event_id).await {
                            tracing::error!(
                                event_type = %data.event_type,
                                performed_by = %data.performed_by,
                                error = %err,
                                "failed to persist activity event"
                            );
                        }
                    }
                    AuditMsg::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue one event. Never blocks and never fails the caller: when the
    /// queue is full the event is dropped and a warning logged.
    pub fn record(&self, event: RecordActivityEvent) {
        match self.tx.try_send(AuditMsg::Record(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("audit queue full; dropping activity event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!("audit writer is gone; dropping activity event");
            }
        }
    }

    /// Wait until everything queued so far has been handed to the store.
    /// Used on graceful shutdown and by tests.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditMsg::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Compare two flat snapshots over an explicit allow-list of fields.
///
/// Only fields present in `after` are considered changed-or-not; a field
/// omitted from the update payload is unchanged by definition. Values are
/// compared by their display form, so `3` and `"3"` are the same value.
/// Output preserves the order of `tracked`.
pub fn diff_tracked_fields(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    tracked: &[&str],
) -> Vec<FieldChange> {
    tracked
        .iter()
        .filter_map(|field| {
            let new_value = after.get(*field)?;
            let old_text = stringify(before.get(*field));
            let new_text = stringify(Some(new_value));
            (old_text != new_text).then(|| FieldChange {
                field: (*field).to_string(),
                old_value: old_text,
                new_value: new_text,
            })
        })
        .collect()
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Which audit event a tracked-field change maps to. Status and assignee
/// changes carry their own event types; everything else is a generic
/// task update.
pub fn event_type_for_field(field: &str) -> EventType {
    match field {
        "status" => EventType::StatusChanged,
        "assignee" => EventType::AssignmentChanged,
        _ => EventType::TaskUpdated,
    }
}

#[cfg(test)]
mod tests {
    use db::models::activity::{ActivityFilter, ActivityLogPage};
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn diff_reports_only_fields_present_and_changed() {
        let before = map(json!({
            "status": "Open",
            "assignee": "a@x.com",
            "priority": "Low",
        }));
        // `priority` omitted from the payload: unchanged by definition,
        // not "changed to empty".
        let after = map(json!({
            "status": "Closed",
            "assignee": "a@x.com",
        }));

        let changes = diff_tracked_fields(&before, &after, &["status", "assignee", "priority"]);
        assert_eq!(
            changes,
            vec![FieldChange {
                field: "status".to_string(),
                old_value: "Open".to_string(),
                new_value: "Closed".to_string(),
            }]
        );
    }

    #[test]
    fn diff_ignores_untracked_fields() {
        let before = map(json!({ "status": "Open", "internal_rev": 1 }));
        let after = map(json!({ "status": "Open", "internal_rev": 2 }));

        let changes = diff_tracked_fields(&before, &after, &["status"]);
        assert!(changes.is_empty());
    }

    #[test]
    fn diff_compares_display_forms_not_types() {
        let before = map(json!({ "estimate": 3 }));
        let after = map(json!({ "estimate": "3" }));

        let changes = diff_tracked_fields(&before, &after, &["estimate"]);
        assert!(changes.is_empty());
    }

    #[test]
    fn diff_treats_null_and_absent_as_empty() {
        let before = map(json!({ "assignee": null }));
        let after = map(json!({ "assignee": "b@x.com" }));

        let changes = diff_tracked_fields(&before, &after, &["assignee", "due_date"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, "");
        assert_eq!(changes[0].new_value, "b@x.com");
    }

    #[test]
    fn diff_preserves_tracked_field_order() {
        let before = map(json!({ "title": "a", "status": "Open", "assignee": "x" }));
        let after = map(json!({ "title": "b", "status": "Closed", "assignee": "y" }));

        let changes = diff_tracked_fields(&before, &after, &["assignee", "title", "status"]);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["assignee", "title", "status"]);
    }

    #[test]
    fn status_and_assignee_changes_get_dedicated_event_types() {
        assert_eq!(event_type_for_field("status"), EventType::StatusChanged);
        assert_eq!(
            event_type_for_field("assignee"),
            EventType::AssignmentChanged
        );
        assert_eq!(event_type_for_field("due_date"), EventType::TaskUpdated);
        assert_eq!(event_type_for_field("title"), EventType::TaskUpdated);
    }

    async fn search_all(db: &DBService) -> ActivityLogPage {
        db::models::activity::ActivityEvent::search(&db.conn, &ActivityFilter::default(), 1, 50)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn recorded_events_land_in_the_store_after_flush() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let audit = AuditService::spawn(db.clone());

        audit.record(RecordActivityEvent::new(
            EventType::TaskCreated,
            "Ana created task \"Ship it\"".to_string(),
            "ana@acme.dev".to_string(),
        ));
        audit.record(RecordActivityEvent::new(
            EventType::StatusChanged,
            "Ana moved \"Ship it\" to done".to_string(),
            "ana@acme.dev".to_string(),
        ));
        audit.flush().await;

        let page = search_all(&db).await;
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn flush_on_an_idle_queue_returns_immediately() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let audit = AuditService::spawn(db);
        audit.flush().await;
    }
}
