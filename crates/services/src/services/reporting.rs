use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use db::{
    DBService, DbErr,
    models::{
        ids,
        project::Project,
        task::{Task, UpcomingTask},
        time_log::TimeLog,
    },
};
use futures_util::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

const NOMINAL_WEEK_HOURS: f64 = 40.0;
const UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Workspace not found")]
    WorkspaceNotFound,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WeeklyReport {
    #[ts(type = "Date")]
    pub week_start: DateTime<Utc>,
    #[ts(type = "Date")]
    pub week_end: DateTime<Utc>,
    pub members: Vec<MemberWeeklyReport>,
}

/// Per-member slice of the weekly report. Window metrics cover
/// `[week_start, week_end)`; `on_time_rate` and `quality_score` are
/// lifetime figures so one quiet week does not erase a track record.
#[derive(Debug, Clone, Serialize, TS)]
pub struct MemberWeeklyReport {
    pub member: String,
    pub completed_this_week: u64,
    pub assigned_as_of_week: u64,
    pub on_time_rate: u32,
    pub hours_logged: f64,
    pub utilisation_pct: i64,
    pub quality_score: Option<f64>,
    pub overdue_tasks: u64,
    pub blocked_tasks: u64,
    pub upcoming_tasks: Vec<UpcomingTask>,
}

struct Scope {
    workspace_row_id: i64,
    project_row_ids: Vec<i64>,
}

impl Scope {
    fn project_ids(&self) -> Option<&[i64]> {
        Some(self.project_row_ids.as_slice())
    }
}

/// Half-open reporting window `[start, start + 7d)` anchored on the most
/// recent Sunday 00:00:00 UTC, shifted by whole weeks.
pub fn week_bounds(now: DateTime<Utc>, week_offset: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_sunday = now.weekday().num_days_from_sunday() as i64;
    let sunday = now.date_naive() - Duration::days(days_since_sunday) + Duration::weeks(week_offset);
    let week_start = sunday.and_time(NaiveTime::MIN).and_utc();
    (week_start, week_start + Duration::days(7))
}

#[derive(Clone)]
pub struct ReportingService {
    db: DBService,
}

impl ReportingService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Build the weekly report for one workspace, or across all
    /// workspaces when `workspace_id` is `None`.
    ///
    /// Metrics are recomputed from the task and time-log stores on every
    /// call; nothing here is cached or persisted. A store failure fails
    /// the whole request: a partially-zeroed report would be
    /// indistinguishable from "no activity".
    pub async fn weekly_report(
        &self,
        workspace_id: Option<Uuid>,
        week_offset: i64,
    ) -> Result<WeeklyReport, ReportError> {
        self.weekly_report_at(workspace_id, week_offset, Utc::now())
            .await
    }

    async fn weekly_report_at(
        &self,
        workspace_id: Option<Uuid>,
        week_offset: i64,
        now: DateTime<Utc>,
    ) -> Result<WeeklyReport, ReportError> {
        let (week_start, week_end) = week_bounds(now, week_offset);

        let scope = match workspace_id {
            Some(workspace_id) => {
                let workspace_row_id = ids::workspace_id_by_uuid(&self.db.conn, workspace_id)
                    .await?
                    .ok_or(ReportError::WorkspaceNotFound)?;
                let project_row_ids =
                    Project::row_ids_by_workspace(&self.db.conn, workspace_row_id).await?;
                Some(Scope {
                    workspace_row_id,
                    project_row_ids,
                })
            }
            None => None,
        };

        // Anyone holding a task in scope is a member; no roster needed.
        let members = Task::distinct_assignees(
            &self.db.conn,
            scope.as_ref().and_then(Scope::project_ids),
        )
        .await?;

        // Members are independent of each other: fan out, then gather
        // everything before responding.
        let mut reports = try_join_all(members.into_iter().map(|member| {
            self.member_report(member, scope.as_ref(), week_start, week_end, now)
        }))
        .await?;
        sort_members(&mut reports);

        Ok(WeeklyReport {
            week_start,
            week_end,
            members: reports,
        })
    }

    async fn member_report(
        &self,
        member: String,
        scope: Option<&Scope>,
        week_start: DateTime<Utc>,
        week_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<MemberWeeklyReport, ReportError> {
        let db = &self.db.conn;
        let project_ids = scope.and_then(Scope::project_ids);
        let workspace_row_id = scope.map(|s| s.workspace_row_id);

        let completed_this_week =
            Task::count_completed_between(db, project_ids, &member, week_start, week_end).await?;
        let assigned_as_of_week =
            Task::count_live_during(db, project_ids, &member, week_start, week_end).await?;

        let (completed_total, on_time_total) =
            Task::completed_totals(db, project_ids, &member).await?;
        let on_time_rate = if completed_total == 0 {
            0
        } else {
            ((on_time_total as f64 / completed_total as f64) * 100.0).round() as u32
        };

        let hours_logged =
            TimeLog::hours_between(db, workspace_row_id, &member, week_start, week_end).await?;
        // Nominal 40h week; above 100 means overtime and stays above 100.
        let utilisation_pct = (hours_logged / NOMINAL_WEEK_HOURS * 100.0).round() as i64;

        let scores = Task::manager_scores(db, project_ids, &member).await?;
        let quality_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64)
        };

        let overdue_tasks = Task::count_overdue(db, project_ids, &member, now).await?;
        let blocked_tasks = Task::count_blocked(db, project_ids, &member).await?;
        let upcoming_tasks =
            Task::upcoming_for_assignee(db, project_ids, &member, UPCOMING_LIMIT).await?;

        Ok(MemberWeeklyReport {
            member,
            completed_this_week,
            assigned_as_of_week,
            on_time_rate,
            hours_logged,
            utilisation_pct,
            quality_score,
            overdue_tasks,
            blocked_tasks,
            upcoming_tasks,
        })
    }
}

/// Most at-risk first: overdue count descending, member id as the
/// deterministic tiebreak.
fn sort_members(members: &mut [MemberWeeklyReport]) {
    members.sort_by(|a, b| {
        b.overdue_tasks
            .cmp(&a.overdue_tasks)
            .then_with(|| a.member.cmp(&b.member))
    });
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use db::{
        entities::task,
        models::{
            project::CreateProject,
            task::{CreateTask, TaskPriority, TaskStatus},
            time_log::CreateTimeLog,
            workspace::{CreateWorkspace, Workspace},
        },
    };
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;

    #[test]
    fn week_bounds_anchor_on_the_most_recent_sunday() {
        // Wednesday, 2026-02-11.
        let now = Utc.with_ymd_and_hms(2026, 2, 11, 15, 42, 7).unwrap();

        let (start, end) = week_bounds(now, 0);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap());

        let (prev_start, prev_end) = week_bounds(now, -1);
        assert_eq!(prev_start, start - Duration::days(7));
        assert_eq!(prev_end, end - Duration::days(7));
    }

    #[test]
    fn week_bounds_on_a_sunday_start_that_same_day() {
        let now = Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap();
        let (start, _) = week_bounds(now, 0);
        assert_eq!(start, now);
    }

    #[test]
    fn members_sort_by_overdue_desc_then_member_asc() {
        fn report(member: &str, overdue_tasks: u64) -> MemberWeeklyReport {
            MemberWeeklyReport {
                member: member.to_string(),
                completed_this_week: 0,
                assigned_as_of_week: 0,
                on_time_rate: 0,
                hours_logged: 0.0,
                utilisation_pct: 0,
                quality_score: None,
                overdue_tasks,
                blocked_tasks: 0,
                upcoming_tasks: Vec::new(),
            }
        }

        let mut members = vec![
            report("zoe@acme.dev", 3),
            report("ana@acme.dev", 0),
            report("bo@acme.dev", 3),
            report("cal@acme.dev", 1),
        ];
        sort_members(&mut members);

        let order: Vec<&str> = members.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(
            order,
            vec!["bo@acme.dev", "zoe@acme.dev", "cal@acme.dev", "ana@acme.dev"]
        );
    }

    async fn seed_workspace(db: &DBService) -> (Uuid, Uuid) {
        let workspace_id = Uuid::new_v4();
        Workspace::create(
            &db.conn,
            &CreateWorkspace {
                name: "Acme".to_string(),
            },
            workspace_id,
        )
        .await
        .unwrap();

        let project_id = Uuid::new_v4();
        db::models::project::Project::create(
            &db.conn,
            &CreateProject {
                workspace_id,
                name: "Launch".to_string(),
                description: None,
            },
            project_id,
        )
        .await
        .unwrap();

        (workspace_id, project_id)
    }

    async fn seed_task(db: &DBService, project_id: Uuid, assignee: &str) {
        let mut create = CreateTask::from_title(project_id, "work".to_string());
        create.assignee = Some(assignee.to_string());
        Task::create(&db.conn, &create, Uuid::new_v4()).await.unwrap();
    }

    /// Insert a task row completed in the past, which the model API
    /// (completion stamps "now") cannot produce.
    async fn seed_completed_task(
        db: &DBService,
        project_id: Uuid,
        assignee: &str,
        completed_at: DateTime<Utc>,
        on_time: bool,
        manager_score: Option<i32>,
    ) {
        let project_row_id = ids::project_id_by_uuid(&db.conn, project_id)
            .await
            .unwrap()
            .unwrap();
        let created_at = completed_at - Duration::days(5);
        task::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row_id),
            title: Set("old work".to_string()),
            description: Set(None),
            status: Set(TaskStatus::Done),
            priority: Set(TaskPriority::Medium),
            assignee: Set(Some(assignee.to_string())),
            due_date: Set(None),
            completed_at: Set(Some(completed_at.into())),
            completed_on_time: Set(Some(on_time)),
            manager_score: Set(manager_score),
            blocked: Set(false),
            created_at: Set(created_at.into()),
            updated_at: Set(completed_at.into()),
            ..Default::default()
        }
        .insert(&db.conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn utilisation_above_full_time_is_not_clamped() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (workspace_id, project_id) = seed_workspace(&db).await;
        seed_task(&db, project_id, "ana@acme.dev").await;

        TimeLog::create(
            &db.conn,
            &CreateTimeLog {
                workspace_id,
                task_id: None,
                member: "ana@acme.dev".to_string(),
                hours: 50.0,
                log_date: None,
                note: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let report = ReportingService::new(db)
            .weekly_report(Some(workspace_id), 0)
            .await
            .unwrap();
        assert_eq!(report.members.len(), 1);
        assert_eq!(report.members[0].utilisation_pct, 125);
        assert!((report.members[0].hours_logged - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn lifetime_metrics_survive_a_quiet_week() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (workspace_id, project_id) = seed_workspace(&db).await;

        // History from a month ago: two completions, one on time, one
        // scored. Nothing this week.
        let past = Utc::now() - Duration::days(30);
        seed_completed_task(&db, project_id, "ana@acme.dev", past, true, Some(5)).await;
        seed_completed_task(&db, project_id, "ana@acme.dev", past, false, None).await;

        let report = ReportingService::new(db)
            .weekly_report(Some(workspace_id), 0)
            .await
            .unwrap();
        let member = &report.members[0];

        assert_eq!(member.completed_this_week, 0);
        assert_eq!(member.on_time_rate, 50);
        assert_eq!(member.quality_score, Some(5.0));
    }

    #[tokio::test]
    async fn completions_inside_the_window_count_for_the_week() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (workspace_id, project_id) = seed_workspace(&db).await;

        let task_id = Uuid::new_v4();
        let mut create = CreateTask::from_title(project_id, "finish me".to_string());
        create.assignee = Some("ana@acme.dev".to_string());
        let created = Task::create(&db.conn, &create, task_id).await.unwrap();
        Task::update(
            &db.conn,
            task_id,
            created.title.clone(),
            None,
            TaskStatus::Done,
            created.priority.clone(),
            created.assignee.clone(),
            None,
        )
        .await
        .unwrap();

        let report = ReportingService::new(db)
            .weekly_report(Some(workspace_id), 0)
            .await
            .unwrap();
        let member = &report.members[0];
        assert_eq!(member.completed_this_week, 1);
        // Completed without a due date counts as on time.
        assert_eq!(member.on_time_rate, 100);
    }

    #[tokio::test]
    async fn workspace_scope_excludes_other_workspaces() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (workspace_a, project_a) = seed_workspace(&db).await;
        let (_workspace_b, project_b) = seed_workspace(&db).await;

        seed_task(&db, project_a, "ana@acme.dev").await;
        seed_task(&db, project_b, "bo@acme.dev").await;

        let report = ReportingService::new(db)
            .weekly_report(Some(workspace_a), 0)
            .await
            .unwrap();
        let members: Vec<&str> = report.members.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(members, vec!["ana@acme.dev"]);
    }

    #[tokio::test]
    async fn cross_workspace_report_sees_everyone() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (_workspace_a, project_a) = seed_workspace(&db).await;
        let (_workspace_b, project_b) = seed_workspace(&db).await;

        seed_task(&db, project_a, "ana@acme.dev").await;
        seed_task(&db, project_b, "bo@acme.dev").await;

        let report = ReportingService::new(db).weekly_report(None, 0).await.unwrap();
        assert_eq!(report.members.len(), 2);
    }

    #[tokio::test]
    async fn empty_scope_yields_an_empty_member_list() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let (workspace_id, _project_id) = seed_workspace(&db).await;

        let report = ReportingService::new(db)
            .weekly_report(Some(workspace_id), 0)
            .await
            .unwrap();
        assert!(report.members.is_empty());
    }

    #[tokio::test]
    async fn unknown_workspace_is_an_error_not_an_empty_report() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();

        let err = ReportingService::new(db)
            .weekly_report(Some(Uuid::new_v4()), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::WorkspaceNotFound));
    }
}
