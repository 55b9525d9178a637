use db::DBService;
use services::services::{audit::AuditService, reporting::ReportingService};

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub mod test_support;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    audit: AuditService,
    reporting: ReportingService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        let audit = AuditService::spawn(db.clone());
        let reporting = ReportingService::new(db.clone());
        Self {
            db,
            audit,
            reporting,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    pub fn reporting(&self) -> &ReportingService {
        &self.reporting
    }
}
