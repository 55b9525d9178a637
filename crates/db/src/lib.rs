use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use utils_core::assets::asset_dir;

pub use sea_orm::{DbErr, TransactionTrait};

pub mod entities;
pub mod models;
pub mod types;

const DATABASE_URL_ENV: &str = "PLANZO_DATABASE_URL";

#[derive(Clone)]
pub struct DBService {
    pub conn: DatabaseConnection,
}

impl DBService {
    /// Connect using `PLANZO_DATABASE_URL`, falling back to a sqlite file
    /// in the local data directory.
    pub async fn new() -> Result<DBService, DbErr> {
        let url = match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => format!(
                "sqlite://{}?mode=rwc",
                asset_dir().join("planzo.sqlite").to_string_lossy()
            ),
        };
        Self::connect(&url).await
    }

    /// Connect to an explicit database URL and bring the schema up to date.
    pub async fn connect(url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(url.to_string());
        options.sqlx_logging(false);
        let conn = Database::connect(options).await?;
        db_migration::Migrator::up(&conn, None).await?;
        Ok(DBService { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_runs_migrations_on_fresh_database() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        // Schema is usable immediately after connect.
        let workspaces = models::workspace::Workspace::find_all(&db.conn).await.unwrap();
        assert!(workspaces.is_empty());
    }
}
