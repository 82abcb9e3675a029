//! Core Runtime
//!
//! Configuration, background task management, and the service handle
//! that wires them to the database.

pub mod config;
pub mod tasks;

pub use config::Config;
pub use tasks::{BackgroundTasks, TaskKind};

use crate::db::DbService;
use crate::db::repository::RepoResult;
use crate::vouchers::sweeper;

/// Running service: the database plus the background tasks that tend it.
/// Dropping it without calling [`CommerceCore::shutdown`] aborts the
/// tasks without a graceful stop.
pub struct CommerceCore {
    pub config: Config,
    pub db: DbService,
    tasks: BackgroundTasks,
}

impl CommerceCore {
    /// Open the database, run migrations, and start the reservation sweep
    pub async fn start(config: Config) -> RepoResult<Self> {
        let db = DbService::new(&config.db_path).await?;

        let mut tasks = BackgroundTasks::new();
        tasks.spawn(
            "reservation_sweep",
            TaskKind::Periodic,
            sweeper::run(
                db.pool().clone(),
                config.sweep_interval_secs,
                config.sweep_max_age_minutes,
                tasks.shutdown_token(),
            ),
        );

        Ok(Self { config, db, tasks })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }

    pub async fn shutdown(self) {
        self.tasks.shutdown().await;
    }
}
