use todo_core::Database;

use crate::config::AppConfig;

/// State shared by every request.
#[derive(Debug)]
pub struct Global {
    config: AppConfig,
    db: Database,
}

impl Global {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self { config, db }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
