use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::queue::TaskStore;
use crate::services::TableFlowService;

/// Application state shared by handlers and the stage pipeline
#[derive(Clone)]
pub struct AppState {
    /// Table orchestration service
    pub flow: Arc<TableFlowService>,
    /// Backing store of the stage queue, polled by the worker
    pub tasks: Arc<dyn TaskStore>,
    /// Database connection (absent for the in-memory backends)
    db: Option<DatabaseConnection>,
}

impl AppState {
    pub fn new(flow: Arc<TableFlowService>, tasks: Arc<dyn TaskStore>) -> Self {
        Self {
            flow,
            tasks,
            db: None,
        }
    }

    pub fn with_db(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }

    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }
}
