use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::orchestrator::Orchestrator;

/// Live revision sessions keyed by id. Sessions live until deleted or the process exits.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Orchestrator>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, orchestrator: Orchestrator) -> (Uuid, Arc<Orchestrator>) {
        let id = Uuid::new_v4();
        let orchestrator = Arc::new(orchestrator);
        self.sessions.write().await.insert(id, orchestrator.clone());
        (id, orchestrator)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Orchestrator>, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Drops the session. A call already in flight finishes against its own handle.
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
