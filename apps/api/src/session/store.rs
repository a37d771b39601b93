use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::resume::ResumeDocument;

/// Holder of the live resume document. The orchestrator reads it before a call
/// and replaces it (whole or in part) once a reply passes its contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self) -> ResumeDocument;
    async fn replace(&self, document: ResumeDocument);
}

/// Process-local store. One per session.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    document: RwLock<ResumeDocument>,
}

impl InMemoryDocumentStore {
    /// Seeds the store, normalizing the document on the way in.
    pub fn new(mut document: ResumeDocument) -> Self {
        document.normalize();
        Self {
            document: RwLock::new(document),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self) -> ResumeDocument {
        self.document.read().await.clone()
    }

    async fn replace(&self, document: ResumeDocument) {
        *self.document.write().await = document;
    }
}
