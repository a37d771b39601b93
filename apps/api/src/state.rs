use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelGateway;
use crate::session::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Every model call goes through this gateway. `LlmClient` in production.
    pub gateway: Arc<dyn ModelGateway>,
    pub sessions: Arc<SessionRegistry>,
}
