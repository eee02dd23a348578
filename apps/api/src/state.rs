use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionModel;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable; every request works on its own clone.
#[derive(Clone)]
pub struct AppState {
    /// The chat-completion backend. `LlmClient` in production.
    pub model: Arc<dyn CompletionModel>,
    pub config: Config,
}
