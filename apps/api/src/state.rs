use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionClient;
use crate::parser::DocumentParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable document parser. Default: LlamaParseClient. Swap via PARSER_BACKEND.
    pub parser: Arc<dyn DocumentParser>,
    pub llm: Arc<dyn CompletionClient>,
    pub config: Config,
}
