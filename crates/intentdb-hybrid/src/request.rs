use std::time::Duration;

use tokio_util::sync::CancellationToken;

use intentdb_core::config::SearchConfig;
use intentdb_core::types::SearchScope;

/// Parameters of one search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    /// Minimum cosine a candidate with no lexical overlap must reach.
    pub min_similarity: f32,
    pub scope: SearchScope,
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self::with_defaults(query, &SearchConfig::default())
    }

    pub fn with_defaults(query: impl Into<String>, config: &SearchConfig) -> Self {
        Self {
            query: query.into(),
            max_results: config.default_max_results,
            min_similarity: config.default_min_similarity,
            scope: SearchScope::All,
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
