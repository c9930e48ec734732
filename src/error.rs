use thiserror::Error;

/// Failures of the search pipeline.
///
/// Every variant is caught at the widget boundary and turned into a
/// placeholder entry in the results container; the details only reach the
/// tracing output. The type is `Clone` so a failed initialization can be
/// remembered for the rest of the page view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The corpus request completed with a non-success status
    #[error("failed to load search data from {url}: status {status}")]
    CorpusStatus { url: String, status: u16 },

    /// The corpus request did not complete at all
    #[error("failed to fetch search data from {url}: {reason}")]
    CorpusFetch { url: String, reason: String },

    /// The corpus body is not a valid JSON array of records
    #[error("invalid JSON in search data: {message}")]
    CorpusParse { message: String, excerpt: String },

    #[error("failed to build search index: {0}")]
    IndexBuild(String),

    #[error("search query failed: {0}")]
    Query(String),

    #[error("search elements not found: #{input_id} / #{results_id}")]
    MissingElements { input_id: String, results_id: String },
}

impl SearchError {
    /// Network or status failure while fetching the corpus
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            SearchError::CorpusStatus { .. } | SearchError::CorpusFetch { .. }
        )
    }
}
