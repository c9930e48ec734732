use std::time::Duration;

pub const DEFAULT_CORPUS_URL: &str = "/search.json";
pub const DEFAULT_INPUT_ID: &str = "search-input";
pub const DEFAULT_RESULTS_ID: &str = "results-container";
/// `<meta name="...">` that overrides the corpus URL for a page
pub const CORPUS_URL_META: &str = "search-json-url";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Knobs of one search widget instance
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub corpus_url: String,
    pub input_id: String,
    pub results_id: String,
    pub debounce: Duration,
    pub max_results: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            corpus_url: DEFAULT_CORPUS_URL.to_string(),
            input_id: DEFAULT_INPUT_ID.to_string(),
            results_id: DEFAULT_RESULTS_ID.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl WidgetConfig {
    pub fn new(corpus_url: &str, input_id: &str, results_id: &str) -> Self {
        Self {
            corpus_url: corpus_url.to_string(),
            input_id: input_id.to_string(),
            results_id: results_id.to_string(),
            ..Self::default()
        }
    }

    /// Defaults, with the corpus URL taken from the page's meta tag if set
    pub fn from_page(page: &impl crate::widget::Page) -> Self {
        let mut config = Self::default();
        if let Some(url) = page.meta(CORPUS_URL_META).filter(|u| !u.is_empty()) {
            config.corpus_url = url;
        }
        config
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::StaticPage;

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.corpus_url, "/search.json");
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.max_results, 20);
    }

    #[test]
    fn test_meta_override() {
        let page = StaticPage::default().with_meta(CORPUS_URL_META, "/docs/search.json");
        assert_eq!(WidgetConfig::from_page(&page).corpus_url, "/docs/search.json");

        let page = StaticPage::default().with_meta(CORPUS_URL_META, "");
        assert_eq!(WidgetConfig::from_page(&page).corpus_url, "/search.json");
    }
}
