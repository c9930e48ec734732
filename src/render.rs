use crate::document::Corpus;
use crate::index::SearchHit;

pub const NO_RESULTS: &str = "No results found";
pub const SEARCH_UNAVAILABLE: &str = "Search unavailable";
pub const SEARCH_ERROR: &str = "Search error occurred";

/// One `<li>` of the results list
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEntry {
    Link { href: String, label: String },
    Placeholder(&'static str),
}

/// Model of the results container: what it holds and whether it is shown.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultsView {
    entries: Vec<ResultEntry>,
    visible: bool,
}

impl ResultsView {
    /// Resolve each hit to its record and list it. References without a
    /// record are skipped; an empty list shows the no-results placeholder.
    pub fn render(&mut self, hits: &[SearchHit], corpus: &Corpus) {
        self.entries = hits
            .iter()
            .filter_map(|hit| corpus.get(&hit.doc_ref))
            .map(|doc| ResultEntry::Link {
                href: doc.url.clone(),
                label: doc.title.clone(),
            })
            .collect();
        if hits.is_empty() {
            self.entries.push(ResultEntry::Placeholder(NO_RESULTS));
        }
        self.visible = true;
    }

    /// Replace the contents with a single placeholder and show it
    pub fn show_message(&mut self, message: &'static str) {
        self.entries = vec![ResultEntry::Placeholder(message)];
        self.visible = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.visible = false;
    }

    /// Hide without forgetting the entries
    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    /// Target of the first rendered link, if any
    pub fn first_link(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            ResultEntry::Link { href, .. } => Some(href.as_str()),
            ResultEntry::Placeholder(_) => None,
        })
    }

    /// The container's inner HTML
    pub fn html(&self) -> String {
        let mut html = String::new();
        for entry in &self.entries {
            match entry {
                ResultEntry::Link { href, label } => {
                    html.push_str("<li><a href=\"");
                    html.push_str(&escape_html(href));
                    html.push_str("\">");
                    html.push_str(&escape_html(label));
                    html.push_str("</a></li>");
                }
                ResultEntry::Placeholder(text) => {
                    html.push_str("<li>");
                    html.push_str(&escape_html(text));
                    html.push_str("</li>");
                }
            }
        }
        html
    }
}

/// Escape text for use in element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
