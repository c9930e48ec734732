use crate::error::SearchError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Longest slice of a malformed corpus echoed into the logs.
pub const PARSE_EXCERPT_CHARS: usize = 500;

/// Document represents one searchable page of the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
}

/// Site generators emit `null` for unset front matter; treat it as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Document {
    pub fn new(id: String, title: String, content: String) -> Self {
        Self {
            id,
            title,
            content,
            url: String::new(),
        }
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

/// Immutable snapshot of every record delivered to the page.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        let mut by_id = HashMap::with_capacity(documents.len());
        for (ordinal, doc) in documents.iter().enumerate() {
            // First record with an id wins, like a linear scan would.
            by_id.entry(doc.id.clone()).or_insert(ordinal);
        }
        Self { documents, by_id }
    }

    /// Parse the corpus file body. The body must be a JSON array of records.
    pub fn from_json(text: &str) -> Result<Self, SearchError> {
        let documents: Vec<Document> =
            serde_json::from_str(text).map_err(|e| SearchError::CorpusParse {
                message: e.to_string(),
                excerpt: text.chars().take(PARSE_EXCERPT_CHARS).collect(),
            })?;
        Ok(Self::new(documents))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Look up the record whose id equals `id`
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&ordinal| &self.documents[ordinal])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corpus() {
        let corpus = Corpus::from_json(
            r#"[{"id":"1","title":"Cache Eviction","content":"LRU policy details","url":"/cache"}]"#,
        )
        .unwrap();

        assert_eq!(corpus.len(), 1);
        let doc = corpus.get("1").unwrap();
        assert_eq!(doc.title, "Cache Eviction");
        assert_eq!(doc.url, "/cache");
        assert!(corpus.get("2").is_none());
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let corpus = Corpus::from_json(
            r#"[{"id":"1","title":null,"content":"Untitled page","url":"/untitled"},
                {"id":"2","title":"Cache Eviction","content":null,"url":"/cache"}]"#,
        )
        .unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get("1").unwrap().title, "");
        assert_eq!(corpus.get("2").unwrap().content, "");
        assert_eq!(corpus.get("2").unwrap().title, "Cache Eviction");
    }

    #[test]
    fn test_trailing_comma_is_parse_error() {
        let err = Corpus::from_json(r#"[{"id":"1","title":"a","content":"b","url":"/"},]"#)
            .unwrap_err();
        assert!(matches!(err, SearchError::CorpusParse { .. }));
    }

    #[test]
    fn test_parse_excerpt_is_bounded() {
        let text = format!("[{}", "x".repeat(2000));
        match Corpus::from_json(&text).unwrap_err() {
            SearchError::CorpusParse { excerpt, .. } => {
                assert_eq!(excerpt.chars().count(), PARSE_EXCERPT_CHARS)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_id_resolves_to_first() {
        let corpus = Corpus::new(vec![
            Document::new("a".into(), "First".into(), String::new()),
            Document::new("a".into(), "Second".into(), String::new()),
        ]);
        assert_eq!(corpus.get("a").unwrap().title, "First");
    }
}
