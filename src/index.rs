use crate::document::{Corpus, Document};
use crate::error::SearchError;
use crate::query::{Clause, Presence, Query};
use crate::ranking::{rank_documents, ScoredDocument, BM25};
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Boost applied to title matches by the default index layout
pub const TITLE_BOOST: f64 = 10.0;
/// Boost applied to body matches by the default index layout
pub const CONTENT_BOOST: f64 = 1.0;

/// Document fields that can take part in scoring. `url` is never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Content,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Content => "content",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "content" => Some(Field::Content),
            _ => None,
        }
    }

    fn extract(self, doc: &Document) -> &str {
        match self {
            Field::Title => &doc.title,
            Field::Content => &doc.content,
        }
    }
}

/// Occurrence of a term inside one field of one document
#[derive(Debug, Clone)]
pub struct Posting {
    pub doc: usize,
    pub field: usize,
    pub term_frequency: usize,
}

#[derive(Debug, Clone, Default)]
struct TermEntry {
    postings: Vec<Posting>,
    doc_frequency: usize,
}

/// Declares the index layout, then receives the whole corpus in one call.
pub struct IndexBuilder {
    fields: Vec<(Field, f64)>,
    tokenizer: Tokenizer,
    refs: Vec<String>,
    field_lengths: Vec<Vec<usize>>,
    terms: BTreeMap<String, TermEntry>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            tokenizer: Tokenizer::new(),
            refs: Vec::new(),
            field_lengths: Vec::new(),
            terms: BTreeMap::new(),
        }
    }

    /// Index `field` with the given relevance boost
    pub fn field(mut self, field: Field, boost: f64) -> Self {
        self.fields.push((field, boost));
        self
    }

    /// Add every record. Records are referenced by their `id`.
    pub fn add_all(&mut self, docs: &[Document]) -> Result<(), SearchError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(docs.len());
        for doc in docs {
            if doc.id.is_empty() {
                return Err(SearchError::IndexBuild(format!(
                    "record #{} ('{}') has no id",
                    self.refs.len(),
                    doc.title
                )));
            }
            if !seen.insert(doc.id.as_str()) {
                warn!(id = %doc.id, "duplicate record id in search data");
            }
            self.add(doc);
        }
        Ok(())
    }

    fn add(&mut self, doc: &Document) {
        let ordinal = self.refs.len();
        let mut lengths = Vec::with_capacity(self.fields.len());
        let mut doc_terms: HashSet<String> = HashSet::new();

        for (field_idx, (field, _)) in self.fields.iter().enumerate() {
            let (frequencies, length) = self.tokenizer.analyze_with_frequencies(field.extract(doc));
            lengths.push(length);

            for (token, tf) in frequencies {
                let entry = self.terms.entry(token.clone()).or_default();
                entry.postings.push(Posting {
                    doc: ordinal,
                    field: field_idx,
                    term_frequency: tf,
                });
                if doc_terms.insert(token) {
                    entry.doc_frequency += 1;
                }
            }
        }

        self.refs.push(doc.id.clone());
        self.field_lengths.push(lengths);
    }

    pub fn build(self) -> SearchIndex {
        let doc_count = self.refs.len();
        let avg_field_length = (0..self.fields.len())
            .map(|f| {
                if doc_count == 0 {
                    0.0
                } else {
                    self.field_lengths.iter().map(|l| l[f]).sum::<usize>() as f64 / doc_count as f64
                }
            })
            .collect();

        SearchIndex {
            fields: self.fields,
            tokenizer: self.tokenizer,
            refs: self.refs,
            field_lengths: self.field_lengths,
            avg_field_length,
            terms: self.terms,
            bm25: BM25::default(),
        }
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A ranked match: the record reference plus its relevance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_ref: String,
    pub score: f64,
}

/// Write-once inverted index over title and content
pub struct SearchIndex {
    fields: Vec<(Field, f64)>,
    tokenizer: Tokenizer,
    refs: Vec<String>,
    field_lengths: Vec<Vec<usize>>,
    avg_field_length: Vec<f64>,
    terms: BTreeMap<String, TermEntry>,
    bm25: BM25,
}

impl SearchIndex {
    /// Build the default layout: title boosted 10x over content.
    pub fn build(corpus: &Corpus) -> Result<Self, SearchError> {
        let mut builder = IndexBuilder::new()
            .field(Field::Title, TITLE_BOOST)
            .field(Field::Content, CONTENT_BOOST);
        builder.add_all(corpus.documents())?;
        let index = builder.build();

        let stats = index.stats();
        info!(
            documents = stats.total_documents,
            tokens = stats.total_tokens,
            "search index built"
        );
        Ok(index)
    }

    /// Ranked retrieval. Hits come back best first with ties in corpus order;
    /// the result is not truncated.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let query = Query::parse(query, &self.tokenizer)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<usize, f64> = HashMap::new();
        let mut required: Option<HashSet<usize>> = None;
        let mut prohibited: HashSet<usize> = HashSet::new();

        for clause in &query.clauses {
            let matched = self.match_clause(clause, &mut scores);
            match clause.presence {
                Presence::Required => {
                    required = Some(match required {
                        None => matched,
                        Some(r) => r.intersection(&matched).copied().collect(),
                    });
                }
                Presence::Prohibited => prohibited.extend(matched),
                Presence::Optional => {}
            }
        }

        let candidates: Vec<ScoredDocument> = if query.is_negative_only() {
            (0..self.refs.len())
                .filter(|doc| !prohibited.contains(doc))
                .map(|doc| ScoredDocument::new(doc, 0.0))
                .collect()
        } else {
            scores
                .into_iter()
                .filter(|(doc, _)| required.as_ref().map_or(true, |r| r.contains(doc)))
                .filter(|(doc, _)| !prohibited.contains(doc))
                .map(|(doc, score)| ScoredDocument::new(doc, score))
                .collect()
        };

        let ranked = rank_documents(candidates);
        debug!(matches = ranked.len(), "search executed");

        Ok(ranked
            .into_iter()
            .map(|sd| SearchHit {
                doc_ref: self.refs[sd.doc].clone(),
                score: sd.score,
            })
            .collect())
    }

    /// Score one clause into `scores` and return the documents it matched.
    /// Prohibited clauses only report matches.
    fn match_clause(&self, clause: &Clause, scores: &mut HashMap<usize, f64>) -> HashSet<usize> {
        let mut matched = HashSet::new();
        let total_docs = self.refs.len();

        for entry in self.expand(clause) {
            for posting in &entry.postings {
                let (field, boost) = self.fields[posting.field];
                if clause.field.map_or(false, |f| f != field) {
                    continue;
                }
                matched.insert(posting.doc);
                if clause.presence == Presence::Prohibited {
                    continue;
                }

                let component = self.bm25.score(
                    posting.term_frequency,
                    entry.doc_frequency,
                    total_docs,
                    self.field_lengths[posting.doc][posting.field],
                    self.avg_field_length[posting.field],
                );
                *scores.entry(posting.doc).or_insert(0.0) += boost * clause.boost * component;
            }
        }

        matched
    }

    /// Vocabulary entries a clause refers to; wildcards scan the sorted prefix range
    fn expand<'a>(&'a self, clause: &'a Clause) -> Box<dyn Iterator<Item = &'a TermEntry> + 'a> {
        if clause.wildcard {
            Box::new(
                self.terms
                    .range(clause.term.clone()..)
                    .take_while(move |(t, _)| t.starts_with(clause.term.as_str()))
                    .map(|(_, e)| e),
            )
        } else {
            Box::new(self.terms.get(&clause.term).into_iter())
        }
    }

    /// Number of documents containing a term (for IDF calculation)
    pub fn doc_frequency(&self, token: &str) -> usize {
        self.terms.get(token).map_or(0, |e| e.doc_frequency)
    }

    /// Get total number of indexed documents
    pub fn total_documents(&self) -> usize {
        self.refs.len()
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        let docs_per_token: usize = self.terms.values().map(|e| e.doc_frequency).sum();
        IndexStats {
            total_documents: self.total_documents(),
            total_tokens: self.terms.len(),
            avg_docs_per_token: if self.terms.is_empty() {
                0.0
            } else {
                docs_per_token as f64 / self.terms.len() as f64
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_tokens: usize,
    pub avg_docs_per_token: f64,
}
