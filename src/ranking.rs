use std::cmp::Ordering;

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct BM25 {
    k1: f64,
    b: f64,
}

impl Default for BM25 {
    fn default() -> Self {
        Self {
            k1: 1.5, // Term frequency saturation parameter
            b: 0.75, // Length normalization parameter
        }
    }
}

impl BM25 {
    /// BM25 contribution of one term in one field of a document
    pub fn score(
        &self,
        term_frequency: usize,
        doc_frequency: usize,
        total_docs: usize,
        field_length: usize,
        avg_field_length: f64,
    ) -> f64 {
        let tf = term_frequency as f64;
        if tf == 0.0 {
            return 0.0;
        }

        // Calculate IDF (Inverse Document Frequency)
        let doc_freq = doc_frequency as f64;
        let total_docs = total_docs as f64;
        let idf = if doc_freq > 0.0 {
            ((total_docs - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln()
        } else {
            0.0
        };

        let length_ratio = if avg_field_length > 0.0 {
            field_length as f64 / avg_field_length
        } else {
            1.0
        };
        let normalized_tf =
            (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * length_ratio));

        idf * normalized_tf
    }
}

/// Candidate document (by corpus ordinal) with its accumulated score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc: usize,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(doc: usize, score: f64) -> Self {
        Self { doc, score }
    }
}

/// Sort by score descending; equal scores keep corpus insertion order
pub fn rank_documents(mut scored_docs: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    scored_docs.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.doc.cmp(&b.doc))
    });
    scored_docs
}
