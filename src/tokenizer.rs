use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};

lazy_static::lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        [
            "a", "able", "about", "across", "after", "all", "almost", "also", "am", "among",
            "an", "and", "any", "are", "as", "at", "be", "because", "been", "but", "by",
            "can", "cannot", "could", "dear", "did", "do", "does", "either", "else", "ever",
            "every", "for", "from", "get", "got", "had", "has", "have", "he", "her", "hers",
            "him", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its",
            "just", "least", "let", "like", "likely", "may", "me", "might", "most", "must",
            "my", "neither", "no", "nor", "not", "of", "off", "often", "on", "only", "or",
            "other", "our", "own", "rather", "said", "say", "says", "she", "should", "since",
            "so", "some", "than", "that", "the", "their", "them", "then", "there", "these",
            "they", "this", "tis", "to", "too", "twas", "us", "wants", "was", "we", "were",
            "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
            "would", "yet", "you", "your",
        ]
        .iter()
        .copied()
        .collect()
    };
}

/// English analysis pipeline shared by the index builder and the query parser
pub struct Tokenizer {
    stemmer: Stemmer,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Tokenize text into words
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.chars()
            .fold(vec![String::new()], |mut tokens, c| {
                if c.is_alphanumeric() {
                    if let Some(last) = tokens.last_mut() {
                        last.push(c);
                    }
                } else if tokens.last().map_or(false, |s| !s.is_empty()) {
                    tokens.push(String::new());
                }
                tokens
            })
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Convert tokens to lowercase
    fn lowercase_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }

    /// Remove stopwords
    fn stopword_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !STOPWORDS.contains(t.as_str()))
            .collect()
    }

    /// Apply stemming
    fn stemmer_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .map(|t| self.stemmer.stem(&t).to_string())
            .collect()
    }

    /// Indexing pipeline: split, lowercase, drop stopwords, stem
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let tokens = self.lowercase_filter(tokens);
        let tokens = self.stopword_filter(tokens);
        self.stemmer_filter(tokens)
    }

    /// Query pipeline. Stopwords are kept so that searching for one simply
    /// finds nothing instead of silently widening the query.
    pub fn analyze_query(&self, text: &str) -> Vec<String> {
        self.stemmer_filter(self.words(text))
    }

    /// Lowercased words without stemming, used for wildcard prefixes
    pub fn words(&self, text: &str) -> Vec<String> {
        self.lowercase_filter(self.tokenize(text))
    }

    pub fn stem(&self, word: &str) -> String {
        self.stemmer.stem(word).to_string()
    }

    /// Analyze and count term frequencies
    pub fn analyze_with_frequencies(&self, text: &str) -> (HashMap<String, usize>, usize) {
        let tokens = self.analyze(text);
        let length = tokens.len();
        let mut frequencies = HashMap::new();
        for token in tokens {
            *frequencies.entry(token).or_insert(0) += 1;
        }
        (frequencies, length)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
