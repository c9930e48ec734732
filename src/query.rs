//! Query-string parsing.
//!
//! A query is a whitespace separated list of clauses:
//!
//! ```text
//! [+|-][field:]term[*][^boost]
//! ```
//!
//! `+` marks a term as required, `-` as prohibited. A field prefix restricts
//! the term to one indexed field. A trailing `*` turns the term into a
//! prefix wildcard, matched against the vocabulary without stemming.
//! Hyphens inside a clause separate words like any other punctuation. The
//! presence modifier and field prefix bind to the first word only, while the
//! boost and wildcard bind to the last, so `+title:write-back^2` requires
//! `write` in the title and boosts an optional `back` in any field.

use crate::error::SearchError;
use crate::index::Field;
use crate::tokenizer::Tokenizer;

/// Whether a clause must, may or must not match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    Prohibited,
}

/// One analysed search term
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub term: String,
    pub presence: Presence,
    /// Fields the term may match in; `None` means every indexed field
    pub field: Option<Field>,
    pub wildcard: bool,
    pub boost: f64,
}

/// A parsed query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    pub fn parse(text: &str, tokenizer: &Tokenizer) -> Result<Self, SearchError> {
        let mut clauses = Vec::new();
        for raw in text.split_whitespace() {
            clauses.extend(parse_clause(raw, tokenizer)?);
        }
        Ok(Self { clauses })
    }

    /// A query made only of prohibited clauses matches everything else
    pub fn is_negative_only(&self) -> bool {
        !self.clauses.is_empty()
            && self
                .clauses
                .iter()
                .all(|c| c.presence == Presence::Prohibited)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn parse_clause(raw: &str, tokenizer: &Tokenizer) -> Result<Vec<Clause>, SearchError> {
    let (presence, rest) = match raw.chars().next() {
        Some('+') => (Presence::Required, &raw[1..]),
        Some('-') => (Presence::Prohibited, &raw[1..]),
        _ => (Presence::Optional, raw),
    };

    let (field, rest) = match rest.split_once(':') {
        Some((name, term)) => {
            let field = Field::from_name(name).ok_or_else(|| {
                SearchError::Query(format!("unrecognised field '{}'", name))
            })?;
            (Some(field), term)
        }
        None => (None, rest),
    };

    let (rest, boost) = match rest.rsplit_once('^') {
        Some((term, boost)) => {
            let boost: f64 = boost
                .parse()
                .ok()
                .filter(|b: &f64| *b > 0.0 && b.is_finite())
                .ok_or_else(|| SearchError::Query(format!("invalid boost '{}'", boost)))?;
            (term, boost)
        }
        None => (rest, 1.0),
    };

    let (rest, wildcard) = match rest.strip_suffix('*') {
        Some(term) => (term, true),
        None => (rest, false),
    };

    if rest.is_empty() {
        return Err(SearchError::Query(format!(
            "expecting a term in clause '{}'",
            raw
        )));
    }

    let mut terms: Vec<(String, bool)> = if wildcard {
        let mut words = tokenizer.words(rest);
        let prefix = words.pop();
        words
            .iter()
            .map(|w| (tokenizer.stem(w), false))
            .chain(prefix.map(|p| (p, true)))
            .collect()
    } else {
        tokenizer
            .analyze_query(rest)
            .into_iter()
            .map(|t| (t, false))
            .collect()
    };
    terms.retain(|(t, _)| !t.is_empty());

    let last = terms.len().saturating_sub(1);
    Ok(terms
        .into_iter()
        .enumerate()
        .map(|(i, (term, wildcard))| Clause {
            term,
            presence: if i == 0 { presence } else { Presence::Optional },
            field: if i == 0 { field } else { None },
            wildcard,
            boost: if i == last { boost } else { 1.0 },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Query, SearchError> {
        Query::parse(text, &Tokenizer::new())
    }

    #[test]
    fn test_plain_terms_are_optional() {
        let query = parse("cache eviction").unwrap();
        assert_eq!(query.clauses.len(), 2);
        assert!(query
            .clauses
            .iter()
            .all(|c| c.presence == Presence::Optional && c.field.is_none()));
        assert_eq!(query.clauses[0].term, "cach");
        assert_eq!(query.clauses[1].term, "evict");
    }

    #[test]
    fn test_modifiers() {
        let query = parse("+title:cache lru*^2").unwrap();
        assert_eq!(query.clauses[0].presence, Presence::Required);
        assert_eq!(query.clauses[0].field, Some(Field::Title));
        assert!(query.clauses[1].wildcard);
        assert_eq!(query.clauses[1].term, "lru");
        assert_eq!(query.clauses[1].boost, 2.0);
    }

    #[test]
    fn test_prohibited_and_hyphenated() {
        let query = parse("cache -lru write-back").unwrap();
        assert_eq!(query.clauses.len(), 4);
        assert_eq!(query.clauses[1].presence, Presence::Prohibited);
        assert_eq!(query.clauses[1].term, "lru");
        assert_eq!(query.clauses[2].term, "write");
        assert_eq!(query.clauses[3].term, "back");
        assert!(!query.is_negative_only());
        assert!(parse("-lru").unwrap().is_negative_only());
    }

    #[test]
    fn test_hyphenated_clause_binds_modifiers_to_ends() {
        let query = parse("+title:write-back^2").unwrap();
        assert_eq!(query.clauses.len(), 2);

        let (write, back) = (&query.clauses[0], &query.clauses[1]);
        assert_eq!(write.term, "write");
        assert_eq!(write.presence, Presence::Required);
        assert_eq!(write.field, Some(Field::Title));
        assert_eq!(write.boost, 1.0);

        assert_eq!(back.term, "back");
        assert_eq!(back.presence, Presence::Optional);
        assert_eq!(back.field, None);
        assert_eq!(back.boost, 2.0);

        assert!(!parse("-write-back").unwrap().is_negative_only());
    }

    #[test]
    fn test_unknown_field_is_error() {
        assert!(matches!(parse("url:cache"), Err(SearchError::Query(_))));
        assert!(matches!(parse("author:bob"), Err(SearchError::Query(_))));
    }

    #[test]
    fn test_dangling_modifier_is_error() {
        assert!(parse("+").is_err());
        assert!(parse("-").is_err());
        assert!(parse("title:").is_err());
        assert!(parse("cache^x").is_err());
    }
}
