use std::collections::{HashMap, HashSet};

use intentdb_core::config::{SearchConfig, DEFAULT_STOPWORDS};

/// Characters that separate tokens. Anything else is part of a token.
pub const DELIMITERS: &[char] = &[
    ' ', '\t', '\n', '\r', '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"',
    '\'', '`', '-', '_', '/', '\\', '|', '<', '>', '=', '+', '*', '&', '#', '@',
];

/// Lowercasing, delimiter-splitting tokenizer with stopword removal and a
/// synonym table for query expansion.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
    synonyms: HashMap<String, Vec<String>>,
}

impl Tokenizer {
    pub fn new<I, S>(stopwords: I, synonyms: HashMap<String, Vec<String>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
        let synonyms = synonyms
            .into_iter()
            .map(|(term, alts)| {
                let alts = alts.into_iter().map(|a| a.to_lowercase()).collect();
                (term.to_lowercase(), alts)
            })
            .collect();
        Self { stopwords, synonyms }
    }

    /// Default English stopwords, no synonyms.
    pub fn english() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied(), HashMap::new())
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.stopwords.iter(), config.synonyms.clone())
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(DELIMITERS)
            .filter(|t| !t.is_empty())
            .filter(|t| !self.is_stopword(t))
            .map(str::to_string)
            .collect()
    }

    /// Each token followed by its synonyms. Duplicates are kept.
    pub fn expand(&self, tokens: &[String]) -> Vec<String> {
        let mut terms = Vec::with_capacity(tokens.len());
        for token in tokens {
            terms.push(token.clone());
            if let Some(alts) = self.synonyms.get(token) {
                terms.extend(alts.iter().cloned());
            }
        }
        terms
    }
}
