use std::collections::{HashMap, HashSet};

use intentdb_core::types::DocId;

use crate::tokenize::Tokenizer;

pub const BM25_K1: f32 = 1.2;
pub const BM25_B: f32 = 0.75;

/// Inverted index plus the per-document statistics BM25 needs.
///
/// Rebuild discipline is clear-all then re-add-all: adding a doc id twice
/// without [`LexicalIndex::clear`] double-counts its terms. Call
/// [`LexicalIndex::recompute_average_length`] once all documents are in.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    tokenizer: Tokenizer,
    postings: HashMap<String, HashMap<DocId, u32>>,
    doc_lengths: HashMap<DocId, usize>,
    avg_doc_length: f32,
    /// Normalized tokens per distinct utterance text.
    token_cache: HashMap<String, Vec<String>>,
}

impl LexicalIndex {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            postings: HashMap::new(),
            doc_lengths: HashMap::new(),
            avg_doc_length: 1.0,
            token_cache: HashMap::new(),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenizes `text` and records its postings. Returns the token count.
    pub fn add_document(&mut self, doc_id: &str, text: &str) -> usize {
        let tokens = match self.token_cache.get(text) {
            Some(tokens) => tokens.clone(),
            None => {
                let tokens = self.tokenizer.tokenize(text);
                self.token_cache.insert(text.to_string(), tokens.clone());
                tokens
            }
        };
        self.doc_lengths.insert(doc_id.to_string(), tokens.len());
        for token in &tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(doc_id.to_string())
                .or_insert(0) += 1;
        }
        tokens.len()
    }

    /// Mean document length, or 1.0 for an empty index so BM25 never divides
    /// by zero.
    pub fn recompute_average_length(&mut self) {
        self.avg_doc_length = if self.doc_lengths.is_empty() {
            1.0
        } else {
            let total: usize = self.doc_lengths.values().sum();
            let mean = total as f32 / self.doc_lengths.len() as f32;
            if mean > 0.0 { mean } else { 1.0 }
        };
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    pub fn unique_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn term_frequency(&self, term: &str, doc_id: &str) -> u32 {
        self.postings
            .get(term)
            .and_then(|p| p.get(doc_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, HashMap::len)
    }

    /// Union of the posting lists of `terms`, sorted by id.
    ///
    /// When the union holds more than `max_candidates` documents, only the
    /// `max_candidates` with the highest summed term frequency over `terms`
    /// survive (ties broken by id). An empty result means no lexical overlap.
    pub fn candidates(&self, terms: &[String], max_candidates: usize) -> Vec<DocId> {
        let mut summed: HashMap<&str, u64> = HashMap::new();
        for term in terms {
            if let Some(postings) = self.postings.get(term) {
                for (doc_id, tf) in postings {
                    *summed.entry(doc_id.as_str()).or_insert(0) += u64::from(*tf);
                }
            }
        }

        let mut ranked: Vec<(&str, u64)> = summed.into_iter().collect();
        if ranked.len() > max_candidates {
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked.truncate(max_candidates);
        }
        let mut ids: Vec<DocId> = ranked.into_iter().map(|(id, _)| id.to_string()).collect();
        ids.sort();
        ids
    }

    /// BM25 of `doc_id` against the distinct terms of `query_terms`.
    pub fn bm25(&self, query_terms: &[String], doc_id: &str) -> f32 {
        let Some(&doc_len) = self.doc_lengths.get(doc_id) else {
            return 0.0;
        };
        let n = self.doc_lengths.len() as f32;
        let length_norm = 1.0 - BM25_B + BM25_B * doc_len as f32 / self.avg_doc_length;

        let mut seen = HashSet::new();
        let mut score = 0.0;
        for term in query_terms {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let Some(&tf) = postings.get(doc_id) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            let tf = tf as f32;
            score += idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * length_norm);
        }
        score
    }
}
