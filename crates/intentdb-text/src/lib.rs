//! intentdb-text
//!
//! In-memory lexical side of the hybrid engine: tokenization with stopwords and
//! synonym expansion, an inverted index with per-document lengths, candidate
//! pruning and BM25 scoring.
pub mod index;
pub mod tokenize;

pub use index::{LexicalIndex, BM25_B, BM25_K1};
pub use tokenize::Tokenizer;
