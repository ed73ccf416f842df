//! Hybrid lexical + semantic search over page-model utterances.
//!
//! [`HybridSearchEngine`] owns the lexical and embedding indexes, rebuilds
//! them from a [`intentdb_core::traits::ModelSource`] and answers
//! [`SearchRequest`]s by fusing BM25 with cosine similarity.
pub mod engine;
pub mod request;
pub mod url_match;

pub use engine::HybridSearchEngine;
pub use request::SearchRequest;
