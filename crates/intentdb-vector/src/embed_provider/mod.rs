//! Embedding provider wrappers.
//!
//! Providers themselves implement [`intentdb_core::traits::Embedder`]; this
//! module layers behaviour on top of any of them. Every wrapper must return
//! vectors of the wrapped provider's dimensionality.

pub mod cached;
