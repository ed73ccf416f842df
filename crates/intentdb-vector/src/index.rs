use std::collections::HashMap;

use intentdb_core::error::Error;
use intentdb_core::types::DocId;

/// Document id -> embedding, all of one dimensionality.
///
/// The first insert fixes the dimension; later vectors of another length are
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: HashMap<DocId, Vec<f32>>,
    dim: Option<usize>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc_id: impl Into<DocId>, vector: Vec<f32>) -> Result<(), Error> {
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
            None => self.dim = Some(vector.len()),
            _ => {}
        }
        self.vectors.insert(doc_id.into(), vector);
        Ok(())
    }

    pub fn get(&self, doc_id: &str) -> Option<&[f32]> {
        self.vectors.get(doc_id).map(Vec::as_slice)
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.vectors.contains_key(doc_id)
    }

    /// Ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.vectors.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_fixes_dimension() {
        let mut index = EmbeddingIndex::new();
        index.insert("a", vec![1.0, 0.0]).unwrap();
        assert_eq!(index.dimension(), Some(2));
        let err = index.insert("b", vec![1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(!index.contains("b"));
    }

    #[test]
    fn get_returns_inserted_vector() {
        let mut index = EmbeddingIndex::new();
        assert!(index.is_empty());
        index.insert("b", vec![1.0, 2.0]).unwrap();
        assert_eq!(index.get("b"), Some(&[1.0, 2.0][..]));
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn ids_are_sorted() {
        let mut index = EmbeddingIndex::new();
        for id in ["c", "a", "b"] {
            index.insert(id, vec![0.0]).unwrap();
        }
        assert_eq!(index.sorted_ids(), vec!["a", "b", "c"]);
    }
}
