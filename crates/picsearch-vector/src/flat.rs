//! Exact nearest-neighbour search over a dense row-major matrix.

use picsearch_core::error::{Error, Result};
use picsearch_core::types::DocId;

/// Brute-force squared-L2 index. Row `i` is the embedding of document `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
	dimension: usize,
	data: Vec<f32>,
}

impl FlatL2Index {
	pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
		let mut data = Vec::with_capacity(dimension * vectors.len());
		for v in vectors {
			if v.len() != dimension { return Err(Error::DimensionMismatch { expected: dimension, actual: v.len() }); }
			data.extend_from_slice(v);
		}
		Ok(Self { dimension, data })
	}

	pub fn dimension(&self) -> usize { self.dimension }

	pub fn len(&self) -> usize { if self.dimension == 0 { 0 } else { self.data.len() / self.dimension } }

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	pub fn iter(&self) -> impl Iterator<Item = (DocId, &[f32])> {
		self.data.chunks_exact(self.dimension.max(1)).enumerate().map(|(i, row)| (i as DocId, row))
	}

	/// The `min(n, len)` nearest rows to `query`, ascending by squared L2
	/// distance; equal distances keep the lower id first.
	pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<(DocId, f32)>> {
		if query.len() != self.dimension {
			return Err(Error::DimensionMismatch { expected: self.dimension, actual: query.len() });
		}
		let mut scored: Vec<(DocId, f32)> = self.iter().map(|(id, row)| (id, squared_l2(query, row))).collect();
		// stable sort keeps id order among ties
		scored.sort_by(|a, b| a.1.total_cmp(&b.1));
		scored.truncate(n.min(self.len()));
		Ok(scored)
	}
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| { let d = x - y; d * d }).sum()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index() -> FlatL2Index {
		FlatL2Index::build(2, &[vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap()
	}

	#[test]
	fn nearest_first_with_squared_distances() {
		let hits = index().search(&[0.0, 0.0], 3).unwrap();
		assert_eq!(hits[0], (0, 0.0));
		assert_eq!(hits[1], (2, 1.0));
		assert_eq!(hits[2], (3, 1.0), "tie resolved by lower id");
	}

	#[test]
	fn result_length_is_capped_by_corpus() {
		let idx = index();
		assert_eq!(idx.search(&[0.0, 0.0], 10).unwrap().len(), 4);
		assert!(idx.search(&[0.0, 0.0], 0).unwrap().is_empty());
		assert_eq!(idx.search(&[3.0, 4.0], 1).unwrap(), vec![(1, 0.0)]);
	}

	#[test]
	fn ragged_vectors_are_rejected() {
		let err = FlatL2Index::build(2, &[vec![0.0, 0.0], vec![1.0]]).unwrap_err();
		assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
	}

	#[test]
	fn wrong_sized_query_is_rejected() {
		let err = index().search(&[0.0, 0.0, 0.0], 1).unwrap_err();
		assert_eq!(err.kind(), "dimension_mismatch");
	}

	#[test]
	fn empty_index_returns_nothing() {
		let idx = FlatL2Index::build(3, &[]).unwrap();
		assert!(idx.is_empty());
		assert!(idx.search(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
		assert_eq!(idx.iter().count(), 0);
	}

	#[test]
	fn rows_iterate_in_id_order() {
		let rows: Vec<_> = index().iter().map(|(id, row)| (id, row.to_vec())).collect();
		assert_eq!(rows[1], (1, vec![3.0, 4.0]));
	}
}
