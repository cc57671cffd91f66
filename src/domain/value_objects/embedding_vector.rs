use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkDataError {
    DimensionMismatch { expected: usize, found: usize },
    NonFiniteValue(usize),
    Empty,
}

impl std::fmt::Display for ChunkDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkDataError::DimensionMismatch { expected, found } => write!(
                f,
                "Embedding dimension mismatch: expected {}, found {}",
                expected, found
            ),
            ChunkDataError::NonFiniteValue(position) => {
                write!(f, "Embedding has a non-finite value at position {}", position)
            }
            ChunkDataError::Empty => write!(f, "Embedding is empty"),
        }
    }
}

impl std::error::Error for ChunkDataError {}

/// Dense embedding of fixed dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn zero(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    /// Validates a stored row before it takes part in ranking.
    pub fn decode(values: Vec<f32>, expected_dimension: usize) -> Result<Self, ChunkDataError> {
        if values.is_empty() {
            return Err(ChunkDataError::Empty);
        }
        if values.len() != expected_dimension {
            return Err(ChunkDataError::DimensionMismatch {
                expected: expected_dimension,
                found: values.len(),
            });
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(ChunkDataError::NonFiniteValue(position));
        }
        Ok(Self(values))
    }

    /// Mean over the token axis. Rows of a different width than the first are ignored.
    pub fn mean_pool(token_vectors: &[Vec<f32>]) -> Option<Self> {
        let width = token_vectors.first()?.len();
        if width == 0 {
            return None;
        }

        let mut sums = vec![0.0f32; width];
        let mut rows = 0usize;
        for row in token_vectors.iter().filter(|row| row.len() == width) {
            for (sum, value) in sums.iter_mut().zip(row) {
                *sum += value;
            }
            rows += 1;
        }

        let divisor = rows as f32;
        Some(Self(sums.into_iter().map(|sum| sum / divisor).collect()))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn magnitude(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|x| *x == 0.0)
    }

    /// Zero when either side has no magnitude or the dimensions differ.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        let a = self.as_slice();
        let b = other.as_slice();

        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a = self.magnitude();
        let norm_b = other.magnitude();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_similarity_is_one() {
        let a = EmbeddingVector::new(vec![0.3, -1.2, 4.5, 0.01]);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_similarity_is_exactly_zero() {
        let a = EmbeddingVector::new(vec![0.3, -1.2, 4.5]);
        let zero = EmbeddingVector::zero(3);
        assert_eq!(zero.cosine_similarity(&a), 0.0);
        assert_eq!(a.cosine_similarity(&zero), 0.0);
        assert!(zero.is_zero());
    }

    #[test]
    fn test_opposite_vectors() {
        let a = EmbeddingVector::new(vec![1.0, 0.0]);
        let b = EmbeddingVector::new(vec![-1.0, 0.0]);
        assert!((a.cosine_similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool() {
        let pooled =
            EmbeddingVector::mean_pool(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(pooled.as_slice(), &[3.0, 4.0]);
        assert!(EmbeddingVector::mean_pool(&[]).is_none());
    }

    #[test]
    fn test_decode_rejects_corrupt_rows() {
        assert_eq!(
            EmbeddingVector::decode(vec![1.0, 2.0], 3),
            Err(ChunkDataError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            EmbeddingVector::decode(vec![1.0, f32::NAN, 2.0], 3),
            Err(ChunkDataError::NonFiniteValue(1))
        );
        assert_eq!(EmbeddingVector::decode(vec![], 3), Err(ChunkDataError::Empty));
        assert!(EmbeddingVector::decode(vec![1.0, 2.0, 3.0], 3).is_ok());
    }
}
