//! Feature-hashing embedder.

use super::Embedder;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Deterministic bag-of-words embedder.
///
/// Each lowercased alphanumeric token is hashed with SHA-256 into one of
/// `dimensions` buckets and the bucket counts are L2-normalized. Texts that
/// share words score above zero; it does NOT capture meaning.
///
/// # Example
///
/// ```rust
/// use embedstore::{Embedder, HashEmbedder};
///
/// let embedder = HashEmbedder::new(64)?;
/// let a = embedder.embed("the quick brown fox")?;
/// let b = embedder.embed("The quick brown fox!")?;
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// # Ok::<(), embedstore::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Default embedding dimensions, matching all-MiniLM-L6-v2.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Upper bound on tokens hashed per text.
    pub const MAX_TOKENS: usize = 10_000;

    /// Creates an embedder producing `dimensions`-length vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Configuration(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
        }
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("cannot embed empty text".to_string()));
        }

        let mut embedding = vec![0.0_f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(Self::MAX_TOKENS);
        for token in tokens {
            embedding[self.bucket(&token.to_lowercase())] += 1.0;
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        Ok(embedding)
    }
}
