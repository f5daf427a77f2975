//! Text embedding seam used by the engine backends.
//!
//! The local engine and the HTTP client both turn document and query text into
//! vectors before storing or querying. [`HashEmbedder`] is always available and
//! deterministic; `FastEmbedder` wraps fastembed when the `fastembed` feature is
//! enabled.

use sha2::{Digest, Sha256};

use super::error::{EngineError, EngineResult};

/// Default vector dimension for the hashing embedder.
pub const DEFAULT_DIMENSION: usize = 384;

/// Produces fixed-size vectors from text.
pub trait Embedder: Send + Sync {
    /// Short model identifier, stored in collection metadata.
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed a batch of texts. The output has one vector per input, in order.
    fn embed(&self, texts: &[&str]) -> EngineResult<Vec<Vec<f32>>>;

    /// Embed one text.
    fn embed_one(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("No embedding generated".to_string()))
    }
}

/// Feature-hashing embedder over lower-cased word tokens.
///
/// Each token is hashed with SHA-256; the digest picks a bucket and a sign.
/// The resulting vector is L2-normalised, so texts sharing more words end up
/// closer together. No model download, no state.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> EngineResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Lower-cased alphanumeric runs.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Squared euclidean distance. Vectors of different length are maximally far.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(feature = "fastembed")]
pub use fast::FastEmbedder;

#[cfg(feature = "fastembed")]
mod fast {
    use std::sync::Mutex;

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::Embedder;
    use crate::engine::error::{EngineError, EngineResult};

    /// fastembed-backed embedder.
    pub struct FastEmbedder {
        name: String,
        model: Mutex<TextEmbedding>,
        dimension: usize,
    }

    impl FastEmbedder {
        /// Load a model by its settings name (e.g. `AllMiniLML6V2`).
        pub fn from_settings(model_name: &str) -> EngineResult<Self> {
            let model = match model_name {
                "AllMiniLML6V2" => EmbeddingModel::AllMiniLML6V2,
                "ParaphraseMLMiniLML12V2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
                "MultilingualE5Small" => EmbeddingModel::MultilingualE5Small,
                other => {
                    return Err(EngineError::Embedding(format!(
                        "Unsupported embedding model: {other}"
                    )));
                }
            };

            let mut text_model =
                TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
                    .map_err(|e| EngineError::Embedding(e.to_string()))?;

            let sample = text_model
                .embed(vec!["dimension check"], None)
                .map_err(|e| EngineError::Embedding(e.to_string()))?;
            let dimension = sample.first().map(Vec::len).unwrap_or_default();

            Ok(Self {
                name: model_name.to_string(),
                model: Mutex::new(text_model),
                dimension,
            })
        }
    }

    impl Embedder for FastEmbedder {
        fn name(&self) -> &str {
            &self.name
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed(&self, texts: &[&str]) -> EngineResult<Vec<Vec<f32>>> {
            let mut model = self
                .model
                .lock()
                .map_err(|_| EngineError::Embedding("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| EngineError::Embedding(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_one("¿Qué es la recategorización?").unwrap();
        let b = embedder.embed_one("¿Qué es la recategorización?").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
    }

    #[test]
    fn test_hash_embedder_unit_length() {
        let embedder = HashEmbedder::with_dimension(32);
        let v = embedder.embed_one("monotributo categoria").unwrap();
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashEmbedder::new();
        let query = embedder.embed_one("how do I pay the monthly fee").unwrap();
        let related = embedder.embed_one("pay the monthly fee online").unwrap();
        let unrelated = embedder.embed_one("register a new company address").unwrap();
        assert!(squared_l2(&query, &related) < squared_l2(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_yields_zero_vector() {
        let embedder = HashEmbedder::with_dimension(8);
        let v = embedder.embed_one("  ¿?  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((squared_l2(&[1.0, 0.0], &[0.0, 1.0]) - 2.0).abs() < 1e-6);
        assert_eq!(squared_l2(&[1.0], &[1.0, 0.0]), f32::MAX);
    }
}
