//! Word-embedding backends for the semantic matching strategy.
//!
//! The matcher only needs a distance between two words (0 = identical,
//! ~2 = opposite). Backends: a GloVe-style vector table, any sentence
//! embedding model through [`ModelDistance`], the ONNX all-MiniLM-L6-v2
//! embedder (feature `onnx-embeddings`), and [`NoEmbedding`] which turns
//! the strategy off.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Standard embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model initialization failed: {0}")]
    ModelInit(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Word not in vocabulary: {0}")]
    UnknownWord(String),

    #[error("Malformed vector table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },

    #[error("No embedding backend configured")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Semantic distance between two words.
pub trait WordEmbedding: Send + Sync {
    /// Distance in `[0, 2]`; an error means "no opinion" for this pair.
    fn distance(&self, a: &str, b: &str) -> Result<f64, EmbeddingError>;

    fn is_available(&self) -> bool {
        true
    }

    /// Called with every word of one label lookup before any distance is
    /// asked for. Model backends embed them in a single batch.
    fn prepare(&self, _words: &[&str]) {}
}

/// Backend that never answers; disables the embedding strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbedding;

impl WordEmbedding for NoEmbedding {
    fn distance(&self, _a: &str, _b: &str) -> Result<f64, EmbeddingError> {
        Err(EmbeddingError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// A model that maps text to a dense vector.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;
}

/// `1 − cos(a, b)`, clamped to `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::Embedding(format!(
            "Dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(EmbeddingError::Embedding("Zero-length vector".to_string()));
    }
    Ok((1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0))
}

/// Adapts an [`EmbeddingModel`] to word distances, caching each word's vector.
pub struct ModelDistance<M> {
    model: M,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl<M: EmbeddingModel> ModelDistance<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn vector(&self, word: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = word.to_lowercase();
        {
            let cache = self
                .cache
                .lock()
                .map_err(|_| EmbeddingError::Embedding("Cache lock poisoned".to_string()))?;
            if let Some(v) = cache.get(&key) {
                return Ok(v.clone());
            }
        }
        let vector = self.model.embed(&key)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, vector.clone());
        }
        Ok(vector)
    }

    /// Lowercased words from `words` that have no cached vector yet.
    fn uncached(&self, words: &[&str]) -> Vec<String> {
        let Ok(cache) = self.cache.lock() else {
            return Vec::new();
        };
        let mut missing: Vec<String> = words
            .iter()
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty() && !cache.contains_key(w))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl<M: EmbeddingModel> WordEmbedding for ModelDistance<M> {
    fn distance(&self, a: &str, b: &str) -> Result<f64, EmbeddingError> {
        if a.eq_ignore_ascii_case(b) {
            return Ok(0.0);
        }
        cosine_distance(&self.vector(a)?, &self.vector(b)?)
    }

    fn prepare(&self, words: &[&str]) {
        let missing = self.uncached(words);
        if missing.is_empty() {
            return;
        }
        let refs: Vec<&str> = missing.iter().map(String::as_str).collect();
        match self.model.embed_batch(&refs) {
            Ok(vectors) if vectors.len() == missing.len() => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.extend(missing.into_iter().zip(vectors));
                }
            }
            Ok(vectors) => tracing::warn!(
                words = missing.len(),
                vectors = vectors.len(),
                "Embedding batch size mismatch, falling back to single lookups"
            ),
            // Per-word lookups still run and report their own errors.
            Err(e) => tracing::debug!(words = missing.len(), error = %e, "Embedding batch failed"),
        }
    }
}

/// In-memory word vectors loaded from a GloVe / word2vec text file.
///
/// One word per line followed by its components, whitespace separated.
/// A leading word2vec `count dimension` header is skipped.
#[derive(Debug, Clone, Default)]
pub struct VectorTable {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl VectorTable {
    pub fn load(path: &Path) -> Result<Self, EmbeddingError> {
        if !path.exists() {
            return Err(EmbeddingError::ModelNotFound(path.to_path_buf()));
        }
        let table = Self::from_reader(BufReader::new(File::open(path)?))?;
        tracing::info!(
            words = table.len(),
            dimension = table.dimension,
            "Word vectors loaded from {}",
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EmbeddingError> {
        let mut table = VectorTable::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let components: Vec<&str> = parts.collect();

            if index == 0 && components.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }

            let vector = components
                .iter()
                .map(|c| c.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| EmbeddingError::MalformedTable {
                    line: index + 1,
                    reason: e.to_string(),
                })?;

            if vector.is_empty() {
                return Err(EmbeddingError::MalformedTable {
                    line: index + 1,
                    reason: "no components".to_string(),
                });
            }
            if table.dimension == 0 {
                table.dimension = vector.len();
            } else if vector.len() != table.dimension {
                return Err(EmbeddingError::MalformedTable {
                    line: index + 1,
                    reason: format!("expected {} components, found {}", table.dimension, vector.len()),
                });
            }
            table.vectors.insert(word.to_lowercase(), vector);
        }

        Ok(table)
    }

    pub fn insert(&mut self, word: &str, vector: Vec<f32>) {
        if self.dimension == 0 {
            self.dimension = vector.len();
        }
        self.vectors.insert(word.to_lowercase(), vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn lookup(&self, word: &str) -> Result<&[f32], EmbeddingError> {
        self.vectors
            .get(&word.to_lowercase())
            .map(Vec::as_slice)
            .ok_or_else(|| EmbeddingError::UnknownWord(word.to_string()))
    }
}

impl EmbeddingModel for VectorTable {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.lookup(text).map(<[f32]>::to_vec)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl WordEmbedding for VectorTable {
    fn distance(&self, a: &str, b: &str) -> Result<f64, EmbeddingError> {
        cosine_distance(self.lookup(a)?, self.lookup(b)?)
    }

    fn is_available(&self) -> bool {
        !self.vectors.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// ONNX Embedder — behind `onnx-embeddings` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use super::{EmbeddingError, EmbeddingModel, EMBEDDING_DIM};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// all-MiniLM-L6-v2 through ONNX Runtime, embedding caption words and
    /// keypath words for the semantic matching strategy.
    ///
    /// Requires `model.onnx` and `tokenizer.json` in the model directory.
    /// `Session::run` needs `&mut self`, hence the Mutex.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, EmbeddingError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(EmbeddingError::ModelNotFound(model_path));
            }
            if !tokenizer_path.exists() {
                return Err(EmbeddingError::ModelNotFound(tokenizer_path));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| EmbeddingError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| EmbeddingError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| EmbeddingError::ModelInit(format!("ONNX load failed: {e}")))?;

            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| EmbeddingError::ModelInit(format!("Tokenizer load failed: {e}")))?;

            tracing::info!(dir = %model_dir.display(), "Word embedder ready");

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        /// One padded `[batch, max_len]` inference over all `words`.
        fn infer_batch(&self, words: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            use ort::value::TensorRef;

            if words.is_empty() {
                return Ok(Vec::new());
            }
            let encodings = self
                .tokenizer
                .encode_batch(words.to_vec(), true)
                .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;

            let batch = encodings.len();
            let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
            if max_len == 0 {
                return Err(EmbeddingError::Tokenization("Empty encoding".to_string()));
            }

            // Pad with id 0 / mask 0; padded positions drop out of pooling.
            let mut input_ids = vec![0i64; batch * max_len];
            let mut attention_mask = vec![0i64; batch * max_len];
            let mut token_type_ids = vec![0i64; batch * max_len];
            for (row, encoding) in encodings.iter().enumerate() {
                let base = row * max_len;
                for (i, &id) in encoding.get_ids().iter().enumerate() {
                    input_ids[base + i] = i64::from(id);
                }
                for (i, &m) in encoding.get_attention_mask().iter().enumerate() {
                    attention_mask[base + i] = i64::from(m);
                }
                for (i, &t) in encoding.get_type_ids().iter().enumerate() {
                    token_type_ids[base + i] = i64::from(t);
                }
            }

            let shape_err = |e: ndarray::ShapeError| EmbeddingError::Embedding(e.to_string());
            let ids_array = ndarray::Array2::from_shape_vec((batch, max_len), input_ids).map_err(shape_err)?;
            let mask_array =
                ndarray::Array2::from_shape_vec((batch, max_len), attention_mask.clone()).map_err(shape_err)?;
            let type_array =
                ndarray::Array2::from_shape_vec((batch, max_len), token_type_ids).map_err(shape_err)?;

            let tensor_err = |e: ort::Error| EmbeddingError::Embedding(e.to_string());
            let ids_tensor = TensorRef::from_array_view(&ids_array).map_err(tensor_err)?;
            let mask_tensor = TensorRef::from_array_view(&mask_array).map_err(tensor_err)?;
            let type_tensor = TensorRef::from_array_view(&type_array).map_err(tensor_err)?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| EmbeddingError::Embedding("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| EmbeddingError::Embedding(format!("ONNX inference failed: {e}")))?;

            let (shape, hidden) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EmbeddingError::Embedding(format!("Output extraction: {e}")))?;

            if shape.len() != 3 || shape[0] as usize != batch || shape[2] as usize != EMBEDDING_DIM {
                return Err(EmbeddingError::Embedding(format!(
                    "Unexpected output shape: {shape:?}, expected [{batch}, {max_len}, {EMBEDDING_DIM}]"
                )));
            }

            let row_len = max_len * EMBEDDING_DIM;
            let vectors = (0..batch)
                .map(|row| {
                    mean_pool(
                        &hidden[row * row_len..(row + 1) * row_len],
                        &attention_mask[row * max_len..(row + 1) * max_len],
                        EMBEDDING_DIM,
                    )
                })
                .collect();
            tracing::trace!(words = batch, tokens = max_len, "Embedded word batch");
            Ok(vectors)
        }
    }

    /// Average the token states where `mask` is set, then L2-normalize.
    fn mean_pool(hidden: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
        let mut pooled = vec![0.0f32; dim];
        let mut mask_sum = 0.0f32;
        for (token, &m) in mask.iter().enumerate() {
            if m == 0 {
                continue;
            }
            let Some(state) = hidden.get(token * dim..(token + 1) * dim) else {
                break;
            };
            mask_sum += 1.0;
            for (p, h) in pooled.iter_mut().zip(state) {
                *p += h;
            }
        }
        if mask_sum > 0.0 {
            pooled.iter_mut().for_each(|v| *v /= mask_sum);
        }

        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            pooled.iter_mut().for_each(|v| *v /= norm);
        }
        pooled
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.infer_batch(&[text])?
                .pop()
                .ok_or_else(|| EmbeddingError::Embedding("Empty batch output".to_string()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.infer_batch(texts)
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }
    }

}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;
