//! Label → keypath matching.
//!
//! A label is resolved against the flattened patient record through a
//! cascade of strategies; the first that succeeds wins and stamps its
//! confidence and method tag:
//!
//! | method            | confidence                    |
//! |-------------------|-------------------------------|
//! | synonym-exact     | 1.0                           |
//! | synonym-contains  | 0.9                           |
//! | synonym-partial   | 0.8                           |
//! | synonym-reverse   | 0.75                          |
//! | token             | Jaccard × 0.7                 |
//! | embedding         | (0.8 − distance) / 0.8 × 0.7  |
//!
//! An unmatched label is a normal outcome, not an error.

pub mod autoselect;
pub mod embedding;
pub mod synonyms;
pub mod text;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::MatchingConfig;
use crate::models::MatchMethod;
use crate::pipeline::flatten::PatientData;

pub use autoselect::{auto_select, select_option_index};
pub use embedding::{
    EmbeddingError, EmbeddingModel, ModelDistance, NoEmbedding, VectorTable, WordEmbedding,
};
#[cfg(feature = "onnx-embeddings")]
pub use embedding::OnnxEmbedder;

use synonyms::SYNONYMS;
use text::{contains_words, jaccard, keypath_words, normalize, tokenize};

const CONTAINS_MIN_LEN: usize = 3;
const PARTIAL_MIN_LEN: usize = 4;
const REVERSE_MIN_LEN: usize = 3;

/// Outcome of one successful match attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub keypath: String,
    pub value: String,
    pub confidence: f64,
    pub method: MatchMethod,
}

/// Fuzzy label matcher. Cheap to clone; the embedding backend is shared.
#[derive(Clone)]
pub struct FuzzyMatcher {
    config: MatchingConfig,
    embedding: Arc<dyn WordEmbedding>,
}

impl std::fmt::Debug for FuzzyMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzyMatcher")
            .field("config", &self.config)
            .field("embedding", &self.embedding.is_available())
            .finish()
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(MatchingConfig::default(), Arc::new(NoEmbedding))
    }
}

impl FuzzyMatcher {
    pub fn new(config: MatchingConfig, embedding: Arc<dyn WordEmbedding>) -> Self {
        Self { config, embedding }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Resolve `label` to a keypath in `data`.
    pub fn match_label(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        let normalized = normalize(label);
        if normalized.is_empty() {
            return None;
        }

        let result = self
            .synonym_exact(&normalized, data)
            .or_else(|| self.synonym_contains(&normalized, data))
            .or_else(|| self.synonym_partial(&normalized, data))
            .or_else(|| self.synonym_reverse(&normalized, data))
            .or_else(|| self.token_match(label, data))
            .or_else(|| self.embedding_match(label, data));

        match &result {
            Some(m) => tracing::debug!(
                label,
                keypath = %m.keypath,
                method = %m.method,
                confidence = m.confidence,
                "Label matched"
            ),
            None => tracing::debug!(label, "Label unmatched"),
        }
        result
    }

    fn synonym_exact(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        SYNONYMS
            .iter()
            .filter(|e| e.patterns.iter().any(|p| *p == label))
            .find_map(|e| hit(data, e.keypath, 1.0, MatchMethod::SynonymExact))
    }

    fn synonym_contains(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        longest_pattern(data, |pattern| {
            pattern.len() >= CONTAINS_MIN_LEN && contains_words(label, pattern)
        })
        .and_then(|keypath| hit(data, keypath, 0.9, MatchMethod::SynonymContains))
    }

    fn synonym_partial(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        longest_pattern(data, |pattern| {
            pattern.len() >= PARTIAL_MIN_LEN && label.contains(pattern)
        })
        .and_then(|keypath| hit(data, keypath, 0.8, MatchMethod::SynonymPartial))
    }

    /// Abbreviated labels: the label is a substring of a pattern. The
    /// shortest (closest) such pattern wins.
    fn synonym_reverse(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        if label.len() < REVERSE_MIN_LEN {
            return None;
        }
        let mut best: Option<(usize, &str)> = None;
        for entry in SYNONYMS.iter().filter(|e| data.has_value(e.keypath)) {
            for pattern in entry.patterns.iter().filter(|p| p.contains(label)) {
                if best.map_or(true, |(len, _)| pattern.len() < len) {
                    best = Some((pattern.len(), entry.keypath));
                }
            }
        }
        best.and_then(|(_, keypath)| hit(data, keypath, 0.75, MatchMethod::SynonymReverse))
    }

    /// Jaccard similarity of label tokens vs the words of each keypath's final segment.
    fn token_match(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        let label_tokens = tokenize(label);
        if label_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &str)> = None;
        for keypath in data.live_keypaths() {
            let score = jaccard(&label_tokens, &keypath_words(keypath));
            // Strict comparison keeps the first keypath in sorted order on ties.
            if best.map_or(score > 0.0, |(best_score, _)| score > best_score) {
                best = Some((score, keypath));
            }
        }

        let (score, keypath) = best?;
        if score < self.config.min_jaccard {
            tracing::trace!(label, keypath, score, "Best token overlap below threshold");
            return None;
        }
        hit(
            data,
            keypath,
            score * self.config.token_confidence_scale,
            MatchMethod::Token,
        )
    }

    /// Minimum word distance across (label word, keypath word) pairs.
    fn embedding_match(&self, label: &str, data: &PatientData) -> Option<MatchResult> {
        if !self.embedding.is_available() {
            return None;
        }
        let min_len = self.config.min_embedding_word_len;
        let label_words: BTreeSet<String> = tokenize(label)
            .into_iter()
            .filter(|w| w.chars().count() >= min_len)
            .collect();
        if label_words.is_empty() {
            return None;
        }

        let key_words: BTreeSet<String> = data
            .live_keypaths()
            .flat_map(keypath_words)
            .filter(|w| w.chars().count() >= min_len)
            .collect();
        let batch: Vec<&str> = label_words.iter().chain(&key_words).map(String::as_str).collect();
        self.embedding.prepare(&batch);

        // Each distinct word pair is looked up once.
        let mut distances: BTreeMap<(&str, String), Option<f64>> = BTreeMap::new();
        let mut best: Option<(f64, &str)> = None;

        for keypath in data.live_keypaths() {
            let words = keypath_words(keypath);
            for key_word in words.iter().filter(|w| w.chars().count() >= min_len) {
                for label_word in &label_words {
                    let distance = *distances
                        .entry((label_word.as_str(), key_word.clone()))
                        .or_insert_with(|| match self.embedding.distance(label_word, key_word) {
                            Ok(d) => Some(d),
                            Err(e) => {
                                tracing::trace!(
                                    label_word = %label_word,
                                    key_word = %key_word,
                                    error = %e,
                                    "No embedding distance"
                                );
                                None
                            }
                        });
                    if let Some(d) = distance {
                        if best.map_or(true, |(best_d, _)| d < best_d) {
                            best = Some((d, keypath));
                        }
                    }
                }
            }
        }

        let (distance, keypath) = best?;
        let max = self.config.max_embedding_distance;
        if distance >= max {
            return None;
        }
        let confidence = ((max - distance) / max).max(0.0) * self.config.embedding_confidence_scale;
        hit(data, keypath, confidence, MatchMethod::Embedding)
    }
}

/// Keypath of the longest pattern accepted by `accept`, among keypaths with
/// a value. Earlier table entries win ties.
fn longest_pattern(data: &PatientData, accept: impl Fn(&str) -> bool) -> Option<&'static str> {
    let mut best: Option<(usize, &'static str)> = None;
    for entry in SYNONYMS.iter().filter(|e| data.has_value(e.keypath)) {
        for pattern in entry.patterns.iter().filter(|p| accept(p)) {
            if best.map_or(true, |(len, _)| pattern.len() > len) {
                best = Some((pattern.len(), entry.keypath));
            }
        }
    }
    best.map(|(_, keypath)| keypath)
}

fn hit(data: &PatientData, keypath: &str, confidence: f64, method: MatchMethod) -> Option<MatchResult> {
    let value = data.value_of(keypath)?;
    Some(MatchResult {
        keypath: keypath.to_string(),
        value: value.to_string(),
        confidence: confidence.clamp(0.0, 1.0),
        method,
    })
}
