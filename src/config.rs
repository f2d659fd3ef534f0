use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Formfill";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "formfill=info"
}

/// Get the application data directory (`<data dir>/Formfill`).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

/// Get the models directory (word vectors, ONNX embeddings)
pub fn models_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("models"))
}

/// Get the embedding model directory (all-MiniLM-L6-v2)
pub fn embedding_model_dir() -> Option<PathBuf> {
    models_dir().map(|d| d.join("all-MiniLM-L6-v2"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ═══════════════════════════════════════════════════════════
// Engine tuning
// ═══════════════════════════════════════════════════════════

/// Label extraction thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Lines below this OCR confidence never become labels.
    pub min_confidence: f64,
    pub min_label_len: usize,
    pub max_label_len: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            min_label_len: 2,
            max_label_len: 50,
        }
    }
}

/// Spatial association weights and limits (unit coordinates).
///
/// The weights and gap limits are empirically tuned heuristics, kept
/// configurable rather than hard-coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Value candidates below this OCR confidence are ignored.
    pub min_candidate_confidence: f64,
    pub min_candidate_len: usize,
    pub same_line_weight: f64,
    pub below_weight: f64,
    /// Maximum horizontal gap for a same-line-right candidate.
    pub max_right_gap: f64,
    /// Maximum vertical gap for a below-aligned candidate.
    pub max_below_gap: f64,
    /// Vertical tolerance for same-line, in multiples of the label height.
    pub same_line_height_factor: f64,
    /// Horizontal tolerance for below-aligned, in multiples of the label width.
    pub below_width_factor: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            min_candidate_confidence: 0.5,
            min_candidate_len: 2,
            same_line_weight: 1.0,
            below_weight: 0.8,
            max_right_gap: 0.3,
            max_below_gap: 0.1,
            same_line_height_factor: 1.5,
            below_width_factor: 2.0,
        }
    }
}

/// Fuzzy matching thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub min_jaccard: f64,
    pub token_confidence_scale: f64,
    /// Embedding distances at or above this never match.
    pub max_embedding_distance: f64,
    pub embedding_confidence_scale: f64,
    pub min_embedding_word_len: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_jaccard: 0.3,
            token_confidence_scale: 0.7,
            max_embedding_distance: 0.8,
            embedding_confidence_scale: 0.7,
            min_embedding_word_len: 3,
        }
    }
}

/// Rendering geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Labels shorter than this (and without a colon) get their value below.
    pub short_caption_len: usize,
    /// Gap between a label and its default value placement (unit coordinates).
    pub value_gap: f64,
    pub default_value_width: f64,
    pub min_font_px: f32,
    pub max_font_px: f32,
    /// Fallback signature rect `[x, y, width, height]`, bottom-left origin.
    pub signature_fallback: [f64; 4],
    pub signature_width: f64,
    pub ink_rgb: [u8; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            short_caption_len: 20,
            value_gap: 0.01,
            default_value_width: 0.35,
            min_font_px: 10.0,
            max_font_px: 48.0,
            signature_fallback: [0.65, 0.05, 0.3, 0.08],
            signature_width: 0.3,
            ink_rgb: [20, 40, 160],
        }
    }
}

/// All tunable engine parameters. Every section falls back to defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub labels: LabelConfig,
    pub spatial: SpatialConfig,
    pub matching: MatchingConfig,
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config.sanitized())
    }

    /// Clamp every value into a range the pipeline can work with.
    pub fn sanitized(mut self) -> Self {
        let l = &mut self.labels;
        l.min_confidence = unit(l.min_confidence, 0.3);
        l.min_label_len = l.min_label_len.max(1);
        l.max_label_len = l.max_label_len.max(l.min_label_len);

        let s = &mut self.spatial;
        s.min_candidate_confidence = unit(s.min_candidate_confidence, 0.5);
        s.same_line_weight = unit(s.same_line_weight, 1.0);
        s.below_weight = unit(s.below_weight, 0.8);
        s.max_right_gap = positive(s.max_right_gap, 0.3);
        s.max_below_gap = positive(s.max_below_gap, 0.1);
        s.same_line_height_factor = positive(s.same_line_height_factor, 1.5);
        s.below_width_factor = positive(s.below_width_factor, 2.0);

        let m = &mut self.matching;
        m.min_jaccard = unit(m.min_jaccard, 0.3);
        m.token_confidence_scale = unit(m.token_confidence_scale, 0.7);
        m.max_embedding_distance = if m.max_embedding_distance.is_finite() {
            m.max_embedding_distance.clamp(0.01, 2.0)
        } else {
            0.8
        };
        m.embedding_confidence_scale = unit(m.embedding_confidence_scale, 0.7);

        let r = &mut self.render;
        r.value_gap = unit(r.value_gap, 0.01);
        r.default_value_width = positive(r.default_value_width, 0.35).min(1.0);
        r.signature_width = positive(r.signature_width, 0.3).min(1.0);
        if !(r.min_font_px.is_finite() && r.min_font_px > 0.0) {
            r.min_font_px = 10.0;
        }
        if !(r.max_font_px.is_finite() && r.max_font_px >= r.min_font_px) {
            r.max_font_px = r.min_font_px.max(48.0);
        }
        self
    }
}

fn unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

fn positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn app_name_is_formfill() {
        assert_eq!(APP_NAME, "Formfill");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn models_dir_under_app_data() {
        if let (Some(app), Some(models)) = (app_data_dir(), models_dir()) {
            assert!(models.starts_with(app));
            assert!(models.ends_with("models"));
        }
    }

    #[test]
    fn defaults_match_documented_heuristics() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.spatial.same_line_weight, 1.0);
        assert_eq!(cfg.spatial.below_weight, 0.8);
        assert_eq!(cfg.matching.max_embedding_distance, 0.8);
        assert_eq!(cfg.labels.min_confidence, 0.3);
        assert_eq!(cfg.spatial.min_candidate_confidence, 0.5);
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"spatial": {{"below_weight": 0.6}}}}"#).unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.spatial.below_weight, 0.6);
        assert_eq!(cfg.spatial.same_line_weight, 1.0);
        assert_eq!(cfg.matching, MatchingConfig::default());
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let mut cfg = EngineConfig::default();
        cfg.spatial.below_weight = 3.0;
        cfg.spatial.max_right_gap = -1.0;
        cfg.matching.max_embedding_distance = f64::NAN;
        cfg.labels.max_label_len = 0;
        let cfg = cfg.sanitized();
        assert_eq!(cfg.spatial.below_weight, 1.0);
        assert_eq!(cfg.spatial.max_right_gap, 0.3);
        assert_eq!(cfg.matching.max_embedding_distance, 0.8);
        assert!(cfg.labels.max_label_len >= cfg.labels.min_label_len);
    }
}
