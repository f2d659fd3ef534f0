//! OCR collaborator boundary.
//!
//! Text recognition itself happens outside this crate. An [`OcrEngine`]
//! turns a page image into [`RecognizedLine`]s; [`RecordedOcr`] replays
//! lines captured earlier as JSON.

use std::path::Path;

use image::DynamicImage;
use serde::Deserialize;
use thiserror::Error;

use crate::models::RecognizedLine;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid OCR JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Text recognition failed: {0}")]
    Recognition(String),
}

/// Anything that can recognize text lines on a page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedLine>, OcrError>;
}

/// Either a bare array of lines or `{"lines": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LinesDocument {
    Bare(Vec<RecognizedLine>),
    Wrapped { lines: Vec<RecognizedLine> },
}

/// Replays recorded OCR output regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct RecordedOcr {
    lines: Vec<RecognizedLine>,
}

impl RecordedOcr {
    pub fn new(lines: Vec<RecognizedLine>) -> Self {
        Self { lines }
    }

    pub fn from_json_str(text: &str) -> Result<Self, OcrError> {
        let lines = match serde_json::from_str(text)? {
            LinesDocument::Bare(lines) | LinesDocument::Wrapped { lines } => lines,
        };
        tracing::debug!(lines = lines.len(), "Loaded recorded OCR lines");
        Ok(Self { lines })
    }

    pub fn from_path(path: &Path) -> Result<Self, OcrError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn lines(&self) -> &[RecognizedLine] {
        &self.lines
    }
}

impl OcrEngine for RecordedOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<RecognizedLine>, OcrError> {
        Ok(self.lines.clone())
    }
}
