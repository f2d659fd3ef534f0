use serde::{Deserialize, Serialize};

use super::geometry::NormalizedRect;

/// One recognized text line, as handed over by the OCR collaborator.
///
/// Immutable once produced; every pipeline stage reads it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedLine {
    pub text: String,
    #[serde(alias = "bounding_box")]
    pub bounding_box: NormalizedRect,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, alias = "page_index")]
    pub page_index: usize,
}

fn default_confidence() -> f64 {
    1.0
}

impl RecognizedLine {
    pub fn new(text: impl Into<String>, bounding_box: NormalizedRect, confidence: f64) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            confidence,
            page_index: 0,
        }
    }

    pub fn on_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_contract() {
        let json = r#"{"text":"DOB:","boundingBox":{"x":0.1,"y":0.8,"width":0.05,"height":0.02},"confidence":0.93,"pageIndex":1}"#;
        let line: RecognizedLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.text, "DOB:");
        assert_eq!(line.page_index, 1);
        assert!((line.bounding_box.width - 0.05).abs() < 1e-9);
    }

    #[test]
    fn deserializes_snake_case_and_defaults() {
        let json = r#"{"text":"Name","bounding_box":{"x":0.1,"y":0.8,"w":0.05,"h":0.02}}"#;
        let line: RecognizedLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.page_index, 0);
        assert_eq!(line.confidence, 1.0);
        assert!((line.bounding_box.height - 0.02).abs() < 1e-9);
    }
}
