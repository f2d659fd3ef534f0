use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{FieldType, MatchMethod};
use super::geometry::NormalizedRect;

/// A detected form field: a label, where it sits, and what was matched into it.
///
/// Created label-only by the extractor, then enriched by spatial association,
/// classification and matching. Manual edits go through `session` so that
/// placement overrides stay clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub label: String,
    pub label_box: NormalizedRect,
    pub field_type: FieldType,
    #[serde(default)]
    pub page_index: usize,
    pub mapped_keypath: Option<String>,
    pub value: String,
    pub match_confidence: f64,
    pub match_method: Option<MatchMethod>,
    /// Text already present on the form next to the label.
    pub detected_value: Option<String>,
    pub value_box: Option<NormalizedRect>,
    pub is_checked: Option<bool>,
    /// Manual placement; when set it always wins over computed placement.
    pub adjusted_value_box: Option<NormalizedRect>,
}

impl Field {
    pub fn new(label: impl Into<String>, label_box: NormalizedRect) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            label_box,
            field_type: FieldType::Text,
            page_index: 0,
            mapped_keypath: None,
            value: String::new(),
            match_confidence: 0.0,
            match_method: None,
            detected_value: None,
            value_box: None,
            is_checked: None,
            adjusted_value_box: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_keypath.is_some()
    }

    pub fn is_filled(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// Drop any keypath binding and its value.
    pub fn clear_match(&mut self) {
        self.mapped_keypath = None;
        self.value.clear();
        self.match_confidence = 0.0;
        self.match_method = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_is_unmatched_text() {
        let f = Field::new("DOB", NormalizedRect::new(0.1, 0.8, 0.05, 0.02));
        assert_eq!(f.field_type, FieldType::Text);
        assert!(!f.is_mapped());
        assert!(!f.is_filled());
        assert_eq!(f.match_confidence, 0.0);
    }

    #[test]
    fn clear_match_resets_binding() {
        let mut f = Field::new("Name", NormalizedRect::default());
        f.mapped_keypath = Some("patient.fullName".into());
        f.value = "Ada Lovelace".into();
        f.match_confidence = 1.0;
        f.match_method = Some(MatchMethod::SynonymExact);
        f.clear_match();
        assert!(!f.is_mapped());
        assert!(!f.is_filled());
        assert!(f.match_method.is_none());
    }
}
