//! Field type classification.
//!
//! Every field starts as `Text`. Signature and date captions are recognised
//! from their wording; a caption that introduces a checkbox group on the
//! same line becomes a `Checkbox` field mirroring the group's selection.

use crate::models::{CheckboxGroup, Field, FieldType};
use crate::pipeline::matching::text::{contains_words, normalize};

const SIGNATURE_TERMS: &[&str] = &["signature", "sign here", "signed by"];
const DATE_TERMS: &[&str] = &["date", "dob", "birthdate", "birthday"];

/// Type implied by the caption wording alone.
pub fn classify_label(label: &str) -> FieldType {
    let normalized = normalize(label);
    if SIGNATURE_TERMS.iter().any(|t| contains_words(&normalized, t)) {
        FieldType::Signature
    } else if DATE_TERMS.iter().any(|t| contains_words(&normalized, t)) {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

/// The multi-option group this field captions, if any: same label, same
/// line band, group to the right.
pub fn linked_group<'a>(field: &Field, groups: &'a [CheckboxGroup]) -> Option<&'a CheckboxGroup> {
    let label = normalize(&field.label);
    groups.iter().find(|g| {
        let gb = &g.bounding_box;
        let fb = &field.label_box;
        g.is_multi()
            && g.page_index == field.page_index
            && g.group_label.as_deref().map(normalize).as_deref() == Some(label.as_str())
            && (fb.mid_y() - gb.mid_y()).abs() <= fb.height.max(gb.height)
            && fb.min_x() <= gb.min_x()
    })
}

/// Assign a type to every field.
pub fn classify_fields(fields: &mut [Field], groups: &[CheckboxGroup]) {
    for field in fields.iter_mut() {
        let field_type = if linked_group(field, groups).is_some() {
            FieldType::Checkbox
        } else {
            classify_label(&field.label)
        };

        if field_type == FieldType::Checkbox {
            // The options are drawn by the group; any inline text was the options themselves.
            field.detected_value = None;
            field.value_box = None;
        }
        field.field_type = field_type;
    }
    sync_checkbox_fields(fields, groups);

    tracing::debug!(
        signatures = fields.iter().filter(|f| f.field_type == FieldType::Signature).count(),
        dates = fields.iter().filter(|f| f.field_type == FieldType::Date).count(),
        checkboxes = fields.iter().filter(|f| f.field_type == FieldType::Checkbox).count(),
        "Field classification complete"
    );
}

/// Refresh `is_checked` on checkbox fields from their groups.
pub fn sync_checkbox_fields(fields: &mut [Field], groups: &[CheckboxGroup]) {
    for field in fields.iter_mut() {
        match field.field_type {
            FieldType::Checkbox => {
                if let Some(group) = linked_group(field, groups) {
                    field.is_checked = Some(group.selected_index.is_some());
                }
            }
            FieldType::Text | FieldType::Signature | FieldType::Date => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Checkbox, NormalizedRect};

    #[test]
    fn wording_rules() {
        assert_eq!(classify_label("Patient Signature"), FieldType::Signature);
        assert_eq!(classify_label("Sign here"), FieldType::Signature);
        assert_eq!(classify_label("Date of Birth"), FieldType::Date);
        assert_eq!(classify_label("D.O.B."), FieldType::Date);
        assert_eq!(classify_label("Today's Date"), FieldType::Date);
        assert_eq!(classify_label("Update reason"), FieldType::Text);
        assert_eq!(classify_label("Phone"), FieldType::Text);
        assert_eq!(classify_label("Birth Place"), FieldType::Text);
        assert_eq!(classify_label("Place of birth"), FieldType::Text);
        assert_eq!(classify_label("Birthdate"), FieldType::Date);
    }

    fn sex_group(selected: Option<usize>) -> CheckboxGroup {
        let mut group = CheckboxGroup::new(vec![
            Checkbox::new(NormalizedRect::new(0.2, 0.5, 0.02, 0.02), false, Some("Male".into())),
            Checkbox::new(NormalizedRect::new(0.3, 0.5, 0.02, 0.02), false, Some("Female".into())),
        ]);
        group.group_label = Some("Sex".into());
        if let Some(index) = selected {
            group.select(index);
        }
        group
    }

    #[test]
    fn caption_of_group_becomes_checkbox() {
        let mut field = Field::new("Sex", NormalizedRect::new(0.1, 0.5, 0.3, 0.02));
        field.detected_value = Some("[ ] Male [ ] Female".into());
        let mut fields = vec![field];
        let groups = vec![sex_group(Some(1))];
        classify_fields(&mut fields, &groups);
        assert_eq!(fields[0].field_type, FieldType::Checkbox);
        assert_eq!(fields[0].is_checked, Some(true));
        assert!(fields[0].detected_value.is_none());
    }

    #[test]
    fn sync_follows_group_selection() {
        let mut fields = vec![Field::new("Sex", NormalizedRect::new(0.1, 0.5, 0.3, 0.02))];
        let mut groups = vec![sex_group(None)];
        classify_fields(&mut fields, &groups);
        assert_eq!(fields[0].is_checked, Some(false));
        groups[0].toggle(0);
        sync_checkbox_fields(&mut fields, &groups);
        assert_eq!(fields[0].is_checked, Some(true));
    }

    #[test]
    fn distant_caption_stays_text() {
        let mut fields = vec![Field::new("Sex", NormalizedRect::new(0.1, 0.2, 0.05, 0.02))];
        classify_fields(&mut fields, &[sex_group(None)]);
        assert_eq!(fields[0].field_type, FieldType::Text);
        assert_eq!(fields[0].is_checked, None);
    }
}
