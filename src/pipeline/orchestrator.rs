use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::checkbox::{detect_checkboxes, group_checkboxes};
use super::classify::{classify_fields, sync_checkbox_fields};
use super::flatten::PatientData;
use super::labels::extract_labels;
use super::matching::{auto_select, FuzzyMatcher, NoEmbedding, WordEmbedding};
use super::spatial::associate_values;
use super::PipelineError;
use crate::config::EngineConfig;
use crate::models::{CheckboxGroup, Field, FieldType, RecognizedLine};

/// Group label that carries no meaning of its own.
const GENERIC_YES_NO: &str = "Yes/No";

/// Everything one analysis pass produces.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub fields: Vec<Field>,
    pub groups: Vec<CheckboxGroup>,
    pub patient_data: PatientData,
}

/// Runs the analysis steps over one scan:
/// labels → checkboxes → spatial values → flatten → classify → match → auto-check.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: EngineConfig,
    matcher: FuzzyMatcher,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Arc::new(NoEmbedding))
    }
}

impl Pipeline {
    /// The config is sanitized here, so hand-built configs get the same
    /// bounds as ones loaded from disk.
    pub fn new(config: EngineConfig, embedding: Arc<dyn WordEmbedding>) -> Self {
        let config = config.sanitized();
        let matcher = FuzzyMatcher::new(config.matching.clone(), embedding);
        Self { config, matcher }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Analyze OCR lines against a raw patient record.
    pub fn analyze(&self, lines: &[RecognizedLine], patient: &Value) -> AnalysisOutput {
        self.analyze_flattened(lines, PatientData::from_json(patient))
    }

    /// Analyze OCR lines against an already flattened record.
    pub fn analyze_flattened(&self, lines: &[RecognizedLine], patient_data: PatientData) -> AnalysisOutput {
        let (mut fields, label_lines) = self.extract_all_pages(lines);
        let mut groups = group_checkboxes(detect_checkboxes(lines), lines);
        associate_values(&mut fields, lines, &label_lines, &self.config.spatial);
        classify_fields(&mut fields, &groups);

        for field in fields.iter_mut().filter(|f| f.field_type != FieldType::Signature) {
            self.apply_match(field, &patient_data);
        }

        for group in groups.iter_mut() {
            if group.mapped_keypath.is_none() {
                if let Some(label) = group.group_label.as_deref().filter(|l| *l != GENERIC_YES_NO) {
                    group.mapped_keypath = self
                        .matcher
                        .match_label(label, &patient_data)
                        .map(|m| m.keypath);
                }
            }
            auto_select(group, &patient_data);
        }
        sync_checkbox_fields(&mut fields, &groups);

        tracing::info!(
            lines = lines.len(),
            fields = fields.len(),
            matched = fields.iter().filter(|f| f.is_mapped()).count(),
            groups = groups.len(),
            "Form analysis complete"
        );

        AnalysisOutput {
            fields,
            groups,
            patient_data,
        }
    }

    /// Run [`Pipeline::analyze`] on a blocking worker thread.
    pub async fn analyze_in_background(
        &self,
        lines: Vec<RecognizedLine>,
        patient: Value,
    ) -> Result<AnalysisOutput, PipelineError> {
        let pipeline = self.clone();
        let output = tokio::task::spawn_blocking(move || pipeline.analyze(&lines, &patient)).await?;
        Ok(output)
    }

    /// Bind `field` to its best keypath, or leave it unmatched.
    pub fn apply_match(&self, field: &mut Field, data: &PatientData) {
        match self.matcher.match_label(&field.label, data) {
            Some(result) => {
                field.mapped_keypath = Some(result.keypath);
                field.value = result.value;
                field.match_confidence = result.confidence;
                field.match_method = Some(result.method);
            }
            None => field.clear_match(),
        }
    }

    /// Labels are extracted page by page; label line indices are global.
    fn extract_all_pages(&self, lines: &[RecognizedLine]) -> (Vec<Field>, BTreeSet<usize>) {
        let pages: BTreeSet<usize> = lines.iter().map(|l| l.page_index).collect();
        let mut fields = Vec::new();
        let mut label_lines = BTreeSet::new();

        for page in pages {
            let indices: Vec<usize> = (0..lines.len()).filter(|&i| lines[i].page_index == page).collect();
            let page_lines: Vec<RecognizedLine> = indices.iter().map(|&i| lines[i].clone()).collect();
            let extraction = extract_labels(&page_lines, &self.config.labels);
            fields.extend(extraction.fields);
            label_lines.extend(extraction.label_lines.into_iter().map(|local| indices[local]));
        }
        (fields, label_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchMethod, NormalizedRect};
    use serde_json::json;

    fn line(text: &str, x: f64, y: f64, w: f64) -> RecognizedLine {
        RecognizedLine::new(text, NormalizedRect::new(x, y, w, 0.02), 0.95)
    }

    fn intake_form() -> Vec<RecognizedLine> {
        vec![
            line("PATIENT INFORMATION", 0.3, 0.92, 0.4),
            line("Name:", 0.1, 0.85, 0.06),
            line("DOB:", 0.1, 0.8, 0.05),
            line("03/14/1980", 0.17, 0.8, 0.1),
            line("Sex: [ ] Male [ ] Female", 0.1, 0.75, 0.35),
            line("Phone ________", 0.1, 0.7, 0.3),
            line("Patient Signature", 0.1, 0.1, 0.2),
        ]
    }

    fn patient() -> Value {
        json!({
            "patient": {
                "firstName": "Jane",
                "lastName": "Doe",
                "dateOfBirth": "1980-03-14",
                "sex": "F",
                "phone": "555-0134"
            }
        })
    }

    fn field<'a>(out: &'a AnalysisOutput, label: &str) -> &'a Field {
        out.fields.iter().find(|f| f.label == label).unwrap()
    }

    #[test]
    fn analyzes_intake_form_end_to_end() {
        let out = Pipeline::default().analyze(&intake_form(), &patient());

        let labels: Vec<&str> = out.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Name", "DOB", "Sex", "Phone", "Patient Signature"]);

        let name = field(&out, "Name");
        assert_eq!(name.mapped_keypath.as_deref(), Some("patient.fullName"));
        assert_eq!(name.value, "Jane Doe");
        assert_eq!(name.match_method, Some(MatchMethod::SynonymExact));

        let dob = field(&out, "DOB");
        assert_eq!(dob.detected_value.as_deref(), Some("03/14/1980"));
        assert_eq!(dob.field_type, FieldType::Date);
        assert_eq!(dob.value, "03/14/1980");

        assert_eq!(field(&out, "Sex").field_type, FieldType::Checkbox);
        assert_eq!(field(&out, "Sex").is_checked, Some(true));
        assert_eq!(field(&out, "Phone").value, "555-0134");

        let signature = field(&out, "Patient Signature");
        assert_eq!(signature.field_type, FieldType::Signature);
        assert!(!signature.is_mapped());
    }

    #[test]
    fn male_female_group_selects_female() {
        let out = Pipeline::default().analyze(&intake_form(), &patient());
        assert_eq!(out.groups.len(), 1);
        let group = &out.groups[0];
        assert_eq!(group.mapped_keypath.as_deref(), Some("patient.sex"));
        assert_eq!(group.selected_index, Some(1));
        assert_eq!(group.options[1].associated_text.as_deref(), Some("Female"));
        assert!(group.selection_is_consistent());
    }

    #[test]
    fn group_without_pattern_is_matched_by_label() {
        let lines = vec![line("Smoker: [ ] Yes [ ] No", 0.1, 0.5, 0.4)];
        let out = Pipeline::default().analyze(&lines, &json!({"social": {"smoker": false}}));
        let group = &out.groups[0];
        assert_eq!(group.group_label.as_deref(), Some("Smoker"));
        assert_eq!(group.mapped_keypath.as_deref(), Some("social.smoker"));
        assert_eq!(group.selected_index, Some(1));
    }

    #[test]
    fn pages_are_extracted_separately() {
        let lines = vec![
            line("Name:", 0.1, 0.85, 0.06),
            line("Name:", 0.1, 0.85, 0.06).on_page(1),
            line("Jane Doe", 0.17, 0.85, 0.2).on_page(1),
        ];
        let out = Pipeline::default().analyze(&lines, &json!({}));
        assert_eq!(out.fields.len(), 2);
        assert!(out.fields[0].detected_value.is_none());
        assert_eq!(out.fields[1].page_index, 1);
        assert_eq!(out.fields[1].detected_value.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = Pipeline::default().analyze(&[], &json!({}));
        assert!(out.fields.is_empty());
        assert!(out.groups.is_empty());
        assert!(out.patient_data.has_value("_computed.todayDate"));
    }

    #[tokio::test]
    async fn background_analysis_matches_synchronous() {
        let pipeline = Pipeline::default();
        let sync = pipeline.analyze(&intake_form(), &patient());
        let background = pipeline
            .analyze_in_background(intake_form(), patient())
            .await
            .unwrap();
        let labels = |o: &AnalysisOutput| o.fields.iter().map(|f| f.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels(&sync), labels(&background));
        assert_eq!(sync.groups[0].selected_index, background.groups[0].selected_index);
    }

    #[test]
    fn hand_built_config_is_sanitized() {
        let mut config = EngineConfig::default();
        config.render.min_font_px = 30.0;
        config.render.max_font_px = 12.0;
        config.spatial.max_right_gap = f64::NAN;
        let pipeline = Pipeline::new(config, Arc::new(NoEmbedding));
        let render = &pipeline.config().render;
        assert!(render.max_font_px >= render.min_font_px);
        assert_eq!(pipeline.config().spatial.max_right_gap, 0.3);
    }
}
