//! Autofill session: phase machine plus the manual-edit operations.
//!
//! The session is the only owner of mutable form state. Analysis runs on
//! immutable inputs and hands back an [`AnalysisOutput`]; [`AutofillSession::publish`]
//! is the single point where that output becomes visible. Each scan carries a
//! [`ScanTicket`] so a result from a cancelled scan cannot overwrite newer state.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CheckboxGroup, Field, FieldType, NormalizedRect, RecognizedLine};
use crate::ocr::{OcrEngine, OcrError};
use crate::pipeline::classify::{classify_label, sync_checkbox_fields};
use crate::pipeline::matching::auto_select;
use crate::pipeline::{AnalysisOutput, PatientData, Pipeline};
use crate::render::{layout, PageSize, RenderPlan, SignatureData, SignaturePlacement};

// ═══════════════════════════════════════════
// Phase
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "message", rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Landing,
    Scanning,
    Analyzing,
    Editing,
    Error(String),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Landing => "landing",
            Phase::Scanning => "scanning",
            Phase::Analyzing => "analyzing",
            Phase::Editing => "editing",
            Phase::Error(_) => "error",
        }
    }
}

/// Identifies one scan. Only the newest ticket may advance the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("Unknown field: {0}")]
    UnknownField(Uuid),

    #[error("Unknown checkbox group: {0}")]
    UnknownGroup(usize),

    #[error("Checkbox group {group} has no option {option}")]
    UnknownOption { group: usize, option: usize },

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializable view of the session for export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot<'a> {
    pub phase: &'a Phase,
    pub fields: &'a [Field],
    pub groups: &'a [CheckboxGroup],
    pub signature_position: Option<NormalizedRect>,
    pub has_signature: bool,
}

// ═══════════════════════════════════════════
// Session
// ═══════════════════════════════════════════

#[derive(Debug, Default)]
pub struct AutofillSession {
    phase: Phase,
    fields: Vec<Field>,
    groups: Vec<CheckboxGroup>,
    patient_data: PatientData,
    signature: Option<SignatureData>,
    signature_position: Option<NormalizedRect>,
    pipeline: Pipeline,
    generation: u64,
}

impl AutofillSession {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: Uuid) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn groups(&self) -> &[CheckboxGroup] {
        &self.groups
    }

    pub fn patient_data(&self) -> &PatientData {
        &self.patient_data
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn signature(&self) -> Option<&SignatureData> {
        self.signature.as_ref()
    }

    pub fn signature_position(&self) -> Option<NormalizedRect> {
        self.signature_position
    }

    // ── Phase transitions ──────────────────────

    /// Start a new scan. The previous form is dropped; a scan already in
    /// flight is cancelled and an error is cleared by passing through Landing.
    /// The captured signature and its placement are kept.
    pub fn begin_scan(&mut self) -> ScanTicket {
        match self.phase {
            Phase::Scanning | Phase::Analyzing => {
                tracing::info!(from = self.phase.name(), "Cancelling in-flight scan");
                self.phase = Phase::Landing;
            }
            Phase::Error(_) => {
                tracing::info!("Recovering from error through landing");
                self.phase = Phase::Landing;
            }
            Phase::Landing | Phase::Editing => {}
        }
        self.clear_form();
        self.generation += 1;
        self.phase = Phase::Scanning;
        ScanTicket {
            generation: self.generation,
        }
    }

    /// OCR finished. Returns false when nothing was recognized, in which
    /// case the session goes back to Landing.
    pub fn complete_ocr(&mut self, ticket: &ScanTicket, lines: &[RecognizedLine]) -> Result<bool, SessionError> {
        self.check_ticket(ticket, Phase::Scanning, "complete OCR")?;
        if lines.is_empty() {
            tracing::info!("No text recognized, returning to landing");
            self.clear_form();
            self.phase = Phase::Landing;
            return Ok(false);
        }
        self.phase = Phase::Analyzing;
        Ok(true)
    }

    /// Any phase → Error.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(from = self.phase.name(), error = %message, "Autofill session failed");
        self.phase = Phase::Error(message);
    }

    /// Make an analysis result visible. Rejected unless it belongs to the
    /// current scan and the session is analyzing.
    pub fn publish(&mut self, ticket: &ScanTicket, output: AnalysisOutput) -> Result<(), SessionError> {
        self.check_ticket(ticket, Phase::Analyzing, "publish analysis")?;
        self.fields = output.fields;
        self.groups = output.groups;
        self.patient_data = output.patient_data;
        self.phase = Phase::Editing;
        tracing::info!(fields = self.fields.len(), groups = self.groups.len(), "Analysis published");
        Ok(())
    }

    /// Back to Landing with an empty form. Outstanding tickets become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = Phase::Landing;
        self.clear_form();
        self.signature = None;
        self.signature_position = None;
    }

    fn clear_form(&mut self) {
        self.fields.clear();
        self.groups.clear();
        self.patient_data = PatientData::default();
    }

    /// Recognize, analyze and publish one page synchronously.
    pub fn scan_page(
        &mut self,
        ocr: &dyn OcrEngine,
        image: &DynamicImage,
        patient: &Value,
    ) -> Result<(), SessionError> {
        let ticket = self.begin_scan();
        let lines = match ocr.recognize(image) {
            Ok(lines) => lines,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e.into());
            }
        };
        if !self.complete_ocr(&ticket, &lines)? {
            return Ok(());
        }
        let output = self.pipeline.analyze(&lines, patient);
        self.publish(&ticket, output)
    }

    fn check_ticket(&self, ticket: &ScanTicket, expected: Phase, action: &'static str) -> Result<(), SessionError> {
        if ticket.generation != self.generation || self.phase != expected {
            return Err(SessionError::InvalidTransition {
                from: self.phase.name(),
                action,
            });
        }
        Ok(())
    }

    // ── Manual edits ───────────────────────────

    /// Rebind a field to `keypath`, copying the current value. `None` unbinds.
    pub fn update_field_keypath(&mut self, id: Uuid, keypath: Option<&str>) -> Result<(), SessionError> {
        self.require_editing("edit fields")?;
        let data = &self.patient_data;
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(SessionError::UnknownField(id))?;

        match keypath {
            Some(keypath) => {
                field.value = data.get(keypath).unwrap_or_default().to_string();
                field.mapped_keypath = Some(keypath.to_string());
                field.match_confidence = 1.0;
                field.match_method = None;
            }
            None => field.clear_match(),
        }
        tracing::debug!(field = %id, keypath = ?keypath, "Field keypath updated");
        Ok(())
    }

    pub fn update_field_value(&mut self, id: Uuid, value: impl Into<String>) -> Result<(), SessionError> {
        self.require_editing("edit fields")?;
        self.field_mut(id)?.value = value.into();
        Ok(())
    }

    /// Override where a value is drawn. The box is clamped into the page.
    pub fn update_field_value_box(&mut self, id: Uuid, value_box: NormalizedRect) -> Result<(), SessionError> {
        self.require_editing("edit fields")?;
        self.field_mut(id)?.adjusted_value_box = Some(value_box.clamped());
        Ok(())
    }

    pub fn toggle_checkbox(&mut self, group_index: usize, option_index: usize) -> Result<(), SessionError> {
        self.require_editing("toggle checkboxes")?;
        let group = self
            .groups
            .get_mut(group_index)
            .ok_or(SessionError::UnknownGroup(group_index))?;
        if !group.toggle(option_index) {
            return Err(SessionError::UnknownOption {
                group: group_index,
                option: option_index,
            });
        }
        sync_checkbox_fields(&mut self.fields, &self.groups);
        Ok(())
    }

    /// Rebind a checkbox group and re-run option selection against it.
    pub fn update_group_keypath(&mut self, group_index: usize, keypath: Option<&str>) -> Result<(), SessionError> {
        self.require_editing("edit checkbox groups")?;
        let group = self
            .groups
            .get_mut(group_index)
            .ok_or(SessionError::UnknownGroup(group_index))?;
        group.mapped_keypath = keypath.map(str::to_string);
        auto_select(group, &self.patient_data);
        sync_checkbox_fields(&mut self.fields, &self.groups);
        Ok(())
    }

    /// Add a field the extractor missed. It gets one matching pass;
    /// `input_box` becomes its clamped placement override.
    pub fn add_manual_field(
        &mut self,
        label: &str,
        label_box: NormalizedRect,
        input_box: Option<NormalizedRect>,
    ) -> Result<Uuid, SessionError> {
        self.require_editing("add fields")?;
        let mut field = Field::new(label.trim(), label_box.clamped());
        field.field_type = classify_label(label);
        if field.field_type != FieldType::Signature {
            self.pipeline.apply_match(&mut field, &self.patient_data);
        }
        field.adjusted_value_box = input_box.map(|b| b.clamped());

        let id = field.id;
        tracing::info!(field = %id, label = %field.label, mapped = field.is_mapped(), "Manual field added");
        self.fields.push(field);
        Ok(id)
    }

    pub fn remove_field(&mut self, id: Uuid) -> Result<Field, SessionError> {
        self.require_editing("remove fields")?;
        let index = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or(SessionError::UnknownField(id))?;
        Ok(self.fields.remove(index))
    }

    /// Manual signature placement; `None` returns to default placement.
    pub fn update_signature_normalized_position(&mut self, position: Option<NormalizedRect>) {
        self.signature_position = position.map(|p| p.clamped());
    }

    pub fn set_signature(&mut self, signature: Option<SignatureData>) {
        self.signature = signature;
    }

    // ── Output ─────────────────────────────────

    pub fn signature_placement(&self) -> Option<SignaturePlacement> {
        self.signature.as_ref().map(|s| SignaturePlacement {
            aspect: s.aspect_ratio(),
            position: self.signature_position,
        })
    }

    pub fn render_plan(&self, page_index: usize, page: PageSize) -> RenderPlan {
        layout(
            &self.fields,
            &self.groups,
            self.signature_placement(),
            page,
            page_index,
            &self.pipeline.config().render,
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            phase: &self.phase,
            fields: &self.fields,
            groups: &self.groups,
            signature_position: self.signature_position,
            has_signature: self.signature.is_some(),
        }
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    fn require_editing(&self, action: &'static str) -> Result<(), SessionError> {
        if self.phase != Phase::Editing {
            return Err(SessionError::InvalidTransition {
                from: self.phase.name(),
                action,
            });
        }
        Ok(())
    }

    fn field_mut(&mut self, id: Uuid) -> Result<&mut Field, SessionError> {
        self.fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(SessionError::UnknownField(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RecordedOcr;
    use crate::render::tests::sample_signature;
    use crate::render::DrawOp;
    use image::RgbaImage;
    use serde_json::json;

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<RecognizedLine>, OcrError> {
            Err(OcrError::Recognition("camera unplugged".into()))
        }
    }

    fn line(text: &str, x: f64, y: f64, w: f64) -> RecognizedLine {
        RecognizedLine::new(text, NormalizedRect::new(x, y, w, 0.02), 0.95)
    }

    fn form_lines() -> Vec<RecognizedLine> {
        vec![
            line("Name:", 0.1, 0.85, 0.06),
            line("DOB:", 0.1, 0.8, 0.05),
            line("Sex: [ ] Male [ ] Female", 0.1, 0.75, 0.35),
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

    fn page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(10, 10))
    }

    fn editing_session() -> AutofillSession {
        let mut session = AutofillSession::default();
        session
            .scan_page(&RecordedOcr::new(form_lines()), &page(), &patient())
            .unwrap();
        assert_eq!(*session.phase(), Phase::Editing);
        session
    }

    fn field_id(session: &AutofillSession, label: &str) -> Uuid {
        session.fields().iter().find(|f| f.label == label).unwrap().id
    }

    #[test]
    fn full_scan_reaches_editing() {
        let session = editing_session();
        assert_eq!(session.fields().len(), 4);
        assert_eq!(session.groups()[0].selected_index, Some(1));
    }

    #[test]
    fn empty_ocr_returns_to_landing() {
        let mut session = AutofillSession::default();
        session.scan_page(&RecordedOcr::default(), &page(), &patient()).unwrap();
        assert_eq!(*session.phase(), Phase::Landing);
        assert!(session.fields().is_empty());
    }

    #[test]
    fn ocr_failure_enters_error() {
        let mut session = AutofillSession::default();
        let err = session.scan_page(&BrokenOcr, &page(), &patient()).unwrap_err();
        assert!(matches!(err, SessionError::Ocr(_)));
        assert_eq!(*session.phase(), Phase::Error("Text recognition failed: camera unplugged".into()));
        // a new scan recovers from Error
        session.begin_scan();
        assert_eq!(*session.phase(), Phase::Scanning);
    }

    #[test]
    fn rescan_after_error_starts_from_an_empty_form() {
        let mut session = editing_session();
        let ticket = session.begin_scan();
        session.fail("scanner jammed");
        assert!(session.publish(&ticket, AnalysisOutput::default()).is_err());

        session.begin_scan();
        assert_eq!(*session.phase(), Phase::Scanning);
        assert!(session.fields().is_empty());
        assert!(session.groups().is_empty());
    }

    #[test]
    fn blank_rescan_drops_previous_form() {
        let mut session = editing_session();
        session.set_signature(Some(sample_signature(40, 10)));
        assert!(!session.fields().is_empty());

        session.scan_page(&RecordedOcr::default(), &page(), &patient()).unwrap();
        assert_eq!(*session.phase(), Phase::Landing);
        assert!(session.fields().is_empty());
        assert!(session.groups().is_empty());
        assert!(session.patient_data().is_empty());
        assert!(session.render_plan(0, PageSize::new(100.0, 100.0)).text_ops().next().is_none());
        // the captured signature belongs to the user, not the scan
        assert!(session.signature().is_some());
    }

    #[test]
    fn rescan_from_editing_replaces_the_form() {
        let mut session = editing_session();
        let old_ids: Vec<Uuid> = session.fields().iter().map(|f| f.id).collect();
        session
            .scan_page(&RecordedOcr::new(form_lines()), &page(), &patient())
            .unwrap();
        assert_eq!(session.fields().len(), 4);
        assert!(session.fields().iter().all(|f| !old_ids.contains(&f.id)));
    }

    #[test]
    fn stale_result_is_rejected_after_restart() {
        let mut session = AutofillSession::default();
        let stale = session.begin_scan();
        session.complete_ocr(&stale, &form_lines()).unwrap();

        let fresh = session.begin_scan();
        assert_eq!(*session.phase(), Phase::Scanning);

        let output = session.pipeline().analyze(&form_lines(), &patient());
        let err = session.publish(&stale, output).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: "scanning", .. }));
        assert!(session.fields().is_empty());

        session.complete_ocr(&fresh, &form_lines()).unwrap();
        let output = session.pipeline().analyze(&form_lines(), &patient());
        session.publish(&fresh, output).unwrap();
        assert_eq!(*session.phase(), Phase::Editing);
    }

    #[test]
    fn publish_outside_analyzing_is_invalid() {
        let mut session = AutofillSession::default();
        let ticket = session.begin_scan();
        let err = session.publish(&ticket, AnalysisOutput::default()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
        assert_eq!(*session.phase(), Phase::Scanning);
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = editing_session();
        session.update_signature_normalized_position(Some(NormalizedRect::new(0.5, 0.5, 0.2, 0.1)));
        session.reset();
        assert_eq!(*session.phase(), Phase::Landing);
        assert!(session.fields().is_empty());
        assert!(session.groups().is_empty());
        assert!(session.patient_data().is_empty());
        assert!(session.signature_position().is_none());
    }

    #[test]
    fn rebinding_copies_value_with_full_confidence() {
        let mut session = editing_session();
        let id = field_id(&session, "Name");
        session.update_field_keypath(id, Some("patient.phone")).unwrap();
        let field = session.field(id).unwrap();
        assert_eq!(field.value, "555-0134");
        assert_eq!(field.match_confidence, 1.0);
        assert_eq!(field.match_method, None);

        session.update_field_keypath(id, None).unwrap();
        let field = session.field(id).unwrap();
        assert!(!field.is_mapped());
        assert!(field.value.is_empty());
    }

    #[test]
    fn value_box_is_clamped() {
        let mut session = editing_session();
        let id = field_id(&session, "DOB");
        session
            .update_field_value_box(id, NormalizedRect::new(0.98, -0.5, 0.2, 0.0))
            .unwrap();
        let rect = session.field(id).unwrap().adjusted_value_box.unwrap();
        assert!(rect.is_within_unit_square());
    }

    #[test]
    fn unknown_ids_leave_state_unchanged() {
        let mut session = editing_session();
        let before = session.fields().to_vec();
        let missing = Uuid::new_v4();
        assert!(matches!(
            session.update_field_value(missing, "x"),
            Err(SessionError::UnknownField(id)) if id == missing
        ));
        assert!(matches!(session.toggle_checkbox(9, 0), Err(SessionError::UnknownGroup(9))));
        assert!(matches!(
            session.toggle_checkbox(0, 7),
            Err(SessionError::UnknownOption { group: 0, option: 7 })
        ));
        assert!(matches!(session.remove_field(missing), Err(SessionError::UnknownField(_))));
        assert_eq!(session.fields(), before.as_slice());
        assert_eq!(session.groups()[0].selected_index, Some(1));
    }

    #[test]
    fn toggling_keeps_groups_exclusive() {
        let mut session = editing_session();
        for option in [0, 1, 1, 0, 0, 1, 0] {
            session.toggle_checkbox(0, option).unwrap();
            assert!(session.groups()[0].selection_is_consistent());
        }
        assert_eq!(session.groups()[0].selected_index, Some(0));
        let sex = session.fields().iter().find(|f| f.label == "Sex").unwrap();
        assert_eq!(sex.is_checked, Some(true));

        session.toggle_checkbox(0, 0).unwrap();
        let sex = session.fields().iter().find(|f| f.label == "Sex").unwrap();
        assert_eq!(sex.is_checked, Some(false));
    }

    #[test]
    fn manual_field_is_matched_and_placed() {
        let mut session = editing_session();
        let id = session
            .add_manual_field(
                "Phone",
                NormalizedRect::new(0.1, 0.6, 0.06, 0.02),
                Some(NormalizedRect::new(0.9, 0.6, 0.3, 0.02)),
            )
            .unwrap();
        let field = session.field(id).unwrap();
        assert_eq!(field.mapped_keypath.as_deref(), Some("patient.phone"));
        assert_eq!(field.value, "555-0134");
        assert!(field.adjusted_value_box.unwrap().is_within_unit_square());

        let removed = session.remove_field(id).unwrap();
        assert_eq!(removed.label, "Phone");
        assert!(session.field(id).is_none());
    }

    #[test]
    fn edits_require_editing_phase() {
        let mut session = AutofillSession::default();
        let err = session
            .add_manual_field("Phone", NormalizedRect::new(0.1, 0.6, 0.06, 0.02), None)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: "landing", .. }));
    }

    #[test]
    fn group_rebinding_reselects() {
        let mut session = editing_session();
        session.update_group_keypath(0, None).unwrap();
        assert_eq!(session.groups()[0].selected_index, Some(1));
        session.toggle_checkbox(0, 1).unwrap();
        assert_eq!(session.groups()[0].selected_index, None);
        session.update_group_keypath(0, Some("patient.sex")).unwrap();
        assert_eq!(session.groups()[0].selected_index, Some(1));
    }

    #[test]
    fn snapshot_exports_json() {
        let session = editing_session();
        let json: Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();
        assert_eq!(json["phase"]["phase"], "editing");
        assert_eq!(json["fields"].as_array().unwrap().len(), 4);
        assert_eq!(json["hasSignature"], false);
    }

    #[test]
    fn signature_position_is_clamped() {
        let mut session = AutofillSession::default();
        let cases = [
            NormalizedRect::new(f64::NAN, 0.5, 0.2, f64::NAN),
            NormalizedRect::new(-0.4, -1.0, 0.3, 0.1),
            NormalizedRect::new(0.9, 0.95, 3.0, 0.0),
            NormalizedRect::new(f64::INFINITY, f64::NEG_INFINITY, -0.2, 0.5),
        ];
        for rect in cases {
            session.update_signature_normalized_position(Some(rect));
            let stored = session.signature_position().unwrap();
            assert!(stored.is_within_unit_square(), "{stored:?} from {rect:?}");
        }

        session.update_signature_normalized_position(Some(NormalizedRect::new(0.9, 0.95, 3.0, 0.0)));
        let stored = session.signature_position().unwrap();
        assert_eq!(stored.width, 1.0);
        assert_eq!(stored.x, 0.0);
        assert!((stored.height - 0.01).abs() < 1e-9);
        assert!((stored.y - 0.95).abs() < 1e-9);

        session.update_signature_normalized_position(None);
        assert!(session.signature_position().is_none());
    }

    #[test]
    fn render_plan_places_signature_at_manual_position() {
        let mut session = editing_session();
        session.set_signature(Some(sample_signature(40, 10)));
        session.update_signature_normalized_position(Some(NormalizedRect::new(0.5, 0.2, 0.4, 0.1)));

        let plan = session.render_plan(0, PageSize::new(1000.0, 1000.0));
        assert!(plan.has_signature());
        let rect = plan
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Signature { rect } => Some(*rect),
                _ => None,
            })
            .unwrap();
        // 4:1 signature fitted into a 400×100 px area at top = (1 − 0.2 − 0.1) × 1000
        assert!((rect.x - 500.0).abs() < 1e-6);
        assert!((rect.y - 700.0).abs() < 1e-6);
        assert!((rect.width - 400.0).abs() < 1e-6);
        assert!((rect.height - 100.0).abs() < 1e-6);
        assert!(session.snapshot().has_signature);
    }

    #[test]
    fn render_plan_uses_session_state() {
        let session = editing_session();
        let plan = session.render_plan(0, PageSize::new(1000.0, 1000.0));
        assert!(plan.text_ops().count() >= 2);
        assert!(!plan.has_signature());
    }
}
