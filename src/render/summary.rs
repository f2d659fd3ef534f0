//! Human-readable fill summaries: plain text and PDF.

use std::io::BufWriter;

use printpdf::*;

use super::RenderError;
use crate::models::{CheckboxGroup, Field, FieldType};

const PDF_BOTTOM_MARGIN_MM: f32 = 20.0;
const PDF_WRAP_CHARS: usize = 90;

/// One summary, shared by the text and PDF outputs.
#[derive(Debug, Clone, PartialEq)]
struct Summary {
    matched: Vec<String>,
    unmatched: Vec<String>,
    checked: Vec<String>,
    signature: String,
}

impl Summary {
    fn build(fields: &[Field], groups: &[CheckboxGroup], has_signature: bool) -> Self {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        for field in fields {
            match (&field.mapped_keypath, field.field_type) {
                (_, FieldType::Signature) => {}
                (Some(keypath), _) => {
                    let method = field.match_method.map_or("manual", |m| m.as_str());
                    matched.push(format!(
                        "{} -> {} = \"{}\" ({:.0}%, {})",
                        field.label,
                        keypath,
                        field.value,
                        field.match_confidence * 100.0,
                        method
                    ));
                }
                (None, _) if field.is_filled() => {
                    unmatched.push(format!("{} = \"{}\" (entered)", field.label, field.value));
                }
                (None, _) => unmatched.push(field.label.clone()),
            }
        }

        let checked = groups
            .iter()
            .flat_map(|group| {
                let label = group.group_label.as_deref().unwrap_or("Checkbox");
                group
                    .checked_options()
                    .map(move |o| format!("{}: {}", label, o.associated_text.as_deref().unwrap_or("(unlabeled)")))
            })
            .collect();

        let signature = if has_signature {
            "attached".to_string()
        } else if fields.iter().any(|f| f.field_type == FieldType::Signature) {
            "missing (form has a signature field)".to_string()
        } else {
            "none".to_string()
        };

        Self {
            matched,
            unmatched,
            checked,
            signature,
        }
    }

    fn sections(&self) -> [(&'static str, &[String]); 3] {
        [
            ("MATCHED FIELDS", self.matched.as_slice()),
            ("UNMATCHED FIELDS", self.unmatched.as_slice()),
            ("CHECKED OPTIONS", self.checked.as_slice()),
        ]
    }
}

/// Plain-text summary of a filled form.
pub fn render_text(fields: &[Field], groups: &[CheckboxGroup], has_signature: bool) -> String {
    let summary = Summary::build(fields, groups, has_signature);
    let mut out = String::new();

    for (title, items) in summary.sections() {
        out.push_str(&format!("{title} ({})\n", items.len()));
        if items.is_empty() {
            out.push_str("  (none)\n");
        }
        for item in items {
            out.push_str(&format!("  {item}\n"));
        }
        out.push('\n');
    }
    out.push_str(&format!("SIGNATURE: {}\n", summary.signature));
    out
}

/// The same summary as a PDF document.
pub fn render_pdf(
    title: &str,
    fields: &[Field],
    groups: &[CheckboxGroup],
    has_signature: bool,
) -> Result<Vec<u8>, RenderError> {
    let summary = Summary::build(fields, groups, has_signature);

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(210.0), Mm(297.0), "Layer 1");
    let mut layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(format!("PDF font error: {e}")))?;

    let mut y = Mm(280.0);
    layer.use_text(title, 14.0, Mm(20.0), y, &bold);
    y -= Mm(10.0);

    for (heading, items) in summary.sections() {
        if y.0 < PDF_BOTTOM_MARGIN_MM + 10.0 {
            layer = next_page(&doc);
            y = Mm(280.0);
        }
        layer.use_text(format!("{heading}:"), 11.0, Mm(20.0), y, &bold);
        y -= Mm(6.0);

        let none = [String::from("(none)")];
        let items = if items.is_empty() { &none[..] } else { items };
        for item in items {
            for line in wrap_text(item, PDF_WRAP_CHARS) {
                if y.0 < PDF_BOTTOM_MARGIN_MM {
                    layer = next_page(&doc);
                    y = Mm(280.0);
                }
                layer.use_text(&line, 9.0, Mm(25.0), y, &font);
                y -= Mm(4.5);
            }
        }
        y -= Mm(4.0);
    }

    if y.0 < PDF_BOTTOM_MARGIN_MM {
        layer = next_page(&doc);
        y = Mm(280.0);
    }
    layer.use_text(format!("SIGNATURE: {}", summary.signature), 10.0, Mm(20.0), y, &bold);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| RenderError::Pdf(format!("PDF buffer error: {e}")))
}

fn next_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Checkbox, MatchMethod, NormalizedRect};

    fn fixture() -> (Vec<Field>, Vec<CheckboxGroup>) {
        let mut name = Field::new("Name", NormalizedRect::new(0.1, 0.85, 0.06, 0.02));
        name.mapped_keypath = Some("patient.fullName".into());
        name.value = "Jane Doe".into();
        name.match_confidence = 1.0;
        name.match_method = Some(MatchMethod::SynonymExact);

        let allergies = Field::new("Allergies", NormalizedRect::new(0.1, 0.6, 0.1, 0.02));
        let mut sig = Field::new("Patient Signature", NormalizedRect::new(0.1, 0.1, 0.2, 0.02));
        sig.field_type = FieldType::Signature;

        let mut group = CheckboxGroup::new(vec![
            Checkbox::new(NormalizedRect::new(0.2, 0.5, 0.02, 0.02), false, Some("Male".into())),
            Checkbox::new(NormalizedRect::new(0.3, 0.5, 0.02, 0.02), false, Some("Female".into())),
        ]);
        group.group_label = Some("Sex".into());
        group.select(1);

        (vec![name, allergies, sig], vec![group])
    }

    #[test]
    fn text_summary_lists_everything() {
        let (fields, groups) = fixture();
        let text = render_text(&fields, &groups, false);
        assert!(text.contains("Name -> patient.fullName = \"Jane Doe\" (100%, synonym-exact)"));
        assert!(text.contains("UNMATCHED FIELDS (1)"));
        assert!(text.contains("  Allergies"));
        assert!(text.contains("Sex: Female"));
        assert!(!text.contains("Sex: Male"));
        assert!(text.contains("SIGNATURE: missing"));
        assert!(!text.contains("Patient Signature"));
    }

    #[test]
    fn manual_binding_reads_as_manual() {
        let (mut fields, _) = fixture();
        fields[0].match_method = None;
        let text = render_text(&fields, &[], true);
        assert!(text.contains("(100%, manual)"));
        assert!(text.contains("SIGNATURE: attached"));
    }

    #[test]
    fn pdf_summary_is_a_pdf() {
        let (fields, groups) = fixture();
        let bytes = render_pdf("Intake form", &fields, &groups, true).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_summaries_spill_onto_more_pages() {
        let fields: Vec<Field> = (0..120)
            .map(|i| Field::new(format!("Unmatched caption {i}"), NormalizedRect::new(0.1, 0.5, 0.1, 0.02)))
            .collect();
        let bytes = render_pdf("Long form", &fields, &[], false).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
