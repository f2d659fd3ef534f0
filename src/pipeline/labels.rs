//! Label candidate extraction.
//!
//! Decides which OCR lines are field captions. Section headings and page
//! titles are filtered out first; then, per line, the first strategy that
//! applies wins: colon-delimited, blank-fill (`Phone ______`), or a known
//! form-label keyword. Labels are deduplicated on their normalized text, so
//! running the extractor twice over the same lines yields the same fields.

use std::collections::{BTreeSet, HashSet};

use crate::config::LabelConfig;
use crate::models::{Field, NormalizedRect, RecognizedLine};
use crate::pipeline::matching::text::{collapse_whitespace, normalize};

/// Section-heading phrases (lowercase). A line equal to one of these, or
/// starting with one followed by `:` / `-`, is a heading rather than a label.
const SECTION_HEADINGS: &[&str] = &[
    "patient information",
    "patient info",
    "patient demographics",
    "demographics",
    "personal information",
    "contact information",
    "insurance information",
    "primary insurance",
    "secondary insurance",
    "medical history",
    "past medical history",
    "family history",
    "social history",
    "surgical history",
    "current medications",
    "medications",
    "allergies",
    "emergency contact",
    "emergency contact information",
    "consent",
    "authorization",
    "office use only",
    "for office use only",
    "review of systems",
    "new patient registration",
    "registration form",
    "intake form",
    "patient intake form",
    "health questionnaire",
    "responsible party",
    "guarantor information",
    "pharmacy information",
];

/// Known form-label keywords (lowercase).
const FORM_LABEL_KEYWORDS: &[&str] = &[
    "name",
    "full name",
    "patient name",
    "first name",
    "last name",
    "middle name",
    "middle initial",
    "surname",
    "dob",
    "d.o.b.",
    "date of birth",
    "birth date",
    "birthdate",
    "age",
    "sex",
    "gender",
    "address",
    "street address",
    "street",
    "city",
    "state",
    "zip",
    "zip code",
    "postal code",
    "phone",
    "phone number",
    "telephone",
    "home phone",
    "cell phone",
    "mobile",
    "email",
    "e-mail",
    "email address",
    "ssn",
    "social security number",
    "marital status",
    "insurance",
    "insurance company",
    "insurance provider",
    "policy number",
    "member id",
    "group number",
    "subscriber",
    "employer",
    "occupation",
    "emergency contact name",
    "relationship",
    "primary care physician",
    "referring physician",
    "pharmacy",
    "date",
    "signature",
    "patient signature",
    "signature of patient",
];

/// Outcome of label extraction for one page.
#[derive(Debug, Clone, Default)]
pub struct LabelExtraction {
    pub fields: Vec<Field>,
    /// Indices (into the input slice) of lines that produced a label.
    pub label_lines: BTreeSet<usize>,
}

/// True when the text alone reads as a section heading.
pub fn is_section_heading_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    let bare = lower.trim_end_matches([':', '-', ' ']).trim();

    for heading in SECTION_HEADINGS {
        if bare == *heading {
            return true;
        }
        if let Some(rest) = lower.strip_prefix(heading) {
            let rest = rest.trim_start();
            if rest.starts_with(':') || rest.starts_with('-') {
                return true;
            }
        }
    }

    is_all_caps_heading(trimmed)
}

/// Long all-caps text with a space reads as a heading ("PATIENT INFORMATION"),
/// unlike short codes such as "DOB".
fn is_all_caps_heading(text: &str) -> bool {
    let len = text.chars().count();
    if !(10..=50).contains(&len) || !text.contains(' ') {
        return false;
    }
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}

/// Heading test including geometry: wide, long lines are page titles.
pub fn is_heading_line(line: &RecognizedLine) -> bool {
    let text = line.trimmed();
    if is_section_heading_text(text) {
        return true;
    }
    line.bounding_box.width > 0.6 && text.chars().count() > 30
}

/// Extract label-only fields from the lines of one page.
pub fn extract_labels(lines: &[RecognizedLine], config: &LabelConfig) -> LabelExtraction {
    let mut extraction = LabelExtraction::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, line) in lines.iter().enumerate() {
        if line.confidence < config.min_confidence || line.trimmed().is_empty() {
            continue;
        }
        if is_heading_line(line) {
            tracing::trace!(text = %line.text, "Skipping heading line");
            continue;
        }

        let Some(candidate) = label_from_line(line, config) else {
            continue;
        };

        let key = normalize(&candidate.label);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }

        let mut field = Field::new(candidate.label, line.bounding_box);
        field.page_index = line.page_index;
        field.detected_value = candidate.inline_value;
        field.value_box = candidate.inline_value_box;
        extraction.fields.push(field);
        extraction.label_lines.insert(index);
    }

    tracing::debug!(
        lines = lines.len(),
        labels = extraction.fields.len(),
        "Label extraction complete"
    );
    extraction
}

struct LabelCandidate {
    label: String,
    inline_value: Option<String>,
    inline_value_box: Option<NormalizedRect>,
}

fn label_from_line(line: &RecognizedLine, config: &LabelConfig) -> Option<LabelCandidate> {
    colon_label(line, config)
        .or_else(|| blank_fill_label(line.trimmed(), config))
        .or_else(|| keyword_label(line.trimmed()))
}

fn valid_label(label: &str, config: &LabelConfig) -> bool {
    let len = label.chars().count();
    len >= config.min_label_len
        && len <= config.max_label_len
        && label.chars().any(char::is_alphabetic)
        && !is_section_heading_text(label)
}

fn clean_label(raw: &str) -> String {
    collapse_whitespace(raw.trim().trim_end_matches([':', '-', '_']).trim())
}

/// `Label: value` — the text before the first colon is the label.
fn colon_label(line: &RecognizedLine, config: &LabelConfig) -> Option<LabelCandidate> {
    let text = line.trimmed();
    let colon = text.find(':')?;
    let label = clean_label(&text[..colon]);
    if !valid_label(&label, config) {
        return None;
    }

    let after = &text[colon + 1..];
    let value = strip_blank_runs(after);
    let inline_value = (value.chars().filter(|c| !c.is_whitespace()).count() >= 2).then_some(value);

    let inline_value_box = inline_value.as_ref().map(|_| {
        let total = text.chars().count().max(1) as f64;
        let start = text[..colon + 1].chars().count() as f64;
        line.bounding_box.horizontal_slice(start / total, 1.0)
    });

    Some(LabelCandidate {
        label,
        inline_value,
        inline_value_box,
    })
}

/// Remove underscore runs and dash runs used as blanks, trim edge punctuation.
fn strip_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '_' || c == '-' {
            let start = i;
            while i < chars.len() && chars[i] == c {
                i += 1;
            }
            // Single dashes inside values ("03-14-1980") survive.
            if c == '-' && i - start == 1 {
                out.push('-');
            } else {
                out.push(' ');
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    collapse_whitespace(out.trim_matches(|c: char| c == '-' || c.is_whitespace()))
}

/// Byte offset of the first blank run (`__` or `--` not at line start).
fn first_blank_run(text: &str) -> Option<usize> {
    let underscores = text.find("__");
    let dashes = text
        .match_indices("--")
        .map(|(pos, _)| pos)
        .find(|&pos| pos > 0);
    match (underscores, dashes) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// `Phone ________` — the caption precedes the blank.
fn blank_fill_label(text: &str, config: &LabelConfig) -> Option<LabelCandidate> {
    let blank = first_blank_run(text)?;

    let before = clean_label(&text[..blank]);
    let label = if valid_label(&before, config) {
        before
    } else {
        let stripped: String = text.chars().filter(|c| *c != '_' && *c != '-').collect();
        let fallback = clean_label(&stripped);
        if !valid_label(&fallback, config) {
            return None;
        }
        fallback
    };

    Some(LabelCandidate {
        label,
        inline_value: None,
        inline_value_box: None,
    })
}

/// Whole-line match against the keyword list, on a word boundary.
fn keyword_label(text: &str) -> Option<LabelCandidate> {
    let label = clean_label(text);
    if label.chars().count() > 50 {
        return None;
    }
    let lower = label.to_lowercase();

    let matched = FORM_LABEL_KEYWORDS.iter().any(|kw| {
        if lower == *kw {
            return true;
        }
        let prefixed = lower
            .strip_prefix(kw)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c == ' ' || c == '/' || c == '(');
        let suffixed = lower
            .strip_suffix(kw)
            .and_then(|rest| rest.chars().last())
            .is_some_and(|c| c == ' ' || c == '/' || c == '(');
        prefixed || suffixed
    });

    matched.then(|| LabelCandidate {
        label,
        inline_value: None,
        inline_value_box: None,
    })
}
