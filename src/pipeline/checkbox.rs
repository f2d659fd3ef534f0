//! Checkbox detection and grouping.
//!
//! Detection scans line text for checkbox glyphs and bracket patterns
//! (`[ ]`, `[x]`, `( )`, `(x)`), estimating each box position from the
//! character offset inside the OCR line. Co-located checkboxes (same line
//! band) become one mutually exclusive group; the rest become single-option
//! toggles. Group labels come from text to the left of the group or, failing
//! that, from the option words themselves.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Checkbox, CheckboxGroup, NormalizedRect, RecognizedLine};

const CHECKED_GLYPHS: &[char] = &['☑', '☒', '■', '✓', '✔', '✗', '✘', '●', '◉'];
const UNCHECKED_GLYPHS: &[char] = &['☐', '□', '▢', '○', '◯'];
/// Marks inside `( )` that mean "checked". Square brackets accept any mark.
const CHECK_MARKS: &[char] = &['x', 'X', '*', '✓', '✔', '✗', '✘'];

/// Words that are option answers rather than free text.
pub const OPTION_TOKENS: &[&str] = &[
    "male", "female", "yes", "no", "m", "f", "married", "single", "divorced", "widowed",
];

/// Max horizontal gap (unit coordinates) between a group and its label text.
const MAX_LABEL_GAP: f64 = 0.2;

static SEX_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:female|male)\b").expect("static regex"));

/// A checkbox option pattern: which keypath a group answers, and the data
/// value each option stands for.
pub struct OptionPattern {
    pub label_terms: &'static [&'static str],
    pub keypath: Option<&'static str>,
    pub options: &'static [(&'static str, &'static str)],
}

pub const OPTION_PATTERNS: &[OptionPattern] = &[
    OptionPattern {
        label_terms: &["sex", "gender"],
        keypath: Some("patient.sex"),
        options: &[("male", "M"), ("female", "F"), ("m", "M"), ("f", "F")],
    },
    OptionPattern {
        label_terms: &["marital"],
        keypath: Some("patient.maritalStatus"),
        options: &[
            ("married", "Married"),
            ("single", "Single"),
            ("divorced", "Divorced"),
            ("widowed", "Widowed"),
        ],
    },
    // Yes/No answers depend on the question; no default keypath.
    OptionPattern {
        label_terms: &["yes/no"],
        keypath: None,
        options: &[("yes", "Yes"), ("no", "No"), ("yes", "true"), ("no", "false")],
    },
];

/// A checkbox together with where it was found.
#[derive(Debug, Clone)]
pub struct DetectedCheckbox {
    pub checkbox: Checkbox,
    pub line_index: usize,
    pub page_index: usize,
    /// Text on the same line before the first checkbox ("Sex:").
    pub leading_text: Option<String>,
}

struct Hit {
    char_pos: usize,
    char_len: usize,
    checked: bool,
}

/// Find every checkbox in the given lines.
pub fn detect_checkboxes(lines: &[RecognizedLine]) -> Vec<DetectedCheckbox> {
    let mut detected = Vec::new();

    for (line_index, line) in lines.iter().enumerate() {
        let chars: Vec<char> = line.text.chars().collect();
        let hits = scan_hits(&chars);

        if hits.is_empty() {
            detected.extend(implicit_sex_options(line, line_index, &chars));
            continue;
        }

        let leading: String = chars[..hits[0].char_pos].iter().collect();
        let leading_text = clean_group_label(&leading);
        let char_count = chars.len().max(1) as f64;

        for (i, hit) in hits.iter().enumerate() {
            let text_start = hit.char_pos + hit.char_len;
            let text_end = hits.get(i + 1).map_or(chars.len(), |next| next.char_pos);
            let trailing: String = chars[text_start..text_end].iter().collect();

            let bounding_box = line.bounding_box.horizontal_slice(
                hit.char_pos as f64 / char_count,
                (hit.char_pos + hit.char_len) as f64 / char_count,
            );

            detected.push(DetectedCheckbox {
                checkbox: Checkbox::new(bounding_box, hit.checked, associated_text(&trailing)),
                line_index,
                page_index: line.page_index,
                leading_text: leading_text.clone(),
            });
        }
    }

    tracing::debug!(count = detected.len(), "Checkbox detection complete");
    detected
}

fn scan_hits(chars: &[char]) -> Vec<Hit> {
    let mut hits = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if CHECKED_GLYPHS.contains(&c) || UNCHECKED_GLYPHS.contains(&c) {
            hits.push(Hit {
                char_pos: i,
                char_len: 1,
                checked: CHECKED_GLYPHS.contains(&c),
            });
            i += 1;
            continue;
        }

        let close = match c {
            '[' => Some(']'),
            '(' => Some(')'),
            _ => None,
        };
        if let Some(close) = close {
            // "[]" with nothing inside
            if c == '[' && chars.get(i + 1) == Some(&close) {
                hits.push(Hit {
                    char_pos: i,
                    char_len: 2,
                    checked: false,
                });
                i += 2;
                continue;
            }
            if chars.get(i + 2) == Some(&close) {
                let inner = chars[i + 1];
                // "(s)" in "Name(s)" is prose, "[v]" is a mark
                let checked = if c == '[' {
                    !inner.is_whitespace()
                } else {
                    CHECK_MARKS.contains(&inner) || !(inner.is_alphanumeric() || inner.is_whitespace())
                };
                if inner == ' ' || checked {
                    hits.push(Hit {
                        char_pos: i,
                        char_len: 3,
                        checked,
                    });
                    i += 3;
                    continue;
                }
            }
        }
        i += 1;
    }
    hits
}

/// Trailing option text, cut to its first word when that word is an option token.
fn associated_text(trailing: &str) -> Option<String> {
    let trimmed = trailing.trim();
    if trimmed.is_empty() {
        return None;
    }
    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .trim_matches(|c: char| !c.is_alphanumeric());
    let lower = first_word.to_lowercase();
    if OPTION_TOKENS.iter().any(|t| *t == lower) {
        return Some(first_word.to_string());
    }
    let text = trimmed.trim_end_matches([',', ';']).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// "Sex: Male Female" with no drawn boxes still asks for a choice.
fn implicit_sex_options(
    line: &RecognizedLine,
    line_index: usize,
    chars: &[char],
) -> Vec<DetectedCheckbox> {
    let text = &line.text;
    let matches: Vec<_> = SEX_WORD.find_iter(text).collect();
    if matches.is_empty() {
        return Vec::new();
    }

    let char_count = chars.len().max(1) as f64;
    let first_char_pos = text[..matches[0].start()].chars().count();
    let leading: String = chars[..first_char_pos].iter().collect();
    let leading_text = clean_group_label(&leading);

    matches
        .into_iter()
        .map(|m| {
            let char_pos = text[..m.start()].chars().count() as f64;
            let char_width = 1.0 / char_count;
            let start = (char_pos / char_count - 1.5 * char_width).max(0.0);
            let bounding_box = line.bounding_box.horizontal_slice(start, start + char_width);
            DetectedCheckbox {
                checkbox: Checkbox::new(bounding_box, false, Some(m.as_str().to_string())),
                line_index,
                page_index: line.page_index,
                leading_text: leading_text.clone(),
            }
        })
        .collect()
}

fn clean_group_label(raw: &str) -> Option<String> {
    let label = raw.trim().trim_end_matches(':').trim();
    (label.chars().any(char::is_alphabetic)).then(|| label.to_string())
}

/// Vertical-centre tolerance for "same line".
fn same_band(a: &NormalizedRect, b: &NormalizedRect) -> bool {
    let tolerance = (a.height.min(b.height) * 0.5).max(0.005);
    (a.mid_y() - b.mid_y()).abs() <= tolerance
}

/// Group detected checkboxes into option sets and resolve their labels.
pub fn group_checkboxes(
    detected: Vec<DetectedCheckbox>,
    lines: &[RecognizedLine],
) -> Vec<CheckboxGroup> {
    let mut buckets: Vec<Vec<DetectedCheckbox>> = Vec::new();

    for item in detected {
        let slot = buckets.iter_mut().find(|bucket| {
            let first = &bucket[0];
            first.page_index == item.page_index
                && same_band(&first.checkbox.bounding_box, &item.checkbox.bounding_box)
        });
        match slot {
            Some(bucket) => bucket.push(item),
            None => buckets.push(vec![item]),
        }
    }

    let mut groups = Vec::new();
    let mut singles = Vec::new();

    for mut bucket in buckets {
        if bucket.len() < 2 {
            singles.extend(bucket);
            continue;
        }
        bucket.sort_by(|a, b| a.checkbox.bounding_box.x.total_cmp(&b.checkbox.bounding_box.x));

        let page_index = bucket[0].page_index;
        let leading = bucket[0].leading_text.clone();
        let mut group = CheckboxGroup::new(bucket.into_iter().map(|d| d.checkbox).collect());
        group.page_index = page_index;
        group.group_label = leading
            .or_else(|| label_left_of(&group, lines))
            .or_else(|| infer_label_from_options(&group));
        group.mapped_keypath = infer_group_keypath(&group);
        groups.push(group);
    }

    for single in singles {
        let mut group = CheckboxGroup::new(vec![single.checkbox]);
        group.page_index = single.page_index;
        group.group_label = single.leading_text;
        group.mapped_keypath = infer_group_keypath(&group);
        groups.push(group);
    }

    tracing::debug!(groups = groups.len(), "Checkbox grouping complete");
    groups
}

/// Nearest text vertically aligned with and left of the group.
fn label_left_of(group: &CheckboxGroup, lines: &[RecognizedLine]) -> Option<String> {
    let gb = &group.bounding_box;
    lines
        .iter()
        .filter(|l| l.page_index == group.page_index)
        .filter(|l| {
            let lb = &l.bounding_box;
            let gap = gb.min_x() - lb.max_x();
            let aligned = (lb.mid_y() - gb.mid_y()).abs() < lb.height.max(gb.height);
            aligned && (0.0..MAX_LABEL_GAP).contains(&gap)
        })
        .min_by(|a, b| {
            let gap_a = gb.min_x() - a.bounding_box.max_x();
            let gap_b = gb.min_x() - b.bounding_box.max_x();
            gap_a.total_cmp(&gap_b)
        })
        .and_then(|l| clean_group_label(&l.text))
}

fn option_keys(group: &CheckboxGroup) -> Vec<String> {
    group
        .options
        .iter()
        .map(|o| o.option_key())
        .filter(|k| !k.is_empty())
        .collect()
}

fn infer_label_from_options(group: &CheckboxGroup) -> Option<String> {
    let keys = option_keys(group);
    let has = |word: &str| keys.iter().any(|k| k == word);

    if has("male") || has("female") {
        Some("Sex".to_string())
    } else if has("yes") || has("no") {
        Some("Yes/No".to_string())
    } else if has("married") || has("single") || has("divorced") || has("widowed") {
        Some("Marital Status".to_string())
    } else {
        None
    }
}

/// The option pattern a group answers, by label first, then by option majority.
pub fn pattern_for_group(group: &CheckboxGroup) -> Option<&'static OptionPattern> {
    if let Some(label) = group.group_label.as_deref() {
        let lower = label.to_lowercase();
        if let Some(p) = OPTION_PATTERNS
            .iter()
            .find(|p| p.label_terms.iter().any(|t| lower.contains(t)))
        {
            return Some(p);
        }
    }

    let keys = option_keys(group);
    if keys.is_empty() {
        return None;
    }
    OPTION_PATTERNS.iter().find(|p| {
        let hits = keys
            .iter()
            .filter(|k| p.options.iter().any(|(opt, _)| opt == &k.as_str()))
            .count();
        hits * 2 > keys.len()
    })
}

/// Canonical keypath for a group, if its pattern has one.
pub fn infer_group_keypath(group: &CheckboxGroup) -> Option<String> {
    pattern_for_group(group)
        .and_then(|p| p.keypath)
        .map(str::to_string)
}
