//! Text normalization shared by label extraction and keypath matching.

use std::collections::BTreeSet;

/// Lowercase, drop everything that is not alphanumeric or a space, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    collapse_whitespace(&kept)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token set of a label after normalization.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Final segment of a keypath, without any `[n]` array index.
///
/// `patient.address.postalCode` → `postalCode`, `contacts[0]` → `contacts`.
pub fn final_segment(keypath: &str) -> &str {
    let last = keypath.rsplit('.').next().unwrap_or(keypath);
    match last.find('[') {
        Some(pos) => &last[..pos],
        None => last,
    }
}

/// Split a camelCase / snake_case identifier into lowercase words.
///
/// `dateOfBirth` → `["date", "of", "birth"]`, `postal_code` → `["postal", "code"]`,
/// `SSNNumber` → `["ssn", "number"]`.
pub fn split_camel_case(ident: &str) -> Vec<String> {
    let chars: Vec<char> = ident.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // Boundary on lower→Upper, and on the last capital of an acronym run.
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Words of a keypath's final segment.
pub fn keypath_words(keypath: &str) -> BTreeSet<String> {
    split_camel_case(final_segment(keypath)).into_iter().collect()
}

/// |A ∩ B| / |A ∪ B|; zero when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Padded-space containment: `needle` appears in `haystack` as whole words.
pub fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {needle} "))
}
