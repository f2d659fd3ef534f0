//! Checkbox auto-selection from patient data.

use crate::models::CheckboxGroup;
use crate::pipeline::checkbox::{pattern_for_group, OPTION_PATTERNS};
use crate::pipeline::flatten::PatientData;

/// Index of the option that answers `value`, if any.
///
/// Passes, first hit wins: option text equal to the value, then a prefix
/// either way (`f` ↔ `female`), then the option mapping table
/// (`male → M`, `yes → true`, …).
pub fn select_option_index(group: &CheckboxGroup, value: &str) -> Option<usize> {
    let wanted = value.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let keys: Vec<String> = group.options.iter().map(|o| o.option_key()).collect();

    if let Some(index) = keys.iter().position(|k| *k == wanted) {
        return Some(index);
    }

    let prefix = keys
        .iter()
        .position(|k| !k.is_empty() && (k.starts_with(&wanted) || wanted.starts_with(k.as_str())));
    if prefix.is_some() {
        return prefix;
    }

    let mappings: Vec<&(&str, &str)> = match pattern_for_group(group) {
        Some(pattern) => pattern.options.iter().collect(),
        None => OPTION_PATTERNS.iter().flat_map(|p| p.options.iter()).collect(),
    };
    keys.iter().position(|k| {
        mappings
            .iter()
            .any(|(option, data_value)| option == k && data_value.eq_ignore_ascii_case(&wanted))
    })
}

/// Select the option matching the group's keypath value. Returns the index
/// chosen; the group is left untouched when nothing matches.
pub fn auto_select(group: &mut CheckboxGroup, data: &PatientData) -> Option<usize> {
    let keypath = group.mapped_keypath.as_deref()?;
    let value = data.value_of(keypath)?;
    let index = select_option_index(group, value)?;

    tracing::debug!(
        group = group.group_label.as_deref().unwrap_or(""),
        keypath,
        index,
        "Checkbox auto-selected"
    );
    group.select(index);
    Some(index)
}
