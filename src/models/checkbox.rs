use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::NormalizedRect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkbox {
    pub bounding_box: NormalizedRect,
    pub is_checked: bool,
    pub associated_text: Option<String>,
    pub group_id: Option<Uuid>,
}

impl Checkbox {
    pub fn new(bounding_box: NormalizedRect, is_checked: bool, associated_text: Option<String>) -> Self {
        Self {
            bounding_box,
            is_checked,
            associated_text,
            group_id: None,
        }
    }

    /// Lowercased option text, empty when the checkbox has none.
    pub fn option_key(&self) -> String {
        self.associated_text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default()
    }
}

/// A set of checkbox options answering one question.
///
/// Multi-option groups are mutually exclusive: at most one option is checked
/// and, when one is, `selected_index` points at it. Single-option groups are
/// plain toggles. All selection changes go through [`CheckboxGroup::select`]
/// and [`CheckboxGroup::toggle`] so the invariant cannot be broken piecemeal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckboxGroup {
    pub id: Uuid,
    pub bounding_box: NormalizedRect,
    pub options: Vec<Checkbox>,
    pub group_label: Option<String>,
    pub mapped_keypath: Option<String>,
    pub selected_index: Option<usize>,
    #[serde(default)]
    pub page_index: usize,
}

impl CheckboxGroup {
    /// Build a group from its options, stamping each with the group id.
    ///
    /// If several options arrive checked on a multi-option group only the
    /// first keeps its mark.
    pub fn new(mut options: Vec<Checkbox>) -> Self {
        let id = Uuid::new_v4();
        let bounding_box =
            NormalizedRect::union_all(options.iter().map(|o| &o.bounding_box)).unwrap_or_default();

        let mut selected_index = None;
        for (i, option) in options.iter_mut().enumerate() {
            option.group_id = Some(id);
            if option.is_checked {
                if selected_index.is_none() {
                    selected_index = Some(i);
                } else {
                    option.is_checked = false;
                }
            }
        }

        Self {
            id,
            bounding_box,
            options,
            group_label: None,
            mapped_keypath: None,
            selected_index,
            page_index: 0,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.options.len() > 1
    }

    /// Check `index` and uncheck every sibling. Returns false when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.options.len() {
            return false;
        }
        for (i, option) in self.options.iter_mut().enumerate() {
            option.is_checked = i == index;
        }
        self.selected_index = Some(index);
        true
    }

    /// Flip one option.
    ///
    /// Multi-option: checking an option unchecks its siblings; unchecking the
    /// selected option leaves the group empty. Single-option: free toggle.
    pub fn toggle(&mut self, index: usize) -> bool {
        let Some(option) = self.options.get(index) else {
            return false;
        };
        let now_checked = !option.is_checked;

        if self.is_multi() {
            if now_checked {
                self.select(index);
            } else {
                self.options[index].is_checked = false;
                self.selected_index = None;
            }
        } else {
            self.options[index].is_checked = now_checked;
            self.selected_index = now_checked.then_some(0);
        }
        true
    }

    pub fn checked_options(&self) -> impl Iterator<Item = &Checkbox> {
        self.options.iter().filter(|o| o.is_checked)
    }

    /// Holds when at most one option is checked and it matches `selected_index`.
    pub fn selection_is_consistent(&self) -> bool {
        let checked: Vec<usize> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_checked)
            .map(|(i, _)| i)
            .collect();
        if !self.is_multi() {
            return checked.len() <= 1;
        }
        match checked.as_slice() {
            [] => self.selected_index.is_none(),
            [only] => self.selected_index == Some(*only),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(x: f64, checked: bool, text: &str) -> Checkbox {
        Checkbox::new(
            NormalizedRect::new(x, 0.5, 0.02, 0.02),
            checked,
            Some(text.to_string()),
        )
    }

    #[test]
    fn new_group_unions_boxes_and_stamps_ids() {
        let group = CheckboxGroup::new(vec![option(0.1, false, "Male"), option(0.3, false, "Female")]);
        assert!((group.bounding_box.x - 0.1).abs() < 1e-9);
        assert!((group.bounding_box.max_x() - 0.32).abs() < 1e-9);
        assert!(group.options.iter().all(|o| o.group_id == Some(group.id)));
        assert!(group.selected_index.is_none());
    }

    #[test]
    fn new_group_keeps_only_first_checked() {
        let group = CheckboxGroup::new(vec![option(0.1, true, "Yes"), option(0.3, true, "No")]);
        assert_eq!(group.selected_index, Some(0));
        assert!(!group.options[1].is_checked);
        assert!(group.selection_is_consistent());
    }

    #[test]
    fn toggle_enforces_mutual_exclusivity() {
        let mut group = CheckboxGroup::new(vec![
            option(0.1, false, "Single"),
            option(0.3, false, "Married"),
            option(0.5, false, "Divorced"),
        ]);
        let sequence = [0, 2, 2, 1, 1, 0, 2, 0, 0, 1];
        for idx in sequence {
            assert!(group.toggle(idx));
            assert!(group.selection_is_consistent());
            assert!(group.checked_options().count() <= 1);
        }
    }

    #[test]
    fn single_option_toggles_freely() {
        let mut group = CheckboxGroup::new(vec![option(0.1, false, "Consent")]);
        assert!(group.toggle(0));
        assert!(group.options[0].is_checked);
        assert_eq!(group.selected_index, Some(0));
        assert!(group.toggle(0));
        assert!(!group.options[0].is_checked);
        assert_eq!(group.selected_index, None);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut group = CheckboxGroup::new(vec![option(0.1, false, "Yes"), option(0.3, false, "No")]);
        assert!(!group.toggle(5));
        assert!(!group.select(2));
        assert!(group.selected_index.is_none());
    }
}
