//! Patient-record flattening.
//!
//! Turns an arbitrary nested JSON document into a flat `keypath → string`
//! map (`patient.address.city`, `contacts[0].name`) and derives the
//! `_computed.*` convenience values that forms commonly ask for.
//! Flattening never fails on content: a value that cannot be used for a
//! derived field simply leaves that field out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const TODAY_DATE_KEY: &str = "_computed.todayDate";
pub const PATIENT_AGE_KEY: &str = "_computed.patientAge";
pub const DOB_FORMATTED_KEY: &str = "_computed.dobFormatted";
pub const FULL_NAME_KEY: &str = "patient.fullName";
pub const FULL_ADDRESS_KEY: &str = "patient.fullAddress";

const DOB_KEY: &str = "patient.dateOfBirth";
const FIRST_NAME_KEY: &str = "patient.firstName";
const LAST_NAME_KEY: &str = "patient.lastName";
const ADDRESS_PART_KEYS: [&str; 5] = [
    "patient.address.line1",
    "patient.address.line2",
    "patient.address.city",
    "patient.address.state",
    "patient.address.postalCode",
];

const FORM_DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Patient data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat, read-only view of one patient record for one autofill session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientData {
    values: BTreeMap<String, String>,
}

impl PatientData {
    /// Flatten a JSON document, deriving computed fields against today's date.
    pub fn from_json(value: &Value) -> Self {
        flatten_with_today(value, Local::now().date_naive())
    }

    pub fn from_json_str(text: &str) -> Result<Self, FlattenError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&value))
    }

    pub fn from_path(path: &Path) -> Result<Self, FlattenError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Raw value for a keypath, including empty strings.
    pub fn get(&self, keypath: &str) -> Option<&str> {
        self.values.get(keypath).map(String::as_str)
    }

    /// Value for a keypath, `None` when missing or blank.
    pub fn value_of(&self, keypath: &str) -> Option<&str> {
        self.get(keypath).filter(|v| !v.trim().is_empty())
    }

    pub fn has_value(&self, keypath: &str) -> bool {
        self.value_of(keypath).is_some()
    }

    /// Keypaths in sorted order.
    pub fn keypaths(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Keypaths whose value is non-blank, in sorted order.
    pub fn live_keypaths(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for PatientData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Flatten `value` and derive computed fields relative to `today`.
pub fn flatten_with_today(value: &Value, today: NaiveDate) -> PatientData {
    let mut values = BTreeMap::new();
    flatten_into("", value, &mut values);
    derive_computed(&mut values, today);
    tracing::debug!(keys = values.len(), "Flattened patient data");
    PatientData { values }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}[{index}]"), child, out);
            }
        }
        terminal => {
            // A bare scalar document has no keypath to live under.
            if prefix.is_empty() {
                return;
            }
            out.insert(prefix.to_string(), stringify_terminal(terminal));
        }
    }
}

fn stringify_terminal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn non_blank<'a>(values: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    values
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn derive_computed(values: &mut BTreeMap<String, String>, today: NaiveDate) {
    values.insert(
        TODAY_DATE_KEY.to_string(),
        today.format(FORM_DATE_FORMAT).to_string(),
    );

    if let Some(dob) = non_blank(values, DOB_KEY).and_then(parse_iso_date) {
        if let Some(age) = whole_years_between(dob, today) {
            values.insert(PATIENT_AGE_KEY.to_string(), age.to_string());
        }
        values.insert(
            DOB_FORMATTED_KEY.to_string(),
            dob.format(FORM_DATE_FORMAT).to_string(),
        );
    }

    if non_blank(values, FULL_NAME_KEY).is_none() {
        if let (Some(first), Some(last)) = (
            non_blank(values, FIRST_NAME_KEY),
            non_blank(values, LAST_NAME_KEY),
        ) {
            let full = format!("{first} {last}");
            values.insert(FULL_NAME_KEY.to_string(), full);
        }
    }

    if non_blank(values, FULL_ADDRESS_KEY).is_none() {
        let parts: Vec<&str> = ADDRESS_PART_KEYS
            .iter()
            .filter_map(|k| non_blank(values, k))
            .collect();
        if !parts.is_empty() {
            let full = parts.join(", ");
            values.insert(FULL_ADDRESS_KEY.to_string(), full);
        }
    }
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component (`1980-03-14T00:00:00Z`).
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Completed years from `from` to `to`; `None` if `from` lies in the future.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
