//! Property-upload location validation
//!
//! Property uploads carry a legal description only. Unlike the well search
//! path, township and range must include a direction letter: a bare `"4"` is
//! rejected rather than defaulted.

use crate::columns::{Field, RawRow, RowFields};
use crate::normalize::{
    normalize_county, normalize_meridian, normalize_range, normalize_section, normalize_township,
};
use serde::{Deserialize, Serialize};

/// Normalized legal description of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyLocation {
    pub section: u8,
    pub township: String,
    pub range: String,
    pub meridian: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRowResult {
    pub row_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PropertyLocation>,
    pub errors: Vec<String>,
}

impl PropertyRowResult {
    pub fn is_valid(&self) -> bool {
        self.location.is_some()
    }
}

/// Error text for a missing or unparseable location component
fn component_error(label: &str, value: Option<&str>, expected: &str) -> String {
    match value {
        None => format!("Missing {}", label),
        Some(v) => format!("Invalid {} \"{}\" - expected {}", label, v, expected),
    }
}

/// Strictly normalize one property row's location
pub fn validate_property_row(row_index: usize, raw: &RawRow) -> PropertyRowResult {
    let fields = RowFields::from_raw(raw);
    let mut errors = Vec::new();

    let section_raw = fields.get(Field::Section);
    let section = section_raw.and_then(normalize_section);
    if section.is_none() {
        errors.push(component_error("section", section_raw, "1-36"));
    }

    let township_raw = fields.get(Field::Township);
    let township = township_raw.and_then(normalize_township);
    if township.is_none() {
        errors.push(component_error("township", township_raw, "a number with N or S, e.g. 4N"));
    }

    let range_raw = fields.get(Field::Range);
    let range = range_raw.and_then(normalize_range);
    if range.is_none() {
        errors.push(component_error("range", range_raw, "a number with E or W, e.g. 3W"));
    }

    let county = fields
        .get(Field::County)
        .map(normalize_county)
        .filter(|c| !c.is_empty());
    let meridian = normalize_meridian(fields.get(Field::Meridian), county.as_deref());

    let location = match (section, township, range) {
        (Some(section), Some(township), Some(range)) => Some(PropertyLocation {
            section,
            township,
            range,
            meridian: meridian.code().to_string(),
            county,
        }),
        _ => None,
    };

    PropertyRowResult {
        row_index,
        location,
        errors,
    }
}

/// Validate every row, preserving order
pub fn validate_properties(rows: &[RawRow]) -> Vec<PropertyRowResult> {
    rows.iter()
        .enumerate()
        .map(|(index, raw)| validate_property_row(index, raw))
        .collect()
}
