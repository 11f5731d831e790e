//! Column alias table for user-uploaded rows
//!
//! Uploaded spreadsheets spell the same column many ways (`WELL_NAME`,
//! `Well Name`, `wellname`). Keys are compared in a canonical form (lowercase
//! ASCII alphanumerics only) against an ordered alias list per field; the
//! first alias with a non-empty value wins.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// One uploaded row: column name → string or number
pub type RawRow = Map<String, Value>;

/// Logical fields read from a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Api,
    WellName,
    WellNumber,
    /// A single "Name & Number" column
    CombinedName,
    Operator,
    Section,
    Township,
    Range,
    Meridian,
    County,
}

/// Accepted aliases per field, in priority order (canonical form).
///
/// Combined columns that also carry the operator (e.g. `Well Name / Operator`)
/// are not aliases of any field.
const ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Api,
        &["api", "apinumber", "apino", "apinum", "wellapi", "api10", "api14"],
    ),
    (Field::WellName, &["wellname", "leasename", "name", "well"]),
    (
        Field::WellNumber,
        &["wellnumber", "wellnum", "wellno", "wellnbr", "number"],
    ),
    (
        Field::CombinedName,
        &["namenumber", "wellnamenumber", "wellnameandnumber", "nameandnumber"],
    ),
    (
        Field::Operator,
        &["operator", "operatorname", "currentoperator", "company"],
    ),
    (Field::Section, &["section", "sec", "sect"]),
    (Field::Township, &["township", "twp", "town", "twn"]),
    (Field::Range, &["range", "rng", "rge"]),
    (Field::Meridian, &["meridian", "mer", "pm", "principalmeridian"]),
    (Field::County, &["county", "countyname", "cnty"]),
];

/// Canonical key: lowercase ASCII alphanumerics, everything else dropped
pub fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Cell value as trimmed text; numbers with no fraction print as integers
fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// A row indexed by canonical column name
#[derive(Debug, Clone, Default)]
pub struct RowFields {
    cells: HashMap<String, String>,
}

impl RowFields {
    pub fn from_raw(row: &RawRow) -> Self {
        let mut cells = HashMap::new();
        for (key, value) in row {
            if let Some(text) = cell_text(value) {
                // first spelling of a canonical key wins
                cells.entry(canonical_key(key)).or_insert(text);
            }
        }
        Self { cells }
    }

    /// Value for a logical field, trying aliases in order
    pub fn get(&self, field: Field) -> Option<&str> {
        let aliases = ALIASES
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[]);

        aliases
            .iter()
            .find_map(|alias| self.cells.get(*alias))
            .map(String::as_str)
    }
}
