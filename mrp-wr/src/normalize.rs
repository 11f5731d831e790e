//! Field normalizer
//!
//! Pure, total functions that canonicalize raw spreadsheet values. Garbage in
//! yields `None`; nothing here panics or returns an error.
//!
//! These are the strict forms used by the property-upload path. The CSV well
//! search path layers a more lenient township/range reading on top (see
//! [`crate::query`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static SECTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(SECTION|SEC|S)\.?\s*").expect("valid regex"));
static TOWNSHIP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(TOWNSHIP|TOWN|T)\.?\s*").expect("valid regex"));
static RANGE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(RANGE|R)\.?\s*").expect("valid regex"));
static TOWNSHIP_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[NS]$").expect("valid regex"));
static RANGE_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[EW]$").expect("valid regex"));

/// Counties in the Oklahoma panhandle surveyed from the Cimarron meridian
const CIMARRON_COUNTIES: [&str; 3] = ["CIMARRON", "TEXAS", "BEAVER"];

/// Oklahoma state prefix of every API number handled here
pub const STATE_API_PREFIX: &str = "35";

/// Principal meridian of a PLSS location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Meridian {
    /// Indian Meridian (most of the state)
    #[default]
    #[serde(rename = "IM")]
    Indian,
    /// Cimarron Meridian (panhandle)
    #[serde(rename = "CM")]
    Cimarron,
}

impl Meridian {
    pub fn code(&self) -> &'static str {
        match self {
            Meridian::Indian => "IM",
            Meridian::Cimarron => "CM",
        }
    }
}

impl fmt::Display for Meridian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Section number, valid only in 1..=36
pub fn normalize_section(value: &str) -> Option<u8> {
    let stripped = SECTION_PREFIX.replace(value, "");
    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
    let n: u32 = digits.parse().ok()?;
    if (1..=36).contains(&n) {
        Some(n as u8)
    } else {
        None
    }
}

/// Township in `<digits><N|S>` form, e.g. `"t 4 n"` → `"4N"`
///
/// A bare number has no direction and is rejected here.
pub fn normalize_township(value: &str) -> Option<String> {
    strip_direction_token(value, &TOWNSHIP_PREFIX, &TOWNSHIP_FORM)
}

/// Range in `<digits><E|W>` form, e.g. `"R 12 w"` → `"12W"`
pub fn normalize_range(value: &str) -> Option<String> {
    strip_direction_token(value, &RANGE_PREFIX, &RANGE_FORM)
}

fn strip_direction_token(value: &str, prefix: &Regex, form: &Regex) -> Option<String> {
    let stripped = prefix.replace(value, "");
    let compact: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if form.is_match(&compact) {
        Some(compact)
    } else {
        None
    }
}

/// Meridian from an explicit value, else inferred from the county
pub fn normalize_meridian(value: Option<&str>, county: Option<&str>) -> Meridian {
    if let Some(v) = value {
        let upper = v.trim().to_uppercase();
        // IM / I / INDIAN..., CM / C / CIMARRON...
        if upper.starts_with('I') {
            return Meridian::Indian;
        }
        if upper.starts_with('C') {
            return Meridian::Cimarron;
        }
    }

    if county.is_some_and(is_cimarron_county) {
        Meridian::Cimarron
    } else {
        Meridian::Indian
    }
}

fn is_cimarron_county(county: &str) -> bool {
    let upper = county.trim().to_uppercase();
    let name = upper.strip_suffix(" COUNTY").unwrap_or(&upper).trim();
    CIMARRON_COUNTIES.contains(&name)
}

/// Title-case each whitespace-separated token: `"LE FLORE"` → `"Le Flore"`
pub fn normalize_county(value: &str) -> String {
    value
        .split_whitespace()
        .map(|token| {
            let lower = token.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of reading a directly supplied API number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiNumber {
    /// 10-digit state API (suffix digits beyond 10 dropped)
    Valid(String),
    /// Value present but not a usable API
    Invalid(String),
    Absent,
}

/// Read an API number column: digits only, 10–14 long, state prefix `35`
pub fn parse_api_number(value: Option<&str>) -> ApiNumber {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return ApiNumber::Absent;
    };

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if (10..=14).contains(&digits.len()) && digits.starts_with(STATE_API_PREFIX) {
        ApiNumber::Valid(digits[..10].to_string())
    } else {
        ApiNumber::Invalid(raw.to_string())
    }
}
