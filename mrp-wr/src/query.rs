//! Query builder for the CSV well search path
//!
//! Turns one uploaded row into a [`NormalizedQuery`]: the combined well name,
//! a fuzzier base name with the trailing well-number token stripped, and a
//! leniently normalized PLSS location.

use crate::columns::{Field, RowFields};
use crate::normalize::{normalize_county, normalize_meridian, normalize_section, Meridian};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trailing well-number token: `3H-30X`, `#1H-30X`, `1-12`
static TRAILING_WELL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(\d+[A-Z]?-\d+[A-Z]?X?|#\d+[A-Z]?-\d+[A-Z]?X?)$").expect("valid regex")
});

/// Trailing bare well number (`1H`, `3H-30X`) without a `#`
static TRAILING_BARE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*\S)\s+(\d+[A-Z]?(?:-\d+[A-Z]?X?)?)$").expect("valid regex")
});

static TOWNSHIP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(TOWNSHIP|TOWN|TWP|T)\.?\s*").expect("valid regex"));
static RANGE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(RANGE|RNG|R)\.?\s*").expect("valid regex"));
static DIRECTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)([A-Z])?$").expect("valid regex"));

const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Normalized search criteria for one row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedQuery {
    pub cleaned_well_name: String,
    pub base_well_name: String,
    pub operator: String,
    pub section: Option<u8>,
    /// Canonical `04N` form
    pub township: Option<String>,
    /// Canonical `12W` form
    pub range: Option<String>,
    pub meridian: Meridian,
    pub county: String,
}

impl NormalizedQuery {
    pub fn has_name(&self) -> bool {
        !self.cleaned_well_name.is_empty()
    }

    pub fn has_operator(&self) -> bool {
        !self.operator.is_empty()
    }

    pub fn has_township_range(&self) -> bool {
        self.township.is_some() && self.range.is_some()
    }

    /// Section, township and range all present
    pub fn has_full_location(&self) -> bool {
        self.section.is_some() && self.has_township_range()
    }

    /// Neither a name nor a township+range: nothing to search on
    pub fn is_insufficient(&self) -> bool {
        !self.has_name() && !self.has_township_range()
    }

    /// `S12-T04N-R03W-IM`, omitting absent parts
    pub fn location_label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(section) = self.section {
            parts.push(format!("S{}", section));
        }
        if let Some(township) = &self.township {
            parts.push(format!("T{}", township));
        }
        if let Some(range) = &self.range {
            parts.push(format!("R{}", range));
        }
        parts.push(self.meridian.code().to_string());
        parts.join("-")
    }
}

/// Build the search query for one row
pub fn build_query(fields: &RowFields) -> NormalizedQuery {
    let raw_name = match (fields.get(Field::WellName), fields.get(Field::WellNumber)) {
        (Some(name), Some(number)) => format!("{} {}", name, number),
        // a combined column carries the number the bare name lacks
        (Some(name), None) => fields.get(Field::CombinedName).unwrap_or(name).to_string(),
        (None, _) => fields
            .get(Field::CombinedName)
            .map(str::to_string)
            .unwrap_or_default(),
    };

    let cleaned_well_name = clean_well_name(&raw_name);
    let base_well_name = base_well_name(&cleaned_well_name);

    let county = fields.get(Field::County).map(normalize_county).unwrap_or_default();
    let meridian = normalize_meridian(
        fields.get(Field::Meridian),
        (!county.is_empty()).then_some(county.as_str()),
    );

    NormalizedQuery {
        cleaned_well_name,
        base_well_name,
        operator: fields
            .get(Field::Operator)
            .map(|op| op.trim().to_string())
            .unwrap_or_default(),
        section: fields.get(Field::Section).and_then(normalize_section),
        township: fields.get(Field::Township).and_then(lenient_township),
        range: fields.get(Field::Range).and_then(lenient_range),
        meridian,
        county,
    }
}

/// Strip quote characters and collapse whitespace
pub fn clean_well_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name with the trailing well-number token removed
pub fn base_well_name(cleaned: &str) -> String {
    TRAILING_WELL_NUMBER.replace(cleaned, "").trim().to_string()
}

/// Exact-match spellings of a name: as given, with `#` before the trailing
/// well number, and with every `#` removed. Duplicates (case-insensitive) are
/// dropped, order preserved.
pub fn exact_name_variants(cleaned: &str) -> Vec<String> {
    let mut variants = vec![cleaned.to_string()];

    if let Some(caps) = TRAILING_BARE_NUMBER.captures(cleaned) {
        variants.push(format!("{} #{}", &caps[1], &caps[2]));
    }

    let without_hash = cleaned
        .replace('#', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    variants.push(without_hash);

    let mut seen = std::collections::HashSet::new();
    variants
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.to_uppercase()))
        .collect()
}

/// Township for search: bare numbers default to north, single digits are
/// zero-padded (`"4"` → `"04N"`)
pub fn lenient_township(value: &str) -> Option<String> {
    lenient_direction(value, &TOWNSHIP_PREFIX, 'N', &['N', 'S'])
}

/// Range for search: bare numbers default to west (`"3"` → `"03W"`)
pub fn lenient_range(value: &str) -> Option<String> {
    lenient_direction(value, &RANGE_PREFIX, 'W', &['E', 'W'])
}

fn lenient_direction(
    value: &str,
    prefix: &Regex,
    default_direction: char,
    allowed: &[char],
) -> Option<String> {
    let stripped = prefix.replace(value, "");
    let compact: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let caps = DIRECTIONAL.captures(&compact)?;
    let number: u32 = caps[1].parse().ok()?;
    if number == 0 {
        return None;
    }

    let direction = match caps.get(2) {
        Some(d) => d.as_str().chars().next()?,
        None => default_direction,
    };
    if !allowed.contains(&direction) {
        return None;
    }

    Some(format!("{:02}{}", number, direction))
}
