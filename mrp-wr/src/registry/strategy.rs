//! Cascade strategies
//!
//! | order | strategy              | filter                                   | score            |
//! |-------|-----------------------|------------------------------------------|------------------|
//! | 1     | `LocationName`        | S+T+R+M, name substring                  | 100 / 90         |
//! | 1.5   | `ExactNameStatewide`  | exact name variants, statewide           | 95 / 85 / 80     |
//! | 2     | `TownshipRangeName`   | T+R+M, name or base name substring       | 90 / 85 / 80 / 70|
//! | 2b    | `SectionLocation`     | S+T+R+M only                             | 75 / 65          |
//! | 3     | `NameStatewide`       | name substring, statewide                | 60 / 50          |
//! | 4     | `TownshipRangeOnly`   | T+R+M only, no name supplied             | 30               |

use super::{contains_ci, full_name, SearchParams};
use mrp_common::db::WellRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the resolution cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LocationName,
    ExactNameStatewide,
    TownshipRangeName,
    SectionLocation,
    NameStatewide,
    TownshipRangeOnly,
}

impl Strategy {
    /// Strategies in the order they are tried
    pub const CASCADE: [Strategy; 6] = [
        Strategy::LocationName,
        Strategy::ExactNameStatewide,
        Strategy::TownshipRangeName,
        Strategy::SectionLocation,
        Strategy::NameStatewide,
        Strategy::TownshipRangeOnly,
    ];

    /// Position in the cascade as documented (`"1"`, `"1.5"`, `"2b"`, ...)
    pub fn label(self) -> &'static str {
        match self {
            Strategy::LocationName => "1",
            Strategy::ExactNameStatewide => "1.5",
            Strategy::TownshipRangeName => "2",
            Strategy::SectionLocation => "2b",
            Strategy::NameStatewide => "3",
            Strategy::TownshipRangeOnly => "4",
        }
    }

    /// Candidates come from location alone, with no name constraint
    pub fn is_location_only(self) -> bool {
        matches!(self, Strategy::SectionLocation | Strategy::TownshipRangeOnly)
    }

    /// Whether the query carries the fields this strategy needs
    pub fn applies(self, params: &SearchParams, exact_name_min_len: usize) -> bool {
        match self {
            Strategy::LocationName => {
                params.has_name() && params.section.is_some() && params.has_township_range()
            }
            Strategy::ExactNameStatewide => {
                params.has_name() && params.name.chars().count() > exact_name_min_len
            }
            Strategy::TownshipRangeName => params.has_name() && params.has_township_range(),
            Strategy::SectionLocation => params.section.is_some() && params.has_township_range(),
            Strategy::NameStatewide => params.has_name(),
            Strategy::TownshipRangeOnly => !params.has_name() && params.has_township_range(),
        }
    }

    /// Match predicate and score for one registry row, `None` when the row
    /// does not match. Same precedence as the SQL `CASE WHEN` expressions.
    pub fn evaluate(self, well: &WellRecord, params: &SearchParams) -> Option<u8> {
        let name = full_name(&well.well_name, well.well_number.as_deref());
        let operator_match =
            params.has_operator() && contains_ci(well.operator.as_deref().unwrap_or(""), &params.operator);
        let section_match = params
            .section
            .is_some_and(|s| well.section == Some(i64::from(s)));

        match self {
            Strategy::LocationName => {
                if !(section_match && same_township_range(well, params) && contains_ci(&name, &params.name)) {
                    return None;
                }
                Some(if operator_match { 100 } else { 90 })
            }
            Strategy::ExactNameStatewide => {
                if !params.exact_names.iter().any(|v| v.eq_ignore_ascii_case(&name)) {
                    return None;
                }
                let same_tr = params.has_township_range()
                    && well.township == params.township
                    && well.range == params.range;
                Some(if operator_match {
                    95
                } else if same_tr {
                    85
                } else {
                    80
                })
            }
            Strategy::TownshipRangeName => {
                let name_match = contains_ci(&name, &params.name) || contains_ci(&name, &params.base_name);
                if !(same_township_range(well, params) && name_match) {
                    return None;
                }
                Some(match (operator_match, section_match) {
                    (true, true) => 90,
                    (true, false) => 85,
                    (false, true) => 80,
                    (false, false) => 70,
                })
            }
            Strategy::SectionLocation => {
                if !(section_match && same_township_range(well, params)) {
                    return None;
                }
                Some(if operator_match { 75 } else { 65 })
            }
            Strategy::NameStatewide => {
                if !contains_ci(&name, &params.name) {
                    return None;
                }
                Some(if operator_match { 60 } else { 50 })
            }
            Strategy::TownshipRangeOnly => same_township_range(well, params).then_some(30),
        }
    }
}

/// Township, range and meridian equal (section not considered)
fn same_township_range(well: &WellRecord, params: &SearchParams) -> bool {
    params.has_township_range()
        && well.township == params.township
        && well.range == params.range
        && well.meridian == params.meridian.code()
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.label(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Meridian;

    fn params() -> SearchParams {
        SearchParams {
            name: "FEIKES A UNIT 3H-30X".to_string(),
            base_name: "FEIKES A UNIT".to_string(),
            exact_names: vec![
                "FEIKES A UNIT 3H-30X".to_string(),
                "FEIKES A UNIT #3H-30X".to_string(),
            ],
            operator: "Acme".to_string(),
            section: Some(12),
            township: Some("04N".to_string()),
            range: Some("03W".to_string()),
            meridian: Meridian::Indian,
            limit: 15,
        }
    }

    fn well(name: &str, number: &str, operator: &str, section: i64) -> WellRecord {
        WellRecord {
            api_number: "3501700001".to_string(),
            well_name: name.to_string(),
            well_number: Some(number.to_string()),
            operator: Some(operator.to_string()),
            section: Some(section),
            township: Some("04N".to_string()),
            range: Some("03W".to_string()),
            meridian: "IM".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_location_name_scores() {
        let p = params();
        assert_eq!(
            Strategy::LocationName.evaluate(&well("FEIKES A UNIT", "3H-30X", "Acme Energy", 12), &p),
            Some(100)
        );
        assert_eq!(
            Strategy::LocationName.evaluate(&well("FEIKES A UNIT", "3H-30X", "Devon", 12), &p),
            Some(90)
        );
        assert_eq!(
            Strategy::LocationName.evaluate(&well("FEIKES A UNIT", "3H-30X", "Acme Energy", 13), &p),
            None
        );
    }

    #[test]
    fn test_exact_name_hash_variant() {
        let mut p = params();
        p.township = Some("10N".to_string());
        assert_eq!(
            Strategy::ExactNameStatewide.evaluate(&well("FEIKES A UNIT", "#3H-30X", "Devon", 1), &p),
            Some(80)
        );
        p.township = Some("04N".to_string());
        assert_eq!(
            Strategy::ExactNameStatewide.evaluate(&well("FEIKES A UNIT", "#3H-30X", "Devon", 1), &p),
            Some(85)
        );
        assert_eq!(
            Strategy::ExactNameStatewide.evaluate(&well("FEIKES A UNIT", "#3H-30X", "ACME", 1), &p),
            Some(95)
        );
    }

    #[test]
    fn test_exact_name_folds_ascii_case_only() {
        let mut p = params();
        p.name = "PÉREZ 1".to_string();
        p.exact_names = vec!["PÉREZ 1".to_string()];
        assert_eq!(
            Strategy::ExactNameStatewide.evaluate(&well("PÉrez", "1", "Devon", 1), &p),
            Some(85)
        );
        assert_eq!(
            Strategy::ExactNameStatewide.evaluate(&well("pérez", "1", "Devon", 1), &p),
            None
        );
    }

    #[test]
    fn test_township_range_name_precedence() {
        let p = params();
        let base_only = well("FEIKES A UNIT", "4H-31X", "Acme Energy", 12);
        assert_eq!(Strategy::TownshipRangeName.evaluate(&base_only, &p), Some(90));

        let other_section = well("FEIKES A UNIT", "4H-31X", "Acme Energy", 11);
        assert_eq!(Strategy::TownshipRangeName.evaluate(&other_section, &p), Some(85));

        let other_operator = well("FEIKES A UNIT", "4H-31X", "Devon", 12);
        assert_eq!(Strategy::TownshipRangeName.evaluate(&other_operator, &p), Some(80));

        let neither = well("FEIKES A UNIT", "4H-31X", "Devon", 11);
        assert_eq!(Strategy::TownshipRangeName.evaluate(&neither, &p), Some(70));
    }

    #[test]
    fn test_location_only_ignores_name() {
        let p = params();
        let w = well("SOMETHING ELSE", "1", "Devon", 12);
        assert_eq!(Strategy::SectionLocation.evaluate(&w, &p), Some(65));
        assert_eq!(Strategy::TownshipRangeOnly.evaluate(&w, &p), Some(30));
    }

    #[test]
    fn test_preconditions() {
        let mut p = params();
        assert!(Strategy::LocationName.applies(&p, 10));
        assert!(Strategy::ExactNameStatewide.applies(&p, 10));
        assert!(!Strategy::ExactNameStatewide.applies(&p, 30));
        assert!(!Strategy::TownshipRangeOnly.applies(&p, 10));

        p.name.clear();
        assert!(!Strategy::LocationName.applies(&p, 10));
        assert!(Strategy::SectionLocation.applies(&p, 10));
        assert!(Strategy::TownshipRangeOnly.applies(&p, 10));

        p.range = None;
        assert!(!Strategy::TownshipRangeOnly.applies(&p, 10));
    }

    #[test]
    fn test_meridian_mismatch_excluded() {
        let mut p = params();
        p.meridian = Meridian::Cimarron;
        let w = well("FEIKES A UNIT", "3H-30X", "Acme Energy", 12);
        assert_eq!(Strategy::LocationName.evaluate(&w, &p), None);
        assert_eq!(Strategy::TownshipRangeOnly.evaluate(&w, &p), None);
    }
}
