//! Scope 3 materiality assessment
//!
//! A category is material when any of these holds:
//! 1. its share of total emissions reaches the sector threshold,
//! 2. it is on the sector's mandatory list,
//! 3. it exceeds the absolute threshold (strictly greater).
//!
//! The thresholds are policy, not regulation. They are loaded from
//! configuration and the defaults below are only a starting point.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;
use crate::scope::Scope3Category;

/// Reporting entity's sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Manufacturing,
    Energy,
    Transport,
    Retail,
    Technology,
    Services,
    Finance,
    Other,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Manufacturing => "manufacturing",
            Sector::Energy => "energy",
            Sector::Transport => "transport",
            Sector::Retail => "retail",
            Sector::Technology => "technology",
            Sector::Services => "services",
            Sector::Finance => "finance",
            Sector::Other => "other",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_lowercase()))
            .map_err(|_| CalcError::UnknownValue {
                kind: "sector",
                value: s.to_string(),
            })
    }
}

/// Materiality policy, configurable per deployment
///
/// When deserialized, entries given are laid over [`MaterialityPolicy::default`]
/// key by key; sectors not mentioned keep their default threshold and list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolicyOverlay")]
pub struct MaterialityPolicy {
    /// Share of total emissions (0.0-1.0) at which a category becomes material
    pub sector_thresholds: BTreeMap<Sector, f64>,
    /// Threshold for sectors missing from `sector_thresholds`
    pub default_threshold: f64,
    /// Categories always material for a sector
    pub mandatory_categories: BTreeMap<Sector, Vec<u8>>,
    /// tCO2e above which any category is material
    pub absolute_threshold_tco2e: f64,
}

impl Default for MaterialityPolicy {
    fn default() -> Self {
        let sector_thresholds = BTreeMap::from([
            (Sector::Manufacturing, 0.05),
            (Sector::Energy, 0.05),
            (Sector::Transport, 0.05),
            (Sector::Retail, 0.10),
            (Sector::Technology, 0.10),
            (Sector::Services, 0.10),
            (Sector::Finance, 0.15),
            (Sector::Other, 0.10),
        ]);
        let mandatory_categories = BTreeMap::from([
            (Sector::Manufacturing, vec![1]),
            (Sector::Energy, vec![3, 11]),
            (Sector::Retail, vec![1, 11]),
            (Sector::Finance, vec![15]),
            (Sector::Transport, vec![4, 9]),
        ]);
        Self {
            sector_thresholds,
            default_threshold: 0.10,
            mandatory_categories,
            absolute_threshold_tco2e: 1_000.0,
        }
    }
}

/// Partial policy as written in a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PolicyOverlay {
    sector_thresholds: BTreeMap<Sector, f64>,
    default_threshold: Option<f64>,
    mandatory_categories: BTreeMap<Sector, Vec<u8>>,
    absolute_threshold_tco2e: Option<f64>,
}

impl From<PolicyOverlay> for MaterialityPolicy {
    fn from(overlay: PolicyOverlay) -> Self {
        let mut policy = MaterialityPolicy::default();
        policy.sector_thresholds.extend(overlay.sector_thresholds);
        policy.mandatory_categories.extend(overlay.mandatory_categories);
        if let Some(threshold) = overlay.default_threshold {
            policy.default_threshold = threshold;
        }
        if let Some(absolute) = overlay.absolute_threshold_tco2e {
            policy.absolute_threshold_tco2e = absolute;
        }
        policy
    }
}

/// Why a category was judged material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialityReason {
    ShareThreshold,
    MandatoryForSector,
    AbsoluteThreshold,
}

/// Outcome for one Scope 3 category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssessment {
    pub category: Scope3Category,
    pub emissions_tco2e: f64,
    /// Share of total emissions (0.0-1.0)
    pub share: f64,
    pub threshold: f64,
    pub material: bool,
    pub reasons: Vec<MaterialityReason>,
}

impl MaterialityPolicy {
    pub fn threshold_for(&self, sector: Sector) -> f64 {
        self.sector_thresholds
            .get(&sector)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn is_mandatory(&self, sector: Sector, category: Scope3Category) -> bool {
        self.mandatory_categories
            .get(&sector)
            .map(|list| list.contains(&category.number()))
            .unwrap_or(false)
    }

    /// Assess a single category against the total inventory
    pub fn assess(
        &self,
        sector: Sector,
        category: Scope3Category,
        category_emissions: f64,
        total_emissions: f64,
    ) -> CategoryAssessment {
        let share = if total_emissions > 0.0 {
            category_emissions / total_emissions
        } else {
            0.0
        };
        let threshold = self.threshold_for(sector);

        let mut reasons = Vec::new();
        if total_emissions > 0.0 && share >= threshold {
            reasons.push(MaterialityReason::ShareThreshold);
        }
        if self.is_mandatory(sector, category) {
            reasons.push(MaterialityReason::MandatoryForSector);
        }
        if category_emissions > self.absolute_threshold_tco2e {
            reasons.push(MaterialityReason::AbsoluteThreshold);
        }

        CategoryAssessment {
            category,
            emissions_tco2e: category_emissions,
            share,
            threshold,
            material: !reasons.is_empty(),
            reasons,
        }
    }

    /// Assess all fifteen categories
    ///
    /// Categories without data are assessed with zero emissions, so only
    /// mandatory membership can make them material.
    pub fn assess_all(
        &self,
        sector: Sector,
        by_category: &BTreeMap<Scope3Category, f64>,
        total_emissions: f64,
    ) -> Vec<CategoryAssessment> {
        Scope3Category::all()
            .map(|category| {
                let emissions = by_category.get(&category).copied().unwrap_or(0.0);
                self.assess(sector, category, emissions, total_emissions)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(n: u8) -> Scope3Category {
        Scope3Category::new(n).unwrap()
    }

    #[test]
    fn test_above_share_threshold_is_material() {
        let policy = MaterialityPolicy::default();
        let a = policy.assess(Sector::Technology, cat(6), 120.0, 1_000.0);
        assert!(a.material);
        assert_eq!(a.reasons, vec![MaterialityReason::ShareThreshold]);
    }

    #[test]
    fn test_below_threshold_not_mandatory_small_is_not_material() {
        let policy = MaterialityPolicy::default();
        let a = policy.assess(Sector::Technology, cat(6), 50.0, 1_000.0);
        assert!(!a.material);
        assert!(a.reasons.is_empty());
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let policy = MaterialityPolicy::default();
        let a = policy.assess(Sector::Finance, cat(6), 15.0, 100.0);
        assert!(a.material);
    }

    #[test]
    fn test_mandatory_category() {
        let policy = MaterialityPolicy::default();
        let a = policy.assess(Sector::Finance, cat(15), 0.0, 10_000.0);
        assert!(a.material);
        assert_eq!(a.reasons, vec![MaterialityReason::MandatoryForSector]);
    }

    #[test]
    fn test_absolute_cutover_is_strict() {
        let policy = MaterialityPolicy::default();
        let at = policy.assess(Sector::Finance, cat(2), 1_000.0, 1_000_000.0);
        assert!(!at.material);
        let above = policy.assess(Sector::Finance, cat(2), 1_000.5, 1_000_000.0);
        assert_eq!(above.reasons, vec![MaterialityReason::AbsoluteThreshold]);
    }

    #[test]
    fn test_zero_total_never_triggers_share() {
        let policy = MaterialityPolicy::default();
        let a = policy.assess(Sector::Services, cat(7), 0.0, 0.0);
        assert_eq!(a.share, 0.0);
        assert!(!a.material);
    }

    #[test]
    fn test_assess_all_covers_every_category() {
        let policy = MaterialityPolicy::default();
        let data = BTreeMap::from([(cat(1), 600.0), (cat(4), 10.0)]);
        let result = policy.assess_all(Sector::Manufacturing, &data, 1_000.0);
        assert_eq!(result.len(), 15);
        assert!(result[0].material);
        assert!(!result[3].material);
    }

    #[test]
    fn test_partial_policy_fills_defaults() {
        let policy: MaterialityPolicy = serde_json::from_str(
            r#"{"absolute_threshold_tco2e": 500.0, "sector_thresholds": {"finance": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(policy.absolute_threshold_tco2e, 500.0);
        assert_eq!(policy.threshold_for(Sector::Finance), 0.2);
        assert_eq!(policy.threshold_for(Sector::Retail), 0.10);
    }

    #[test]
    fn test_partial_policy_keeps_other_sectors() {
        let policy: MaterialityPolicy = serde_json::from_str(
            r#"{"sector_thresholds": {"finance": 0.2}, "mandatory_categories": {"services": [6]}}"#,
        )
        .unwrap();
        assert_eq!(policy.threshold_for(Sector::Finance), 0.2);
        assert_eq!(policy.threshold_for(Sector::Manufacturing), 0.05);
        assert_eq!(policy.threshold_for(Sector::Transport), 0.05);
        assert!(policy.is_mandatory(Sector::Services, cat(6)));
        assert!(policy.is_mandatory(Sector::Finance, cat(15)));
        assert!(policy.is_mandatory(Sector::Energy, cat(11)));

        // 7 % share is material for manufacturing at its 5 % threshold
        let a = policy.assess(Sector::Manufacturing, cat(6), 7.0, 100.0);
        assert!(a.material);
    }

    #[test]
    fn test_unknown_policy_key_rejected() {
        assert!(serde_json::from_str::<MaterialityPolicy>(r#"{"thresholds": {}}"#).is_err());
    }

    #[test]
    fn test_sector_parse() {
        assert_eq!("Finance".parse::<Sector>().unwrap(), Sector::Finance);
        assert!("mining".parse::<Sector>().is_err());
    }
}
