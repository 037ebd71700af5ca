//! Data quality scoring
//!
//! Each emissions record may carry an assessment; assessments are rolled up
//! into a reporting-level score weighted by emissions.

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};

const TIER_WEIGHT: f64 = 40.0;
const REPRESENTATIVENESS_WEIGHT: f64 = 30.0;
const COMPLETENESS_WEIGHT: f64 = 20.0;
const UNCERTAINTY_WEIGHT: f64 = 10.0;

/// Data quality assessment of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// 1 (estimated/default factors) to 3 (measured/primary data)
    pub tier: u8,
    /// Representativeness scores, 1 (poor) to 5 (excellent)
    pub temporal: u8,
    pub geographical: u8,
    pub technological: u8,
    /// Share of the activity covered by data (0.0-1.0)
    pub completeness: f64,
    /// Relative uncertainty in percent
    pub uncertainty_percent: f64,
}

impl DataQuality {
    pub fn validate(&self) -> CalcResult<()> {
        if !(1..=3).contains(&self.tier) {
            return Err(CalcError::InvalidDataQuality(format!(
                "tier must be 1-3, got {}",
                self.tier
            )));
        }
        for (name, value) in [
            ("temporal", self.temporal),
            ("geographical", self.geographical),
            ("technological", self.technological),
        ] {
            if !(1..=5).contains(&value) {
                return Err(CalcError::InvalidDataQuality(format!(
                    "{} score must be 1-5, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.completeness) {
            return Err(CalcError::InvalidDataQuality(format!(
                "completeness must be 0-1, got {}",
                self.completeness
            )));
        }
        if !self.uncertainty_percent.is_finite() || self.uncertainty_percent < 0.0 {
            return Err(CalcError::InvalidUncertainty(self.uncertainty_percent));
        }
        Ok(())
    }

    /// Score 0-100, higher is better
    pub fn score(&self) -> CalcResult<f64> {
        self.validate()?;
        let representativeness =
            f64::from(self.temporal + self.geographical + self.technological) / 3.0;
        let uncertainty = self.uncertainty_percent.min(100.0);

        Ok(TIER_WEIGHT * f64::from(self.tier) / 3.0
            + REPRESENTATIVENESS_WEIGHT * representativeness / 5.0
            + COMPLETENESS_WEIGHT * self.completeness
            + UNCERTAINTY_WEIGHT * (1.0 - uncertainty / 100.0))
    }
}

/// Reporting-level quality summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct QualitySummary {
    /// Emissions-weighted mean score (0-100) over assessed records
    pub score: f64,
    /// Share of total emissions backed by an assessment (0.0-1.0)
    pub coverage: f64,
}

/// Roll record scores up to the reporting level
///
/// Each item is `(emissions_tco2e, optional record score)`. Unassessed
/// records lower coverage but do not drag the score itself.
pub fn reporting_score(records: &[(f64, Option<f64>)]) -> QualitySummary {
    let total: f64 = records.iter().map(|(e, _)| e).sum();
    let assessed: f64 = records
        .iter()
        .filter(|(_, s)| s.is_some())
        .map(|(e, _)| e)
        .sum();
    let weighted: f64 = records
        .iter()
        .filter_map(|(e, s)| s.map(|s| e * s))
        .sum();

    if assessed <= 0.0 {
        // No emissions behind any assessment; fall back to an unweighted mean
        let scores: Vec<f64> = records.iter().filter_map(|(_, s)| *s).collect();
        let score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        return QualitySummary { score, coverage: 0.0 };
    }

    QualitySummary {
        score: weighted / assessed,
        coverage: if total > 0.0 { assessed / total } else { 0.0 },
    }
}
