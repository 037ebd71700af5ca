//! Emission calculation
//!
//! Converts activity data into tonnes of CO2-equivalent, either by applying an
//! emission factor (`activity × factor`) or, when individual gas masses are
//! reported, by weighting each gas with its GWP.

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::gwp::{GasAmount, GwpVersion};

/// Core product of activity value and factor
///
/// Both inputs must be finite and non-negative. Nothing is clamped: an invalid
/// input is an error, a valid one produces exactly `activity_value * factor`.
pub fn calculate_emissions(activity_value: f64, factor: f64) -> CalcResult<f64> {
    if !activity_value.is_finite() || activity_value < 0.0 {
        return Err(CalcError::InvalidActivityValue(activity_value));
    }
    if !factor.is_finite() || factor < 0.0 {
        return Err(CalcError::InvalidFactor(factor));
    }
    Ok(activity_value * factor)
}

/// Mass unit in the numerator of an emission factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassUnit {
    Grams,
    Kilograms,
    Tonnes,
}

impl MassUnit {
    /// Divisor that converts this unit to metric tonnes
    fn per_tonne(&self) -> f64 {
        match self {
            MassUnit::Grams => 1_000_000.0,
            MassUnit::Kilograms => 1_000.0,
            MassUnit::Tonnes => 1.0,
        }
    }
}

/// Parsed emission factor unit, e.g. `kgCO2e/kWh`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorUnit {
    pub mass: MassUnit,
    /// Activity unit the factor applies to (denominator)
    pub per: String,
}

impl FactorUnit {
    /// Parse `<mass>/<activity unit>`
    ///
    /// Recognised masses: `gCO2e`, `kgCO2e`, `tCO2e`, `kgCO2`, `tCO2`.
    pub fn parse(unit: &str) -> CalcResult<Self> {
        let (mass, per) = unit
            .split_once('/')
            .ok_or_else(|| CalcError::UnrecognizedUnit(unit.to_string()))?;

        let mass = match mass.trim() {
            "gCO2e" => MassUnit::Grams,
            "kgCO2e" | "kgCO2" => MassUnit::Kilograms,
            "tCO2e" | "tCO2" => MassUnit::Tonnes,
            _ => return Err(CalcError::UnrecognizedUnit(unit.to_string())),
        };

        let per = per.trim();
        if per.is_empty() || per.contains('/') {
            return Err(CalcError::UnrecognizedUnit(unit.to_string()));
        }

        Ok(Self {
            mass,
            per: per.to_string(),
        })
    }

    /// Case-insensitive comparison against an activity unit
    pub fn accepts(&self, activity_unit: &str) -> bool {
        self.per.eq_ignore_ascii_case(activity_unit.trim())
    }
}

/// Emission factor as stored in the factor library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub value: f64,
    pub unit: String,
    pub source: String,
    /// 1 (default/estimated) to 3 (measured/supplier-specific)
    pub data_quality_tier: u8,
}

impl EmissionFactor {
    /// Emissions in tCO2e for the given activity
    pub fn apply(&self, activity_value: f64, activity_unit: &str) -> CalcResult<f64> {
        let unit = FactorUnit::parse(&self.unit)?;
        if !unit.accepts(activity_unit) {
            return Err(CalcError::UnitMismatch {
                activity: activity_unit.to_string(),
                factor: unit.per,
            });
        }
        let in_factor_mass = calculate_emissions(activity_value, self.value)?;
        Ok(in_factor_mass / unit.mass.per_tonne())
    }
}

/// Σ amount × GWP over the reported gases
pub fn gas_weighted_total(gases: &[GasAmount], version: GwpVersion) -> CalcResult<f64> {
    gases
        .iter()
        .try_fold(0.0, |acc, gas| Ok(acc + gas.co2e(version)?))
}

/// Activity record ready for calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInput {
    pub activity_value: f64,
    pub activity_unit: String,
    pub factor: EmissionFactor,
    #[serde(default)]
    pub gases: Vec<GasAmount>,
    #[serde(default)]
    pub gwp_version: GwpVersion,
}

/// Total tCO2e of a record
///
/// Reported gases take precedence: their GWP-weighted sum is the total. The
/// factor is still validated against the activity so a mismatched record is
/// rejected regardless of which path produced the number.
pub fn record_total(input: &ActivityInput) -> CalcResult<f64> {
    let factor_based = input.factor.apply(input.activity_value, &input.activity_unit)?;
    if input.gases.is_empty() {
        Ok(factor_based)
    } else {
        gas_weighted_total(&input.gases, input.gwp_version)
    }
}
