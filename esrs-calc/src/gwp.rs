//! Global Warming Potential tables
//!
//! 100-year GWP values from the IPCC Fourth (AR4), Fifth (AR5) and Sixth (AR6)
//! Assessment Reports. CO2 is the reference gas and is 1 in every version.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CalcError, CalcResult};

/// IPCC assessment report whose GWP values are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GwpVersion {
    Ar4,
    Ar5,
    Ar6,
}

impl Default for GwpVersion {
    fn default() -> Self {
        GwpVersion::Ar6
    }
}

impl GwpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            GwpVersion::Ar4 => "AR4",
            GwpVersion::Ar5 => "AR5",
            GwpVersion::Ar6 => "AR6",
        }
    }
}

impl fmt::Display for GwpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GwpVersion {
    type Err = CalcError;

    fn from_str(s: &str) -> CalcResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AR4" => Ok(GwpVersion::Ar4),
            "AR5" => Ok(GwpVersion::Ar5),
            "AR6" => Ok(GwpVersion::Ar6),
            other => Err(CalcError::UnknownValue {
                kind: "GWP version",
                value: other.to_string(),
            }),
        }
    }
}

/// Greenhouse gases covered by the Kyoto basket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gas {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CH4")]
    Ch4,
    #[serde(rename = "N2O")]
    N2o,
    #[serde(rename = "SF6")]
    Sf6,
    #[serde(rename = "NF3")]
    Nf3,
    #[serde(rename = "HFC-23")]
    Hfc23,
    #[serde(rename = "HFC-32")]
    Hfc32,
    #[serde(rename = "HFC-134a")]
    Hfc134a,
    #[serde(rename = "CF4")]
    Cf4,
    #[serde(rename = "C2F6")]
    C2f6,
}

impl Gas {
    pub const ALL: [Gas; 10] = [
        Gas::Co2,
        Gas::Ch4,
        Gas::N2o,
        Gas::Sf6,
        Gas::Nf3,
        Gas::Hfc23,
        Gas::Hfc32,
        Gas::Hfc134a,
        Gas::Cf4,
        Gas::C2f6,
    ];

    pub fn formula(&self) -> &'static str {
        match self {
            Gas::Co2 => "CO2",
            Gas::Ch4 => "CH4",
            Gas::N2o => "N2O",
            Gas::Sf6 => "SF6",
            Gas::Nf3 => "NF3",
            Gas::Hfc23 => "HFC-23",
            Gas::Hfc32 => "HFC-32",
            Gas::Hfc134a => "HFC-134a",
            Gas::Cf4 => "CF4",
            Gas::C2f6 => "C2F6",
        }
    }

    /// 100-year GWP of this gas under the given assessment report
    pub fn gwp(&self, version: GwpVersion) -> f64 {
        gwp_factor(*self, version)
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.formula())
    }
}

impl FromStr for Gas {
    type Err = CalcError;

    fn from_str(s: &str) -> CalcResult<Self> {
        let wanted = s.trim();
        Gas::ALL
            .iter()
            .copied()
            .find(|g| g.formula().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CalcError::UnknownGas(wanted.to_string()))
    }
}

/// Look up the 100-year GWP multiplier
///
/// AR6 CH4 is the single combined figure; the fossil/non-fossil split is not modelled.
pub fn gwp_factor(gas: Gas, version: GwpVersion) -> f64 {
    use Gas::*;
    use GwpVersion::*;

    match (gas, version) {
        (Co2, _) => 1.0,

        (Ch4, Ar4) => 25.0,
        (Ch4, Ar5) => 28.0,
        (Ch4, Ar6) => 27.9,

        (N2o, Ar4) => 298.0,
        (N2o, Ar5) => 265.0,
        (N2o, Ar6) => 273.0,

        (Sf6, Ar4) => 22_800.0,
        (Sf6, Ar5) => 23_500.0,
        (Sf6, Ar6) => 25_200.0,

        (Nf3, Ar4) => 17_200.0,
        (Nf3, Ar5) => 16_100.0,
        (Nf3, Ar6) => 17_400.0,

        (Hfc23, Ar4) => 14_800.0,
        (Hfc23, Ar5) => 12_400.0,
        (Hfc23, Ar6) => 14_600.0,

        (Hfc32, Ar4) => 675.0,
        (Hfc32, Ar5) => 677.0,
        (Hfc32, Ar6) => 771.0,

        (Hfc134a, Ar4) => 1_430.0,
        (Hfc134a, Ar5) => 1_300.0,
        (Hfc134a, Ar6) => 1_530.0,

        (Cf4, Ar4) => 7_390.0,
        (Cf4, Ar5) => 6_630.0,
        (Cf4, Ar6) => 7_380.0,

        (C2f6, Ar4) => 12_200.0,
        (C2f6, Ar5) => 11_100.0,
        (C2f6, Ar6) => 12_400.0,
    }
}

/// Mass of a single gas reported for an activity, in metric tonnes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasAmount {
    pub gas: Gas,
    pub amount_tonnes: f64,
}

impl GasAmount {
    pub fn new(gas: Gas, amount_tonnes: f64) -> Self {
        Self { gas, amount_tonnes }
    }

    /// CO2-equivalent of this amount in tonnes
    pub fn co2e(&self, version: GwpVersion) -> CalcResult<f64> {
        if !self.amount_tonnes.is_finite() || self.amount_tonnes < 0.0 {
            return Err(CalcError::InvalidGasAmount {
                gas: self.gas.to_string(),
                amount: self.amount_tonnes,
            });
        }
        Ok(self.amount_tonnes * self.gas.gwp(version))
    }
}
