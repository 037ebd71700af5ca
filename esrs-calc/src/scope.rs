//! GHG Protocol scope classification

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CalcError, CalcResult};

/// Scope 2 accounting method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope2Method {
    LocationBased,
    MarketBased,
}

impl Scope2Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope2Method::LocationBased => "LOCATION_BASED",
            Scope2Method::MarketBased => "MARKET_BASED",
        }
    }
}

/// Scope 3 value-chain category (1-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Scope3Category(u8);

impl Scope3Category {
    pub fn new(number: u8) -> CalcResult<Self> {
        if (1..=15).contains(&number) {
            Ok(Self(number))
        } else {
            Err(CalcError::InvalidScope3Category(number))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// All fifteen categories in order
    pub fn all() -> impl Iterator<Item = Scope3Category> {
        (1..=15).map(Scope3Category)
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "Purchased goods and services",
            2 => "Capital goods",
            3 => "Fuel- and energy-related activities",
            4 => "Upstream transportation and distribution",
            5 => "Waste generated in operations",
            6 => "Business travel",
            7 => "Employee commuting",
            8 => "Upstream leased assets",
            9 => "Downstream transportation and distribution",
            10 => "Processing of sold products",
            11 => "Use of sold products",
            12 => "End-of-life treatment of sold products",
            13 => "Downstream leased assets",
            14 => "Franchises",
            _ => "Investments",
        }
    }
}

impl TryFrom<u8> for Scope3Category {
    type Error = CalcError;

    fn try_from(value: u8) -> CalcResult<Self> {
        Scope3Category::new(value)
    }
}

impl From<Scope3Category> for u8 {
    fn from(category: Scope3Category) -> u8 {
        category.0
    }
}

impl fmt::Display for Scope3Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category {}", self.0)
    }
}

/// Emission scope of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Direct emissions from owned or controlled sources
    #[serde(rename = "SCOPE_1")]
    Scope1,
    /// Indirect emissions from purchased energy
    #[serde(rename = "SCOPE_2")]
    Scope2 { method: Scope2Method },
    /// Other indirect emissions in the value chain
    #[serde(rename = "SCOPE_3")]
    Scope3 { category: Scope3Category },
}

impl Scope {
    /// Column value stored in the `scope` column
    pub fn code(&self) -> &'static str {
        match self {
            Scope::Scope1 => "SCOPE_1",
            Scope::Scope2 { .. } => "SCOPE_2",
            Scope::Scope3 { .. } => "SCOPE_3",
        }
    }

    /// Rebuild a scope from its stored columns
    pub fn from_parts(
        code: &str,
        scope2_method: Option<&str>,
        scope3_category: Option<i64>,
    ) -> CalcResult<Self> {
        match code {
            "SCOPE_1" => Ok(Scope::Scope1),
            "SCOPE_2" => {
                let method = match scope2_method {
                    Some("LOCATION_BASED") => Scope2Method::LocationBased,
                    Some("MARKET_BASED") => Scope2Method::MarketBased,
                    other => {
                        return Err(CalcError::UnknownValue {
                            kind: "Scope 2 method",
                            value: other.unwrap_or_default().to_string(),
                        })
                    }
                };
                Ok(Scope::Scope2 { method })
            }
            "SCOPE_3" => {
                let number = scope3_category.unwrap_or(0);
                let number = u8::try_from(number)
                    .map_err(|_| CalcError::InvalidScope3Category(0))?;
                Ok(Scope::Scope3 {
                    category: Scope3Category::new(number)?,
                })
            }
            other => Err(CalcError::UnknownValue {
                kind: "scope",
                value: other.to_string(),
            }),
        }
    }

    pub fn scope2_method(&self) -> Option<Scope2Method> {
        match self {
            Scope::Scope2 { method } => Some(*method),
            _ => None,
        }
    }

    pub fn scope3_category(&self) -> Option<Scope3Category> {
        match self {
            Scope::Scope3 { category } => Some(*category),
            _ => None,
        }
    }
}
