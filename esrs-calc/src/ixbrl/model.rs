//! Fact, context and unit model
//!
//! Facts carry *keys* describing the context and unit they need. Ids are only
//! assigned once the whole fact set is known (see [`super::document`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::taxonomy::{MEASURE_PURE, MEASURE_TCO2E};

/// Reporting period (duration, inclusive end date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Dimension/member pair placed in a context's scenario
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExplicitMember {
    pub dimension: String,
    pub member: String,
}

/// Everything that distinguishes one context from another
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
    pub period: Period,
    /// Sorted by dimension so equal scenarios compare equal
    pub members: Vec<ExplicitMember>,
}

impl ContextKey {
    pub fn plain(period: Period) -> Self {
        Self {
            period,
            members: Vec::new(),
        }
    }

    pub fn with_member(period: Period, dimension: &str, member: String) -> Self {
        let mut key = Self::plain(period);
        key.members.push(ExplicitMember {
            dimension: dimension.to_string(),
            member,
        });
        key.members.sort();
        key
    }
}

/// Unit of a numeric fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitKey {
    Measure(String),
    Divide { numerator: String, denominator: String },
}

impl UnitKey {
    pub fn pure() -> Self {
        UnitKey::Measure(MEASURE_PURE.to_string())
    }

    pub fn tco2e() -> Self {
        UnitKey::Measure(MEASURE_TCO2E.to_string())
    }

    /// tCO2e per unit of the given ISO 4217 currency
    pub fn tco2e_per_currency(currency: &str) -> Self {
        UnitKey::Divide {
            numerator: MEASURE_TCO2E.to_string(),
            denominator: format!("iso4217:{}", currency),
        }
    }

    /// Stable id derived from the measures, e.g. `u-tCO2e-per-EUR`
    pub fn id(&self) -> String {
        fn local(measure: &str) -> &str {
            measure.rsplit(':').next().unwrap_or(measure)
        }
        match self {
            UnitKey::Measure(m) => format!("u-{}", local(m)),
            UnitKey::Divide {
                numerator,
                denominator,
            } => format!("u-{}-per-{}", local(numerator), local(denominator)),
        }
    }
}

/// Value carried by a fact
#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Numeric {
        value: f64,
        unit: UnitKey,
        decimals: u8,
        /// Power of ten applied to the displayed number (`scale` attribute)
        scale: i8,
    },
    Text(String),
}

/// One tagged disclosure item
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub concept: String,
    /// Human-readable row label
    pub label: String,
    pub context: ContextKey,
    pub value: FactValue,
}

impl Fact {
    pub fn numeric(
        concept: &str,
        label: impl Into<String>,
        context: ContextKey,
        value: f64,
        unit: UnitKey,
        decimals: u8,
    ) -> Self {
        Self {
            concept: concept.to_string(),
            label: label.into(),
            context,
            value: FactValue::Numeric {
                value,
                unit,
                decimals,
                scale: 0,
            },
        }
    }

    pub fn text(
        concept: &str,
        label: impl Into<String>,
        context: ContextKey,
        text: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.to_string(),
            label: label.into(),
            context,
            value: FactValue::Text(text.into()),
        }
    }

    pub fn with_scale(mut self, new_scale: i8) -> Self {
        if let FactValue::Numeric { ref mut scale, .. } = self.value {
            *scale = new_scale;
        }
        self
    }

    pub fn unit(&self) -> Option<&UnitKey> {
        match &self.value {
            FactValue::Numeric { unit, .. } => Some(unit),
            FactValue::Text(_) => None,
        }
    }
}

/// Format a numeric fact's displayed value
///
/// The displayed number is `value / 10^scale`, rounded to `decimals` places,
/// without thousands separators and without a sign (sign goes in an
/// attribute). Negative zero prints as zero.
pub fn display_number(value: f64, decimals: u8, scale: i8) -> String {
    let shown = value.abs() / 10f64.powi(i32::from(scale));
    let text = format!("{:.*}", usize::from(decimals), shown);
    if text.starts_with('-') {
        text[1..].to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ids() {
        assert_eq!(UnitKey::pure().id(), "u-pure");
        assert_eq!(UnitKey::tco2e().id(), "u-tCO2e");
        assert_eq!(UnitKey::tco2e_per_currency("EUR").id(), "u-tCO2e-per-EUR");
    }

    #[test]
    fn test_display_number() {
        assert_eq!(display_number(1234.5678, 2, 0), "1234.57");
        assert_eq!(display_number(-0.0, 1, 0), "0.0");
        assert_eq!(display_number(-12.0, 0, 0), "12");
        // 0.000125 tCO2e/EUR shown per million EUR
        assert_eq!(display_number(0.000125, 1, -6), "125.0");
    }

    #[test]
    fn test_context_members_sorted() {
        let period = Period {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        let a = ContextKey::with_member(period, "esrs:B", "esrs:X".into());
        let b = ContextKey::with_member(period, "esrs:B", "esrs:X".into());
        assert_eq!(a, b);
        assert_ne!(a, ContextKey::plain(period));
    }
}
