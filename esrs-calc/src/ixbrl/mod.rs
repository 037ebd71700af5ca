//! Inline XBRL disclosure export
//!
//! [`export_disclosure`] turns calculated emissions plus entity details into a
//! single XHTML document with embedded iXBRL facts. The document is parsed
//! back and structurally checked before it is returned; on any failure the
//! caller gets an error and no document.

pub mod document;
pub mod model;
mod render;
pub mod taxonomy;
pub mod validate;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::inventory::CalculatedEmissions;
use document::FactSet;
use model::{ContextKey, Fact, Period, UnitKey};
use render::RenderOptions;
use taxonomy::{concept, dimension};
pub use validate::{check_document, DocumentCheck};

/// Export failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    /// Entity details or figures unfit for a filing
    #[error("Invalid disclosure input: {0}")]
    InvalidInput(String),

    /// XML writer or parser failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Internal inconsistency while assembling the document
    #[error("Document structure error: {0}")]
    Structure(String),

    /// The rendered document failed its structural check
    #[error("Document failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Everything needed to produce one disclosure document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisclosureInput {
    pub entity_name: String,
    /// Legal Entity Identifier (20 uppercase alphanumerics)
    pub lei: String,
    pub period: Period,
    /// ISO 4217 code used for the intensity denominator
    pub currency: String,
    pub emissions: CalculatedEmissions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Taxonomy entry point written to `link:schemaRef`
    pub entry_point: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            entry_point: taxonomy::DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

/// A validated document with its content hash
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    pub content: String,
    pub sha256: String,
    pub check: DocumentCheck,
}

/// Hex SHA-256 of document content
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn export_disclosure(
    input: &DisclosureInput,
    options: &ExportOptions,
) -> Result<ExportedDocument, ExportError> {
    validate_input(input)?;

    let facts = collect_facts(input);
    let expected_facts = facts.fact_count();
    let resolved = facts.resolve()?;

    let title = format!(
        "{} ESRS E1 climate disclosure {} to {}",
        input.entity_name.trim(),
        input.period.start,
        input.period.end
    );
    let content = render::render(
        &resolved,
        &RenderOptions {
            title: &title,
            lei: &input.lei,
            entry_point: &options.entry_point,
        },
    )?;

    let check = check_document(&content)?;
    if check.fact_count != expected_facts {
        return Err(ExportError::Structure(format!(
            "rendered {} facts, expected {}",
            check.fact_count, expected_facts
        )));
    }

    debug!(
        facts = expected_facts,
        contexts = resolved.contexts.len(),
        units = resolved.units.len(),
        "Disclosure document exported"
    );

    Ok(ExportedDocument {
        sha256: content_hash(&content),
        content,
        check,
    })
}

fn is_lei(value: &str) -> bool {
    value.len() == 20
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

fn validate_input(input: &DisclosureInput) -> Result<(), ExportError> {
    if input.entity_name.trim().is_empty() {
        return Err(ExportError::InvalidInput("entity name is empty".to_string()));
    }
    if !is_lei(&input.lei) {
        return Err(ExportError::InvalidInput(format!(
            "'{}' is not a 20-character LEI",
            input.lei
        )));
    }
    if input.period.end < input.period.start {
        return Err(ExportError::InvalidInput(format!(
            "period ends ({}) before it starts ({})",
            input.period.end, input.period.start
        )));
    }
    if input.currency.len() != 3 || !input.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ExportError::InvalidInput(format!(
            "'{}' is not an ISO 4217 currency code",
            input.currency
        )));
    }

    let e = &input.emissions;
    let mut figures = vec![
        ("scope 1", e.scope1_tco2e),
        ("scope 2 location-based", e.scope2_location_tco2e),
        ("scope 2 market-based", e.scope2_market_tco2e),
        ("scope 3", e.scope3_tco2e),
        ("total location-based", e.total_location_based_tco2e),
        ("total market-based", e.total_market_based_tco2e),
        ("data quality score", e.quality.score),
        ("data quality coverage", e.quality.coverage),
    ];
    figures.extend(e.scope3_by_category.iter().map(|c| ("scope 3 category", c.emissions_tco2e)));
    if let Some(v) = e.intensity_location_per_million {
        figures.push(("location-based intensity", v));
    }
    if let Some(v) = e.intensity_market_per_million {
        figures.push(("market-based intensity", v));
    }
    if let Some((name, value)) = figures.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ExportError::InvalidInput(format!(
            "{} is not a finite number ({})",
            name, value
        )));
    }

    Ok(())
}

/// Canonical fact ordering; context and unit ids follow from it
fn collect_facts(input: &DisclosureInput) -> FactSet {
    let e = &input.emissions;
    let period = input.period;
    let plain = || ContextKey::plain(period);
    let tonnes = |concept: &str, label: &str, value: f64| {
        Fact::numeric(concept, label, plain(), value, UnitKey::tco2e(), 2)
    };
    let scope2 = |concept: &str, label: &str, member: &str, value: f64| {
        let context =
            ContextKey::with_member(period, dimension::SCOPE2_METHOD_AXIS, member.to_string());
        Fact::numeric(concept, label, context, value, UnitKey::tco2e(), 2)
    };

    let mut set = FactSet::new();

    set.section(
        "General information",
        vec![
            Fact::text(
                concept::NAME_OF_UNDERTAKING,
                "Name of reporting undertaking",
                plain(),
                input.entity_name.trim(),
            ),
            Fact::text(
                concept::REPORTING_PERIOD,
                "Reporting period",
                plain(),
                format!("{} to {}", period.start, period.end),
            ),
            Fact::text(
                concept::GWP_VALUES_USED,
                "Global warming potential values",
                plain(),
                format!("IPCC {} 100-year GWP values", e.gwp_version),
            ),
        ],
    );

    set.section(
        "E1-6 Gross Scopes 1, 2, 3 and total GHG emissions",
        vec![
            tonnes(concept::GROSS_SCOPE1, "Gross Scope 1 GHG emissions (tCO2e)", e.scope1_tco2e),
            scope2(
                concept::GROSS_SCOPE2_LOCATION,
                "Gross location-based Scope 2 GHG emissions (tCO2e)",
                dimension::LOCATION_BASED_MEMBER,
                e.scope2_location_tco2e,
            ),
            scope2(
                concept::GROSS_SCOPE2_MARKET,
                "Gross market-based Scope 2 GHG emissions (tCO2e)",
                dimension::MARKET_BASED_MEMBER,
                e.scope2_market_tco2e,
            ),
            tonnes(concept::GROSS_SCOPE3, "Gross Scope 3 GHG emissions (tCO2e)", e.scope3_tco2e),
            tonnes(
                concept::TOTAL_LOCATION,
                "Total GHG emissions, location-based (tCO2e)",
                e.total_location_based_tco2e,
            ),
            tonnes(
                concept::TOTAL_MARKET,
                "Total GHG emissions, market-based (tCO2e)",
                e.total_market_based_tco2e,
            ),
        ],
    );

    set.section(
        "Scope 3 GHG emissions by category",
        e.scope3_by_category
            .iter()
            .map(|c| {
                Fact::numeric(
                    concept::GROSS_SCOPE3,
                    format!("Category {}: {} (tCO2e)", c.category.number(), c.category.name()),
                    ContextKey::with_member(
                        period,
                        dimension::SCOPE3_CATEGORY_AXIS,
                        dimension::scope3_category_member(c.category.number()),
                    ),
                    c.emissions_tco2e,
                    UnitKey::tco2e(),
                    2,
                )
            })
            .collect(),
    );

    let material: Vec<String> = e
        .material_categories()
        .map(|a| format!("{} {}", a.category.number(), a.category.name()))
        .collect();
    set.section(
        "Significant Scope 3 categories",
        vec![Fact::text(
            concept::MATERIAL_SCOPE3_CATEGORIES,
            "Material Scope 3 categories",
            plain(),
            if material.is_empty() {
                "None".to_string()
            } else {
                material.join("; ")
            },
        )],
    );

    // Stored per million currency units, tagged per single unit with scale -6
    let intensity = |concept: &str, label: &str, per_million: f64| {
        Fact::numeric(
            concept,
            label,
            plain(),
            per_million / 1_000_000.0,
            UnitKey::tco2e_per_currency(&input.currency),
            2,
        )
        .with_scale(-6)
    };
    let mut intensity_facts = Vec::new();
    if let Some(v) = e.intensity_location_per_million {
        intensity_facts.push(intensity(
            concept::INTENSITY_LOCATION,
            &format!("GHG intensity, location-based (tCO2e per million {})", input.currency),
            v,
        ));
    }
    if let Some(v) = e.intensity_market_per_million {
        intensity_facts.push(intensity(
            concept::INTENSITY_MARKET,
            &format!("GHG intensity, market-based (tCO2e per million {})", input.currency),
            v,
        ));
    }
    set.section("GHG intensity per net revenue", intensity_facts);

    set.section(
        "Data quality",
        vec![
            Fact::numeric(
                concept::DATA_QUALITY_SCORE,
                "Data quality score (ratio)",
                plain(),
                e.quality.score / 100.0,
                UnitKey::pure(),
                4,
            ),
            Fact::numeric(
                concept::DATA_QUALITY_COVERAGE,
                "Share of emissions with a data quality assessment",
                plain(),
                e.quality.coverage,
                UnitKey::pure(),
                4,
            ),
        ],
    );

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gwp::GwpVersion;
    use crate::inventory::InventoryEntry;
    use crate::materiality::{MaterialityPolicy, Sector};
    use crate::scope::{Scope, Scope2Method, Scope3Category};
    use chrono::NaiveDate;

    fn input(revenue: Option<f64>) -> DisclosureInput {
        let entries = vec![
            InventoryEntry {
                scope: Scope::Scope1,
                total_emissions_tco2e: 120.5,
                uncertainty_percent: Some(5.0),
                quality_score: Some(80.0),
            },
            InventoryEntry {
                scope: Scope::Scope2 {
                    method: Scope2Method::LocationBased,
                },
                total_emissions_tco2e: 40.0,
                uncertainty_percent: None,
                quality_score: None,
            },
            InventoryEntry {
                scope: Scope::Scope3 {
                    category: Scope3Category::new(6).unwrap(),
                },
                total_emissions_tco2e: 12.0,
                uncertainty_percent: None,
                quality_score: None,
            },
        ];
        DisclosureInput {
            entity_name: "Acme Components GmbH".to_string(),
            lei: "529900T8BM49AURSDO55".to_string(),
            period: Period {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            },
            currency: "EUR".to_string(),
            emissions: CalculatedEmissions::aggregate(
                &entries,
                GwpVersion::Ar6,
                Sector::Manufacturing,
                &MaterialityPolicy::default(),
                revenue,
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_export_is_valid_and_complete() {
        let doc = export_disclosure(&input(Some(10_000_000.0)), &ExportOptions::default()).unwrap();
        // 3 general + 6 E1-6 + 1 category + 1 material list + 2 intensity + 2 quality
        assert_eq!(doc.check.fact_count, 15);
        // plain, location-based, market-based, category 6
        assert_eq!(doc.check.declared_contexts.len(), 4);
        assert_eq!(doc.check.declared_units.len(), 3);
        assert!(doc.content.contains("esrs:Scope3Category6Member"));
        assert!(doc.content.contains(r#"scale="-6""#));
        assert_eq!(doc.sha256, content_hash(&doc.content));
    }

    #[test]
    fn test_scope2_methods_have_own_contexts() {
        let data = input(None);
        let facts = collect_facts(&data);
        let context_of = |name: &str| {
            facts
                .facts()
                .find(|f| f.concept == name)
                .map(|f| f.context.clone())
                .unwrap()
        };

        let location = context_of(concept::GROSS_SCOPE2_LOCATION);
        let market = context_of(concept::GROSS_SCOPE2_MARKET);
        assert_ne!(location, market);
        assert_ne!(location, ContextKey::plain(data.period));
        assert_eq!(location.members[0].dimension, dimension::SCOPE2_METHOD_AXIS);
        assert_eq!(location.members[0].member, dimension::LOCATION_BASED_MEMBER);
        assert_eq!(market.members[0].member, dimension::MARKET_BASED_MEMBER);

        let doc = export_disclosure(&data, &ExportOptions::default()).unwrap();
        assert!(doc.content.contains(dimension::SCOPE2_METHOD_AXIS));
        assert!(doc.content.contains(dimension::MARKET_BASED_MEMBER));
    }

    #[test]
    fn test_no_intensity_without_revenue() {
        let doc = export_disclosure(&input(None), &ExportOptions::default()).unwrap();
        assert!(!doc.content.contains("u-tCO2e-per-EUR"));
        assert_eq!(doc.check.declared_units.len(), 2);
    }

    #[test]
    fn test_export_is_deterministic() {
        let a = export_disclosure(&input(Some(5.0e6)), &ExportOptions::default()).unwrap();
        let b = export_disclosure(&input(Some(5.0e6)), &ExportOptions::default()).unwrap();
        assert_eq!(a.content, b.content);
        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn test_entity_name_is_escaped() {
        let mut data = input(None);
        data.entity_name = "Smith & <Sons>".to_string();
        let doc = export_disclosure(&data, &ExportOptions::default()).unwrap();
        assert!(doc.content.contains("Smith &amp; &lt;Sons&gt;"));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut bad_lei = input(None);
        bad_lei.lei = "short".to_string();
        assert!(matches!(
            export_disclosure(&bad_lei, &ExportOptions::default()),
            Err(ExportError::InvalidInput(_))
        ));

        let mut bad_period = input(None);
        bad_period.period.end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(matches!(
            export_disclosure(&bad_period, &ExportOptions::default()),
            Err(ExportError::InvalidInput(_))
        ));

        let mut bad_currency = input(None);
        bad_currency.currency = "eur".to_string();
        assert!(matches!(
            export_disclosure(&bad_currency, &ExportOptions::default()),
            Err(ExportError::InvalidInput(_))
        ));

        let mut bad_number = input(None);
        bad_number.emissions.scope1_tco2e = f64::NAN;
        assert!(matches!(
            export_disclosure(&bad_number, &ExportOptions::default()),
            Err(ExportError::InvalidInput(_))
        ));
    }
}
