//! Inventory aggregation
//!
//! Turns a list of calculated records into the per-scope figures disclosed in
//! ESRS E1-6 (gross Scope 1, 2, 3 and totals) plus materiality, quality and
//! intensity metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CalcResult;
use crate::gwp::GwpVersion;
use crate::materiality::{CategoryAssessment, MaterialityPolicy, Sector};
use crate::quality::{reporting_score, QualitySummary};
use crate::scope::{Scope, Scope2Method, Scope3Category};
use crate::uncertainty::combine_sum;

/// One calculated record feeding the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub scope: Scope,
    pub total_emissions_tco2e: f64,
    pub uncertainty_percent: Option<f64>,
    /// Record-level data quality score (0-100), when assessed
    pub quality_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Scope3Category,
    pub emissions_tco2e: f64,
}

/// Calculated emissions of a reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedEmissions {
    pub gwp_version: GwpVersion,
    pub scope1_tco2e: f64,
    pub scope2_location_tco2e: f64,
    pub scope2_market_tco2e: f64,
    pub scope3_tco2e: f64,
    /// Categories with at least one record, ascending
    pub scope3_by_category: Vec<CategoryTotal>,
    pub total_location_based_tco2e: f64,
    pub total_market_based_tco2e: f64,
    pub materiality: Vec<CategoryAssessment>,
    pub quality: QualitySummary,
    /// Combined relative uncertainty (%) over records that state one
    pub uncertainty_percent: Option<f64>,
    /// tCO2e per million currency units of net revenue (location-based total)
    pub intensity_location_per_million: Option<f64>,
    /// tCO2e per million currency units of net revenue (market-based total)
    pub intensity_market_per_million: Option<f64>,
}

impl CalculatedEmissions {
    pub fn aggregate(
        entries: &[InventoryEntry],
        gwp_version: GwpVersion,
        sector: Sector,
        policy: &MaterialityPolicy,
        net_revenue: Option<f64>,
    ) -> CalcResult<Self> {
        let mut scope1 = 0.0;
        let mut scope2_location = 0.0;
        let mut scope2_market = 0.0;
        let mut by_category: BTreeMap<Scope3Category, f64> = BTreeMap::new();

        for entry in entries {
            let value = entry.total_emissions_tco2e;
            match entry.scope {
                Scope::Scope1 => scope1 += value,
                Scope::Scope2 {
                    method: Scope2Method::LocationBased,
                } => scope2_location += value,
                Scope::Scope2 {
                    method: Scope2Method::MarketBased,
                } => scope2_market += value,
                Scope::Scope3 { category } => {
                    *by_category.entry(category).or_insert(0.0) += value;
                }
            }
        }

        let scope3: f64 = by_category.values().sum();
        let total_location = scope1 + scope2_location + scope3;
        let total_market = scope1 + scope2_market + scope3;

        let materiality = policy.assess_all(sector, &by_category, total_location);

        let quality = reporting_score(
            &entries
                .iter()
                .map(|e| (e.total_emissions_tco2e, e.quality_score))
                .collect::<Vec<_>>(),
        );

        let with_uncertainty: Vec<(f64, f64)> = entries
            .iter()
            .filter_map(|e| e.uncertainty_percent.map(|u| (e.total_emissions_tco2e, u)))
            .collect();
        let uncertainty_percent = if with_uncertainty.is_empty() {
            None
        } else {
            Some(combine_sum(&with_uncertainty)?)
        };

        let per_million = |total: f64| {
            net_revenue
                .filter(|r| *r > 0.0)
                .map(|revenue| total / (revenue / 1_000_000.0))
        };

        Ok(Self {
            gwp_version,
            scope1_tco2e: scope1,
            scope2_location_tco2e: scope2_location,
            scope2_market_tco2e: scope2_market,
            scope3_tco2e: scope3,
            scope3_by_category: by_category
                .into_iter()
                .map(|(category, emissions_tco2e)| CategoryTotal {
                    category,
                    emissions_tco2e,
                })
                .collect(),
            total_location_based_tco2e: total_location,
            total_market_based_tco2e: total_market,
            materiality,
            quality,
            uncertainty_percent,
            intensity_location_per_million: per_million(total_location),
            intensity_market_per_million: per_million(total_market),
        })
    }

    pub fn material_categories(&self) -> impl Iterator<Item = &CategoryAssessment> {
        self.materiality.iter().filter(|a| a.material)
    }
}
