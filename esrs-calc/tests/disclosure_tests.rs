//! End-to-end checks from activity data to a parsed disclosure document

use chrono::NaiveDate;
use esrs_calc::calculator::{record_total, ActivityInput};
use esrs_calc::ixbrl::model::Period;
use esrs_calc::ixbrl::{check_document, export_disclosure, DisclosureInput, ExportOptions};
use esrs_calc::{
    calculate_emissions, CalculatedEmissions, EmissionFactor, Gas, GasAmount, GwpVersion,
    InventoryEntry, MaterialityPolicy, Scope, Scope2Method, Scope3Category, Sector,
};

fn factor(value: f64, unit: &str) -> EmissionFactor {
    EmissionFactor {
        value,
        unit: unit.to_string(),
        source: "DEFRA 2024".to_string(),
        data_quality_tier: 2,
    }
}

fn entry(scope: Scope, total: f64) -> InventoryEntry {
    InventoryEntry {
        scope,
        total_emissions_tco2e: total,
        uncertainty_percent: None,
        quality_score: None,
    }
}

fn disclosure(entries: &[InventoryEntry], revenue: Option<f64>) -> DisclosureInput {
    DisclosureInput {
        entity_name: "Nordwind Logistics AG".to_string(),
        lei: "391200ABCDEFGH123456".to_string(),
        period: Period {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        },
        currency: "EUR".to_string(),
        emissions: CalculatedEmissions::aggregate(
            entries,
            GwpVersion::Ar6,
            Sector::Transport,
            &MaterialityPolicy::default(),
            revenue,
        )
        .unwrap(),
    }
}

#[test]
fn test_calculation_is_exact_product() {
    for (a, f) in [(1000.0, 0.233), (0.5, 2.0), (3.0, 0.0)] {
        assert_eq!(calculate_emissions(a, f).unwrap(), a * f);
    }
    assert!(calculate_emissions(-1.0, 1.0).is_err());
}

#[test]
fn test_co2_only_gases_equal_their_mass() {
    for version in [GwpVersion::Ar4, GwpVersion::Ar5, GwpVersion::Ar6] {
        let input = ActivityInput {
            activity_value: 100.0,
            activity_unit: "kWh".to_string(),
            factor: factor(0.2, "kgCO2e/kWh"),
            gases: vec![GasAmount::new(Gas::Co2, 12.5), GasAmount::new(Gas::Co2, 0.5)],
            gwp_version: version,
        };
        assert_eq!(record_total(&input).unwrap(), 13.0);
    }
}

#[test]
fn test_materiality_around_threshold() {
    let policy = MaterialityPolicy::default();
    let cat = Scope3Category::new(6).unwrap();
    // Services threshold is 10% and category 6 is not mandatory
    assert!(policy.assess(Sector::Services, cat, 10.0, 100.0).material);
    assert!(!policy.assess(Sector::Services, cat, 9.99, 100.0).material);
}

#[test]
fn test_every_reference_is_declared() {
    let entries = vec![
        entry(Scope::Scope1, 850.0),
        entry(
            Scope::Scope2 {
                method: Scope2Method::LocationBased,
            },
            310.0,
        ),
        entry(
            Scope::Scope2 {
                method: Scope2Method::MarketBased,
            },
            120.0,
        ),
        entry(
            Scope::Scope3 {
                category: Scope3Category::new(4).unwrap(),
            },
            2_400.0,
        ),
        entry(
            Scope::Scope3 {
                category: Scope3Category::new(9).unwrap(),
            },
            640.0,
        ),
        entry(
            Scope::Scope3 {
                category: Scope3Category::new(1).unwrap(),
            },
            75.0,
        ),
    ];
    let doc = export_disclosure(&disclosure(&entries, Some(42_000_000.0)), &ExportOptions::default())
        .unwrap();

    // Parse again from scratch rather than trusting the returned check
    let check = check_document(&doc.content).unwrap();
    assert!(check.referenced_contexts.is_subset(&check.declared_contexts));
    assert!(check.referenced_units.is_subset(&check.declared_units));
    assert_eq!(check.referenced_contexts, check.declared_contexts);
    // plain period + two Scope 2 methods + three Scope 3 categories
    assert_eq!(check.declared_contexts.len(), 6);

    let resources_end = doc.content.find("</ix:resources>").unwrap();
    let first_fact = doc.content.find("<ix:non").unwrap();
    assert!(resources_end < first_fact);
}

#[test]
fn test_reexport_is_byte_identical() {
    let entries = vec![entry(Scope::Scope1, 1.0 / 3.0)];
    let options = ExportOptions {
        entry_point: "https://example.org/esrs_all.xsd".to_string(),
    };
    let first = export_disclosure(&disclosure(&entries, Some(1.0e6)), &options).unwrap();
    let second = export_disclosure(&disclosure(&entries, Some(1.0e6)), &options).unwrap();
    assert_eq!(first.content.as_bytes(), second.content.as_bytes());
    assert!(first.content.contains("https://example.org/esrs_all.xsd"));
}

#[test]
fn test_negative_total_carries_sign_attribute() {
    // Removals recorded as negative Scope 1 adjustments are still exportable
    let mut input = disclosure(&[entry(Scope::Scope1, 10.0)], None);
    input.emissions.scope1_tco2e = -4.25;
    let doc = export_disclosure(&input, &ExportOptions::default()).unwrap();
    assert!(doc.content.contains(r#"sign="-""#));
    assert!(doc.content.contains(">4.25<"));
}
