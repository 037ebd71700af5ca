//! Namespaces, measures and concept names used in exported documents
//!
//! These identifiers were not taken from a verified taxonomy package. Before a
//! document is filed they must be checked against the official EFRAG ESRS
//! taxonomy; every name lives here so that check touches one file.

pub const NS_XHTML: &str = "http://www.w3.org/1999/xhtml";
pub const NS_IX: &str = "http://www.xbrl.org/2013/inlineXBRL";
pub const NS_IXT: &str = "http://www.xbrl.org/inlineXBRL/transformation/2020-02-12";
pub const NS_XBRLI: &str = "http://www.xbrl.org/2003/instance";
pub const NS_XBRLDI: &str = "http://xbrl.org/2006/xbrldi";
pub const NS_LINK: &str = "http://www.xbrl.org/2003/linkbase";
pub const NS_XLINK: &str = "http://www.w3.org/1999/xlink";
pub const NS_ISO4217: &str = "http://www.xbrl.org/2003/iso4217";
pub const NS_UTR: &str = "http://www.xbrl.org/2009/utr";
pub const NS_ESRS: &str = "https://xbrl.efrag.org/taxonomy/esrs/2023-12-22";

pub const DEFAULT_ENTRY_POINT: &str =
    "https://xbrl.efrag.org/taxonomy/esrs/2023-12-22/esrs_all.xsd";

/// Identifier scheme for Legal Entity Identifiers
pub const LEI_SCHEME: &str = "http://standards.iso.org/iso/17442";

/// Number format transformation applied to every numeric fact
pub const NUMBER_FORMAT: &str = "ixt:num-dot-decimal";

pub const MEASURE_PURE: &str = "xbrli:pure";
pub const MEASURE_TCO2E: &str = "utr:tCO2e";

/// Namespace prefixes declared on the root element, in output order
pub const PREFIXES: [(&str, &str); 10] = [
    ("xmlns", NS_XHTML),
    ("xmlns:ix", NS_IX),
    ("xmlns:ixt", NS_IXT),
    ("xmlns:xbrli", NS_XBRLI),
    ("xmlns:xbrldi", NS_XBRLDI),
    ("xmlns:link", NS_LINK),
    ("xmlns:xlink", NS_XLINK),
    ("xmlns:iso4217", NS_ISO4217),
    ("xmlns:utr", NS_UTR),
    ("xmlns:esrs", NS_ESRS),
];

pub mod concept {
    pub const NAME_OF_UNDERTAKING: &str = "esrs:NameOfReportingUndertaking";
    pub const REPORTING_PERIOD: &str = "esrs:DescriptionOfReportingPeriod";
    pub const GWP_VALUES_USED: &str = "esrs:DisclosureOfGlobalWarmingPotentialValuesUsed";

    pub const GROSS_SCOPE1: &str = "esrs:GrossScope1GreenhouseGasEmissions";
    pub const GROSS_SCOPE2_LOCATION: &str = "esrs:GrossLocationBasedScope2GreenhouseGasEmissions";
    pub const GROSS_SCOPE2_MARKET: &str = "esrs:GrossMarketBasedScope2GreenhouseGasEmissions";
    pub const GROSS_SCOPE3: &str = "esrs:GrossScope3GreenhouseGasEmissions";
    pub const TOTAL_LOCATION: &str = "esrs:TotalGHGEmissionsLocationBased";
    pub const TOTAL_MARKET: &str = "esrs:TotalGHGEmissionsMarketBased";

    pub const INTENSITY_LOCATION: &str = "esrs:GHGEmissionsIntensityLocationBasedPerNetRevenue";
    pub const INTENSITY_MARKET: &str = "esrs:GHGEmissionsIntensityMarketBasedPerNetRevenue";

    pub const DATA_QUALITY_SCORE: &str = "esrs:GHGEmissionsDataQualityScore";
    pub const DATA_QUALITY_COVERAGE: &str = "esrs:PercentageOfGHGEmissionsCoveredByDataQualityAssessment";
    pub const MATERIAL_SCOPE3_CATEGORIES: &str = "esrs:DisclosureOfSignificantScope3Categories";
}

pub mod dimension {
    pub const SCOPE3_CATEGORY_AXIS: &str = "esrs:Scope3GHGEmissionsCategoryAxis";

    pub const SCOPE2_METHOD_AXIS: &str = "esrs:Scope2GHGEmissionsMethodAxis";
    pub const LOCATION_BASED_MEMBER: &str = "esrs:LocationBasedMember";
    pub const MARKET_BASED_MEMBER: &str = "esrs:MarketBasedMember";

    /// Member name for a Scope 3 category number (1-15)
    pub fn scope3_category_member(number: u8) -> String {
        format!("esrs:Scope3Category{}Member", number)
    }
}
