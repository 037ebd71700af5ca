//! # ESRS Calculation Library
//!
//! Domain core for greenhouse-gas accounting and disclosure:
//! - Emission calculation from activity data and emission factors
//! - GWP tables (AR4, AR5, AR6) for multi-gas records
//! - Uncertainty propagation
//! - Scope 3 materiality assessment
//! - Data quality scoring
//! - Inline XBRL (iXBRL) disclosure export with structural validation
//!
//! No I/O happens here. Persistence and HTTP live in `esrs-common` and `esrs-api`.

pub mod calculator;
pub mod error;
pub mod gwp;
pub mod inventory;
pub mod ixbrl;
pub mod materiality;
pub mod quality;
pub mod scope;
pub mod uncertainty;
pub mod validation;

pub use calculator::{calculate_emissions, EmissionFactor, FactorUnit};
pub use error::{CalcError, CalcResult};
pub use gwp::{Gas, GasAmount, GwpVersion};
pub use inventory::{CalculatedEmissions, InventoryEntry};
pub use materiality::{MaterialityPolicy, Sector};
pub use quality::DataQuality;
pub use scope::{Scope, Scope2Method, Scope3Category};
pub use validation::ValidationReport;
