//! Compliance wizard state machine
//!
//! A session progresses DRAFT → IN_PROGRESS → SUBMITTED → REPORT_GENERATED.
//! Step edits are accepted until submission; submission validates the
//! collected data and stores the calculated inventory; report generation is
//! terminal.

use chrono::{DateTime, NaiveDate, Utc};
use esrs_calc::calculator::{record_total, ActivityInput};
use esrs_calc::ixbrl::model::Period;
use esrs_calc::ixbrl::DisclosureInput;
use esrs_calc::{
    CalculatedEmissions, DataQuality, EmissionFactor, GasAmount, GwpVersion, InventoryEntry,
    MaterialityPolicy, Scope, Scope2Method, Sector, ValidationReport,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{validate_factor, ScopeSelection};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardState {
    Draft,
    InProgress,
    Submitted,
    ReportGenerated,
}

impl WizardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardState::Draft => "DRAFT",
            WizardState::InProgress => "IN_PROGRESS",
            WizardState::Submitted => "SUBMITTED",
            WizardState::ReportGenerated => "REPORT_GENERATED",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "DRAFT" => Ok(WizardState::Draft),
            "IN_PROGRESS" => Ok(WizardState::InProgress),
            "SUBMITTED" => Ok(WizardState::Submitted),
            "REPORT_GENERATED" => Ok(WizardState::ReportGenerated),
            other => Err(Error::Internal(format!("Unknown wizard state: {}", other))),
        }
    }

    /// Steps may still be edited
    pub fn is_editable(&self) -> bool {
        matches!(self, WizardState::Draft | WizardState::InProgress)
    }
}

/// Record of a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_guid: Uuid,
    pub old_state: WizardState,
    pub new_state: WizardState,
    pub transitioned_at: DateTime<Utc>,
}

/// Company profile step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Legal Entity Identifier
    pub lei: String,
    pub sector: Sector,
    /// ISO 3166-1 alpha-2
    pub country: String,
    pub reporting_period_start: NaiveDate,
    pub reporting_period_end: NaiveDate,
    #[serde(default)]
    pub net_revenue: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub gwp_version: Option<GwpVersion>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl CompanyProfile {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Company name is empty".to_string()));
        }
        if self.lei.len() != 20
            || !self
                .lei
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        {
            return Err(Error::InvalidInput(format!(
                "LEI must be 20 uppercase alphanumeric characters, got '{}'",
                self.lei
            )));
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::InvalidInput(format!(
                "country must be an ISO 3166-1 alpha-2 code, got '{}'",
                self.country
            )));
        }
        if self.reporting_period_end < self.reporting_period_start {
            return Err(Error::InvalidInput(
                "reporting_period_end precedes reporting_period_start".to_string(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::InvalidInput(format!(
                "currency must be an ISO 4217 code, got '{}'",
                self.currency
            )));
        }
        if let Some(revenue) = self.net_revenue {
            if !revenue.is_finite() || revenue < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "net_revenue must be a non-negative number, got {}",
                    revenue
                )));
            }
        }
        Ok(())
    }

    pub fn period(&self) -> Period {
        Period {
            start: self.reporting_period_start,
            end: self.reporting_period_end,
        }
    }
}

/// One line of the activity data step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardActivity {
    pub description: String,
    pub activity_value: f64,
    pub activity_unit: String,
    pub emission_factor: EmissionFactor,
    #[serde(default)]
    pub gases: Vec<GasAmount>,
    #[serde(flatten)]
    pub scope: ScopeSelection,
    #[serde(default)]
    pub uncertainty_percent: Option<f64>,
    #[serde(default)]
    pub data_quality: Option<DataQuality>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub guid: Uuid,
    pub state: WizardState,
    pub profile: Option<CompanyProfile>,
    pub activities: Vec<WizardActivity>,
    pub calculated: Option<CalculatedEmissions>,
    pub validation: Option<ValidationReport>,
    pub voucher_code: Option<String>,
    pub disclosure_guid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4(),
            state: WizardState::Draft,
            profile: None,
            activities: Vec::new(),
            calculated: None,
            validation: None,
            voucher_code: None,
            disclosure_guid: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition_to(&mut self, new_state: WizardState) -> StateTransition {
        let now = Utc::now();
        let transition = StateTransition {
            session_guid: self.guid,
            old_state: self.state,
            new_state,
            transitioned_at: now,
        };
        self.state = new_state;
        self.updated_at = now;
        transition
    }

    fn require_editable(&self) -> Result<()> {
        if self.state.is_editable() {
            Ok(())
        } else {
            Err(Error::Conflict(format!(
                "Session {} is {} and can no longer be edited",
                self.guid,
                self.state.as_str()
            )))
        }
    }

    pub fn save_profile(&mut self, profile: CompanyProfile) -> Result<StateTransition> {
        self.require_editable()?;
        profile.validate()?;
        self.profile = Some(profile);
        Ok(self.transition_to(WizardState::InProgress))
    }

    pub fn save_activities(&mut self, activities: Vec<WizardActivity>) -> Result<StateTransition> {
        self.require_editable()?;
        self.activities = activities;
        Ok(self.transition_to(WizardState::InProgress))
    }

    /// Validate collected data without changing state
    pub fn check(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        match &self.profile {
            None => report.error("Company profile has not been provided"),
            Some(profile) => {
                if let Err(e) = profile.validate() {
                    report.error(e.to_string());
                }
                if profile.net_revenue.filter(|r| *r > 0.0).is_none() {
                    report.warn("No net revenue given; GHG intensity will be omitted");
                }
            }
        }

        if self.activities.is_empty() {
            report.error("At least one activity is required");
        }

        let gwp = self.gwp_version(GwpVersion::default());
        let mut has_market_based = false;
        let mut has_location_based = false;
        for (index, activity) in self.activities.iter().enumerate() {
            let line = index + 1;
            match activity.scope.to_scope() {
                Ok(Scope::Scope2 {
                    method: Scope2Method::MarketBased,
                }) => has_market_based = true,
                Ok(Scope::Scope2 {
                    method: Scope2Method::LocationBased,
                }) => has_location_based = true,
                Ok(_) => {}
                Err(e) => report.error(format!("Activity {}: {}", line, e)),
            }
            let calculated = validate_factor(&activity.emission_factor)
                .and_then(|()| record_total(&activity_input(activity, gwp)).map_err(Error::from));
            if let Err(e) = calculated {
                report.error(format!("Activity {}: {}", line, e));
            }
            if let Some(u) = activity.uncertainty_percent {
                if !u.is_finite() || u < 0.0 {
                    report.error(format!("Activity {}: invalid uncertainty {}", line, u));
                }
            }
            match &activity.data_quality {
                Some(dq) => {
                    if let Err(e) = dq.validate() {
                        report.error(format!("Activity {}: {}", line, e));
                    }
                }
                None => report.warn(format!(
                    "Activity {} has no data quality assessment",
                    line
                )),
            }
        }

        if has_location_based && !has_market_based {
            report.warn("Scope 2 market-based emissions not reported");
        }

        report
    }

    fn gwp_version(&self, default_gwp: GwpVersion) -> GwpVersion {
        self.profile
            .as_ref()
            .and_then(|p| p.gwp_version)
            .unwrap_or(default_gwp)
    }

    /// Validate and calculate; moves to SUBMITTED only when valid
    ///
    /// The validation report is returned (and kept on the session) either way.
    pub fn submit(
        &mut self,
        default_gwp: GwpVersion,
        policy: &MaterialityPolicy,
    ) -> Result<(ValidationReport, Option<StateTransition>)> {
        self.require_editable()?;
        let mut report = self.check();
        if !report.is_valid() {
            self.validation = Some(report.clone());
            return Ok((report, None));
        }

        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| Error::Internal("validated session has no profile".to_string()))?;
        let gwp = self.gwp_version(default_gwp);

        let mut entries = Vec::with_capacity(self.activities.len());
        for activity in &self.activities {
            let quality_score = match &activity.data_quality {
                Some(dq) => Some(dq.score()?),
                None => None,
            };
            entries.push(InventoryEntry {
                scope: activity.scope.to_scope()?,
                total_emissions_tco2e: record_total(&activity_input(activity, gwp))?,
                uncertainty_percent: activity.uncertainty_percent,
                quality_score,
            });
        }

        let calculated =
            CalculatedEmissions::aggregate(&entries, gwp, profile.sector, policy, profile.net_revenue)?;
        if calculated.quality.coverage < 1.0 && calculated.quality.coverage > 0.0 {
            report.warn(format!(
                "Data quality assessments cover {:.0}% of emissions",
                calculated.quality.coverage * 100.0
            ));
        }

        self.calculated = Some(calculated);
        self.validation = Some(report.clone());
        let transition = self.transition_to(WizardState::Submitted);
        Ok((report, Some(transition)))
    }

    /// Export input for a submitted session
    pub fn disclosure_input(&self) -> Result<DisclosureInput> {
        let (profile, calculated) = match (&self.profile, &self.calculated) {
            (Some(p), Some(c)) => (p, c),
            _ => {
                return Err(Error::Conflict(format!(
                    "Session {} has not been submitted",
                    self.guid
                )))
            }
        };
        Ok(DisclosureInput {
            entity_name: profile.name.clone(),
            lei: profile.lei.clone(),
            period: profile.period(),
            currency: profile.currency.clone(),
            emissions: calculated.clone(),
        })
    }

    /// Check that a report may be generated now
    pub fn require_submitted(&self) -> Result<()> {
        match self.state {
            WizardState::Submitted => Ok(()),
            WizardState::ReportGenerated => Err(Error::Conflict(format!(
                "A report has already been generated for session {}",
                self.guid
            ))),
            other => Err(Error::Conflict(format!(
                "Session {} is {}; submit it before generating a report",
                self.guid,
                other.as_str()
            ))),
        }
    }

    pub fn mark_report_generated(
        &mut self,
        voucher_code: String,
        disclosure_guid: Uuid,
    ) -> Result<StateTransition> {
        self.require_submitted()?;
        self.voucher_code = Some(voucher_code);
        self.disclosure_guid = Some(disclosure_guid);
        Ok(self.transition_to(WizardState::ReportGenerated))
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

fn activity_input(activity: &WizardActivity, gwp: GwpVersion) -> ActivityInput {
    ActivityInput {
        activity_value: activity.activity_value,
        activity_unit: activity.activity_unit.clone(),
        factor: activity.emission_factor.clone(),
        gases: activity.gases.clone(),
        gwp_version: gwp,
    }
}
