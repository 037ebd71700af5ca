//! Structured validation results
//!
//! Validation never panics or short-circuits on the first problem: callers get
//! every error and warning at once and decide what to do with them.

use serde::{Deserialize, Serialize};

/// A report is valid exactly when it carries no errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReportFields")]
pub struct ValidationReport {
    valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Stored shape; `valid` is recomputed rather than trusted
#[derive(Deserialize)]
struct ReportFields {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

impl From<ReportFields> for ValidationReport {
    fn from(fields: ReportFields) -> Self {
        Self {
            valid: fields.errors.is_empty(),
            errors: fields.errors,
            warnings: fields.warnings,
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
