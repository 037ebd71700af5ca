//! Service configuration
//!
//! Values are resolved in priority order:
//! 1. Command-line argument
//! 2. Environment variable (both handled by the binary's clap parser)
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file is not an error: a warning is logged and defaults
//! are used. A config file that exists but does not parse is an error.

use crate::{Error, Result};
use esrs_calc::{GwpVersion, MaterialityPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5760";
pub const DEFAULT_VOUCHER_VALIDITY_DAYS: i64 = 365;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// About a century
pub const MAX_VOUCHER_VALIDITY_DAYS: i64 = 36_500;

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub default_gwp_version: Option<GwpVersion>,
    pub voucher_validity_days: Option<i64>,
    pub max_body_bytes: Option<usize>,
    pub taxonomy_entry_point: Option<String>,
    pub materiality: Option<MaterialityPolicy>,
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read a config file; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(Some(config))
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub default_gwp_version: Option<GwpVersion>,
    pub voucher_validity_days: Option<i64>,
}

/// Fully resolved configuration, built once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub default_gwp_version: GwpVersion,
    pub voucher_validity_days: i64,
    pub max_body_bytes: usize,
    pub taxonomy_entry_point: String,
    pub materiality: MaterialityPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_path: default_database_path(),
            default_gwp_version: GwpVersion::default(),
            voucher_validity_days: DEFAULT_VOUCHER_VALIDITY_DAYS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            taxonomy_entry_point: esrs_calc::ixbrl::taxonomy::DEFAULT_ENTRY_POINT.to_string(),
            materiality: MaterialityPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from an optional file plus overrides
    ///
    /// With no explicit path the platform config location is tried
    /// (`~/.config/esrs/config.toml` on Linux).
    pub fn resolve(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let file = match config_file {
            Some(path) => TomlConfig::load(path)?,
            None => match default_config_file() {
                Some(path) => TomlConfig::load(&path)?,
                None => None,
            },
        };
        let config = Self::merge(file.unwrap_or_default(), overrides);
        config.validate()?;
        Ok(config)
    }

    /// Layer overrides over file values over defaults
    pub fn merge(file: TomlConfig, overrides: ConfigOverrides) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or(defaults.database_path),
            default_gwp_version: overrides
                .default_gwp_version
                .or(file.default_gwp_version)
                .unwrap_or(defaults.default_gwp_version),
            voucher_validity_days: overrides
                .voucher_validity_days
                .or(file.voucher_validity_days)
                .unwrap_or(defaults.voucher_validity_days),
            max_body_bytes: file.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            taxonomy_entry_point: file
                .taxonomy_entry_point
                .unwrap_or(defaults.taxonomy_entry_point),
            materiality: file.materiality.unwrap_or(defaults.materiality),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_VOUCHER_VALIDITY_DAYS).contains(&self.voucher_validity_days) {
            return Err(Error::Config(format!(
                "voucher_validity_days must be between 1 and {}, got {}",
                MAX_VOUCHER_VALIDITY_DAYS, self.voucher_validity_days
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::Config("max_body_bytes must be positive".to_string()));
        }
        let policy = &self.materiality;
        let thresholds = policy
            .sector_thresholds
            .values()
            .chain(std::iter::once(&policy.default_threshold));
        for threshold in thresholds {
            if !(0.0..=1.0).contains(threshold) {
                return Err(Error::Config(format!(
                    "materiality threshold {} is outside 0.0-1.0",
                    threshold
                )));
            }
        }
        for (sector, categories) in &policy.mandatory_categories {
            if let Some(bad) = categories.iter().find(|c| !(1..=15).contains(*c)) {
                return Err(Error::Config(format!(
                    "mandatory Scope 3 category {} for sector {} is outside 1-15",
                    bad, sector
                )));
            }
        }
        if policy.absolute_threshold_tco2e.is_nan() || policy.absolute_threshold_tco2e < 0.0 {
            return Err(Error::Config(
                "materiality absolute_threshold_tco2e must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("esrs").join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("esrs"))
        .unwrap_or_else(|| PathBuf::from("./esrs_data"))
        .join("esrs.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use esrs_calc::Sector;
    use std::io::Write;

    #[test]
    fn test_overrides_beat_file_beat_defaults() {
        let file = TomlConfig {
            bind_addr: Some("0.0.0.0:8000".to_string()),
            voucher_validity_days: Some(30),
            max_body_bytes: Some(1024),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            bind_addr: Some("127.0.0.1:9000".to_string()),
            ..Default::default()
        };

        let config = ServiceConfig::merge(file, overrides);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.voucher_validity_days, 30);
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.default_gwp_version, GwpVersion::Ar6);
    }

    #[test]
    fn test_materiality_table_parsed() {
        let config = TomlConfig::parse(
            r#"
            default_gwp_version = "AR5"

            [materiality]
            default_threshold = 0.2
            absolute_threshold_tco2e = 500.0

            [materiality.sector_thresholds]
            finance = 0.25

            [materiality.mandatory_categories]
            technology = [1, 11]
            "#,
        )
        .unwrap();

        assert_eq!(config.default_gwp_version, Some(GwpVersion::Ar5));
        let policy = config.materiality.unwrap();
        assert_eq!(policy.default_threshold, 0.2);
        assert_eq!(policy.threshold_for(Sector::Finance), 0.25);
        // Sectors left out of the table keep their defaults
        assert_eq!(policy.threshold_for(Sector::Retail), 0.10);
        assert_eq!(policy.threshold_for(Sector::Manufacturing), 0.05);
        assert!(policy.is_mandatory(Sector::Finance, esrs_calc::Scope3Category::new(15).unwrap()));
        assert_eq!(
            policy.mandatory_categories.get(&Sector::Technology),
            Some(&vec![1, 11])
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            TomlConfig::parse("bind_addr = [unclosed"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TomlConfig::parse("no_such_key = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = ServiceConfig::resolve(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.materiality, MaterialityPolicy::default());
    }

    #[test]
    fn test_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "voucher_validity_days = 90").unwrap();
        writeln!(file, "taxonomy_entry_point = \"https://example.org/esrs.xsd\"").unwrap();

        let config = ServiceConfig::resolve(Some(file.path()), ConfigOverrides::default()).unwrap();
        assert_eq!(config.voucher_validity_days, 90);
        assert_eq!(config.taxonomy_entry_point, "https://example.org/esrs.xsd");
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = ServiceConfig::default();
        config.voucher_validity_days = 0;
        assert!(config.validate().is_err());

        let config = ServiceConfig::merge(
            TomlConfig::default(),
            ConfigOverrides {
                voucher_validity_days: Some(i64::MAX),
                ..Default::default()
            },
        );
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = ServiceConfig::default();
        config.voucher_validity_days = MAX_VOUCHER_VALIDITY_DAYS;
        assert!(config.validate().is_ok());
        config.voucher_validity_days = MAX_VOUCHER_VALIDITY_DAYS + 1;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config
            .materiality
            .mandatory_categories
            .insert(Sector::Other, vec![16]);
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.materiality.default_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
