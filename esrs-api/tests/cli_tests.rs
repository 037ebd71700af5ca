//! Command-line and configuration precedence tests
//!
//! Environment variables are process-wide, so every test here runs serially.

use std::path::PathBuf;

use clap::Parser;
use esrs_api::cli::{Args, Command, TenantCommand};
use esrs_calc::GwpVersion;
use esrs_common::config::ServiceConfig;
use serial_test::serial;

const ENV_VARS: [&str; 5] = [
    "ESRS_CONFIG",
    "ESRS_BIND_ADDR",
    "ESRS_DATABASE_PATH",
    "ESRS_GWP_VERSION",
    "ESRS_VOUCHER_VALIDITY_DAYS",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_no_subcommand_serves() {
    clear_env();
    let args = Args::try_parse_from(["esrs-api"]).unwrap();
    assert_eq!(args.command(), Command::Serve);
    assert_eq!(args.overrides(), Default::default());
}

#[test]
#[serial]
fn test_tenant_create_subcommand() {
    clear_env();
    let args = Args::try_parse_from(["esrs-api", "tenant", "create", "--name", "Acme Components"]).unwrap();
    assert_eq!(
        args.command(),
        Command::Tenant {
            action: TenantCommand::Create {
                name: "Acme Components".to_string()
            }
        }
    );

    assert!(Args::try_parse_from(["esrs-api", "tenant", "create"]).is_err());
}

#[test]
#[serial]
fn test_global_options_after_subcommand() {
    clear_env();
    let args = Args::try_parse_from([
        "esrs-api",
        "serve",
        "--bind",
        "0.0.0.0:8080",
        "--gwp",
        "ar5",
        "--voucher-validity-days",
        "30",
    ])
    .unwrap();
    let overrides = args.overrides();
    assert_eq!(overrides.bind_addr.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(overrides.default_gwp_version, Some(GwpVersion::Ar5));
    assert_eq!(overrides.voucher_validity_days, Some(30));

    assert!(Args::try_parse_from(["esrs-api", "--gwp", "AR3"]).is_err());
}

#[test]
#[serial]
fn test_environment_fills_unset_options() {
    clear_env();
    std::env::set_var("ESRS_BIND_ADDR", "127.0.0.1:9000");
    std::env::set_var("ESRS_DATABASE_PATH", "/var/lib/esrs/esrs.db");
    std::env::set_var("ESRS_GWP_VERSION", "AR4");

    let args = Args::try_parse_from(["esrs-api", "--bind", "127.0.0.1:7000"]).unwrap();
    clear_env();

    // Command line beats environment
    assert_eq!(args.bind.as_deref(), Some("127.0.0.1:7000"));
    assert_eq!(args.database, Some(PathBuf::from("/var/lib/esrs/esrs.db")));
    assert_eq!(args.gwp, Some(GwpVersion::Ar4));
}

#[test]
#[serial]
fn test_overrides_beat_config_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
bind_addr = "127.0.0.1:6000"
voucher_validity_days = 90
max_body_bytes = 65536
"#,
    )
    .unwrap();

    let args = Args::try_parse_from([
        "esrs-api",
        "--config",
        path.to_str().unwrap(),
        "--bind",
        "127.0.0.1:7000",
    ])
    .unwrap();
    let config = ServiceConfig::resolve(args.config.as_deref(), args.overrides()).unwrap();

    assert_eq!(config.bind_addr, "127.0.0.1:7000");
    assert_eq!(config.voucher_validity_days, 90);
    assert_eq!(config.max_body_bytes, 65536);
    assert_eq!(config.default_gwp_version, GwpVersion::Ar6);
}

#[test]
#[serial]
fn test_invalid_config_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "bind_addr = [").unwrap();

    let args = Args::try_parse_from(["esrs-api", "--config", path.to_str().unwrap()]).unwrap();
    assert!(ServiceConfig::resolve(args.config.as_deref(), args.overrides()).is_err());
}
