//! Command-line interface
//!
//! Options may also come from the environment (`ESRS_*`); both take
//! priority over the TOML config file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use esrs_calc::GwpVersion;
use esrs_common::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "esrs-api")]
#[command(about = "ESRS E1 emissions calculation and iXBRL disclosure service")]
#[command(version)]
pub struct Args {
    /// TOML config file (default: platform config dir, esrs/config.toml)
    #[arg(short, long, env = "ESRS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5760
    #[arg(short, long, env = "ESRS_BIND_ADDR", global = true)]
    pub bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "ESRS_DATABASE_PATH", global = true)]
    pub database: Option<PathBuf>,

    /// GWP table used when a record does not name one (AR4, AR5, AR6)
    #[arg(long, env = "ESRS_GWP_VERSION", global = true)]
    pub gwp: Option<GwpVersion>,

    /// Days a newly issued voucher stays valid
    #[arg(long, env = "ESRS_VOUCHER_VALIDITY_DAYS", global = true)]
    pub voucher_validity_days: Option<i64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        action: TenantCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TenantCommand {
    /// Create a tenant and print its API key (shown only once)
    Create {
        #[arg(long)]
        name: String,
    },
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind.clone(),
            database_path: self.database.clone(),
            default_gwp_version: self.gwp,
            voucher_validity_days: self.voucher_validity_days,
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
