//! # ESRS Common Library
//!
//! Shared code for the ESRS disclosure service:
//! - Error types
//! - Service configuration
//! - Database initialization, migrations and tenant-scoped repositories
//! - Compliance wizard state machine

pub mod config;
pub mod db;
pub mod error;
pub mod wizard;

pub use error::{Error, Result};
