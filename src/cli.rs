//! Command-line interface parsing for dashfeeds
//!
//! This module handles parsing of CLI arguments using clap. Global flags (and
//! their `DASHFEEDS_*` environment fallbacks) become a [`Settings`]; the
//! subcommand selects which hub operation to run.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::config::Credentials;
use crate::error::IntegrationError;
use crate::settings::{Location, Settings};
use crate::source::{ResetTarget, SourceKind};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The statistic value is not valid JSON
    #[error("Invalid JSON value: {0}")]
    InvalidJson(String),
    /// Supplier credentials were given without a supplier name
    #[error("Supplier credentials need a name: pass --supplier NAME")]
    SupplierNameRequired,
    /// A supplier or endpoint was given without the key to go with it
    #[error("Supplier credentials need a key: pass --api-key KEY")]
    SupplierKeyRequired,
    /// A supplier name was given for a source that takes a single API key
    #[error("--supplier and --endpoint only apply to suppliers, not {0}")]
    UnexpectedSupplier(SourceKind),
}

/// dashfeeds - weather, local events and supplier feeds for the dashboard
#[derive(Parser, Debug)]
#[command(name = "dashfeeds")]
#[command(about = "External data feeds for the small-business dashboard")]
#[command(version)]
pub struct Cli {
    /// Directory holding the persisted documents (defaults to the XDG data dir)
    #[arg(long, global = true, env = "DASHFEEDS_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Use generated data instead of calling the providers
    #[arg(long, global = true, env = "DASHFEEDS_OFFLINE")]
    pub offline: bool,

    /// Seconds allowed for a single provider fetch
    #[arg(long, global = true, env = "DASHFEEDS_TIMEOUT_SECS", default_value_t = 10, value_name = "SECS")]
    pub timeout_secs: u64,

    /// Latitude of the business
    #[arg(long, global = true, env = "DASHFEEDS_LAT", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the business
    #[arg(long, global = true, env = "DASHFEEDS_LON", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show configuration and live status of every source
    Status,

    /// Enable a source and optionally set its credentials
    ///
    /// Examples:
    ///   dashfeeds configure weather --api-key KEY
    ///   dashfeeds configure suppliers --supplier acme --api-key KEY --endpoint https://acme.example/catalog
    ///   dashfeeds configure events --disable
    Configure {
        /// weather, events or suppliers
        #[arg(value_parser = parse_source)]
        source: SourceKind,
        /// API key (for suppliers, the named supplier's key)
        #[arg(long)]
        api_key: Option<String>,
        /// Supplier name; other configured suppliers are kept
        #[arg(long)]
        supplier: Option<String>,
        /// Catalog endpoint of the supplier
        #[arg(long, requires = "supplier")]
        endpoint: Option<String>,
        /// Disable the source instead of enabling it
        #[arg(long)]
        disable: bool,
    },

    /// Remove one supplier's credentials
    RemoveSupplier {
        name: String,
    },

    /// Get a source's data, fetching it if the cache is stale
    Fetch {
        #[arg(value_parser = parse_source)]
        source: SourceKind,
        /// Fetch even if the cache is fresh
        #[arg(long)]
        force: bool,
    },

    /// Get every source's data concurrently
    Refresh {
        #[arg(long)]
        force: bool,
    },

    /// Show the data quality of every source
    Quality,

    /// Show the aggregate health score
    Health,

    /// Show usage statistics
    Stats,

    /// Show recent notifications, newest first
    Notifications {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Reset a source, or all of them, to the unconfigured state
    Reset {
        /// weather, events, suppliers or all
        #[arg(value_parser = parse_reset_target)]
        target: ResetTarget,
    },

    /// Set a statistic at a dotted path, e.g. `dashboard.views 12`
    SetStat {
        path: String,
        #[arg(value_parser = parse_json_value)]
        value: Value,
    },
}

/// Parses a source name argument
pub fn parse_source(s: &str) -> Result<SourceKind, IntegrationError> {
    s.parse()
}

/// Parses a reset target argument
pub fn parse_reset_target(s: &str) -> Result<ResetTarget, IntegrationError> {
    s.parse()
}

/// Parses a statistic value as JSON, falling back to a plain string
///
/// `12` is a number and `{"a":1}` an object, while `hello` becomes the
/// string `"hello"`. Input that starts like JSON but fails to parse is
/// rejected.
pub fn parse_json_value(s: &str) -> Result<Value, CliError> {
    match serde_json::from_str(s) {
        Ok(value) => Ok(value),
        Err(e) if s.trim_start().starts_with(['{', '[', '"']) => Err(CliError::InvalidJson(e.to_string())),
        Err(_) => Ok(Value::String(s.to_string())),
    }
}

/// Builds the credentials of a `configure` invocation
///
/// # Arguments
/// * `source` - The source being configured
/// * `api_key` - The `--api-key` value
/// * `supplier` - The `--supplier` value
/// * `endpoint` - The `--endpoint` value
///
/// # Returns
/// * `Ok(None)` if no key was given; the stored credentials are kept
/// * `Ok(Some(Credentials))` of the shape the source expects
/// * `Err(CliError)` for a supplier flag on the wrong source, or supplier
///   credentials missing their name or key
pub fn credentials_from_args(
    source: SourceKind,
    api_key: Option<&str>,
    supplier: Option<&str>,
    endpoint: Option<&str>,
) -> Result<Option<Credentials>, CliError> {
    match source {
        SourceKind::Suppliers => match (supplier, api_key) {
            (Some(name), Some(key)) => Ok(Some(Credentials::supplier(
                name,
                key,
                endpoint.map(str::to_string),
            ))),
            (None, Some(_)) => Err(CliError::SupplierNameRequired),
            (Some(_), None) => Err(CliError::SupplierKeyRequired),
            (None, None) if endpoint.is_some() => Err(CliError::SupplierKeyRequired),
            (None, None) => Ok(None),
        },
        _ if supplier.is_some() || endpoint.is_some() => Err(CliError::UnexpectedSupplier(source)),
        _ => Ok(api_key.map(Credentials::api_key)),
    }
}

impl Cli {
    /// Settings derived from the global flags
    pub fn settings(&self) -> Settings {
        let default_location = Location::default();
        Settings {
            data_dir: self.data_dir.clone(),
            location: Location {
                latitude: self.lat.unwrap_or(default_location.latitude),
                longitude: self.lon.unwrap_or(default_location.longitude),
            },
            fetch_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            offline: self.offline,
            ..Settings::default()
        }
    }
}
