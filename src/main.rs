//! dashfeeds - external data feeds for the small-business dashboard
//!
//! Drives the integration hub from the command line. Every subcommand prints
//! pretty JSON on stdout; logs go to stderr.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dashfeeds::cli::{credentials_from_args, Cli, Command};
use dashfeeds::clock::SystemClock;
use dashfeeds::fetcher::{Fetcher, HttpFetcher, SimulatedFetcher};
use dashfeeds::hub::{HubOptions, IntegrationHub};
use dashfeeds::source::{PerSource, SourceKind};
use dashfeeds::store::JsonFileStore;

/// Sets up logging to stderr, filtered by `RUST_LOG`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashfeeds=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = cli.settings();
    let store = match &settings.data_dir {
        Some(dir) => JsonFileStore::with_dir(dir.clone()),
        None => JsonFileStore::new().ok_or("Could not determine a data directory; pass --data-dir")?,
    };
    debug!(dir = %store.dir().display(), "using data directory");

    let fetcher: Arc<dyn Fetcher> = if settings.offline {
        Arc::new(SimulatedFetcher::new(settings.location))
    } else {
        Arc::new(HttpFetcher::new(&settings))
    };
    let hub = IntegrationHub::open(
        Arc::new(store),
        fetcher,
        Arc::new(SystemClock),
        HubOptions::from(&settings),
    );

    match cli.command {
        Command::Status => print_json(&hub.get_status())?,
        Command::Configure {
            source,
            api_key,
            supplier,
            endpoint,
            disable,
        } => {
            let credentials =
                credentials_from_args(source, api_key.as_deref(), supplier.as_deref(), endpoint.as_deref())?;
            print_json(&hub.configure_source(source, credentials, !disable)?)?
        }
        Command::RemoveSupplier { name } => print_json(&hub.remove_supplier(&name)?)?,
        Command::Fetch { source, force } => {
            hub.get_data(source, force).await;
            print_json(&hub.cache_entry(source).await)?
        }
        Command::Refresh { force } => {
            let payloads = hub.refresh_all(force).await;
            let summaries: BTreeMap<SourceKind, String> =
                payloads.iter().map(|p| (p.kind(), p.summary())).collect();
            print_json(&summaries)?
        }
        Command::Quality => {
            let quality = hub.get_data_quality();
            print_json(&PerSource::from_fn(|source| quality.get(source).rounded()))?
        }
        Command::Health => print_json(&hub.calculate_health())?,
        Command::Stats => print_json(&hub.get_statistics())?,
        Command::Notifications { limit } => print_json(&hub.get_notifications(limit))?,
        Command::Reset { target } => print_json(&hub.reset_integration(target)?)?,
        Command::SetStat { path, value } => {
            hub.update_statistic(&path, value)?;
            print_json(&hub.get_statistics())?
        }
    }

    Ok(())
}
