#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Portland permit search.
//!
//! With no subcommand an interactive session starts. The feature service
//! is chosen with `--service`, then the `PDX_PERMITS_SERVICE` environment
//! variable, then the built-in default. Cutoff days and status dates use
//! the machine's local time zone.

mod interactive;
mod layer;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use pdx_permits_permit_models::{MarkerDescriptor, SelectionState};
use pdx_permits_query::service::{self, DEFAULT_SERVICE_ID, ServiceDefinition};
use pdx_permits_results::ResultSetManager;
use pdx_permits_results::export::to_geojson_string;
use pdx_permits_source::feature_service::{FeatureSource, HttpFeatureSource, SavedResponseSource};

use crate::layer::TerminalLayer;

/// Environment variable naming the default feature service.
const SERVICE_ENV: &str = "PDX_PERMITS_SERVICE";

#[derive(Parser)]
#[command(name = "pdx_permits", about = "Search Portland residential construction permits")]
struct Cli {
    /// Feature service id (see `services`)
    #[arg(long, global = true)]
    service: Option<String>,
    /// Read a saved query response instead of calling the service
    #[arg(long, global = true)]
    input: Option<PathBuf>,
    /// Interactive mode only: rewrite this `GeoJSON` file after each search
    #[arg(long)]
    geojson: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

/// The search form, as flags.
#[derive(clap::Args)]
struct SelectionArgs {
    /// Comma-separated development types: sfr, thrh, duplex. Pass an empty
    /// string to select none.
    #[arg(long, default_value = "sfr,thrh,duplex")]
    types: String,
    /// Permit stage: review, issued, or finaled
    #[arg(long, default_value = "issued")]
    issuance: String,
    /// Lookback window: week, months1, months3, months6, months12, default18months
    #[arg(long, default_value = "default18months")]
    lookback: String,
}

impl SelectionArgs {
    fn selection(&self) -> SelectionState {
        SelectionState::from_form(
            self.types.split(',').filter(|s| !s.trim().is_empty()),
            &self.issuance,
            &self.lookback,
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    Table,
    /// Marker descriptors as JSON
    Json,
    /// `GeoJSON` feature collection
    Geojson,
}

#[derive(Subcommand)]
enum Commands {
    /// Search permits and print the matching markers
    Search {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Write JSON or `GeoJSON` output to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the where clause and encoded query URL without fetching
    Url {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List configured feature services
    Services,
}

/// Picks the service id from the flag, the environment value, or the
/// default.
fn service_id(flag: Option<&str>, env_value: Option<String>) -> String {
    flag.map(ToString::to_string)
        .or(env_value)
        .unwrap_or_else(|| DEFAULT_SERVICE_ID.to_string())
}

/// Resolves the service from the flag, the environment, or the default.
fn resolve_service(flag: Option<&str>) -> Result<ServiceDefinition, service::ServiceError> {
    service::find_service(&service_id(flag, std::env::var(SERVICE_ENV).ok()))
}

/// Lines printed by `services`, with `selected` starred. An unknown
/// selected id is only warned about so the valid ids still get listed.
fn service_listing(selected: &str) -> Vec<String> {
    let services = service::all_services();
    if !services.iter().any(|def| def.id == selected) {
        log::warn!("Unknown feature service: {selected}");
    }

    services
        .iter()
        .flat_map(|def| {
            let marker = if def.id == selected { "*" } else { " " };
            [
                format!("{marker} {:<24} {} ({}, {})", def.id, def.name, def.city, def.state),
                format!("  {}", def.base_url),
            ]
        })
        .collect()
}

fn build_source(
    service: ServiceDefinition,
    input: Option<&Path>,
) -> Box<dyn FeatureSource> {
    match input {
        Some(path) => {
            log::info!("Reading saved response from {}", path.display());
            Box::new(SavedResponseSource::new(path))
        }
        None => Box::new(HttpFeatureSource::new(service)),
    }
}

/// Writes markers as `GeoJSON` to `path`.
///
/// # Errors
///
/// Returns an error if conversion or the file write fails.
pub fn write_geojson(
    path: &Path,
    markers: &[MarkerDescriptor],
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, to_geojson_string(markers)?)?;
    log::info!("Wrote {} markers to {}", markers.len(), path.display());
    Ok(())
}

fn emit(text: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let service = resolve_service(cli.service.as_deref())?;
        let source = build_source(service, cli.input.as_deref());
        return interactive::run(source.as_ref(), cli.geojson.as_deref()).await;
    };

    match command {
        Commands::Search {
            selection,
            format,
            output,
        } => {
            let selection = selection.selection();
            let service = resolve_service(cli.service.as_deref())?;
            let source = build_source(service, cli.input.as_deref());

            let layer = match format {
                OutputFormat::Table => TerminalLayer::table(),
                OutputFormat::Json | OutputFormat::Geojson => TerminalLayer::quiet(),
            };
            let mut results = ResultSetManager::new(layer);

            let outcome =
                pdx_permits_source::search(source.as_ref(), &selection, chrono::Local::now())
                    .await?;
            if outcome.skipped > 0 {
                log::warn!("{} records had no geometry and were skipped", outcome.skipped);
            }
            if outcome.truncated {
                log::warn!("The service truncated the result; only the first page is shown");
            }

            let set = results.replace(outcome.markers);
            match format {
                OutputFormat::Table => {}
                OutputFormat::Json => emit(
                    &serde_json::to_string_pretty(set.markers())?,
                    output.as_deref(),
                )?,
                OutputFormat::Geojson => {
                    emit(&to_geojson_string(set.markers())?, output.as_deref())?;
                }
            }
        }
        Commands::Url { selection } => {
            let service = resolve_service(cli.service.as_deref())?;
            let plan = pdx_permits_query::plan(&selection.selection(), chrono::Local::now());
            println!("Lookback: {} (since {})", plan.lookback.label, plan.lookback.cutoff_date());
            println!("Where:    {}", plan.predicate);
            println!("URL:      {}", plan.request(&service).url());
        }
        Commands::Services => {
            let selected = service_id(cli.service.as_deref(), std::env::var(SERVICE_ENV).ok());
            for line in service_listing(&selected) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() {
        assert_eq!(service_id(Some("a"), Some("b".to_string())), "a");
        assert_eq!(service_id(None, Some("b".to_string())), "b");
        assert_eq!(service_id(None, None), DEFAULT_SERVICE_ID);
    }

    #[test]
    fn unknown_service_still_lists_valid_ids() {
        let lines = service_listing("atlantis");
        assert_eq!(lines.len(), service::all_services().len() * 2);
        assert!(lines.iter().any(|l| l.contains(DEFAULT_SERVICE_ID)));
        assert!(lines.iter().all(|l| !l.starts_with('*')));
    }

    #[test]
    fn selected_service_is_starred() {
        let lines = service_listing(DEFAULT_SERVICE_ID);
        assert!(lines[0].starts_with(&format!("* {DEFAULT_SERVICE_ID}")));
    }

    #[test]
    fn blank_types_select_nothing() {
        let args = SelectionArgs {
            types: String::new(),
            issuance: "review".to_string(),
            lookback: "week".to_string(),
        };
        assert!(args.selection().development_types.is_empty());
    }
}
