//! Interactive search session.
//!
//! Mirrors the search form: development type checkboxes, then a single
//! choice each for permit stage and lookback window. Every submission
//! replaces the markers from the previous one.

use std::path::Path;

use dialoguer::{Confirm, MultiSelect, Select};
use pdx_permits_permit_models::{DevTypeCode, IssuanceStage, LookbackWindow, SelectionState};
use pdx_permits_query::lookback;
use pdx_permits_results::ResultSetManager;
use pdx_permits_source::feature_service::FeatureSource;

use crate::layer::TerminalLayer;

/// Prompts for one selection.
fn prompt_selection() -> Result<SelectionState, Box<dyn std::error::Error>> {
    let type_labels: Vec<String> = DevTypeCode::ALL
        .iter()
        .map(|code| format!("{code}: {}", code.label()))
        .collect();
    let defaults = vec![true; type_labels.len()];

    let checked = MultiSelect::new()
        .with_prompt("Development types (space=toggle, enter=confirm)")
        .items(&type_labels)
        .defaults(&defaults)
        .interact()?;

    let stage_labels: Vec<&str> = IssuanceStage::ALL.iter().map(|s| s.label()).collect();
    let stage = Select::new()
        .with_prompt("Permit stage")
        .items(&stage_labels)
        .default(1)
        .interact()?;

    let window_labels: Vec<&str> = LookbackWindow::ALL
        .iter()
        .map(|w| lookback::label(*w))
        .collect();
    let window = Select::new()
        .with_prompt("Look back")
        .items(&window_labels)
        .default(LookbackWindow::ALL.len() - 1)
        .interact()?;

    Ok(SelectionState::new(
        checked.into_iter().map(|i| DevTypeCode::ALL[i]),
        IssuanceStage::ALL[stage],
        LookbackWindow::ALL[window],
    ))
}

/// Runs search submissions until the user stops.
///
/// A failed search is reported and leaves the map empty; the session
/// continues.
///
/// # Errors
///
/// Returns an error if a prompt fails or the `GeoJSON` file cannot be
/// written.
pub async fn run(
    source: &dyn FeatureSource,
    geojson_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Portland permit search ({})", source.label());
    println!();

    let mut results = ResultSetManager::new(TerminalLayer::table());

    loop {
        let selection = prompt_selection()?;

        // Old markers come off the map as soon as a new search is submitted.
        results.clear();

        match pdx_permits_source::search(source, &selection, chrono::Local::now()).await {
            Ok(outcome) => {
                if outcome.truncated {
                    println!("Showing the first page only; narrow the search to see everything.");
                }
                let set = results.replace(outcome.markers);
                if let Some(path) = geojson_path {
                    crate::write_geojson(path, set.markers())?;
                }
            }
            Err(e) => {
                log::error!("Search failed: {e}");
            }
        }

        let again = Confirm::new()
            .with_prompt("Run another search?")
            .default(true)
            .interact()?;
        if !again {
            break;
        }
    }

    results.clear();
    Ok(())
}
