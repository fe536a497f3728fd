#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Permit feature-service fetching and normalization.
//!
//! A [`feature_service::FeatureSource`] answers a query plan with raw
//! feature records; [`normalize`] turns each record into a marker. The
//! [`search`] function runs one submission end to end.

pub mod feature_service;
pub mod normalize;
pub mod parsing;

use std::fmt;

use chrono::{DateTime, TimeZone};
use pdx_permits_permit_models::{MarkerDescriptor, SelectionState};
use pdx_permits_query::QueryPlan;

use crate::feature_service::FeatureSource;

/// Errors that can occur while querying a feature service.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (reading a saved response).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The body parsed as JSON but is not a feature query response.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description of what went wrong.
        message: String,
    },

    /// The service answered with an error object.
    #[error("Feature service error: {message}")]
    Service {
        /// Message reported by the service.
        message: String,
    },
}

/// Result of one search submission.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The plan that was sent.
    pub plan: QueryPlan,
    /// Normalized markers, in service order.
    pub markers: Vec<MarkerDescriptor>,
    /// Records dropped during normalization.
    pub skipped: usize,
    /// Whether the service truncated the result.
    pub truncated: bool,
}

/// Runs one submission: plan, query, normalize. The lookback cutoff day and
/// the status dates follow the zone of `now`.
///
/// # Errors
///
/// Returns [`SourceError`] if the source fails or answers with a malformed
/// response.
pub async fn search<Tz: TimeZone>(
    source: &dyn FeatureSource,
    selection: &SelectionState,
    now: DateTime<Tz>,
) -> Result<SearchOutcome, SourceError>
where
    Tz::Offset: fmt::Display,
{
    let zone = now.timezone();
    let plan = pdx_permits_query::plan(selection, now);

    log::info!(
        "Searching {} for {} permits in the last {}",
        source.label(),
        selection.issuance,
        plan.lookback.label
    );

    let page = source.query(&plan).await?;
    let (markers, skipped) = normalize::normalize_all(&page.features, selection, &zone);

    Ok(SearchOutcome {
        plan,
        markers,
        skipped,
        truncated: page.exceeded_transfer_limit,
    })
}
