//! `ArcGIS` feature-service query client.
//!
//! Sends one GET per submission and parses the `features` array. There is
//! no pagination, retry, or timeout: a layer that sets
//! `exceededTransferLimit` is logged and the first page is used as-is.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pdx_permits_permit_models::FeatureRecord;
use pdx_permits_query::QueryPlan;
use pdx_permits_query::service::ServiceDefinition;
use serde::Deserialize as _;

use crate::SourceError;

/// Parsed body of a query response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePage {
    /// Returned features, in service order.
    pub features: Vec<FeatureRecord>,
    /// Whether the service truncated the result at its record limit.
    pub exceeded_transfer_limit: bool,
}

/// Something that can answer a [`QueryPlan`] with feature records.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Short label for log messages.
    fn label(&self) -> &str;

    /// Runs the query.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the records cannot be retrieved or the
    /// response is malformed.
    async fn query(&self, plan: &QueryPlan) -> Result<FeaturePage, SourceError>;
}

/// Parses a query response body.
///
/// # Errors
///
/// * [`SourceError::Service`] if the body is an `ArcGIS` error object.
/// * [`SourceError::MalformedResponse`] if `features` is missing, not an
///   array, or contains an element that is not a feature record.
pub fn parse_response(body: &serde_json::Value) -> Result<FeaturePage, SourceError> {
    if let Some(error) = body.get("error") {
        return Err(SourceError::Service {
            message: error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    let raw = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::MalformedResponse {
            message: "no features array in response".to_string(),
        })?;

    let features = raw
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            FeatureRecord::deserialize(feature).map_err(|e| SourceError::MalformedResponse {
                message: format!("feature {i}: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let exceeded_transfer_limit = body
        .get("exceededTransferLimit")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    Ok(FeaturePage {
        features,
        exceeded_transfer_limit,
    })
}

/// Live feature service over HTTP.
pub struct HttpFeatureSource {
    client: reqwest::Client,
    service: ServiceDefinition,
}

impl HttpFeatureSource {
    /// Creates a client for `service`.
    #[must_use]
    pub fn new(service: ServiceDefinition) -> Self {
        Self {
            client: reqwest::Client::new(),
            service,
        }
    }

    /// The service being queried.
    #[must_use]
    pub const fn service(&self) -> &ServiceDefinition {
        &self.service
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    fn label(&self) -> &str {
        &self.service.name
    }

    async fn query(&self, plan: &QueryPlan) -> Result<FeaturePage, SourceError> {
        let url = plan.request(&self.service).url();
        log::debug!("{}: GET {url}", self.service.id);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: serde_json::Value = serde_json::from_str(&response.text().await?)?;
        let page = parse_response(&body)?;

        if page.exceeded_transfer_limit {
            log::warn!(
                "{}: result truncated at {} records (exceededTransferLimit)",
                self.service.id,
                page.features.len()
            );
        }
        log::info!(
            "{}: {} features returned",
            self.service.id,
            page.features.len()
        );

        Ok(page)
    }
}

/// A previously saved query response on disk.
///
/// The service already applied some where clause to it, so the plan's
/// predicate is evaluated again locally before records are returned.
pub struct SavedResponseSource {
    path: PathBuf,
}

impl SavedResponseSource {
    /// Reads from `path` on each query.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the saved response.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeatureSource for SavedResponseSource {
    fn label(&self) -> &str {
        "saved response"
    }

    async fn query(&self, plan: &QueryPlan) -> Result<FeaturePage, SourceError> {
        let text = std::fs::read_to_string(&self.path)?;
        let body: serde_json::Value = serde_json::from_str(&text)?;
        let page = parse_response(&body)?;
        Ok(filter_page(page, plan))
    }
}

/// Fixed in-memory records, filtered by the plan's predicate.
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureSource {
    features: Vec<FeatureRecord>,
}

impl StaticFeatureSource {
    /// Serves `features`.
    #[must_use]
    pub const fn new(features: Vec<FeatureRecord>) -> Self {
        Self { features }
    }
}

#[async_trait]
impl FeatureSource for StaticFeatureSource {
    fn label(&self) -> &str {
        "in-memory"
    }

    async fn query(&self, plan: &QueryPlan) -> Result<FeaturePage, SourceError> {
        Ok(filter_page(
            FeaturePage {
                features: self.features.clone(),
                exceeded_transfer_limit: false,
            },
            plan,
        ))
    }
}

/// Keeps only features that satisfy the plan's predicate.
#[must_use]
pub fn filter_page(page: FeaturePage, plan: &QueryPlan) -> FeaturePage {
    let before = page.features.len();
    let features: Vec<FeatureRecord> = page
        .features
        .into_iter()
        .filter(|f| plan.predicate.evaluate(&f.attributes))
        .collect();

    log::debug!("local filter kept {} of {before} features", features.len());

    FeaturePage {
        features,
        exceeded_transfer_limit: page.exceeded_transfer_limit,
    }
}
