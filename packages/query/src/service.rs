//! Feature service registry: loads service definitions from embedded TOML
//! configs.
//!
//! Each `.toml` file in `packages/query/services/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new layer is a matter of
//! creating a TOML file and listing it below.

use serde::Deserialize;

use crate::assemble::{FIXED_PARAMS, QueryRequest};
use crate::predicate::Predicate;

/// Service used when nothing else is configured.
pub const DEFAULT_SERVICE_ID: &str = "portland_residential";

/// TOML configs embedded at compile time.
const SERVICE_TOMLS: &[(&str, &str)] = &[(
    "portland_residential",
    include_str!("../services/portland_residential.toml"),
)];

/// Errors resolving a service definition.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No service with this id is configured.
    #[error("Unknown feature service: {id}")]
    Unknown {
        /// The requested id.
        id: String,
    },

    /// A service config could not be parsed.
    #[error("Invalid service config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A queryable feature-service layer.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// Unique identifier (e.g., `"portland_residential"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// City the layer covers.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// Layer URL; `query?` is appended to it.
    pub base_url: String,
    /// Human-readable portal for the data.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// Values that replace entries of the fixed parameter set.
    #[serde(default)]
    pub params: Vec<ParamOverride>,
}

/// One fixed-parameter override.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamOverride {
    /// Parameter name.
    pub name: String,
    /// Replacement value.
    pub value: String,
}

impl ServiceDefinition {
    /// Builds the query for `predicate` against this layer.
    #[must_use]
    pub fn request(&self, predicate: &Predicate) -> QueryRequest {
        let mut request = QueryRequest::new(&self.base_url, FIXED_PARAMS);
        for param in &self.params {
            request.set(&param.name, param.value.clone());
        }
        request.with_where(predicate)
    }
}

/// Parses a service definition from TOML.
///
/// # Errors
///
/// Returns [`ServiceError::Parse`] if the TOML is malformed or missing
/// required fields.
pub fn parse_service_toml(toml_str: &str) -> Result<ServiceDefinition, ServiceError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Returns all configured service definitions.
///
/// # Panics
///
/// Panics if an embedded TOML config is malformed.
#[must_use]
pub fn all_services() -> Vec<ServiceDefinition> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_service_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a service by id.
///
/// # Errors
///
/// Returns [`ServiceError::Unknown`] if no service has this id.
pub fn find_service(id: &str) -> Result<ServiceDefinition, ServiceError> {
    all_services()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| ServiceError::Unknown { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), SERVICE_TOMLS.len());
        for service in &services {
            assert!(!service.id.is_empty());
            assert!(service.base_url.starts_with("https://"), "{}", service.id);
        }
    }

    #[test]
    fn default_service_exists() {
        let service = find_service(DEFAULT_SERVICE_ID).unwrap();
        assert_eq!(service.city, "Portland");
        assert!(service.base_url.ends_with("/MapServer/15/"));
    }

    #[test]
    fn unknown_service_is_an_error() {
        assert!(matches!(
            find_service("atlantis"),
            Err(ServiceError::Unknown { id }) if id == "atlantis"
        ));
    }

    #[test]
    fn overrides_replace_fixed_values_in_place() {
        let toml_str = r#"
            id = "test"
            name = "Test layer"
            city = "Portland"
            state = "OR"
            base_url = "https://example.com/MapServer/3"

            [[params]]
            name = "f"
            value = "json"

            [[params]]
            name = "resultRecordCount"
            value = "500"
        "#;
        let service = parse_service_toml(toml_str).unwrap();
        let request = service.request(&Predicate::is_null("FINALED"));

        assert_eq!(request.base_url, "https://example.com/MapServer/3/");
        assert_eq!(request.get("f"), Some("json"));
        assert_eq!(request.get("resultRecordCount"), Some("500"));
        assert_eq!(request.get("where"), Some("\"FINALED\" IS null"));
        assert_eq!(request.params.len(), FIXED_PARAMS.len());
    }

    #[test]
    fn rejects_incomplete_config() {
        assert!(matches!(
            parse_service_toml("id = \"x\""),
            Err(ServiceError::Parse(_))
        ));
    }
}
