//! Query URL assembly for `ArcGIS` `MapServer` layers.
//!
//! The full parameter list is always sent, most of it empty, so the
//! service never falls back to its own defaults for spatial reference or
//! output format.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::predicate::Predicate;

/// Path segment appended to the layer URL.
pub const QUERY_PATH: &str = "query?";

/// Name of the where-clause parameter.
pub const WHERE_PARAM: &str = "where";

/// Fixed query parameters, in the order they are sent. `outSR=4326` makes
/// the service return WGS84 longitude/latitude pairs.
pub const FIXED_PARAMS: &[(&str, &str)] = &[
    (WHERE_PARAM, ""),
    ("text", ""),
    ("objectIds", ""),
    ("time", ""),
    ("geometry", ""),
    ("geometryType", "esriGeometryEnvelope"),
    ("inSR", ""),
    ("spatialRel", "esriSpatialRelIntersects"),
    ("relationParam", ""),
    ("outFields", "*"),
    ("returnGeometry", "true"),
    ("returnTrueCurves", "false"),
    ("maxAllowableOffset", ""),
    ("geometryPrecision", ""),
    ("outSR", "4326"),
    ("returnIdsOnly", "false"),
    ("returnCountOnly", "false"),
    ("orderByFields", ""),
    ("groupByFieldsForStatistics", ""),
    ("outStatistics", ""),
    ("returnZ", "false"),
    ("returnM", "false"),
    ("gdbVersion", ""),
    ("returnDistinctValues", "false"),
    ("resultOffset", ""),
    ("resultRecordCount", ""),
    ("queryByDistance", ""),
    ("returnExtentsOnly", "false"),
    ("datumTransformation", ""),
    ("parameterValues", ""),
    ("rangeValues", ""),
    ("f", "pjson"),
];

/// Characters escaped when encoding a whole URI: everything outside the
/// URI reserved and unreserved sets. Reserved delimiters such as `&`, `=`
/// and `'` pass through untouched.
const URI: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A query against one layer: base URL plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Layer URL, ending in `/`.
    pub base_url: String,
    /// Parameters in send order. Values may be empty but are never absent.
    pub params: Vec<(String, String)>,
}

impl QueryRequest {
    /// Starts a request against `base_url` with the given parameter set.
    #[must_use]
    pub fn new(base_url: &str, params: &[(&str, &str)]) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            base_url,
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Starts a request with [`FIXED_PARAMS`].
    #[must_use]
    pub fn with_fixed_params(base_url: &str) -> Self {
        Self::new(base_url, FIXED_PARAMS)
    }

    /// Sets a parameter, keeping its position if it already exists and
    /// appending it otherwise.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.params.push((key.to_string(), value));
        }
    }

    /// Current value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets the `where` parameter to the rendered predicate.
    #[must_use]
    pub fn with_where(mut self, predicate: &Predicate) -> Self {
        self.set(WHERE_PARAM, predicate.to_string());
        self
    }

    /// `query?k1=v1&k2=v2&...&`, unencoded. Every pair is followed by `&`,
    /// including the last.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut out = String::from(QUERY_PATH);
        for (key, value) in &self.params {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('&');
        }
        out
    }

    /// The full request URL after one URI encoding pass.
    #[must_use]
    pub fn url(&self) -> String {
        encode_uri(&format!("{}{}", self.base_url, self.query_string()))
    }
}

/// Percent-encodes a complete URI, leaving reserved delimiters intact.
#[must_use]
pub fn encode_uri(raw: &str) -> String {
    utf8_percent_encode(raw, URI).to_string()
}

/// Builds the encoded request URL for `predicate` against `base_url`.
#[must_use]
pub fn assemble(base_url: &str, fixed_params: &[(&str, &str)], predicate: &str) -> String {
    let mut request = QueryRequest::new(base_url, fixed_params);
    request.set(WHERE_PARAM, predicate);
    request.url()
}
