#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Permit selection types, raw feature-service records, and the normalized
//! marker format.
//!
//! A [`SelectionState`] captures what the user asked for. The feature
//! service answers with [`FeatureRecord`]s, each of which is normalized into
//! one [`MarkerDescriptor`] ready for a map renderer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A development type checkbox in the search form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DevTypeCode {
    /// Single family residence
    Sfr,
    /// Townhouse / rowhouse
    Thrh,
    /// Duplex
    Duplex,
}

impl DevTypeCode {
    /// All codes, in the order the selection is checked when building the
    /// `TYPE` membership list.
    pub const ALL: &[Self] = &[Self::Sfr, Self::Thrh, Self::Duplex];

    /// The `TYPE` attribute values this code stands for.
    #[must_use]
    pub const fn type_labels(self) -> &'static [&'static str] {
        match self {
            Self::Sfr => &["Single Family Dwelling"],
            Self::Thrh => &["Townhouse (2 Units)", "Townhouse (3 or more units)"],
            Self::Duplex => &["Duplex"],
        }
    }

    /// Short human-readable label for prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sfr => "Single family residence",
            Self::Thrh => "Townhouse / rowhouse",
            Self::Duplex => "Duplex",
        }
    }
}

/// Permit lifecycle stage. Decides which date field filters and displays.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssuanceStage {
    /// Intake complete, not yet issued
    Review,
    /// Issued, not yet finaled
    Issued,
    /// Finaled
    Finaled,
}

impl IssuanceStage {
    /// All stages, in form order.
    pub const ALL: &[Self] = &[Self::Review, Self::Issued, Self::Finaled];

    /// Parses a form value. Anything unrecognized is treated as
    /// [`IssuanceStage::Finaled`].
    #[must_use]
    pub fn from_selection(value: &str) -> Self {
        value.trim().parse().unwrap_or(Self::Finaled)
    }

    /// The date field that governs this stage.
    #[must_use]
    pub const fn date_field(self) -> DateField {
        match self {
            Self::Review => DateField::IntakeComplete,
            Self::Issued => DateField::Issued,
            Self::Finaled => DateField::Finaled,
        }
    }

    /// Short human-readable label for prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Review => "Under review",
            Self::Issued => "Issued",
            Self::Finaled => "Finaled",
        }
    }
}

/// How far back to look for permit activity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LookbackWindow {
    /// Last 7 days
    Week,
    /// Last 30 days
    Months1,
    /// Last 90 days
    Months3,
    /// Last 180 days
    Months6,
    /// Last 365 days
    Months12,
    /// The form's default ("18 months")
    Default18Months,
}

impl LookbackWindow {
    /// All windows, in form order.
    pub const ALL: &[Self] = &[
        Self::Week,
        Self::Months1,
        Self::Months3,
        Self::Months6,
        Self::Months12,
        Self::Default18Months,
    ];

    /// Parses a form value. Anything unrecognized is treated as
    /// [`LookbackWindow::Default18Months`].
    #[must_use]
    pub fn from_selection(value: &str) -> Self {
        value.trim().parse().unwrap_or(Self::Default18Months)
    }
}

/// One of the three permit date columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    /// `INTAKECOMPLETEDATE`
    IntakeComplete,
    /// `ISSUED`
    Issued,
    /// `FINALED`
    Finaled,
}

impl DateField {
    /// Column name on the feature service.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::IntakeComplete => "INTAKECOMPLETEDATE",
            Self::Issued => "ISSUED",
            Self::Finaled => "FINALED",
        }
    }
}

/// A single search submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// Checked development types. May be empty.
    pub development_types: BTreeSet<DevTypeCode>,
    /// Selected permit stage.
    pub issuance: IssuanceStage,
    /// Selected lookback window.
    pub lookback: LookbackWindow,
}

impl SelectionState {
    /// Builds a selection from its parts.
    #[must_use]
    pub fn new(
        development_types: impl IntoIterator<Item = DevTypeCode>,
        issuance: IssuanceStage,
        lookback: LookbackWindow,
    ) -> Self {
        Self {
            development_types: development_types.into_iter().collect(),
            issuance,
            lookback,
        }
    }

    /// Builds a selection from raw form values. Unknown development type
    /// codes are dropped; unknown radio values fall back to their defaults.
    #[must_use]
    pub fn from_form<'a>(
        development_types: impl IntoIterator<Item = &'a str>,
        issuance: &str,
        lookback: &str,
    ) -> Self {
        Self::new(
            development_types
                .into_iter()
                .filter_map(|code| code.trim().parse().ok()),
            IssuanceStage::from_selection(issuance),
            LookbackWindow::from_selection(lookback),
        )
    }

    /// Whether the given development type is checked.
    #[must_use]
    pub fn includes(&self, code: DevTypeCode) -> bool {
        self.development_types.contains(&code)
    }
}

/// Attribute block of one residential construction permit feature.
///
/// Every field may be `null` on the wire. Date fields are epoch
/// milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitAttributes {
    /// House number. Arrives as either a number or a string.
    #[serde(rename = "HOUSE", default, deserialize_with = "text_or_number")]
    pub house: Option<String>,
    /// Street direction prefix (e.g., `"NE"`).
    #[serde(rename = "DIRECTION", default)]
    pub direction: Option<String>,
    /// Street name.
    #[serde(rename = "PROPSTREET", default)]
    pub street: Option<String>,
    /// Street type (e.g., `"AVE"`).
    #[serde(rename = "STREETTYPE", default)]
    pub street_type: Option<String>,
    /// Development type label (e.g., `"Single Family Dwelling"`).
    #[serde(rename = "TYPE", default)]
    pub development_type: Option<String>,
    /// Total square footage.
    #[serde(rename = "TOTALSQFT", default)]
    pub square_feet: Option<f64>,
    /// Free-text work description.
    #[serde(rename = "DESCRIPTION", default)]
    pub description: Option<String>,
    /// Link to the permit on Portland Maps.
    #[serde(rename = "PORTLAND_MAPS_URL", default)]
    pub detail_url: Option<String>,
    /// When intake completed (epoch ms).
    #[serde(rename = "INTAKECOMPLETEDATE", default)]
    pub intake_complete_date: Option<i64>,
    /// When the permit was issued (epoch ms).
    #[serde(rename = "ISSUED", default)]
    pub issued: Option<i64>,
    /// When the permit was finaled (epoch ms).
    #[serde(rename = "FINALED", default)]
    pub finaled: Option<i64>,
}

impl PermitAttributes {
    /// Raw epoch-millisecond value of a date column.
    #[must_use]
    pub const fn date_millis(&self, field: DateField) -> Option<i64> {
        match field {
            DateField::IntakeComplete => self.intake_complete_date,
            DateField::Issued => self.issued,
            DateField::Finaled => self.finaled,
        }
    }

    /// Typed value of a column by its service name. Unknown columns read
    /// as [`FieldValue::Null`].
    #[must_use]
    pub fn field(&self, column: &str) -> FieldValue {
        let text = |v: &Option<String>| v.clone().map_or(FieldValue::Null, FieldValue::Text);
        let date = |v: Option<i64>| {
            v.and_then(DateTime::from_timestamp_millis)
                .map_or(FieldValue::Null, FieldValue::Date)
        };

        match column {
            "HOUSE" => text(&self.house),
            "DIRECTION" => text(&self.direction),
            "PROPSTREET" => text(&self.street),
            "STREETTYPE" => text(&self.street_type),
            "TYPE" => text(&self.development_type),
            "DESCRIPTION" => text(&self.description),
            "PORTLAND_MAPS_URL" => text(&self.detail_url),
            "TOTALSQFT" => self.square_feet.map_or(FieldValue::Null, FieldValue::Number),
            "INTAKECOMPLETEDATE" => date(self.intake_complete_date),
            "ISSUED" => date(self.issued),
            "FINALED" => date(self.finaled),
            _ => FieldValue::Null,
        }
    }
}

/// Typed view of one attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent or `null`
    Null,
    /// String attribute
    Text(String),
    /// Numeric attribute
    Number(f64),
    /// Date attribute
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Whether the value is absent.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Point geometry in the requested output spatial reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    /// Longitude (WGS84).
    pub x: f64,
    /// Latitude (WGS84).
    pub y: f64,
}

/// One element of the service's `features` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Flat attribute map.
    #[serde(default)]
    pub attributes: PermitAttributes,
    /// Point location. `None` when the service returns no geometry or an
    /// empty point (`null` or `"NaN"` coordinates).
    #[serde(default, deserialize_with = "point_or_empty")]
    pub geometry: Option<PointGeometry>,
}

/// Map position of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// A permit normalized for display as a map marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDescriptor {
    /// Where to place the marker.
    pub position: Position,
    /// Street address, or `"No address"`.
    pub address: String,
    /// Development type label as reported by the service.
    pub development_type: Option<String>,
    /// Date of the selected stage, formatted `M/D/YYYY`.
    pub status_date: String,
    /// Total square footage.
    pub square_feet: Option<f64>,
    /// Lower-cased work description.
    pub description: Option<String>,
    /// Link to the permit detail page.
    pub detail_url: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(format_number(&n)),
        Some(other) => Some(other.to_string()),
    })
}

/// Integral values print without a fractional part (`1234.0` -> `1234`).
fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(value)
            if n.is_f64() && value.fract().abs() < f64::EPSILON && value.abs() < 1e15 =>
        {
            (value as i64).to_string()
        }
        _ => n.to_string(),
    }
}

fn point_or_empty<'de, D>(deserializer: D) -> Result<Option<PointGeometry>, D::Error>
where
    D: Deserializer<'de>,
{
    let coordinate = |point: &serde_json::Map<String, serde_json::Value>, key: &str| {
        point
            .get(key)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
    };

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(point)) => Ok(coordinate(&point, "x")
            .zip(coordinate(&point, "y"))
            .map(|(x, y)| PointGeometry { x, y })),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected point geometry, got {other}"
        ))),
    }
}
