//! Feature record normalization.
//!
//! Maps one raw [`FeatureRecord`] plus the [`SelectionState`] that
//! produced it into a [`MarkerDescriptor`]. Status dates are shown in the
//! time zone the caller passes in.

use std::fmt;

use chrono::TimeZone;
use pdx_permits_permit_models::{
    DateField, FeatureRecord, IssuanceStage, MarkerDescriptor, PermitAttributes, Position,
    SelectionState,
};

use crate::parsing::{format_status_date, parse_epoch_millis};

/// Address shown when the record has no house number.
pub const NO_ADDRESS: &str = "No address";

/// Status date shown when the selected date field is missing.
pub const UNKNOWN_DATE: &str = "Unknown date";

/// Reasons a record cannot be fully normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The date column for the selected stage is `null` or out of range.
    #[error("Missing date field: {field}")]
    MissingDateField {
        /// Column name.
        field: &'static str,
    },

    /// The record has no point geometry to place on the map.
    #[error("Record has no geometry")]
    MissingGeometry,
}

/// `"{house} {direction} {street} {street type}"`, or [`NO_ADDRESS`] when
/// the house number is missing. Other missing parts render empty.
#[must_use]
pub fn format_address(attributes: &PermitAttributes) -> String {
    let Some(house) = attributes.house.as_deref() else {
        return NO_ADDRESS.to_string();
    };

    format!(
        "{house} {} {} {}",
        attributes.direction.as_deref().unwrap_or_default(),
        attributes.street.as_deref().unwrap_or_default(),
        attributes.street_type.as_deref().unwrap_or_default(),
    )
}

/// The selected stage's date as `M/D/YYYY` in `zone`.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingDateField`] if the column is `null` or
/// not a valid timestamp.
pub fn status_date<Tz: TimeZone>(
    attributes: &PermitAttributes,
    stage: IssuanceStage,
    zone: &Tz,
) -> Result<String, NormalizeError>
where
    Tz::Offset: fmt::Display,
{
    let field: DateField = stage.date_field();
    attributes
        .date_millis(field)
        .and_then(parse_epoch_millis)
        .map(|date| format_status_date(&date.with_timezone(zone)))
        .ok_or(NormalizeError::MissingDateField {
            field: field.column(),
        })
}

/// Normalizes one record.
///
/// A missing status date is not fatal: it renders as [`UNKNOWN_DATE`].
///
/// # Errors
///
/// Returns [`NormalizeError::MissingGeometry`] if the record cannot be
/// placed on the map.
pub fn normalize<Tz: TimeZone>(
    record: &FeatureRecord,
    selection: &SelectionState,
    zone: &Tz,
) -> Result<MarkerDescriptor, NormalizeError>
where
    Tz::Offset: fmt::Display,
{
    let geometry = record.geometry.ok_or(NormalizeError::MissingGeometry)?;
    let attributes = &record.attributes;

    let status_date = status_date(attributes, selection.issuance, zone).unwrap_or_else(|e| {
        log::debug!("{e}; showing placeholder");
        UNKNOWN_DATE.to_string()
    });

    Ok(MarkerDescriptor {
        // Source geometry is (x = longitude, y = latitude).
        position: Position {
            latitude: geometry.y,
            longitude: geometry.x,
        },
        address: format_address(attributes),
        development_type: attributes.development_type.clone(),
        status_date,
        square_feet: attributes.square_feet,
        description: attributes.description.as_deref().map(str::to_lowercase),
        detail_url: attributes.detail_url.clone(),
    })
}

/// Normalizes every record, skipping (and logging) those without
/// geometry. Returns the markers and the number skipped.
#[must_use]
pub fn normalize_all<Tz: TimeZone>(
    records: &[FeatureRecord],
    selection: &SelectionState,
    zone: &Tz,
) -> (Vec<MarkerDescriptor>, usize)
where
    Tz::Offset: fmt::Display,
{
    let mut markers = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match normalize(record, selection, zone) {
            Ok(marker) => markers.push(marker),
            Err(e) => {
                skipped += 1;
                log::warn!(
                    "Skipping permit at {}: {e}",
                    format_address(&record.attributes)
                );
            }
        }
    }

    (markers, skipped)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pdx_permits_permit_models::{DevTypeCode, LookbackWindow, PointGeometry};

    use super::*;

    fn record() -> FeatureRecord {
        serde_json::from_value(serde_json::json!({
            "attributes": {
                "HOUSE": 4215,
                "DIRECTION": "NE",
                "PROPSTREET": "ALBERTA",
                "STREETTYPE": "ST",
                "TYPE": "Single Family Dwelling",
                "TOTALSQFT": 2150,
                "DESCRIPTION": "NEW 2 STORY SFR WITH ATTACHED GARAGE",
                "PORTLAND_MAPS_URL": "https://www.portlandmaps.com/detail/permit/2024-123456-000-00-RS",
                "INTAKECOMPLETEDATE": 1_704_441_600_000_i64,
                "ISSUED": 1_709_596_800_000_i64,
                "FINALED": null
            },
            "geometry": { "x": -122.6187, "y": 45.5591 }
        }))
        .unwrap()
    }

    fn selection(stage: IssuanceStage) -> SelectionState {
        SelectionState::new([DevTypeCode::Sfr], stage, LookbackWindow::Months3)
    }

    #[test]
    fn formats_full_address() {
        assert_eq!(format_address(&record().attributes), "4215 NE ALBERTA ST");
    }

    #[test]
    fn missing_house_number_means_no_address() {
        let mut rec = record();
        rec.attributes.house = None;
        assert_eq!(format_address(&rec.attributes), NO_ADDRESS);
    }

    #[test]
    fn missing_components_render_empty() {
        let mut rec = record();
        rec.attributes.direction = None;
        assert_eq!(format_address(&rec.attributes), "4215  ALBERTA ST");
    }

    #[test]
    fn normalizes_issued_record() {
        let marker = normalize(&record(), &selection(IssuanceStage::Issued), &Utc).unwrap();

        assert!((marker.position.latitude - 45.5591).abs() < f64::EPSILON);
        assert!((marker.position.longitude - -122.6187).abs() < f64::EPSILON);
        assert_eq!(marker.address, "4215 NE ALBERTA ST");
        assert_eq!(marker.status_date, "3/5/2024");
        assert_eq!(
            marker.development_type.as_deref(),
            Some("Single Family Dwelling")
        );
        assert_eq!(marker.square_feet, Some(2150.0));
        assert_eq!(
            marker.description.as_deref(),
            Some("new 2 story sfr with attached garage")
        );
        assert!(marker.detail_url.unwrap().ends_with("RS"));
    }

    #[test]
    fn status_date_follows_stage() {
        let review = normalize(&record(), &selection(IssuanceStage::Review), &Utc).unwrap();
        assert_eq!(review.status_date, "1/5/2024");
    }

    #[test]
    fn missing_stage_date_uses_placeholder() {
        let finaled = normalize(&record(), &selection(IssuanceStage::Finaled), &Utc).unwrap();
        assert_eq!(finaled.status_date, UNKNOWN_DATE);
        assert_eq!(
            status_date(&record().attributes, IssuanceStage::Finaled, &Utc),
            Err(NormalizeError::MissingDateField { field: "FINALED" })
        );
    }

    #[test]
    fn nulls_pass_through() {
        let rec = FeatureRecord {
            attributes: PermitAttributes::default(),
            geometry: Some(PointGeometry { x: -122.6, y: 45.5 }),
        };
        let marker = normalize(&rec, &selection(IssuanceStage::Issued), &Utc).unwrap();
        assert_eq!(marker.address, NO_ADDRESS);
        assert_eq!(marker.square_feet, None);
        assert_eq!(marker.development_type, None);
        assert_eq!(marker.description, None);
    }

    #[test]
    fn skips_records_without_geometry() {
        let mut missing = record();
        missing.geometry = None;
        assert_eq!(
            normalize(&missing, &selection(IssuanceStage::Issued), &Utc),
            Err(NormalizeError::MissingGeometry)
        );

        let (markers, skipped) = normalize_all(
            &[record(), missing, record()],
            &selection(IssuanceStage::Issued),
            &Utc,
        );
        assert_eq!(markers.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn status_date_uses_given_zone() {
        let pacific = chrono::FixedOffset::west_opt(8 * 3600).unwrap();
        // ISSUED is midnight UTC on March 5th, still the 4th in Portland.
        let marker = normalize(&record(), &selection(IssuanceStage::Issued), &pacific).unwrap();
        assert_eq!(marker.status_date, "3/4/2024");
    }

    #[test]
    fn empty_point_is_skipped_beside_valid_record() {
        let empty: FeatureRecord = serde_json::from_value(serde_json::json!({
            "attributes": { "HOUSE": 99, "ISSUED": 1_709_596_800_000_i64 },
            "geometry": { "x": null, "y": null }
        }))
        .unwrap();

        let (markers, skipped) =
            normalize_all(&[empty, record()], &selection(IssuanceStage::Issued), &Utc);

        assert_eq!(skipped, 1);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].address, "4215 NE ALBERTA ST");
    }
}
