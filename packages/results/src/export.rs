//! `GeoJSON` export of a result set.
//!
//! Produces a `FeatureCollection` of points (`[longitude, latitude]`)
//! whose properties are the marker fields plus the rendered popup, which
//! any web map library can load directly.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use pdx_permits_permit_models::MarkerDescriptor;

use crate::ResultsError;
use crate::popup::popup_html;

/// Converts one marker to a point feature.
///
/// # Errors
///
/// Returns [`ResultsError`] if the marker cannot be serialized or its popup
/// cannot be rendered.
pub fn marker_feature(marker: &MarkerDescriptor) -> Result<Feature, ResultsError> {
    let mut properties = match serde_json::to_value(marker)? {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    properties.remove("position");
    properties.insert(
        "popup".to_string(),
        serde_json::Value::String(popup_html(marker)?),
    );

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            marker.position.longitude,
            marker.position.latitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Converts markers to a feature collection, preserving order.
///
/// # Errors
///
/// Returns [`ResultsError`] if any marker fails to convert.
pub fn feature_collection(markers: &[MarkerDescriptor]) -> Result<FeatureCollection, ResultsError> {
    Ok(FeatureCollection {
        bbox: None,
        features: markers
            .iter()
            .map(marker_feature)
            .collect::<Result<Vec<_>, _>>()?,
        foreign_members: None,
    })
}

/// Serializes markers as a pretty-printed `GeoJSON` document.
///
/// # Errors
///
/// Returns [`ResultsError`] if conversion or serialization fails.
pub fn to_geojson_string(markers: &[MarkerDescriptor]) -> Result<String, ResultsError> {
    Ok(serde_json::to_string_pretty(&feature_collection(markers)?)?)
}

#[cfg(test)]
mod tests {
    use pdx_permits_permit_models::Position;

    use super::*;

    fn marker(address: &str, latitude: f64, longitude: f64) -> MarkerDescriptor {
        MarkerDescriptor {
            position: Position {
                latitude,
                longitude,
            },
            address: address.to_string(),
            development_type: Some("Single Family Dwelling".to_string()),
            status_date: "5/1/2024".to_string(),
            square_feet: None,
            description: None,
            detail_url: None,
        }
    }

    #[test]
    fn points_are_longitude_first() {
        let feature = marker_feature(&marker("1 N MAIN ST", 45.5, -122.6)).unwrap();
        let geometry = feature.geometry.unwrap();
        assert_eq!(geometry.value, Value::Point(vec![-122.6, 45.5]));
    }

    #[test]
    fn properties_carry_marker_fields() {
        let feature = marker_feature(&marker("1 N MAIN ST", 45.5, -122.6)).unwrap();
        let props = feature.properties.unwrap();
        assert_eq!(props["address"], "1 N MAIN ST");
        assert_eq!(props["statusDate"], "5/1/2024");
        assert_eq!(props["squareFeet"], serde_json::Value::Null);
        assert!(props["popup"].as_str().unwrap().contains("1 N MAIN ST"));
        assert!(!props.contains_key("position"));
    }

    #[test]
    fn collection_keeps_order() {
        let markers = [marker("A", 45.0, -122.0), marker("B", 45.1, -122.1)];
        let json: serde_json::Value =
            serde_json::from_str(&to_geojson_string(&markers).unwrap()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["properties"]["address"], "A");
        assert_eq!(json["features"][1]["properties"]["address"], "B");
    }
}
