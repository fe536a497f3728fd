//! Marker popup markup.
//!
//! Every interpolated value is HTML-escaped by the template engine, so a
//! permit description containing markup shows up as text.

use askama::Template;
use pdx_permits_permit_models::MarkerDescriptor;

use crate::ResultsError;

#[derive(Template)]
#[template(path = "popup.html")]
struct PopupTemplate<'a> {
    address: &'a str,
    development_type: &'a str,
    status_date: &'a str,
    square_feet: String,
    description: &'a str,
    detail_url: Option<&'a str>,
}

/// Square footage as shown in the popup: whole numbers without a
/// fractional part, empty when unknown.
#[must_use]
pub fn format_square_feet(square_feet: Option<f64>) -> String {
    match square_feet {
        #[allow(clippy::cast_possible_truncation)]
        Some(value) if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 => {
            (value as i64).to_string()
        }
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

/// Renders the popup for one marker.
///
/// # Errors
///
/// Returns [`ResultsError::Template`] if rendering fails.
pub fn popup_html(marker: &MarkerDescriptor) -> Result<String, ResultsError> {
    let template = PopupTemplate {
        address: &marker.address,
        development_type: marker.development_type.as_deref().unwrap_or_default(),
        status_date: &marker.status_date,
        square_feet: format_square_feet(marker.square_feet),
        description: marker.description.as_deref().unwrap_or_default(),
        detail_url: marker.detail_url.as_deref(),
    };
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use pdx_permits_permit_models::Position;

    use super::*;

    fn marker() -> MarkerDescriptor {
        MarkerDescriptor {
            position: Position {
                latitude: 45.52,
                longitude: -122.68,
            },
            address: "1900 SW 4TH AVE".to_string(),
            development_type: Some("Duplex".to_string()),
            status_date: "2/9/2024".to_string(),
            square_feet: Some(2400.0),
            description: Some("new duplex".to_string()),
            detail_url: Some("https://www.portlandmaps.com/detail/permit/1".to_string()),
        }
    }

    #[test]
    fn renders_fields() {
        let html = popup_html(&marker()).unwrap();
        assert!(html.starts_with("<div class=\"dev-popup\"><h5>1900 SW 4TH AVE</h5>"));
        assert!(html.contains("<p><b>Type: </b>Duplex</p>"));
        assert!(html.contains("<p><b>Status date: </b>2/9/2024</p>"));
        assert!(html.contains("<p><b>Square feet: </b>2400</p>"));
        assert!(html.contains("<small>new duplex</small>"));
        assert!(html.contains("View in Portland Maps</a>"));
    }

    #[test]
    fn escapes_description_markup() {
        let mut m = marker();
        m.description = Some("<script>alert(1)</script> & more".to_string());
        let html = popup_html(&m).unwrap();
        assert!(!html.contains("<script>"));
        assert!(!html.contains(" & more"));
        assert!(html.contains("<small>&#60;script&#62;alert(1)&#60;/script&#62; &#38; more</small>"));
    }

    #[test]
    fn escapes_detail_url_attribute() {
        let mut m = marker();
        m.detail_url = Some("https://x.test/?a=1&b=\"><script>".to_string());
        let html = popup_html(&m).unwrap();
        assert!(!html.contains("\"><script>"));
        assert!(html.contains("<a href=\"https://x.test/?a=1&#38;b=&#34;&#62;&#60;script&#62;\">"));
    }

    #[test]
    fn omits_link_without_url() {
        let mut m = marker();
        m.detail_url = None;
        let html = popup_html(&m).unwrap();
        assert!(!html.contains("<a href"));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn formats_square_feet() {
        assert_eq!(format_square_feet(Some(1800.0)), "1800");
        assert_eq!(format_square_feet(Some(1800.5)), "1800.5");
        assert_eq!(format_square_feet(None), "");
    }
}
