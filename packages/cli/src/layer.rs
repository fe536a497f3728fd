//! Terminal stand-in for the map: prints markers as a table.

use pdx_permits_results::popup::format_square_feet;
use pdx_permits_results::{MarkerLayer, ResultSet};

/// Prints each attached result set to stdout.
pub struct TerminalLayer {
    print_table: bool,
}

impl TerminalLayer {
    /// A layer that prints a table for every attached set.
    #[must_use]
    pub const fn table() -> Self {
        Self { print_table: true }
    }

    /// A layer that only logs; used when results are written elsewhere.
    #[must_use]
    pub const fn quiet() -> Self {
        Self { print_table: false }
    }
}

impl MarkerLayer for TerminalLayer {
    fn attach(&mut self, set: &ResultSet) {
        log::info!("Showing {} permits", set.len());
        if !self.print_table {
            return;
        }
        if set.is_empty() {
            println!("No matching permits.");
            return;
        }

        println!(
            "{:<32} {:<28} {:>11} {:>8}  {:>21}",
            "Address", "Type", "Status date", "Sq ft", "Lat, Lon"
        );
        for marker in set.markers() {
            println!(
                "{:<32} {:<28} {:>11} {:>8}  {:>10.5},{:>10.5}",
                marker.address,
                marker.development_type.as_deref().unwrap_or("-"),
                marker.status_date,
                format_square_feet(marker.square_feet),
                marker.position.latitude,
                marker.position.longitude,
            );
        }
        println!();
    }

    fn detach(&mut self, set: &ResultSet) {
        log::debug!("Removed {} permits from the previous search", set.len());
    }
}
