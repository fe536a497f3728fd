#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The live set of permit markers and its hand-off to a map renderer.
//!
//! [`ResultSetManager`] owns exactly one [`ResultSet`] at a time. Each
//! submission replaces it wholesale: the previous set is detached from the
//! [`MarkerLayer`] before the new one is attached, and nothing is merged.

pub mod export;
pub mod popup;

use pdx_permits_permit_models::MarkerDescriptor;

/// Errors producing renderable output from markers.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// Popup template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable batch of markers from one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    generation: u64,
    markers: Vec<MarkerDescriptor>,
}

impl ResultSet {
    /// Sequence number of the submission that produced this set. Starts at 1.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Markers in service order.
    #[must_use]
    pub fn markers(&self) -> &[MarkerDescriptor] {
        &self.markers
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the set has no markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// The map-rendering side of the hand-off.
pub trait MarkerLayer {
    /// Shows every marker of `set`.
    fn attach(&mut self, set: &ResultSet);

    /// Removes every marker of `set`. Called before the set is dropped.
    fn detach(&mut self, set: &ResultSet);
}

/// Owns the live result set and keeps the layer in sync with it.
pub struct ResultSetManager<L: MarkerLayer> {
    layer: L,
    live: Option<ResultSet>,
    generation: u64,
}

impl<L: MarkerLayer> ResultSetManager<L> {
    /// Creates a manager with nothing attached.
    #[must_use]
    pub const fn new(layer: L) -> Self {
        Self {
            layer,
            live: None,
            generation: 0,
        }
    }

    /// Detaches and drops the live set, if any.
    pub fn clear(&mut self) {
        if let Some(previous) = self.live.take() {
            log::debug!(
                "Detaching result set #{} ({} markers)",
                previous.generation,
                previous.len()
            );
            self.layer.detach(&previous);
        }
    }

    /// Replaces the live set with `markers`. The previous set is detached
    /// and released first.
    pub fn replace(&mut self, markers: Vec<MarkerDescriptor>) -> &ResultSet {
        self.clear();

        self.generation += 1;
        let set = ResultSet {
            generation: self.generation,
            markers,
        };
        log::debug!(
            "Attaching result set #{} ({} markers)",
            set.generation,
            set.len()
        );
        self.layer.attach(&set);

        self.live.insert(set)
    }

    /// The live set, if one is attached.
    #[must_use]
    pub const fn current(&self) -> Option<&ResultSet> {
        self.live.as_ref()
    }

    /// Markers of the live set; empty when nothing is attached.
    #[must_use]
    pub fn markers(&self) -> &[MarkerDescriptor] {
        self.live.as_ref().map(ResultSet::markers).unwrap_or_default()
    }

    /// Number of live markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers().len()
    }

    /// Whether no markers are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers().is_empty()
    }

    /// The renderer.
    #[must_use]
    pub const fn layer(&self) -> &L {
        &self.layer
    }
}

#[cfg(test)]
mod tests {
    use pdx_permits_permit_models::Position;

    use super::*;

    /// Tracks which generations are currently on the map.
    #[derive(Default)]
    struct RecordingLayer {
        shown: Vec<u64>,
        events: Vec<String>,
    }

    impl MarkerLayer for RecordingLayer {
        fn attach(&mut self, set: &ResultSet) {
            self.shown.push(set.generation());
            self.events.push(format!("attach {}", set.generation()));
        }

        fn detach(&mut self, set: &ResultSet) {
            self.shown.retain(|g| *g != set.generation());
            self.events.push(format!("detach {}", set.generation()));
        }
    }

    fn markers(addresses: &[&str]) -> Vec<MarkerDescriptor> {
        addresses
            .iter()
            .map(|address| MarkerDescriptor {
                position: Position {
                    latitude: 45.5,
                    longitude: -122.6,
                },
                address: (*address).to_string(),
                development_type: None,
                status_date: "1/1/2024".to_string(),
                square_feet: None,
                description: None,
                detail_url: None,
            })
            .collect()
    }

    #[test]
    fn starts_empty() {
        let manager = ResultSetManager::new(RecordingLayer::default());
        assert!(manager.current().is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn second_replace_leaves_only_second_set() {
        let mut manager = ResultSetManager::new(RecordingLayer::default());
        manager.replace(markers(&["A", "B"]));
        manager.replace(markers(&["C"]));

        let addresses: Vec<&str> = manager.markers().iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addresses, ["C"]);
        assert_eq!(manager.current().unwrap().generation(), 2);
        assert_eq!(manager.layer().shown, [2]);
        assert_eq!(
            manager.layer().events,
            ["attach 1", "detach 1", "attach 2"]
        );
    }

    #[test]
    fn replace_does_not_deduplicate() {
        let mut manager = ResultSetManager::new(RecordingLayer::default());
        let set = manager.replace(markers(&["A", "A"]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn clear_detaches_live_set() {
        let mut manager = ResultSetManager::new(RecordingLayer::default());
        manager.replace(markers(&["A"]));
        manager.clear();
        manager.clear();

        assert!(manager.current().is_none());
        assert!(manager.layer().shown.is_empty());
        assert_eq!(manager.layer().events, ["attach 1", "detach 1"]);
    }

    #[test]
    fn empty_replace_still_replaces() {
        let mut manager = ResultSetManager::new(RecordingLayer::default());
        manager.replace(markers(&["A"]));
        manager.replace(Vec::new());
        assert!(manager.is_empty());
        assert_eq!(manager.current().unwrap().generation(), 2);
    }
}
