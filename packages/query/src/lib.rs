#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Where-clause construction and query URL assembly.
//!
//! A [`SelectionState`] is turned into a [`QueryPlan`]: the resolved
//! lookback window plus the predicate tree. The plan renders into a
//! [`assemble::QueryRequest`] for a configured feature service.

pub mod assemble;
pub mod lookback;
pub mod predicate;
pub mod service;

use chrono::{DateTime, TimeZone};
use pdx_permits_permit_models::SelectionState;

use crate::assemble::QueryRequest;
use crate::lookback::Lookback;
use crate::predicate::{Predicate, where_predicate};
use crate::service::ServiceDefinition;

/// Everything derived from one submission before it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Resolved lookback window.
    pub lookback: Lookback,
    /// Complete where clause.
    pub predicate: Predicate,
}

impl QueryPlan {
    /// Request for this plan against `service`.
    #[must_use]
    pub fn request(&self, service: &ServiceDefinition) -> QueryRequest {
        service.request(&self.predicate)
    }
}

/// Resolves the lookback and builds the where clause for `selection`. The
/// cutoff day is taken in the zone of `now`.
#[must_use]
pub fn plan<Tz: TimeZone>(selection: &SelectionState, now: DateTime<Tz>) -> QueryPlan {
    let lookback = lookback::resolve(selection.lookback, now);
    let predicate = where_predicate(selection, &lookback.literal_value());

    log::debug!("where clause: {predicate}");

    QueryPlan {
        lookback,
        predicate,
    }
}
