//! Lookback window resolution.
//!
//! Turns a [`LookbackWindow`] into the cutoff instant, the label shown to
//! the user, and the `DATE '...'` literal embedded in the where clause.
//!
//! The literal's calendar date is taken in the time zone of `now`, so a
//! caller passing local time gets the local cutoff day.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use pdx_permits_permit_models::LookbackWindow;

use crate::predicate::Literal;

/// A resolved lookback window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookback {
    /// Earliest instant that still matches.
    pub cutoff: DateTime<Utc>,
    /// Calendar date of the cutoff in the caller's zone.
    pub date: NaiveDate,
    /// Human-readable span (e.g., `"90 days"`).
    pub label: &'static str,
    /// Where-clause literal, `DATE 'YYYY-MM-DD 00:00:00'`.
    pub literal: String,
}

impl Lookback {
    /// Calendar date of the cutoff.
    #[must_use]
    pub const fn cutoff_date(&self) -> NaiveDate {
        self.date
    }

    /// The cutoff as a predicate literal.
    #[must_use]
    pub fn literal_value(&self) -> Literal {
        Literal::Date(self.cutoff_date())
    }
}

/// Net span between `now` and the cutoff.
///
/// The default window steps back 365 days and then forward 180, leaving
/// 185 days even though it is labelled "18 months".
#[must_use]
pub fn span(window: LookbackWindow) -> TimeDelta {
    match window {
        LookbackWindow::Week => TimeDelta::days(7),
        LookbackWindow::Months1 => TimeDelta::days(30),
        LookbackWindow::Months3 => TimeDelta::days(30 * 3),
        LookbackWindow::Months6 => TimeDelta::days(30 * 6),
        LookbackWindow::Months12 => TimeDelta::days(365),
        LookbackWindow::Default18Months => TimeDelta::days(365) - TimeDelta::days(30 * 6),
    }
}

/// Label shown next to results for a window.
#[must_use]
pub const fn label(window: LookbackWindow) -> &'static str {
    match window {
        LookbackWindow::Week => "7 days",
        LookbackWindow::Months1 => "30 days",
        LookbackWindow::Months3 => "90 days",
        LookbackWindow::Months6 => "6 months",
        LookbackWindow::Months12 => "12 months",
        LookbackWindow::Default18Months => "18 months",
    }
}

/// Resolves a window against `now`.
#[must_use]
pub fn resolve<Tz: TimeZone>(window: LookbackWindow, now: DateTime<Tz>) -> Lookback {
    let local = now - span(window);
    let date = local.date_naive();
    let cutoff = local.with_timezone(&Utc);
    let literal = Literal::Date(date).to_string();

    log::debug!("lookback {window}: cutoff={cutoff} literal={literal}");

    Lookback {
        cutoff,
        date,
        label: label(window),
        literal,
    }
}

/// Resolves a raw form value, falling back to the default window when the
/// value is not recognized.
#[must_use]
pub fn resolve_selection<Tz: TimeZone>(value: &str, now: DateTime<Tz>) -> Lookback {
    resolve(LookbackWindow::from_selection(value), now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 45, 12).unwrap()
    }

    #[test]
    fn cutoff_is_now_minus_span_for_every_window() {
        let expected_days = [7, 30, 90, 180, 365, 185];
        for (window, days) in LookbackWindow::ALL.iter().zip(expected_days) {
            let resolved = resolve(*window, now());
            assert!(resolved.cutoff < now());
            assert_eq!(now() - resolved.cutoff, TimeDelta::days(days), "{window}");
        }
    }

    #[test]
    fn literal_is_zero_padded() {
        let resolved = resolve(LookbackWindow::Week, now());
        assert_eq!(resolved.literal, "DATE '2024-03-08 00:00:00'");

        let resolved = resolve(LookbackWindow::Months1, now());
        assert_eq!(resolved.literal, "DATE '2024-02-14 00:00:00'");
    }

    #[test]
    fn literal_matches_pattern_for_every_window() {
        for window in LookbackWindow::ALL {
            let literal = resolve(*window, now()).literal;
            let inner = literal
                .strip_prefix("DATE '")
                .and_then(|s| s.strip_suffix(" 00:00:00'"))
                .unwrap();
            assert_eq!(inner.len(), 10, "{literal}");
            assert!(NaiveDate::parse_from_str(inner, "%Y-%m-%d").is_ok(), "{literal}");
        }
    }

    #[test]
    fn default_window_is_185_days() {
        let resolved = resolve(LookbackWindow::Default18Months, now());
        assert_eq!(resolved.label, "18 months");
        assert_eq!(resolved.literal, "DATE '2023-09-12 00:00:00'");
    }

    #[test]
    fn unrecognized_selection_uses_default_window() {
        assert_eq!(
            resolve_selection("fortnight", now()),
            resolve(LookbackWindow::Default18Months, now())
        );
    }

    #[test]
    fn literal_date_follows_caller_zone() {
        // 7pm on the 15th in Portland is already the 16th in UTC.
        let pacific = chrono::FixedOffset::west_opt(7 * 3600).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 16, 2, 0, 0).unwrap();

        let local = resolve(LookbackWindow::Week, evening.with_timezone(&pacific));
        assert_eq!(local.literal, "DATE '2024-03-08 00:00:00'");
        assert_eq!(local.cutoff, evening - TimeDelta::days(7));

        let utc = resolve(LookbackWindow::Week, evening);
        assert_eq!(utc.literal, "DATE '2024-03-09 00:00:00'");
    }

    #[test]
    fn labels_follow_window() {
        assert_eq!(resolve(LookbackWindow::Months3, now()).label, "90 days");
        assert_eq!(resolve(LookbackWindow::Months6, now()).label, "6 months");
        assert_eq!(resolve(LookbackWindow::Months12, now()).label, "12 months");
    }
}
