//! Per-table cooldown between two requests of the same type.
//!
//! Nothing is stored: a type is available for a table at `now` iff the most
//! recent request of that type was created at least `cooldown(type)` before
//! `now`.
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::api::CooldownView;
use crate::catalog::RequestType;

/// Minimum interval between two requests of `request_type` from one table
pub fn cooldown(request_type: RequestType) -> Duration {
    Duration::minutes(request_type.cooldown_minutes())
}

/// Instant at which `request_type` becomes available again after a request made at `last`
pub fn cooldown_until(request_type: RequestType, last: DateTime<Utc>) -> DateTime<Utc> {
    last + cooldown(request_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Available,
    Active { until: DateTime<Utc> },
}

/// Decide whether `request_type` may be requested at `now`, given the creation time of the
/// last request of that type for the same table
pub fn check(
    request_type: RequestType,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CooldownState {
    match last.map(|last| cooldown_until(request_type, last)) {
        Some(until) if now < until => CooldownState::Active { until },
        _ => CooldownState::Available,
    }
}

/// Remaining time before `until`, as "{minutes}m {seconds}s".
///
/// Seconds are rounded up so the display never reads "0m 0s" while the cooldown is still
/// running. Returns None once `until` is reached.
pub fn format_remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        return None;
    }
    let seconds = (millis + 999) / 1000;
    Some(format!("{}m {}s", seconds / 60, seconds % 60))
}

/// Build the view of a cooldown as sent to table pages
pub fn view(
    request_type: RequestType,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CooldownView {
    match check(request_type, last, now) {
        CooldownState::Active { until } => CooldownView {
            request_type,
            until: Some(until),
            time_left: format_remaining(until, now).unwrap_or_default(),
        },
        CooldownState::Available => CooldownView {
            request_type,
            until: None,
            time_left: String::new(),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Countdown {
    until: DateTime<Utc>,
    time_left: String,
}

/// Client-side copy of the cooldowns of one table.
///
/// Loaded from the server when the table page opens, then driven by `tick` once per second
/// without further network calls.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    active: HashMap<RequestType, Countdown>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked cooldowns with the ones fetched from the server
    pub fn load(&mut self, views: &[CooldownView], now: DateTime<Utc>) {
        self.active.clear();
        for view in views {
            if let Some(until) = view.until {
                self.insert(view.request_type, until, now);
            }
        }
    }

    /// Start the cooldown of `request_type` after a successful submission at `now`
    pub fn start(&mut self, request_type: RequestType, now: DateTime<Utc>) {
        self.insert(request_type, now + cooldown(request_type), now);
    }

    fn insert(&mut self, request_type: RequestType, until: DateTime<Utc>, now: DateTime<Utc>) {
        if let Some(time_left) = format_remaining(until, now) {
            self.active
                .insert(request_type, Countdown { until, time_left });
        }
    }

    /// Recompute the display strings, dropping elapsed cooldowns.
    ///
    /// Returns true if anything visible changed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        self.active.retain(|_, countdown| {
            match format_remaining(countdown.until, now) {
                Some(time_left) => {
                    if time_left != countdown.time_left {
                        countdown.time_left = time_left;
                        changed = true;
                    }
                    true
                }
                None => {
                    changed = true;
                    false
                }
            }
        });
        changed
    }

    pub fn is_active(&self, request_type: RequestType) -> bool {
        self.active.contains_key(&request_type)
    }

    /// Display string of the remaining time, None if `request_type` is available
    pub fn remaining(&self, request_type: RequestType) -> Option<&str> {
        self.active
            .get(&request_type)
            .map(|countdown| countdown.time_left.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_no_previous_request_is_available() {
        for t in RequestType::ALL {
            assert_eq!(check(t, None, at(12, 0, 0)), CooldownState::Available);
        }
    }

    #[test]
    fn test_cooldown_window() {
        let t0 = at(12, 0, 0);
        let t = RequestType::TableClean;

        assert_eq!(
            check(t, Some(t0), t0 + Duration::milliseconds(1)),
            CooldownState::Active { until: at(12, 10, 0) }
        );
        assert_eq!(
            check(t, Some(t0), at(12, 9, 59)),
            CooldownState::Active { until: at(12, 10, 0) }
        );
        assert_eq!(check(t, Some(t0), at(12, 10, 0)), CooldownState::Available);
        assert_eq!(check(t, Some(t0), at(13, 0, 0)), CooldownState::Available);
    }

    #[test]
    fn test_format_remaining() {
        let until = at(12, 10, 0);
        assert_eq!(format_remaining(until, at(12, 0, 0)).unwrap(), "10m 0s");
        assert_eq!(format_remaining(until, at(12, 5, 30)).unwrap(), "4m 30s");
        assert_eq!(format_remaining(until, at(12, 9, 59)).unwrap(), "0m 1s");
        assert_eq!(
            format_remaining(until, until - Duration::milliseconds(200)).unwrap(),
            "0m 1s"
        );
        assert_eq!(format_remaining(until, until), None);
        assert_eq!(format_remaining(until, at(12, 11, 0)), None);
    }

    #[test]
    fn test_view() {
        let v = view(RequestType::RequestSauces, Some(at(12, 0, 0)), at(12, 1, 0));
        assert_eq!(v.until, Some(at(12, 3, 0)));
        assert_eq!(v.time_left, "2m 0s");

        let v = view(RequestType::RequestSauces, Some(at(12, 0, 0)), at(12, 3, 0));
        assert_eq!(v.until, None);
        assert_eq!(v.time_left, "");
    }

    #[test]
    fn test_tracker_counts_down_then_clears() {
        let mut tracker = CooldownTracker::new();
        let t0 = at(12, 0, 0);
        tracker.start(RequestType::TableClean, t0);

        assert!(tracker.is_active(RequestType::TableClean));
        assert!(!tracker.is_active(RequestType::ToiletClean));
        assert_eq!(tracker.remaining(RequestType::TableClean), Some("10m 0s"));

        assert!(tracker.tick(t0 + Duration::seconds(1)));
        assert_eq!(tracker.remaining(RequestType::TableClean), Some("9m 59s"));
        assert!(!tracker.tick(t0 + Duration::milliseconds(1500)));

        tracker.tick(at(12, 9, 59));
        assert_eq!(tracker.remaining(RequestType::TableClean), Some("0m 1s"));

        assert!(tracker.tick(at(12, 10, 0)));
        assert_eq!(tracker.remaining(RequestType::TableClean), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_tracker_load_skips_available() {
        let now = at(12, 0, 0);
        let views = vec![
            view(RequestType::ToiletClean, Some(at(11, 50, 0)), now),
            view(RequestType::ReplaceCutlery, Some(at(11, 50, 0)), now),
            view(RequestType::ReadyToOrder, None, now),
        ];

        let mut tracker = CooldownTracker::new();
        tracker.start(RequestType::RequestSauces, now);
        tracker.load(&views, now);

        assert_eq!(tracker.remaining(RequestType::ToiletClean), Some("5m 0s"));
        assert!(!tracker.is_active(RequestType::ReplaceCutlery));
        assert!(!tracker.is_active(RequestType::ReadyToOrder));
        assert!(!tracker.is_active(RequestType::RequestSauces));
    }
}
