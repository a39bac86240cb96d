//! Local-hour resolution without an embedded DST table
//!
//! The current hour is resolved by asking the target zone for its UTC offset at
//! the present instant, shifting into local time, flooring to the hour and
//! shifting back. The offset is queried fresh on every call so the result stays
//! correct across DST transitions.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::error::{ElprisError, Result};

/// Milliseconds per hour
pub const HOUR_MS: i64 = 3_600_000;

/// Source of the present instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Answers "what is the UTC offset of the target zone at this instant"
pub trait OffsetSource: Send + Sync {
    fn offset_at(&self, instant: DateTime<Utc>) -> Result<TimeDelta>;
}

/// Offset derived by rendering an instant in a named civil timezone and
/// comparing the local wall-clock reading with the UTC one.
#[derive(Debug, Clone, Copy)]
pub struct ZoneOffset {
    tz: Tz,
}

impl ZoneOffset {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Resolve a zone by IANA name. Unknown names are a configuration error.
    pub fn from_name(name: &str) -> Result<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|_| ElprisError::config(format!("Unknown timezone '{}'", name)))?;
        Ok(Self::new(tz))
    }
}

impl OffsetSource for ZoneOffset {
    fn offset_at(&self, instant: DateTime<Utc>) -> Result<TimeDelta> {
        let local = instant.with_timezone(&self.tz).naive_local();
        Ok(local - instant.naive_utc())
    }
}

/// Constant offset, independent of the instant
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetSource(pub TimeDelta);

#[cfg(test)]
impl OffsetSource for FixedOffsetSource {
    fn offset_at(&self, _instant: DateTime<Utc>) -> Result<TimeDelta> {
        Ok(self.0)
    }
}

/// Resolves the UTC instant at which the current local hour started
#[derive(Clone)]
pub struct ClockResolver {
    clock: Arc<dyn Clock>,
    offsets: Arc<dyn OffsetSource>,
}

impl std::fmt::Debug for ClockResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockResolver").finish_non_exhaustive()
    }
}

impl ClockResolver {
    pub fn new(clock: Arc<dyn Clock>, offsets: Arc<dyn OffsetSource>) -> Self {
        Self { clock, offsets }
    }

    /// Resolver on the system clock for a named zone
    pub fn for_timezone(name: &str) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SystemClock),
            Arc::new(ZoneOffset::from_name(name)?),
        ))
    }

    /// The present instant as seen by this resolver's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start of the current local hour, expressed as a UTC instant
    pub fn current_local_hour_as_utc(&self) -> Result<DateTime<Utc>> {
        self.local_hour_at(self.clock.now())
    }

    /// Start of the local hour containing `now`, expressed as a UTC instant
    pub fn local_hour_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let offset_ms = self.offsets.offset_at(now)?.num_milliseconds();
        let local_ms = now.timestamp_millis() + offset_ms;
        let floored = local_ms - local_ms.rem_euclid(HOUR_MS);
        DateTime::from_timestamp_millis(floored - offset_ms)
            .ok_or_else(|| ElprisError::clock(format!("instant out of range: {}", now)))
    }
}

/// `instant + n` hours, pure arithmetic with no calendar semantics.
/// Results outside the representable range are a clock error.
pub fn add_hours(instant: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| {
            ElprisError::clock(format!("{} + {}h is out of range", instant, hours))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn fixed(now: &str, offset_hours: i64) -> ClockResolver {
        ClockResolver::new(
            Arc::new(FixedClock(at(now))),
            Arc::new(FixedOffsetSource(TimeDelta::hours(offset_hours))),
        )
    }

    fn copenhagen(now: &str) -> ClockResolver {
        ClockResolver::new(
            Arc::new(FixedClock(at(now))),
            Arc::new(ZoneOffset::new(chrono_tz::Europe::Copenhagen)),
        )
    }

    #[test]
    fn winter_time_floors_to_local_hour() {
        let r = fixed("2025-10-29T13:30:00Z", 1);
        assert_eq!(
            r.current_local_hour_as_utc().unwrap(),
            at("2025-10-29T13:00:00Z")
        );
    }

    #[test]
    fn summer_time_floors_to_local_hour() {
        let r = fixed("2025-06-15T13:30:00Z", 2);
        assert_eq!(
            r.current_local_hour_as_utc().unwrap(),
            at("2025-06-15T13:00:00Z")
        );
    }

    #[test]
    fn zone_offset_reports_cet_and_cest() {
        let zone = ZoneOffset::new(chrono_tz::Europe::Copenhagen);
        assert_eq!(
            zone.offset_at(at("2025-10-29T13:30:00Z")).unwrap(),
            TimeDelta::hours(1)
        );
        assert_eq!(
            zone.offset_at(at("2025-06-15T13:30:00Z")).unwrap(),
            TimeDelta::hours(2)
        );
    }

    #[test]
    fn named_zone_matches_fixed_offsets() {
        assert_eq!(
            copenhagen("2025-10-29T13:30:00Z")
                .current_local_hour_as_utc()
                .unwrap(),
            at("2025-10-29T13:00:00Z")
        );
        assert_eq!(
            copenhagen("2025-06-15T13:30:00Z")
                .current_local_hour_as_utc()
                .unwrap(),
            at("2025-06-15T13:00:00Z")
        );
    }

    #[test]
    fn repeated_fall_back_hour_yields_two_distinct_instants() {
        // 02:30 local occurs twice on 2025-10-26
        let first = copenhagen("2025-10-26T00:30:00Z")
            .current_local_hour_as_utc()
            .unwrap();
        let second = copenhagen("2025-10-26T01:30:00Z")
            .current_local_hour_as_utc()
            .unwrap();
        assert_eq!(first, at("2025-10-26T00:00:00Z"));
        assert_eq!(second, at("2025-10-26T01:00:00Z"));
    }

    #[test]
    fn spring_forward_uses_offset_at_the_instant() {
        let before = copenhagen("2025-03-30T00:30:00Z")
            .current_local_hour_as_utc()
            .unwrap();
        let after = copenhagen("2025-03-30T01:30:00Z")
            .current_local_hour_as_utc()
            .unwrap();
        assert_eq!(before, at("2025-03-30T00:00:00Z"));
        assert_eq!(after, at("2025-03-30T01:00:00Z"));
    }

    #[test]
    fn hour_floor_is_stable_within_the_hour() {
        let r = fixed("2025-10-29T13:00:00Z", 1);
        let base = r.local_hour_at(at("2025-10-29T13:42:10Z")).unwrap();
        let next_ms = r
            .local_hour_at(at("2025-10-29T13:42:10.001Z"))
            .unwrap();
        assert_eq!(base, next_ms);
        assert_eq!(
            r.local_hour_at(at("2025-10-29T13:00:00Z")).unwrap(),
            at("2025-10-29T13:00:00Z")
        );
        assert_eq!(
            r.local_hour_at(at("2025-10-29T13:59:59.999Z")).unwrap(),
            at("2025-10-29T13:00:00Z")
        );
    }

    #[test]
    fn half_hour_offset_floors_on_local_boundary() {
        let r = ClockResolver::new(
            Arc::new(FixedClock(at("2025-01-10T10:10:00Z"))),
            Arc::new(FixedOffsetSource(TimeDelta::minutes(330))),
        );
        // 15:40 local -> 15:00 local -> 09:30Z
        assert_eq!(
            r.current_local_hour_as_utc().unwrap(),
            at("2025-01-10T09:30:00Z")
        );
    }

    #[test]
    fn pre_epoch_instants_floor_downwards() {
        let r = fixed("1969-12-31T23:30:00Z", 0);
        assert_eq!(
            r.current_local_hour_as_utc().unwrap(),
            at("1969-12-31T23:00:00Z")
        );
    }

    #[test]
    fn add_hours_is_plain_arithmetic() {
        let t = at("2025-10-26T00:00:00Z");
        assert_eq!(add_hours(t, 3).unwrap(), at("2025-10-26T03:00:00Z"));
        assert_eq!(add_hours(t, -2).unwrap(), at("2025-10-25T22:00:00Z"));
        assert_eq!(add_hours(t, 0).unwrap(), t);
    }

    #[test]
    fn add_hours_overflow_is_clock_unavailable() {
        let t = at("2025-10-26T00:00:00Z");
        for hours in [i64::from(u32::MAX), i64::MAX, i64::MIN] {
            let err = add_hours(t, hours).unwrap_err();
            assert!(matches!(err, ElprisError::ClockUnavailable { .. }));
        }
    }

    #[test]
    fn unknown_zone_name_is_config_error() {
        let err = ZoneOffset::from_name("Mars/Olympus").unwrap_err();
        assert!(matches!(err, ElprisError::Config { .. }));
    }
}
