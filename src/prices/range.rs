use crate::clock::ClockResolver;
use crate::error::Result;
use crate::prices::types::FetchRange;

/// Builds request windows anchored at the current local hour
#[derive(Debug, Clone)]
pub struct RangeBuilder {
    resolver: ClockResolver,
}

impl RangeBuilder {
    pub fn new(resolver: ClockResolver) -> Self {
        Self { resolver }
    }

    /// `[current local hour, + lookahead_hours)`; no clamping, 0 gives an empty window
    pub fn build_range(&self, lookahead_hours: u32) -> Result<FetchRange> {
        let from = self.resolver.current_local_hour_as_utc()?;
        FetchRange::starting_at(from, lookahead_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, FixedOffsetSource};
    use crate::error::ElprisError;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::sync::Arc;

    fn builder(now: &str, offset_hours: i64) -> RangeBuilder {
        RangeBuilder::new(ClockResolver::new(
            Arc::new(FixedClock(now.parse().unwrap())),
            Arc::new(FixedOffsetSource(TimeDelta::hours(offset_hours))),
        ))
    }

    #[test]
    fn range_spans_exactly_n_hours() {
        let b = builder("2025-10-29T13:30:00Z", 1);
        for n in [1_u32, 2, 24, 48, 72] {
            let r = b.build_range(n).unwrap();
            assert_eq!(r.to - r.from, TimeDelta::hours(i64::from(n)));
        }
    }

    #[test]
    fn zero_lookahead_is_zero_width() {
        let r = builder("2025-10-29T13:30:00Z", 1).build_range(0).unwrap();
        assert_eq!(r.from, r.to);
        assert!(r.is_empty());
    }

    #[test]
    fn range_starts_at_current_local_hour() {
        let r = builder("2025-06-15T13:30:00Z", 2).build_range(48).unwrap();
        let from: DateTime<Utc> = "2025-06-15T13:00:00Z".parse().unwrap();
        let to: DateTime<Utc> = "2025-06-17T13:00:00Z".parse().unwrap();
        assert_eq!(r.from, from);
        assert_eq!(r.to, to);
    }

    #[test]
    fn unrepresentable_lookahead_is_clock_error() {
        let err = builder("2025-10-29T13:30:00Z", 1)
            .build_range(u32::MAX)
            .unwrap_err();
        assert!(matches!(err, ElprisError::ClockUnavailable { .. }));
    }
}
