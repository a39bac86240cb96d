use std::sync::Arc;

use crate::clock::ClockResolver;
use crate::error::Result;
use crate::format::DisplayFormatter;
use crate::prices::types::{DisplayPoint, RawPricePoint};

/// Maps raw points to display records
#[derive(Clone)]
pub struct UiProjector {
    resolver: ClockResolver,
    formatter: Arc<dyn DisplayFormatter>,
}

impl UiProjector {
    pub fn new(resolver: ClockResolver, formatter: Arc<dyn DisplayFormatter>) -> Self {
        Self {
            resolver,
            formatter,
        }
    }

    pub fn resolver(&self) -> &ClockResolver {
        &self.resolver
    }

    /// One output per input, same order. The current hour is resolved once per
    /// call so an hour rollover mid-projection cannot flag two entries.
    pub fn project(&self, points: &[RawPricePoint]) -> Result<Vec<DisplayPoint>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let current_hour = self.resolver.current_local_hour_as_utc()?;

        Ok(points
            .iter()
            .map(|p| DisplayPoint {
                instant: p.instant,
                label: self.formatter.hour_label(p.instant),
                price: p.price,
                is_forecast: p.is_forecast(),
                is_current_hour: p.instant == current_hour,
            })
            .collect())
    }
}
