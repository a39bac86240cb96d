//! Fetch-and-project unit of work and the latest published snapshot

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::Result;
use crate::format::DisplayFormatter;
use crate::logging::{StructuredLogger, get_logger};
use crate::prices::{CancelToken, DisplayPoint, PriceFetcher, UiProjector, iso_utc};
use crate::refresh::RefreshJob;

/// What the outer surface shows: the last good sequence plus the last failure
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub points: Vec<DisplayPoint>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_label: Option<String>,
    pub last_error: Option<String>,
}

impl PriceSnapshot {
    /// The entry flagged as the current hour, if it was fetched
    pub fn current(&self) -> Option<&DisplayPoint> {
        self.points.iter().find(|p| p.is_current_hour)
    }
}

/// Holder of the latest snapshot; readers subscribe through a watch channel
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<Arc<PriceSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(PriceSnapshot::default()));
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PriceSnapshot>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<PriceSnapshot> {
        self.tx.borrow().clone()
    }

    /// Replace the whole snapshot with a fresh cycle's result
    pub fn publish(&self, snapshot: PriceSnapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Record a failed cycle; previously published points stay untouched
    pub fn record_error(&self, message: String) {
        self.tx.send_modify(|current| {
            let mut next = (**current).clone();
            next.last_error = Some(message);
            *current = Arc::new(next);
        });
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches the lookahead window, projects it and publishes the result
pub struct PricePipeline {
    fetcher: PriceFetcher,
    projector: UiProjector,
    formatter: Arc<dyn DisplayFormatter>,
    lookahead_hours: u32,
    store: SnapshotStore,
    logger: StructuredLogger,
}

impl PricePipeline {
    pub fn new(
        fetcher: PriceFetcher,
        projector: UiProjector,
        formatter: Arc<dyn DisplayFormatter>,
        lookahead_hours: u32,
        store: SnapshotStore,
    ) -> Self {
        Self {
            fetcher,
            projector,
            formatter,
            lookahead_hours,
            store,
            logger: get_logger("pipeline"),
        }
    }

    async fn cycle(&self, cancel: &CancelToken) -> Result<PriceSnapshot> {
        let (range, raw) = self
            .fetcher
            .fetch_ahead(self.lookahead_hours, Some(cancel))
            .await?;
        let points = self.projector.project(&raw)?;
        let now = self.projector.resolver().now();
        Ok(PriceSnapshot {
            points,
            from: Some(range.from),
            to: Some(range.to),
            last_updated: Some(now),
            last_updated_label: Some(self.formatter.date_time(now)),
            last_error: None,
        })
    }
}

#[async_trait]
impl RefreshJob for PricePipeline {
    async fn run(&self, run_id: &str, cancel: CancelToken) -> Result<()> {
        let logger = self.logger.for_run(run_id);
        match self.cycle(&cancel).await {
            Ok(snapshot) => {
                let current = snapshot
                    .current()
                    .map(|p| self.formatter.price(p.price))
                    .unwrap_or_else(|| "n/a".to_string());
                logger.info(&format!(
                    "Published {} points from {} (current hour: {})",
                    snapshot.points.len(),
                    snapshot.from.map(iso_utc).unwrap_or_default(),
                    current
                ));
                self.store.publish(snapshot);
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.store.record_error(e.to_string());
                Err(e)
            }
        }
    }
}
