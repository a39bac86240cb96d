use anyhow::Result;
use elpris::clock::ClockResolver;
use elpris::config::Config;
use elpris::format::{DanishFormatter, DisplayFormatter};
use elpris::logging::{get_logger, init_logging};
use elpris::pipeline::{PricePipeline, SnapshotStore};
use elpris::prices::{HttpTransport, PriceFetcher, PriceQuery, RangeBuilder, UiProjector};
use elpris::refresh::{IntervalSource, RefreshCoordinator, RefreshSignal, SignalSource};
use elpris::web::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging)?;

    let logger = get_logger("main");
    logger.info(&format!(
        "Elpris {} starting up (timezone {}, {}h lookahead)",
        env!("APP_VERSION"),
        config.api.timezone,
        config.api.hours_ahead
    ));

    let resolver = ClockResolver::for_timezone(&config.api.timezone)?;
    let formatter: Arc<dyn DisplayFormatter> =
        Arc::new(DanishFormatter::from_name(&config.api.timezone)?);
    let transport = Arc::new(HttpTransport::new(config.api.request_timeout_secs)?);
    let fetcher = PriceFetcher::new(
        transport,
        PriceQuery::from(&config.api),
        RangeBuilder::new(resolver.clone()),
    );
    let projector = UiProjector::new(resolver, formatter.clone());
    let store = SnapshotStore::new();
    let pipeline = PricePipeline::new(
        fetcher,
        projector,
        formatter,
        config.api.hours_ahead,
        store.clone(),
    );
    let coordinator = RefreshCoordinator::new(Arc::new(pipeline));

    let (signal_tx, signal_rx) = mpsc::unbounded_channel::<RefreshSignal>();
    let mut sources: Vec<Box<dyn SignalSource>> = vec![Box::new(signal_rx)];
    if config.refresh.interval_secs > 0 {
        sources.push(Box::new(IntervalSource::new(Duration::from_secs(
            config.refresh.interval_secs,
        ))));
    }
    let subscription = coordinator.attach(sources);

    if config.refresh.refresh_on_startup
        && let Err(e) = signal_tx.send(RefreshSignal::Manual)
    {
        logger.warn(&format!("Failed to queue startup refresh: {}", e));
    }

    let config = Arc::new(config);
    let web_task = if config.web.enabled {
        let state = AppState {
            snapshots: store.subscribe(),
            signals: signal_tx.clone(),
            coordinator: coordinator.clone(),
            config: Arc::clone(&config),
        };
        let host = config.web.host.clone();
        let port = config.web.port;
        let web_logger = get_logger("web");
        Some(tokio::spawn(async move {
            if let Err(e) = web::serve(state, &host, port).await {
                web_logger.error(&e.to_string());
            }
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    logger.info("Shutdown requested");

    subscription.unsubscribe();
    if coordinator.cancel_current() {
        logger.info("Cancelled in-flight refresh");
    }
    let last = store.current();
    logger.info(&format!(
        "Last snapshot: {} points, updated {}",
        last.points.len(),
        last.last_updated_label.as_deref().unwrap_or("never")
    ));
    if let Some(task) = web_task {
        task.abort();
    }
    logger.info("Shutdown complete");
    Ok(())
}
