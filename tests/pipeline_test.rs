use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use elpris::clock::{ClockResolver, FixedClock, ZoneOffset};
use elpris::config::ApiConfig;
use elpris::format::{DanishFormatter, DisplayFormatter};
use elpris::pipeline::{PricePipeline, SnapshotStore};
use elpris::prices::{HttpTransport, PriceFetcher, PriceQuery, RangeBuilder, UiProjector};
use elpris::refresh::{RefreshCoordinator, RefreshState, TriggerOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const BODY: &str = r#"[
    {"date":"2025-10-29T12:00:00.000Z","price":0.75,"resolution":"1h"},
    {"date":"2025-10-29T13:00:00.000Z","price":1234.5,"resolution":"1h"},
    {"date":"2025-10-29T14:00:00.000Z","price":1.1,"resolution":"1h","forecast":true}
]"#;

/// First call succeeds, later calls return 502
async fn flaky(State(calls): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::OK, [("content-type", "application/json")], BODY)
    } else {
        (StatusCode::BAD_GATEWAY, [("content-type", "text/plain")], "")
    }
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "[]"
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn coordinator(base_url: &str) -> (RefreshCoordinator, SnapshotStore) {
    let resolver = ClockResolver::new(
        Arc::new(FixedClock("2025-10-29T13:30:00Z".parse().unwrap())),
        Arc::new(ZoneOffset::from_name("Europe/Copenhagen").unwrap()),
    );
    let api = ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    };
    let formatter: Arc<dyn DisplayFormatter> = Arc::new(DanishFormatter::default());
    let fetcher = PriceFetcher::new(
        Arc::new(HttpTransport::new(0).unwrap()),
        PriceQuery::from(&api),
        RangeBuilder::new(resolver.clone()),
    );
    let projector = UiProjector::new(resolver, formatter.clone());
    let store = SnapshotStore::new();
    let pipeline = PricePipeline::new(fetcher, projector, formatter, 48, store.clone());
    (RefreshCoordinator::new(Arc::new(pipeline)), store)
}

fn started(outcome: TriggerOutcome) -> tokio::task::JoinHandle<elpris::Result<()>> {
    match outcome {
        TriggerOutcome::Started(handle) => handle,
        other => panic!("expected a started run, got {:?}", other),
    }
}

#[tokio::test]
async fn successful_run_publishes_projected_points() {
    let router = Router::new()
        .route("/api/prices", get(flaky))
        .with_state(Arc::new(AtomicUsize::new(0)));
    let (coordinator, store) = coordinator(&spawn_server(router).await);

    started(coordinator.trigger()).await.unwrap().unwrap();

    let snapshot = store.current();
    assert_eq!(snapshot.points.len(), 3);
    let current = snapshot.current().unwrap();
    assert_eq!(current.label, "Ons. - kl. 14");
    assert_eq!(DanishFormatter::default().price(current.price), "1.234,50 kr");
    assert!(snapshot.points[2].is_forecast);
    assert_eq!(
        snapshot.last_updated_label.as_deref(),
        Some("29.10.2025 14.30.00")
    );
    assert!(snapshot.last_error.is_none());
    assert_eq!(coordinator.state(), RefreshState::Idle);
}

#[tokio::test]
async fn failed_run_keeps_previous_points() {
    let router = Router::new()
        .route("/api/prices", get(flaky))
        .with_state(Arc::new(AtomicUsize::new(0)));
    let (coordinator, store) = coordinator(&spawn_server(router).await);

    started(coordinator.trigger()).await.unwrap().unwrap();
    let err = started(coordinator.trigger()).await.unwrap().unwrap_err();
    assert!(matches!(err, elpris::ElprisError::Upstream { status: 502 }));

    let snapshot = store.current();
    assert_eq!(snapshot.points.len(), 3);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Upstream error: HTTP 502")
    );
}

#[tokio::test]
async fn cancelled_run_is_not_recorded_as_an_error() {
    let router = Router::new().route("/api/prices", get(slow));
    let (coordinator, store) = coordinator(&spawn_server(router).await);

    let handle = started(coordinator.trigger());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(coordinator.trigger(), TriggerOutcome::AlreadyRunning));
    assert!(coordinator.cancel_current());

    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(store.current().last_error.is_none());
    assert!(store.current().points.is_empty());
    assert_eq!(coordinator.state(), RefreshState::Idle);
}
