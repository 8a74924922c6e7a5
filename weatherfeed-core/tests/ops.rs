//! Tests for the once / periodic / paired operations against a stub source,
//! on tokio's paused clock.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tokio::time::{self, Instant};
use weatherfeed_core::{
    ParseError, Scope, Surface, TemperatureUnit, TransportError, WeatherQuery, WeatherReport,
    WeatherResult, WeatherSource, fetch_every, fetch_once, fetch_pair, ops::MAX_POLL_INTERVAL,
};

#[derive(Debug, Clone)]
enum Canned {
    Report(f64),
    Garbage,
    Unavailable,
}

/// Answers by location after a per-location delay.
#[derive(Debug, Default)]
struct StubSource {
    answers: HashMap<String, (Canned, Duration)>,
    calls: AtomicUsize,
}

impl StubSource {
    fn answer(mut self, location: &str, canned: Canned, delay: Duration) -> Self {
        self.answers.insert(location.to_string(), (canned, delay));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for StubSource {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (canned, delay) = self
            .answers
            .get(&query.location)
            .cloned()
            .unwrap_or((Canned::Unavailable, Duration::ZERO));

        if !delay.is_zero() {
            time::sleep(delay).await;
        }

        match canned {
            Canned::Report(temperature) => Ok(WeatherResult::Report(WeatherReport {
                city_name: query.location.clone(),
                temperature,
                unit: query.units,
            })),
            Canned::Garbage => Ok(WeatherResult::Unparseable(ParseError::new(
                "expected value at line 1 column 1",
            ))),
            Canned::Unavailable => Err(TransportError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "upstream down".to_string(),
            }),
        }
    }
}

fn query(location: &str) -> WeatherQuery {
    let endpoint = Url::parse("https://api.example.test/data/2.5/weather").unwrap();
    WeatherQuery::new(endpoint, location, "KEY").with_units(TemperatureUnit::Metric)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn fetch_once_delivers_report_line() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(200)));
    let (scope, mut inbox) = Scope::new();

    fetch_once(&scope, source.clone(), query("London"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.surface, Surface::Once);
    assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\n");
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_once_delivers_parse_failure_as_text() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Garbage, ms(10)));
    let (scope, mut inbox) = Scope::new();

    fetch_once(&scope, source, query("London"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.outcome.unwrap(), "expected value at line 1 column 1\n");
}

#[tokio::test(start_paused = true)]
async fn fetch_once_delivers_transport_failure_as_error() {
    let source = Arc::new(StubSource::default());
    let (scope, mut inbox) = Scope::new();

    fetch_once(&scope, source, query("Nowhere"));

    let err = inbox.recv().await.unwrap().outcome.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test(start_paused = true)]
async fn pair_joins_left_then_right_when_right_finishes_first() {
    let source = Arc::new(
        StubSource::default()
            .answer("London", Canned::Report(15.0), ms(2_000))
            .answer("Paris", Canned::Report(17.0), ms(100)),
    );
    let (scope, mut inbox) = Scope::new();

    fetch_pair(&scope, source, query("London"), query("Paris"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.surface, Surface::Pair);
    assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\nParis: 17.0 °C\n");
}

#[tokio::test(start_paused = true)]
async fn pair_joins_left_then_right_when_left_finishes_first() {
    let source = Arc::new(
        StubSource::default()
            .answer("London", Canned::Report(15.0), ms(100))
            .answer("Paris", Canned::Report(17.0), ms(2_000)),
    );
    let (scope, mut inbox) = Scope::new();

    fetch_pair(&scope, source, query("London"), query("Paris"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\nParis: 17.0 °C\n");
}

#[tokio::test(start_paused = true)]
async fn pair_runs_both_fetches_concurrently() {
    let source = Arc::new(
        StubSource::default()
            .answer("London", Canned::Report(15.0), ms(1_000))
            .answer("Paris", Canned::Report(17.0), ms(1_000)),
    );
    let (scope, mut inbox) = Scope::new();
    let start = Instant::now();

    fetch_pair(&scope, source, query("London"), query("Paris"));
    inbox.recv().await.unwrap().outcome.unwrap();

    assert!(start.elapsed() < ms(2_000), "fetches ran one after another");
}

#[tokio::test(start_paused = true)]
async fn pair_fails_when_either_side_fails() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(10)));
    let (scope, mut inbox) = Scope::new();

    fetch_pair(&scope, source, query("London"), query("Atlantis"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.surface, Surface::Pair);
    assert!(update.outcome.is_err());
}

#[tokio::test(start_paused = true)]
async fn periodic_emits_n_results_within_n_periods() {
    const N: usize = 5;
    let period = Duration::from_secs(3);
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), Duration::ZERO));
    let (mut scope, mut inbox) = Scope::new();
    let start = Instant::now();

    fetch_every(&scope, source.clone(), query("London"), period);

    for _ in 0..N {
        let update = inbox.recv().await.unwrap();
        assert_eq!(update.surface, Surface::Interval);
        assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\n");
    }

    assert!(start.elapsed() <= period * N as u32, "took {:?}", start.elapsed());
    assert!(source.calls() >= N);
    scope.pause();
}

#[tokio::test(start_paused = true)]
async fn periodic_waits_one_period_before_first_fetch() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), Duration::ZERO));
    let (scope, _inbox) = Scope::new();

    fetch_every(&scope, source.clone(), query("London"), Duration::from_secs(3));

    time::sleep(ms(2_900)).await;
    assert_eq!(source.calls(), 0);

    time::sleep(ms(200)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn periodic_clamps_oversized_period() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), Duration::ZERO));
    let (mut scope, mut inbox) = Scope::new();
    let start = Instant::now();

    let handle = fetch_every(&scope, source.clone(), query("London"), Duration::from_secs(u64::MAX));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\n");
    assert_eq!(start.elapsed(), MAX_POLL_INTERVAL);

    scope.pause();
    handle.await.expect("polling task must not panic");
}

#[tokio::test(start_paused = true)]
async fn periodic_keeps_polling_after_failures() {
    let source = Arc::new(
        StubSource::default()
            .answer("London", Canned::Garbage, Duration::ZERO),
    );
    let (mut scope, mut inbox) = Scope::new();

    fetch_every(&scope, source.clone(), query("London"), Duration::from_secs(3));
    fetch_every(&scope, source, query("Atlantis"), Duration::from_secs(3));

    let mut parse_failures = 0;
    let mut transport_failures = 0;
    while parse_failures + transport_failures < 6 {
        match inbox.recv().await.unwrap().outcome {
            Ok(text) => {
                assert_eq!(text, "expected value at line 1 column 1\n");
                parse_failures += 1;
            }
            Err(_) => transport_failures += 1,
        }
    }

    assert_eq!(parse_failures, 3);
    assert_eq!(transport_failures, 3);
    scope.pause();
}

#[tokio::test(start_paused = true)]
async fn pause_before_fetch_resolves_prevents_delivery() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(5_000)));
    let (mut scope, mut inbox) = Scope::new();

    let handle = fetch_once(&scope, source.clone(), query("London"));
    time::sleep(ms(1_000)).await;
    scope.pause();

    handle.await.unwrap();
    time::sleep(ms(10_000)).await;

    assert!(inbox.try_recv().is_none());
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_discards_result_already_queued() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(10)));
    let (mut scope, mut inbox) = Scope::new();

    fetch_once(&scope, source, query("London")).await.unwrap();
    scope.pause();

    assert!(inbox.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn pause_stops_polling() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), Duration::ZERO));
    let (mut scope, mut inbox) = Scope::new();

    let handle = fetch_every(&scope, source.clone(), query("London"), Duration::from_secs(3));
    inbox.recv().await.unwrap();
    inbox.recv().await.unwrap();

    scope.pause();
    handle.await.unwrap();
    let calls = source.calls();

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls(), calls);
    assert!(inbox.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn pause_cancels_pending_pair() {
    let source = Arc::new(
        StubSource::default()
            .answer("London", Canned::Report(15.0), ms(100))
            .answer("Paris", Canned::Report(17.0), ms(4_000)),
    );
    let (mut scope, mut inbox) = Scope::new();

    let handle = fetch_pair(&scope, source, query("London"), query("Paris"));
    time::sleep(ms(500)).await;
    scope.pause();
    handle.await.unwrap();

    assert!(inbox.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn operations_started_after_pause_deliver() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(10)));
    let (mut scope, mut inbox) = Scope::new();

    fetch_once(&scope, source.clone(), query("London"));
    scope.pause();
    fetch_once(&scope, source, query("London"));

    let update = inbox.recv().await.unwrap();
    assert_eq!(update.outcome.unwrap(), "London: 15.0 °C\n");
    assert!(inbox.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_all_operations() {
    let source = Arc::new(StubSource::default().answer("London", Canned::Report(15.0), ms(5_000)));
    let (scope, mut inbox) = Scope::new();

    fetch_once(&scope, source.clone(), query("London"));
    fetch_every(&scope, source.clone(), query("London"), Duration::from_secs(3));
    fetch_pair(&scope, source, query("London"), query("London"));

    scope.shutdown().await;

    assert!(inbox.recv().await.is_none());
}
