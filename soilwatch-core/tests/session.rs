//! Integration tests for the session engine.
//!
//! A scripted in-memory feed stands in for the spreadsheet endpoint, and the tokio clock is
//! paused so every poll cycle happens at a known instant.

use serde_json::{json, Value};
use soilwatch_core::{
    feed::FeedSource,
    ingestor::CycleOutcome,
    session::SessionBuilder,
    views::TimeFormat,
    SoilwatchError,
};
use soilwatch_schemas::{file_formats::AbsorbPolicy, reading::MetricGroup};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Default)]
struct Script {
    entries: Vec<Value>,
    fail_next: usize,
    hang: bool,
    fetches: usize,
}

#[derive(Clone, Default)]
struct ScriptedFeed {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFeed {
    fn with_entries(n: u32) -> Self {
        let feed = Self::default();
        feed.grow_to(n);
        feed
    }

    fn grow_to(&self, n: u32) {
        let mut script = self.script.lock().unwrap();
        let have = script.entries.len() as u32;
        script.entries.extend((have..n).map(entry));
    }

    fn fail_next(&self, times: usize) {
        self.script.lock().unwrap().fail_next = times;
    }

    fn set_hang(&self, hang: bool) {
        self.script.lock().unwrap().hang = hang;
    }

    fn fetches(&self) -> usize {
        self.script.lock().unwrap().fetches
    }
}

impl FeedSource for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<Value>, SoilwatchError> {
        let (result, hang) = {
            let mut script = self.script.lock().unwrap();
            script.fetches += 1;
            let result = if script.fail_next > 0 {
                script.fail_next -= 1;
                Err(SoilwatchError::FetchFailure("connection refused".to_string()))
            } else {
                Ok(script.entries.clone())
            };
            (result, script.hang)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        result
    }
}

fn entry(seed: u32) -> Value {
    let millis = 1_714_550_400_000_i64 + i64::from(seed) * 60_000;
    json!({
        "soilMoisture_sensor1": seed,
        "soilMoisture_sensor2": seed + 1,
        "soilMoisture_sensor3": seed + 2,
        "gas_sensor1": 400 + seed,
        "gas_sensor2": 410 + seed,
        "gas_sensor3": 420 + seed,
        "temperature": 20 + seed,
        "humidity": 50 + seed,
        "date": millis,
        "time": millis,
    })
}

fn builder() -> SessionBuilder {
    SessionBuilder::new()
        .with_time_format(TimeFormat::utc())
        .with_poll_interval(Duration::from_secs(10))
        .with_fetch_timeout(Duration::from_secs(2))
}

#[tokio::test(start_paused = true)]
async fn empty_feed_keeps_log_empty() {
    let feed = ScriptedFeed::default();
    let handle = builder().build(feed.clone()).unwrap().spawn();

    sleep(Duration::from_secs(25)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.log_len, 0);
    assert_eq!(snapshot.stats.idle_cycles, 3);
    assert!(handle.table(MetricGroup::SoilMoisture).await.unwrap().is_empty());
    assert!(handle.chart(MetricGroup::Gas).await.unwrap().is_empty());

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_on_interval() {
    let feed = ScriptedFeed::with_entries(3);
    let handle = builder().build(feed.clone()).unwrap().spawn();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(feed.fetches(), 1);
    assert_eq!(handle.snapshot().await.unwrap().log_len, 3);

    feed.grow_to(5);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.snapshot().await.unwrap().log_len, 3);

    sleep(Duration::from_secs(5)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(feed.fetches(), 2);
    assert_eq!(snapshot.log_len, 5);
    assert_eq!(snapshot.next_unprocessed, 5);
    assert_eq!(snapshot.stats.records_absorbed, 5);

    let state = handle.stop().await.unwrap();
    let temperatures: Vec<f64> = state.log().iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![20.0, 21.0, 22.0, 23.0, 24.0]);
}

#[tokio::test(start_paused = true)]
async fn one_per_cycle_policy_absorbs_a_single_entry_each_tick() {
    let feed = ScriptedFeed::with_entries(3);
    let handle = builder()
        .with_absorb_policy(AbsorbPolicy::OnePerCycle)
        .build(feed.clone())
        .unwrap()
        .spawn();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.snapshot().await.unwrap().log_len, 1);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.snapshot().await.unwrap().log_len, 2);
    sleep(Duration::from_secs(20)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.log_len, 3);
    assert_eq!(snapshot.stats.idle_cycles, 1);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_is_retried_on_next_tick() {
    let feed = ScriptedFeed::with_entries(4);
    feed.fail_next(1);
    let handle = builder().build(feed.clone()).unwrap().spawn();

    sleep(Duration::from_secs(1)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.log_len, 0);
    assert_eq!(snapshot.next_unprocessed, 0);
    assert_eq!(snapshot.stats.fetch_failures, 1);

    sleep(Duration::from_secs(10)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(feed.fetches(), 2);
    assert_eq!(snapshot.log_len, 4);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_cut_off_by_cycle_budget() {
    let feed = ScriptedFeed::with_entries(2);
    feed.set_hang(true);
    let handle = builder().build(feed.clone()).unwrap().spawn();

    sleep(Duration::from_secs(3)).await;
    feed.set_hang(false);
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.stats.fetch_failures, 1);
    assert_eq!(snapshot.log_len, 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.snapshot().await.unwrap().log_len, 2);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_further_cycles() {
    let feed = ScriptedFeed::with_entries(1);
    let handle = builder().build(feed.clone()).unwrap().spawn();

    sleep(Duration::from_secs(1)).await;
    let state = handle.stop().await.unwrap();
    assert_eq!(state.log().len(), 1);

    let fetches = feed.fetches();
    feed.grow_to(4);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(feed.fetches(), fetches);
}

#[tokio::test(start_paused = true)]
async fn navigation_over_25_records_stops_at_offset_two() {
    let feed = ScriptedFeed::with_entries(25);
    let handle = builder().build(feed.clone()).unwrap().spawn();
    sleep(Duration::from_secs(1)).await;

    assert!(handle.toggle_chart(MetricGroup::Temperature).await.unwrap());
    assert!(handle.older().await.unwrap());
    assert!(handle.older().await.unwrap());
    assert!(!handle.older().await.unwrap());

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.window_offset, 2);
    assert_eq!(snapshot.window_range, 0..10);

    let charts = handle.visible_charts().await.unwrap();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].labels.first().map(String::as_str), Some("8:00:00 AM"));
    assert_eq!(charts[0].datasets[0].data.len(), 10);

    assert!(handle.newer().await.unwrap());
    assert!(handle.newer().await.unwrap());
    assert!(!handle.newer().await.unwrap());

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn export_writes_entire_log_regardless_of_window() {
    let feed = ScriptedFeed::with_entries(12);
    let handle = builder().build(feed.clone()).unwrap().spawn();
    sleep(Duration::from_secs(1)).await;
    handle.older().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let (path, rows) = handle.export(dir.path(), "sensor_data.csv").await.unwrap();
    assert_eq!(rows, 12);
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 13);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn poll_once_stops_cursor_on_malformed_entry() {
    let feed = ScriptedFeed::with_entries(3);
    feed.script.lock().unwrap().entries[1]["time"] = json!("not a time");
    let mut engine = builder().build(feed.clone()).unwrap();

    let err = engine.poll_once().await.unwrap_err();
    assert!(matches!(err, SoilwatchError::MalformedRecord { index: 1, .. }));
    assert!(err.is_transient());
    assert_eq!(engine.state().ingestor().next_unprocessed(), 1);
    assert_eq!(engine.state().log().len(), 1);

    feed.script.lock().unwrap().entries[1] = entry(1);
    assert_eq!(
        engine.poll_once().await.unwrap(),
        CycleOutcome::Appended { count: 2, cursor: 3 }
    );
}

#[tokio::test(start_paused = true)]
async fn commands_are_served_while_a_fetch_hangs() {
    let feed = ScriptedFeed::with_entries(2);
    feed.set_hang(true);
    let handle = builder()
        .with_fetch_timeout(Duration::from_secs(8))
        .build(feed.clone())
        .unwrap()
        .spawn();

    sleep(Duration::from_millis(100)).await;
    let asked = Instant::now();
    assert!(!handle.older().await.unwrap());
    assert!(handle.toggle_chart(MetricGroup::Gas).await.unwrap());
    let snapshot = handle.snapshot().await.unwrap();
    assert!(asked.elapsed() < Duration::from_millis(10));
    assert_eq!(snapshot.stats.fetch_failures, 0);
    assert_eq!(feed.fetches(), 1);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn only_one_fetch_is_in_flight_at_a_time() {
    let feed = ScriptedFeed::with_entries(2);
    feed.set_hang(true);
    let handle = builder()
        .with_poll_interval(Duration::from_secs(2))
        .with_fetch_timeout(Duration::from_secs(8))
        .build(feed.clone())
        .unwrap()
        .spawn();

    sleep(Duration::from_secs(7)).await;
    assert_eq!(feed.fetches(), 1);

    feed.set_hang(false);
    sleep(Duration::from_secs(2)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.stats.fetch_failures, 1);
    assert_eq!(feed.fetches(), 2);
    assert_eq!(snapshot.log_len, 2);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn entries_before_a_malformed_one_are_absorbed() {
    for policy in [AbsorbPolicy::WholeSuffix, AbsorbPolicy::OnePerCycle] {
        let feed = ScriptedFeed::with_entries(4);
        feed.script.lock().unwrap().entries[3]["humidity"] = json!("n/a");
        let handle = builder()
            .with_absorb_policy(policy)
            .build(feed.clone())
            .unwrap()
            .spawn();

        sleep(Duration::from_secs(45)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.log_len, 3, "{:?}", policy);
        assert_eq!(snapshot.next_unprocessed, 3, "{:?}", policy);
        assert!(snapshot.stats.malformed_rejections >= 1);

        handle.stop().await.unwrap();
    }
}

#[test]
fn zero_interval_is_rejected() {
    let result = SessionBuilder::new()
        .with_poll_interval(Duration::ZERO)
        .build(ScriptedFeed::default());
    assert!(matches!(result, Err(SoilwatchError::ConfigError(_))));
}
