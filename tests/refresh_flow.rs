//! End-to-end refresh flow tests.
//!
//! Drive the gateway the way the host shell would — configure, let the
//! scheduled jobs fire, read the cache — with the HTTP side mocked by
//! wiremock and scheduling handled by the on-demand fake backend.

use std::sync::Arc;
use vcbrief_background::{
    BriefBackground, BriefClient, BriefStore, CacheSnapshot, ConfigureRequest, FakeBackend,
    FilePrefsStore, JobBackend, JobOutcome, MemoryPrefsStore, PrefsStore, RefreshConfig,
    RefreshScheduler, ONESHOT_JOB_NAME, PERIODIC_JOB_NAME, REFRESH_INTERVAL,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_gateway(prefs: Arc<dyn PrefsStore>) -> (BriefBackground, Arc<FakeBackend>, BriefStore) {
    let backend = Arc::new(FakeBackend::new());
    let store = BriefStore::new(prefs);
    let client = Arc::new(BriefClient::new().expect("build client"));
    let scheduler = RefreshScheduler::new(
        Arc::clone(&backend) as Arc<dyn JobBackend>,
        store.clone(),
        client,
    );
    (
        BriefBackground::new(store.clone(), scheduler),
        backend,
        store,
    )
}

fn memory_gateway() -> (BriefBackground, Arc<FakeBackend>, BriefStore) {
    build_gateway(Arc::new(MemoryPrefsStore::new()))
}

fn configure(gateway: &BriefBackground, api_base: &str, enabled: bool) {
    let ack = gateway.configure(ConfigureRequest {
        api_base: Some(api_base.to_owned()),
        enabled: Some(enabled),
    });
    assert!(ack.ok);
}

// ── Scenario A: configure, immediate one-shot, 200 ──────────────────────────

#[tokio::test]
async fn configure_then_fire_populates_cache() {
    let server = MockServer::start().await;
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .and(query_param("date", today))
        .and(query_param("mode", "execution"))
        .and(query_param("level", "3_5"))
        .and(query_param("itemCount", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"items\":[]}"))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, backend, store) = memory_gateway();
    // Trailing slash must be stripped before the URL is built.
    configure(&gateway, &format!("{}/", server.uri()), true);
    assert_eq!(store.config().unwrap().api_base, server.uri());

    let outcome = backend.fire(ONESHOT_JOB_NAME).await;
    assert_eq!(outcome, Some(JobOutcome::Succeeded));

    let snapshot = gateway.cache();
    assert_eq!(snapshot.json, "{\"items\":[]}");
    assert!(snapshot.cached_at_ms > 0);
    assert_eq!(snapshot.last_error, "");
}

// ── Scenario B: 503 keeps the previous body and signals retry ───────────────

#[tokio::test]
async fn server_error_keeps_previous_brief_and_signals_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (gateway, backend, store) = memory_gateway();
    store.record_success("{\"items\":[\"prior\"]}", 1_000).unwrap();

    configure(&gateway, &server.uri(), true);
    let outcome = backend.fire(ONESHOT_JOB_NAME).await.unwrap();
    assert_eq!(outcome, JobOutcome::FailedTransient);
    assert!(outcome.signals_retry());

    let snapshot = gateway.cache();
    assert_eq!(snapshot.json, "{\"items\":[\"prior\"]}");
    assert_eq!(snapshot.cached_at_ms, 1_000);
    assert_eq!(snapshot.last_error, "http_503");
}

#[tokio::test]
async fn server_error_with_empty_cache_leaves_it_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (gateway, backend, _store) = memory_gateway();
    configure(&gateway, &server.uri(), true);
    backend.fire(ONESHOT_JOB_NAME).await.unwrap();

    let snapshot = gateway.cache();
    assert_eq!(snapshot.json, "");
    assert_eq!(snapshot.cached_at_ms, 0);
    assert_eq!(snapshot.last_error, "http_500");
}

// ── Scenario C: empty base schedules nothing ────────────────────────────────

#[tokio::test]
async fn empty_base_schedules_nothing_and_cache_is_untouched() {
    let (gateway, backend, store) = memory_gateway();
    store.record_success("{\"items\":[\"prior\"]}", 7).unwrap();

    configure(&gateway, "", true);

    assert!(backend.scheduled().is_empty());
    let snapshot = gateway.cache();
    assert_eq!(snapshot.json, "{\"items\":[\"prior\"]}");
    assert_eq!(snapshot.cached_at_ms, 7);
}

// ── Scenario D: rapid reconfiguration collapses to the latest intent ────────

#[tokio::test]
async fn rapid_reconfigure_fetches_only_the_latest_endpoint() {
    let stale = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stale"))
        .expect(0)
        .mount(&stale)
        .await;

    let fresh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .expect(1)
        .mount(&fresh)
        .await;

    let (gateway, backend, _store) = memory_gateway();
    configure(&gateway, &stale.uri(), true);
    configure(&gateway, &fresh.uri(), true);

    // Only one pending one-shot exists: the replacement.
    let outcome = backend.fire(ONESHOT_JOB_NAME).await;
    assert_eq!(outcome, Some(JobOutcome::Succeeded));
    assert_eq!(gateway.cache().json, "fresh");
}

// ── Disable cancels; pending triggers become no-ops ─────────────────────────

#[tokio::test]
async fn disable_cancels_both_jobs() {
    let (gateway, backend, _store) = memory_gateway();
    configure(&gateway, "https://api.example.com", true);
    assert_eq!(backend.scheduled().len(), 2);

    configure(&gateway, "https://api.example.com", false);
    assert!(backend.scheduled().is_empty());
    assert_eq!(backend.fire(ONESHOT_JOB_NAME).await, None);
    assert_eq!(backend.fire(PERIODIC_JOB_NAME).await, None);
}

#[tokio::test]
async fn trigger_after_disable_skips_without_network_or_cache_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should not land"))
        .expect(0)
        .mount(&server)
        .await;

    let (gateway, backend, store) = memory_gateway();
    configure(&gateway, &server.uri(), true);

    // The disabled intent lands in the store while an instance is still
    // registered with the platform — its trigger must become a no-op.
    store
        .save_config(&RefreshConfig::normalized(&server.uri(), false))
        .unwrap();

    let outcome = backend.fire(ONESHOT_JOB_NAME).await.unwrap();
    assert_eq!(outcome, JobOutcome::Skipped);
    assert_eq!(gateway.cache(), CacheSnapshot::default());
}

// ── Idempotence and uniqueness ──────────────────────────────────────────────

#[tokio::test]
async fn repeated_configure_keeps_one_instance_per_identity() {
    let (gateway, backend, store) = memory_gateway();
    configure(&gateway, "https://api.example.com/", true);
    let first = store.config().unwrap();

    configure(&gateway, "https://api.example.com/", true);
    assert_eq!(store.config().unwrap(), first);

    assert_eq!(
        backend.scheduled(),
        vec![ONESHOT_JOB_NAME.to_owned(), PERIODIC_JOB_NAME.to_owned()]
    );
    assert_eq!(
        backend.spec(PERIODIC_JOB_NAME).unwrap().repeat,
        Some(REFRESH_INTERVAL)
    );
}

// ── Durability across restarts ──────────────────────────────────────────────

#[tokio::test]
async fn cache_and_config_survive_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brief"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"items\":[1,2]}"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("vcbrief.bg.json");

    {
        let prefs = Arc::new(FilePrefsStore::open(&store_path).unwrap());
        let (gateway, backend, _store) = build_gateway(prefs);
        configure(&gateway, &server.uri(), true);
        backend.fire(ONESHOT_JOB_NAME).await.unwrap();
        assert_eq!(gateway.cache().json, "{\"items\":[1,2]}");
    }

    // A fresh process: same file, no jobs fired yet.
    let prefs = Arc::new(FilePrefsStore::open(&store_path).unwrap());
    let (gateway, _backend, store) = build_gateway(prefs);
    assert_eq!(store.config().unwrap().api_base, server.uri());
    let snapshot = gateway.cache();
    assert_eq!(snapshot.json, "{\"items\":[1,2]}");
    assert!(snapshot.cached_at_ms > 0);
    assert_eq!(snapshot.last_error, "");
}
