#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use medassist_api::api::{create_router, AppState};
use medassist_api::cache::{CacheConnection, CacheConnector};
use medassist_api::config::{CacheSettings, SimulationSettings};
use medassist_api::error::{AppError, Result};
use medassist_api::models::{Consultation, Doctor, NewConsultation};
use medassist_api::observability::{AppMetrics, JsonLogLayer, MetricsRegistry};
use medassist_api::repositories::{StoreConnection, StoreConnector};
use medassist_api::services::{ConnectionProvider, RandomSource, SeededRandom};

// ============================================================================
// Fixtures
// ============================================================================

pub fn doctor(id: i64, available: bool, price: f64) -> Doctor {
    Doctor {
        id,
        first_name: format!("First{}", id),
        last_name: format!("Last{}", id),
        specialty: "General Practice".to_string(),
        available,
        consultation_price: price,
    }
}

pub fn seed_doctors() -> Vec<Doctor> {
    vec![
        doctor(1, true, 45.0),
        doctor(2, true, 60.5),
        doctor(3, false, 80.0),
    ]
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
struct StoreShared {
    doctors: Mutex<Vec<Doctor>>,
    consultations: Mutex<Vec<Consultation>>,
    inserted: Mutex<Vec<NewConsultation>>,
    connects: AtomicUsize,
    doctor_queries: AtomicUsize,
    down: AtomicBool,
    failing_queries: AtomicBool,
}

/// Store fake with connection counting and failure toggles.
#[derive(Clone, Default)]
pub struct FakeStore {
    shared: Arc<StoreShared>,
}

impl FakeStore {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        let store = Self::default();
        *store.shared.doctors.lock() = doctors;
        store
    }

    pub fn set_down(&self, down: bool) {
        self.shared.down.store(down, Ordering::SeqCst);
    }

    pub fn set_failing_queries(&self, failing: bool) {
        self.shared.failing_queries.store(failing, Ordering::SeqCst);
    }

    pub fn set_doctors(&self, doctors: Vec<Doctor>) {
        *self.shared.doctors.lock() = doctors;
    }

    pub fn push_consultation(&self, consultation: Consultation) {
        self.shared.consultations.lock().push(consultation);
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn doctor_queries(&self) -> usize {
        self.shared.doctor_queries.load(Ordering::SeqCst)
    }

    pub fn inserted(&self) -> Vec<NewConsultation> {
        self.shared.inserted.lock().clone()
    }

    /// A connection handle without going through `connect`.
    pub fn connection(&self) -> Box<dyn StoreConnection> {
        Box::new(FakeStoreConnection {
            shared: self.shared.clone(),
        })
    }
}

#[async_trait]
impl StoreConnector for FakeStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.shared.down.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("connection refused")));
        }
        Ok(Box::new(FakeStoreConnection {
            shared: self.shared.clone(),
        }))
    }
}

struct FakeStoreConnection {
    shared: Arc<StoreShared>,
}

impl FakeStoreConnection {
    fn check(&self) -> Result<()> {
        if self.shared.failing_queries.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("query failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreConnection for FakeStoreConnection {
    async fn ping(&mut self) -> Result<()> {
        self.check()
    }

    async fn available_doctors(&mut self) -> Result<Vec<Doctor>> {
        self.check()?;
        self.shared.doctor_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .shared
            .doctors
            .lock()
            .iter()
            .filter(|d| d.available)
            .cloned()
            .collect())
    }

    async fn recent_consultations(&mut self, limit: i64) -> Result<Vec<Consultation>> {
        self.check()?;
        let mut consultations = self.shared.consultations.lock().clone();
        consultations.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        consultations.truncate(limit.max(0) as usize);
        Ok(consultations)
    }

    async fn available_doctor_price(&mut self, doctor_id: i64) -> Result<Option<f64>> {
        self.check()?;
        Ok(self
            .shared
            .doctors
            .lock()
            .iter()
            .find(|d| d.id == doctor_id && d.available)
            .map(|d| d.consultation_price))
    }

    async fn insert_consultation(&mut self, consultation: &NewConsultation) -> Result<u64> {
        self.check()?;
        let mut inserted = self.shared.inserted.lock();
        inserted.push(consultation.clone());
        Ok(inserted.len() as u64)
    }
}

// ============================================================================
// In-memory cache
// ============================================================================

#[derive(Default)]
struct CacheShared {
    entries: Mutex<HashMap<String, (String, u64)>>,
    connects: AtomicUsize,
    writes: AtomicUsize,
    down: AtomicBool,
    failing_reads: AtomicBool,
    failing_writes: AtomicBool,
}

/// Cache fake that records the TTL of every write.
#[derive(Clone, Default)]
pub struct FakeCache {
    shared: Arc<CacheShared>,
}

impl FakeCache {
    pub fn set_down(&self, down: bool) {
        self.shared.down.store(down, Ordering::SeqCst);
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.shared.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.shared.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.shared.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str, ttl_secs: u64) {
        self.shared
            .entries
            .lock()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
    }

    pub fn clear(&self) {
        self.shared.entries.lock().clear();
    }

    pub fn writes(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheConnector for FakeCache {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.shared.down.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("cache unreachable")));
        }
        Ok(Box::new(FakeCacheConnection {
            shared: self.shared.clone(),
        }))
    }
}

struct FakeCacheConnection {
    shared: Arc<CacheShared>,
}

#[async_trait]
impl CacheConnection for FakeCacheConnection {
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        if self.shared.failing_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("read failed")));
        }
        Ok(self.shared.entries.lock().get(key).map(|(v, _)| v.clone()))
    }

    async fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        if self.shared.failing_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("write failed")));
        }
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        self.shared
            .entries
            .lock()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }
}

// ============================================================================
// Scripted randomness
// ============================================================================

/// Replays queued draws; once a queue is empty it returns `low` for integer
/// draws and 0.99 for unit draws. Degenerate ranges such as disabled
/// latency never consume a queued value.
#[derive(Default)]
pub struct ScriptedRandom {
    units: Mutex<VecDeque<f64>>,
    integers: Mutex<VecDeque<u64>>,
}

impl ScriptedRandom {
    pub fn new(units: &[f64], integers: &[u64]) -> Self {
        Self {
            units: Mutex::new(units.iter().copied().collect()),
            integers: Mutex::new(integers.iter().copied().collect()),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&self) -> f64 {
        self.units.lock().pop_front().unwrap_or(0.99)
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.integers.lock().pop_front().unwrap_or(low)
    }
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.0.clone())
    }
}

impl LogCapture {
    /// Installs a JSON subscriber for the current thread.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber =
            tracing_subscriber::registry().with(JsonLogLayer::new(capture.clone()));
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|r| r["message"] == message)
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|r| r["level"] == level)
            .collect()
    }
}

// ============================================================================
// Router harness
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub metrics: Arc<AppMetrics>,
    pub registry: Arc<MetricsRegistry>,
    pub store: FakeStore,
    pub cache: FakeCache,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_random(Arc::new(SeededRandom::new(42)))
    }

    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self::build(
            FakeStore::with_doctors(seed_doctors()),
            FakeCache::default(),
            random,
            SimulationSettings::without_latency(),
        )
    }

    pub fn build(
        store: FakeStore,
        cache: FakeCache,
        random: Arc<dyn RandomSource>,
        simulation: SimulationSettings,
    ) -> Self {
        let registry = Arc::new(MetricsRegistry::new());
        let metrics = Arc::new(AppMetrics::new(registry.clone()).unwrap());
        let connections = ConnectionProvider::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            metrics.clone(),
        );
        let state = AppState::new(connections, random, CacheSettings::default(), simulation);

        Self {
            router: create_router(state.clone()),
            state,
            metrics,
            registry,
            store,
            cache,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(request(Method::GET, path, Body::empty())).await
    }

    pub async fn post(&self, path: &str, body: &str) -> TestResponse {
        self.send(request(Method::POST, path, Body::from(body.to_string())))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(self.router.clone(), request).await
    }

    pub fn requests_total(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.registry
            .counter_value("http_requests_total", &[method, endpoint, status])
            .unwrap_or(0)
    }

    pub fn in_flight(&self, method: &str, endpoint: &str) -> f64 {
        self.registry
            .gauge_value("http_requests_in_progress", &[method, endpoint])
            .unwrap_or(0.0)
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

pub fn request(method: Method, path: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}
