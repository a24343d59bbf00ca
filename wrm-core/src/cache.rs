//! Per-session sensor cache and the fetch manager that fills it.
//!
//! Entries are created on the first successful fetch for a key, replaced by
//! later successful fetches (last completed wins) and never expire. A failed
//! fetch leaves whatever was cached before untouched.

use crate::api::SensorSource;
use crate::reading::{RawReading, SensorSeries, SeriesKind};
use crate::station::StationView;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

/// Fetched sensor payloads for one map session.
#[derive(Debug, Default, Clone)]
pub struct SensorCache {
    /// Current readings, keyed by station name (popup use)
    readings: HashMap<String, Vec<RawReading>>,
    /// Historical series, keyed by station id and parameter (panel use)
    series: HashMap<(String, SeriesKind), SensorSeries>,
}

impl SensorCache {
    pub fn readings(&self, station_name: &str) -> Option<&[RawReading]> {
        self.readings.get(station_name).map(Vec::as_slice)
    }

    pub fn series(&self, station_id: &str, kind: SeriesKind) -> Option<&SensorSeries> {
        self.series.get(&(station_id.to_string(), kind))
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty() && self.series.is_empty()
    }

    fn insert_readings(&mut self, station_name: String, readings: Vec<RawReading>) {
        self.readings.insert(station_name, readings);
    }

    fn insert_series(&mut self, series: SensorSeries) {
        self.series
            .insert((series.station_id.clone(), series.kind), series);
    }
}

/// Cache handle shared between the fetch manager and its readers.
pub type SharedCache = Arc<RwLock<SensorCache>>;

/// Which remote endpoint a fetch targets.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Endpoint {
    Station,
    Series(SeriesKind),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Station => f.write_str("station"),
            Endpoint::Series(kind) => f.write_str(kind.endpoint()),
        }
    }
}

/// At most one request per key is outstanding at any time.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FetchKey {
    pub station_id: String,
    pub endpoint: Endpoint,
}

impl FetchKey {
    pub fn new(station_id: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            station_id: station_id.into(),
            endpoint,
        }
    }
}

/// What a fetch trigger did.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FetchOutcome {
    /// The payload was fetched and written to the cache.
    Stored,
    /// A request for the same key was already outstanding; nothing was sent.
    InFlight,
    /// The station is not active; nothing was sent.
    Inactive,
    /// The request failed; the cache was left as it was.
    Failed,
}

/// Removes its key from the in-flight set when dropped, including when the
/// owning future is dropped before completion.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<FetchKey>>,
    key: FetchKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Fetches sensor payloads on demand and memoizes them in a [`SharedCache`].
pub struct FetchManager<S> {
    source: Arc<S>,
    cache: SharedCache,
    in_flight: Arc<Mutex<HashSet<FetchKey>>>,
}

impl<S> Clone for FetchManager<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: SensorSource + 'static> FetchManager<S> {
    pub fn new(source: S) -> Self {
        Self::with_cache(Arc::new(source), SharedCache::default())
    }

    pub fn with_cache(source: Arc<S>, cache: SharedCache) -> Self {
        Self {
            source,
            cache,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    /// Cached current readings for a station, by name.
    pub fn readings(&self, station_name: &str) -> Option<Vec<RawReading>> {
        self.read_cache().readings(station_name).map(<[_]>::to_vec)
    }

    /// Cached history for a station, by id.
    pub fn series(&self, station_id: &str, kind: SeriesKind) -> Option<SensorSeries> {
        self.read_cache().series(station_id, kind).cloned()
    }

    /// Whether a request for `key` is outstanding.
    pub fn is_loading(&self, key: &FetchKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Fetch current readings for an active station into the cache.
    pub async fn fetch_station_readings(&self, station: &StationView) -> FetchOutcome {
        if !station.is_active {
            debug!("Not fetching readings for inactive station {}", station.id);
            return FetchOutcome::Inactive;
        }
        let Some(_in_flight) = self.claim(FetchKey::new(&station.id, Endpoint::Station)) else {
            debug!("Readings for {} already in flight", station.id);
            return FetchOutcome::InFlight;
        };

        match self.source.current_readings(&station.id).await {
            Ok(readings) => {
                debug!(
                    "Caching {} readings for {} ({})",
                    readings.len(),
                    station.name,
                    station.id
                );
                self.write_cache()
                    .insert_readings(station.name.clone(), readings);
                FetchOutcome::Stored
            }
            Err(e) => {
                warn!(
                    "Fetching readings for {} ({}) failed: {}",
                    station.name, station.id, e
                );
                FetchOutcome::Failed
            }
        }
    }

    /// Fetch one historical series for an active station into the cache.
    pub async fn fetch_station_series(
        &self,
        station: &StationView,
        kind: SeriesKind,
    ) -> FetchOutcome {
        if !station.is_active {
            debug!("Not fetching {} for inactive station {}", kind, station.id);
            return FetchOutcome::Inactive;
        }
        let Some(_in_flight) = self.claim(FetchKey::new(&station.id, Endpoint::Series(kind)))
        else {
            debug!("{} for {} already in flight", kind, station.id);
            return FetchOutcome::InFlight;
        };

        match self.source.series(&station.id, kind).await {
            Ok(points) => {
                debug!(
                    "Caching {} {} points for {}",
                    points.len(),
                    kind,
                    station.id
                );
                self.write_cache().insert_series(SensorSeries {
                    station_id: station.id.clone(),
                    kind,
                    points,
                });
                FetchOutcome::Stored
            }
            Err(e) => {
                warn!("Fetching {} for {} failed: {}", kind, station.id, e);
                FetchOutcome::Failed
            }
        }
    }

    /// Fetch all three panel series for a station concurrently, in
    /// [`SeriesKind::ALL`] order.
    pub async fn load_panel(&self, station: &StationView) -> [FetchOutcome; 3] {
        let [flow, oxygen, conductivity] = SeriesKind::ALL;
        let (flow, oxygen, conductivity) = tokio::join!(
            self.fetch_station_series(station, flow),
            self.fetch_station_series(station, oxygen),
            self.fetch_station_series(station, conductivity),
        );
        [flow, oxygen, conductivity]
    }

    /// Start a readings fetch on the runtime. The task writes into the cache
    /// whether or not the handle is kept.
    pub fn spawn_readings(&self, station: StationView) -> JoinHandle<FetchOutcome> {
        let manager = self.clone();
        tokio::spawn(async move { manager.fetch_station_readings(&station).await })
    }

    /// Start a history fetch on the runtime.
    pub fn spawn_series(&self, station: StationView, kind: SeriesKind) -> JoinHandle<FetchOutcome> {
        let manager = self.clone();
        tokio::spawn(async move { manager.fetch_station_series(&station, kind).await })
    }

    fn claim(&self, key: FetchKey) -> Option<InFlight<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then(|| InFlight {
            set: &self.in_flight,
            key,
        })
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, SensorCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, SensorCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SensorError};
    use crate::reading::SeriesPoint;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSource {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Duration,
        value: Mutex<f64>,
    }

    impl FakeSource {
        fn new(delay_millis: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay: Duration::from_millis(delay_millis),
                value: Mutex::new(12.3),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn set_value(&self, value: f64) {
            *self.value.lock().unwrap() = value;
        }

        async fn respond<T>(&self, url: String, payload: T) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(SensorError::Status { url, status: 503 });
            }
            Ok(payload)
        }
    }

    #[async_trait]
    impl SensorSource for FakeSource {
        async fn current_readings(&self, station_id: &str) -> Result<Vec<RawReading>> {
            let value = *self.value.lock().unwrap();
            let readings = vec![RawReading {
                parameter_label: "Stream Discharge (ML/d)".to_string(),
                value: Some(value),
                units: Some("ML/d".to_string()),
                timestamp: Some("2024-05-01T12:00:00Z".to_string()),
            }];
            self.respond(format!("fake://station/{}", station_id), readings)
                .await
        }

        async fn series(&self, station_id: &str, kind: SeriesKind) -> Result<Vec<SeriesPoint>> {
            let value = *self.value.lock().unwrap();
            let points = vec![SeriesPoint {
                timestamp: Some("2024-05-01T00:00:00Z".to_string()),
                value: Some(value),
            }];
            self.respond(format!("fake://{}/{}", kind, station_id), points)
                .await
        }
    }

    fn station(is_active: bool) -> StationView {
        StationView {
            id: "S1".to_string(),
            name: "Creek A".to_string(),
            display_label: "Creek A".to_string(),
            latitude: -36.1,
            longitude: 141.9,
            is_active,
        }
    }

    #[tokio::test]
    async fn test_fetch_stores_readings_by_name() {
        let manager = FetchManager::new(FakeSource::new(0));
        let outcome = manager.fetch_station_readings(&station(true)).await;
        assert_eq!(outcome, FetchOutcome::Stored);
        let readings = manager.readings("Creek A").unwrap();
        assert_eq!(readings[0].value, Some(12.3));
        assert!(manager.readings("S1").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_send_one_request() {
        let source = Arc::new(FakeSource::new(20));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        let (first, second) = tokio::join!(
            manager.fetch_station_readings(&view),
            manager.fetch_station_readings(&view),
        );
        assert_eq!(first, FetchOutcome::Stored);
        assert_eq!(second, FetchOutcome::InFlight);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_series_triggers_send_one_request() {
        let source = Arc::new(FakeSource::new(20));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        let (first, second) = tokio::join!(
            manager.fetch_station_series(&view, SeriesKind::Oxygen),
            manager.fetch_station_series(&view, SeriesKind::Oxygen),
        );
        assert_eq!(first, FetchOutcome::Stored);
        assert_eq!(second, FetchOutcome::InFlight);
        assert_eq!(source.calls(), 1);
        assert!(!manager.is_loading(&FetchKey::new("S1", Endpoint::Series(SeriesKind::Oxygen))));
    }

    #[tokio::test]
    async fn test_different_endpoints_are_not_deduplicated() {
        let source = Arc::new(FakeSource::new(20));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        let (readings, flow) = tokio::join!(
            manager.fetch_station_readings(&view),
            manager.fetch_station_series(&view, SeriesKind::Flow),
        );
        assert_eq!(readings, FetchOutcome::Stored);
        assert_eq!(flow, FetchOutcome::Stored);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_inactive_station_is_never_fetched() {
        let source = Arc::new(FakeSource::new(0));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(false);
        assert_eq!(
            manager.fetch_station_readings(&view).await,
            FetchOutcome::Inactive
        );
        assert_eq!(
            manager.fetch_station_series(&view, SeriesKind::Oxygen).await,
            FetchOutcome::Inactive
        );
        assert_eq!(source.calls(), 0);
        assert!(manager.cache().read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_entry() {
        let source = Arc::new(FakeSource::new(0));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        assert_eq!(
            manager.fetch_station_readings(&view).await,
            FetchOutcome::Stored
        );

        source.set_failing(true);
        source.set_value(99.0);
        assert_eq!(
            manager.fetch_station_readings(&view).await,
            FetchOutcome::Failed
        );
        assert_eq!(manager.readings("Creek A").unwrap()[0].value, Some(12.3));
    }

    #[tokio::test]
    async fn test_failed_series_fetch_keeps_previous_entry() {
        let source = Arc::new(FakeSource::new(0));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        assert_eq!(
            manager.fetch_station_series(&view, SeriesKind::Flow).await,
            FetchOutcome::Stored
        );

        source.set_failing(true);
        source.set_value(99.0);
        assert_eq!(
            manager.fetch_station_series(&view, SeriesKind::Flow).await,
            FetchOutcome::Failed
        );
        let series = manager.series("S1", SeriesKind::Flow).unwrap();
        assert_eq!(series.points[0].value, Some(12.3));
        assert!(manager.series("S1", SeriesKind::Oxygen).is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_without_entry_leaves_cache_empty() {
        let source = Arc::new(FakeSource::new(0));
        source.set_failing(true);
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        assert_eq!(
            manager.fetch_station_series(&view, SeriesKind::Flow).await,
            FetchOutcome::Failed
        );
        assert!(manager.series("S1", SeriesKind::Flow).is_none());
        assert!(!manager.is_loading(&FetchKey::new("S1", Endpoint::Series(SeriesKind::Flow))));
    }

    #[tokio::test]
    async fn test_later_success_overwrites() {
        let source = Arc::new(FakeSource::new(0));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        manager.fetch_station_readings(&view).await;
        source.set_value(15.0);
        assert_eq!(
            manager.fetch_station_readings(&view).await,
            FetchOutcome::Stored
        );
        assert_eq!(source.calls(), 2);
        assert_eq!(manager.readings("Creek A").unwrap()[0].value, Some(15.0));
    }

    #[tokio::test]
    async fn test_dropped_fetch_releases_key() {
        let source = Arc::new(FakeSource::new(50));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let view = station(true);
        let key = FetchKey::new("S1", Endpoint::Station);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(5),
            manager.fetch_station_readings(&view),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!manager.is_loading(&key));
        assert!(manager.readings("Creek A").is_none());
    }

    #[tokio::test]
    async fn test_spawned_fetch_writes_shared_cache() {
        let manager = FetchManager::new(FakeSource::new(5));
        let cache = manager.cache();
        let handle = manager.spawn_series(station(true), SeriesKind::Conductivity);
        assert_eq!(handle.await.unwrap(), FetchOutcome::Stored);
        let guard = cache.read().unwrap();
        let series = guard.series("S1", SeriesKind::Conductivity).unwrap();
        assert_eq!(series.unit(), "µS/cm");
        assert_eq!(series.points.len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_readings_in_flight_while_running() {
        let manager = FetchManager::new(FakeSource::new(20));
        let handle = manager.spawn_readings(station(true));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(manager.is_loading(&FetchKey::new("S1", Endpoint::Station)));
        assert_eq!(
            manager.fetch_station_readings(&station(true)).await,
            FetchOutcome::InFlight
        );
        assert_eq!(handle.await.unwrap(), FetchOutcome::Stored);
        assert!(!manager.is_loading(&FetchKey::new("S1", Endpoint::Station)));
    }

    #[tokio::test]
    async fn test_load_panel_fetches_all_series() {
        let source = Arc::new(FakeSource::new(5));
        let manager = FetchManager::with_cache(Arc::clone(&source), SharedCache::default());
        let outcomes = manager.load_panel(&station(true)).await;
        assert_eq!(outcomes, [FetchOutcome::Stored; 3]);
        assert_eq!(source.calls(), 3);
        for kind in SeriesKind::ALL {
            assert!(manager.series("S1", kind).is_some());
        }
    }
}
