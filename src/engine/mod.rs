// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The controller state synchronization engine.
//!
//! [`WiserEngine`] owns the snapshot repository, the device-to-room
//! map, the last-seen map and the connection state, and drives the
//! fetch→store→map→enrich→diff cycle either on demand
//! ([`WiserEngine::refresh`]) or on a timer
//! ([`WiserEngine::start_monitor`]). Everything the engine observes is
//! published on its [`EventBus`].
//!
//! The engine is an explicit object constructed with its configuration;
//! several independent engines can monitor several controllers. Clones
//! share the same underlying state, like the clones of a channel.

mod command;
mod query;

pub use command::{RoomSelector, SetRoomOutcome};
pub use query::{
    BatteryLevelsView, BatteryReading, ChannelState, ChannelSummary, OfflineDevicesView,
    RoomTemperatureReading, RoomTemperaturesView, SystemStateView, battery_levels,
    offline_devices, room_temperatures, system_state,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use parking_lot::RwLock as SyncRwLock;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, ProtocolError};
use crate::event::{EngineEvent, EventBus, MonitorTick};
use crate::protocol::{BRAND_NAME, GatewayChecker, HubClient, HubConfig};
use crate::snapshot::{DeviceRoomMap, Snapshot, SnapshotStore, diff_snapshots, enrich_devices};
use crate::types::SetpointLimits;

/// Default monitor loop interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Whether the last connection to the controller succeeded, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// `true` if the most recent fetch reached the controller.
    pub last_successful: bool,
    /// When the controller last answered a fetch.
    pub last_connection_at: Option<DateTime<Utc>>,
}

/// Builder for a [`WiserEngine`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use wiser_lib::WiserEngine;
///
/// # fn main() -> wiser_lib::Result<()> {
/// let engine = WiserEngine::builder("192.168.1.100", "secret-from-hub")
///     .with_poll_interval(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EngineBuilder {
    hub: HubConfig,
    poll_interval: Duration,
    limits: SetpointLimits,
    gateway: GatewayChecker,
    event_capacity: Option<usize>,
}

impl EngineBuilder {
    /// Sets a custom controller port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.hub = self.hub.with_port(port);
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Should stay well below the poll interval so a slow request
    /// cannot back up behind the next scheduled tick.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.hub = self.hub.with_timeout(timeout);
        self
    }

    /// Sets the monitor poll interval (default 60 s).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the setpoint clamping limits.
    #[must_use]
    pub fn with_setpoint_limits(mut self, limits: SetpointLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the gateway probe timeout.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.gateway = GatewayChecker::with_timeout(timeout);
        self
    }

    /// Sets the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Fails fast with a configuration error when the host or shared
    /// secret is missing or invalid.
    pub fn build(self) -> Result<WiserEngine, Error> {
        let client = self.hub.into_client()?;
        let bus = self
            .event_capacity
            .map_or_else(EventBus::new, EventBus::with_capacity);

        Ok(WiserEngine {
            client,
            bus,
            snapshots: Arc::new(RwLock::new(SnapshotStore::new())),
            room_map: Arc::new(SyncRwLock::new(DeviceRoomMap::new())),
            last_seen: Arc::new(SyncMutex::new(HashMap::new())),
            connection: Arc::new(SyncMutex::new(ConnectionState::default())),
            cloud_connected: Arc::new(SyncMutex::new(None)),
            cycle_lock: Arc::new(Mutex::new(())),
            monitor: Arc::new(SyncMutex::new(None)),
            poll_interval: self.poll_interval,
            limits: self.limits,
            gateway: self.gateway,
        })
    }
}

/// A running monitor loop.
#[derive(Debug)]
struct MonitorTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Synchronization engine for one Wiser controller.
///
/// See the [module documentation](self) for an overview. Construct via
/// [`WiserEngine::builder`]; clones share all state and the event bus.
///
/// # Examples
///
/// ```no_run
/// use wiser_lib::WiserEngine;
///
/// #[tokio::main]
/// async fn main() -> wiser_lib::Result<()> {
///     let engine = WiserEngine::builder("192.168.1.100", "secret-from-hub").build()?;
///
///     // Watch what the engine observes
///     let mut events = engine.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("{}: {event:?}", event.topic());
///         }
///     });
///
///     // One-shot setup fetch, then poll on the configured interval
///     engine.refresh().await?;
///     engine.start_monitor();
///
///     // Queries and commands run on demand
///     let temps = engine.room_temperatures(None).await?;
///     println!("{} rooms", temps.rooms.len());
///     engine.set_room_temperature("Lounge", 21.5).await;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WiserEngine {
    pub(crate) client: HubClient,
    pub(crate) bus: EventBus,
    snapshots: Arc<RwLock<SnapshotStore>>,
    room_map: Arc<SyncRwLock<DeviceRoomMap>>,
    pub(crate) last_seen: Arc<SyncMutex<HashMap<i64, DateTime<Utc>>>>,
    connection: Arc<SyncMutex<ConnectionState>>,
    cloud_connected: Arc<SyncMutex<Option<bool>>>,
    cycle_lock: Arc<Mutex<()>>,
    monitor: Arc<SyncMutex<Option<MonitorTask>>>,
    poll_interval: Duration,
    pub(crate) limits: SetpointLimits,
    gateway: GatewayChecker,
}

impl WiserEngine {
    /// Starts building an engine for the given controller.
    ///
    /// # Arguments
    ///
    /// * `host` - The controller's hostname or IP address
    /// * `secret` - The shared secret from the hub's setup mode
    #[must_use]
    pub fn builder(host: impl Into<String>, secret: impl Into<String>) -> EngineBuilder {
        EngineBuilder {
            hub: HubConfig::new(host, secret),
            poll_interval: DEFAULT_POLL_INTERVAL,
            limits: SetpointLimits::default(),
            gateway: GatewayChecker::new(),
            event_capacity: None,
        }
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to engine events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Returns the number of active event subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    // =========================================================================
    // Fetch cycle
    // =========================================================================

    /// Runs one full fetch cycle: fetch, store, map, enrich, diff.
    ///
    /// Used by the monitor loop on every tick, and directly for a
    /// one-shot setup fetch. Cycles never interleave: if another cycle
    /// is still in flight this call is skipped.
    ///
    /// Connectivity transitions (offline→online and back) are published
    /// exactly once per transition; repeated failures stay quiet.
    ///
    /// # Errors
    ///
    /// Returns the classified fetch failure. The failure has already
    /// been published on the event bus; the monitor loop ignores it.
    pub async fn refresh(&self) -> Result<(), Error> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::trace!("fetch cycle already in flight, skipping");
            self.bus.publish(EngineEvent::Debug {
                context: "refresh",
                message: "fetch cycle already in flight, tick skipped".to_string(),
            });
            return Ok(());
        };

        match self.client.get_all().await {
            Ok(raw) => self.apply_snapshot(raw).await,
            Err(error) => Err(self.handle_fetch_failure(error).await.into()),
        }
    }

    /// Stores and processes a freshly fetched snapshot.
    async fn apply_snapshot(&self, raw: Value) -> Result<(), Error> {
        let mut snapshot = Snapshot::from_raw(raw)?;

        let map = DeviceRoomMap::rebuild(&snapshot);
        self.bus.publish(EngineEvent::RoomMapUpdated(map.clone()));

        {
            let mut last_seen = self.last_seen.lock();
            enrich_devices(&mut snapshot, &map, &mut last_seen);
        }

        // Swap the fully-built snapshot in and diff against the prior
        // one; promotion happens exactly once regardless of changes.
        let (latest, changes) = {
            let mut store = self.snapshots.write().await;
            let latest = store.store(snapshot);
            let changes = match store.previous() {
                Some(previous) => diff_snapshots(&previous, &latest, &map),
                None => Vec::new(),
            };
            store.promote();
            (latest, changes)
        };
        *self.room_map.write() = map;

        let change_count = changes.len();
        for change in changes {
            self.bus.publish(EngineEvent::Change(change));
        }
        tracing::trace!(change_count, "diff pass complete");

        self.check_cloud_connection(&latest);

        let was_online = {
            let mut connection = self.connection.lock();
            let was = connection.last_successful;
            connection.last_successful = true;
            connection.last_connection_at = Some(Utc::now());
            was
        };
        if !was_online {
            tracing::info!("controller reachable");
            self.bus.publish(EngineEvent::Online { online: true });
        }

        self.bus.publish(EngineEvent::FetchSucceeded { snapshot: latest });
        Ok(())
    }

    /// Publishes and classifies a fetch failure.
    async fn handle_fetch_failure(&self, error: ProtocolError) -> ProtocolError {
        let was_online = {
            let mut connection = self.connection.lock();
            let was = connection.last_successful;
            connection.last_successful = false;
            was
        };
        // Only report the transition, not every repeated failure
        if was_online {
            tracing::warn!("controller cannot be reached, is it online?");
            self.bus.publish(EngineEvent::Online { online: false });
        }

        let error = if error.is_reachability_failure() {
            if self.gateway.is_gateway_reachable().await {
                let refined = ProtocolError::ControllerUnreachable(error.to_string());
                self.bus.publish(EngineEvent::ControllerUnreachable {
                    message: refined.to_string(),
                });
                refined
            } else {
                let refined = ProtocolError::GatewayUnreachable;
                self.bus.publish(EngineEvent::GatewayUnreachable {
                    message: refined.to_string(),
                });
                refined
            }
        } else {
            error
        };

        tracing::warn!(error = %error, "full state fetch failed");
        self.bus.publish(EngineEvent::FetchFailed {
            error: error.to_string(),
        });
        error
    }

    /// Publishes a cloud connectivity change when the status differs
    /// from the prior check.
    fn check_cloud_connection(&self, latest: &Snapshot) {
        let Some(connected) = latest.cloud_connected() else {
            return;
        };
        let prior = self.cloud_connected.lock().replace(connected);
        if prior.is_some() && prior != Some(connected) {
            tracing::debug!(connected, "cloud connection status changed");
            self.bus.publish(EngineEvent::CloudConnection { connected });
        }
    }

    // =========================================================================
    // Monitor loop
    // =========================================================================

    /// Starts the monitor loop on the configured poll interval.
    ///
    /// Every tick publishes a tick event and runs one fetch cycle.
    /// Returns `false` (and leaves the running loop untouched) when a
    /// monitor is already running; stop it first to change the
    /// interval.
    pub fn start_monitor(&self) -> bool {
        let mut slot = self.monitor.lock();
        if slot.is_some() {
            tracing::warn!("monitor already running, start ignored; stop it before recreating");
            return false;
        }

        let (stop, mut stopped) = watch::channel(false);
        let engine = self.clone();
        let interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.bus.publish(EngineEvent::MonitorTick(MonitorTick {
                            timestamp: Utc::now(),
                            interval,
                        }));
                        tracing::trace!(interval_secs = interval.as_secs(), "monitor tick");
                        // An in-flight cycle is allowed to finish even if
                        // stop() fires meanwhile; the loop exits afterwards.
                        if let Err(error) = engine.refresh().await {
                            tracing::debug!(error = %error, "monitor fetch cycle failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            tracing::trace!("monitor loop ended");
        });

        *slot = Some(MonitorTask { handle, stop });
        tracing::info!(interval_secs = self.poll_interval.as_secs(), "monitor started");
        self.bus.publish(EngineEvent::MonitorCreated { interval });
        true
    }

    /// Stops the monitor loop.
    ///
    /// Returns `false` when no monitor is running. An in-flight fetch
    /// cycle completes and still publishes its results.
    pub fn stop_monitor(&self) -> bool {
        let mut slot = self.monitor.lock();
        let Some(task) = slot.take() else {
            tracing::debug!("attempt to stop non-existent monitor, ignored");
            return false;
        };

        let _ = task.stop.send(true);
        // The task exits on its own once any in-flight cycle finishes
        drop(task.handle);

        tracing::info!("monitor stopped");
        self.bus.publish(EngineEvent::MonitorRemoved);
        true
    }

    /// Returns `true` while the monitor loop is running.
    #[must_use]
    pub fn monitor_running(&self) -> bool {
        self.monitor.lock().is_some()
    }

    // =========================================================================
    // Connection probe and pass-through reads
    // =========================================================================

    /// Probes whether the controller answers with its brand name.
    pub async fn test_connection(&self) -> bool {
        match self.client.get_brand_name().await {
            Ok(brand) => {
                let ok = brand == BRAND_NAME;
                tracing::debug!(brand = %brand, ok, "connection probe answered");
                self.bus
                    .publish(EngineEvent::ConnectionTested { ok, error: None });
                ok
            }
            Err(error) => {
                tracing::debug!(error = %error, "connection probe failed");
                self.bus.publish(EngineEvent::ConnectionTested {
                    ok: false,
                    error: Some(error.to_string()),
                });
                false
            }
        }
    }

    /// Fetches the controller's network information.
    ///
    /// # Errors
    ///
    /// Returns the transport failure; the matching error event has been
    /// published.
    pub async fn get_network(&self) -> Result<Value, Error> {
        match self.client.get_network().await {
            Ok(data) => {
                self.bus.publish(EngineEvent::NetworkInfo { data: data.clone() });
                Ok(data)
            }
            Err(error) => {
                tracing::warn!(error = %error, "network info fetch failed");
                self.bus.publish(EngineEvent::NetworkInfoFailed {
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Fetches schedule data, for one schedule or all of them.
    ///
    /// # Errors
    ///
    /// Returns the transport failure; the matching error event has been
    /// published.
    pub async fn get_schedule(&self, schedule_id: Option<i64>) -> Result<Value, Error> {
        match self.client.get_schedule(schedule_id).await {
            Ok(data) => {
                self.bus.publish(EngineEvent::Schedule { data: data.clone() });
                Ok(data)
            }
            Err(error) => {
                tracing::warn!(error = %error, "schedule fetch failed");
                self.bus.publish(EngineEvent::ScheduleFailed {
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the latest stored snapshot.
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.read().await.latest()
    }

    /// Returns a copy of the current device-to-room map.
    #[must_use]
    pub fn device_room_map(&self) -> DeviceRoomMap {
        self.room_map.read().clone()
    }

    /// Returns a copy of the device last-seen map.
    #[must_use]
    pub fn device_last_seen(&self) -> HashMap<i64, DateTime<Utc>> {
        self.last_seen.lock().clone()
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.lock().clone()
    }

    /// Returns `true` if the most recent fetch reached the controller.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connection.lock().last_successful
    }

    /// Returns when the controller last answered a fetch.
    #[must_use]
    pub fn last_connection_at(&self) -> Option<DateTime<Utc>> {
        self.connection.lock().last_connection_at
    }

    /// Returns the configured poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the configured setpoint limits.
    #[must_use]
    pub fn setpoint_limits(&self) -> SetpointLimits {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> WiserEngine {
        // Points at a closed local port; monitor tests never tick
        WiserEngine::builder("127.0.0.1", "test-secret")
            .with_port(59_999)
            .with_poll_interval(Duration::from_secs(3600))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_fails_without_secret() {
        let result = WiserEngine::builder("192.168.1.100", "").build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_fails_without_host() {
        let result = WiserEngine::builder("", "secret").build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn new_engine_has_no_snapshot() {
        let engine = engine();
        assert!(engine.latest().await.is_none());
        assert!(engine.device_room_map().is_empty());
        assert!(engine.device_last_seen().is_empty());
        assert!(!engine.is_online());
    }

    #[tokio::test]
    async fn start_monitor_twice_reports_second_as_ignored() {
        let engine = engine();
        let mut events = engine.subscribe();

        assert!(engine.start_monitor());
        assert!(!engine.start_monitor());
        assert!(engine.monitor_running());

        // Exactly one created event despite two start calls
        let event = events.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::MonitorCreated { .. }));
        assert!(events.try_recv().is_err());

        engine.stop_monitor();
    }

    #[tokio::test]
    async fn stop_monitor_when_idle_is_ignored() {
        let engine = engine();
        assert!(!engine.stop_monitor());
        assert!(!engine.monitor_running());
    }

    #[tokio::test]
    async fn stop_after_start_removes_monitor() {
        let engine = engine();
        let mut events = engine.subscribe();

        assert!(engine.start_monitor());
        assert!(engine.stop_monitor());
        assert!(!engine.monitor_running());

        let created = events.recv().await.unwrap();
        assert!(matches!(created, EngineEvent::MonitorCreated { .. }));
        let removed = events.recv().await.unwrap();
        assert!(matches!(removed, EngineEvent::MonitorRemoved));
    }

    #[tokio::test]
    async fn monitor_can_be_restarted_after_stop() {
        let engine = engine();
        assert!(engine.start_monitor());
        assert!(engine.stop_monitor());
        assert!(engine.start_monitor());
        assert!(engine.stop_monitor());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let engine = engine();
        let clone = engine.clone();

        assert!(engine.start_monitor());
        assert!(clone.monitor_running());
        assert!(clone.stop_monitor());
        assert!(!engine.monitor_running());
    }

    #[tokio::test]
    async fn first_failure_publishes_no_offline_event() {
        // Connection refused locally; the engine has never been online,
        // so no transition event is due.
        let engine = engine();
        let mut events = engine.subscribe();

        let result = engine.refresh().await;
        assert!(result.is_err());
        assert!(!engine.is_online());

        while let Ok(event) = events.try_recv() {
            assert!(
                !matches!(event, EngineEvent::Online { .. }),
                "no transition event expected on initial failure"
            );
        }
    }

    #[tokio::test]
    async fn queries_before_first_fetch_report_no_data() {
        let engine = engine();
        assert!(matches!(
            engine.battery_levels(None).await,
            Err(Error::NoData("Device"))
        ));
        assert!(matches!(
            engine.room_temperatures(None).await,
            Err(Error::NoData("Room"))
        ));
        assert!(matches!(
            engine.offline_devices().await,
            Err(Error::NoData("Device"))
        ));
        assert!(matches!(
            engine.system_state().await,
            Err(Error::NoData("System"))
        ));
    }
}
