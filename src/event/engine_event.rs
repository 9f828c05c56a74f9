// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine event types.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::engine::{
    BatteryLevelsView, OfflineDevicesView, RoomTemperaturesView, SetRoomOutcome, SystemStateView,
};
use crate::snapshot::{ChangeRecord, DeviceRoomMap, Snapshot};

/// One tick of the monitor loop.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MonitorTick {
    /// When the tick fired.
    pub timestamp: DateTime<Utc>,
    /// The configured poll interval.
    pub interval: Duration,
}

/// Which query-layer projection an error event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum QueryKind {
    /// The battery-levels projection.
    BatteryLevels,
    /// The room-temperatures projection.
    RoomTemperatures,
    /// The offline-devices projection.
    OfflineDevices,
    /// The system-state projection.
    SystemState,
}

/// Events published by the engine.
///
/// Every variant corresponds to a stable topic string, returned by
/// [`EngineEvent::topic`], so external consumers can route on topics
/// while the compiler checks payload shapes.
///
/// # Topics
///
/// | Variant | Topic |
/// |---|---|
/// | `Online` | `wiser/online` |
/// | `CloudConnection` | `wiser/cloudConnection` |
/// | `Change` | `wiser/changes` |
/// | `RoomMapUpdated` | `wiser/success/room-map` |
/// | `FetchSucceeded` | `wiser/success/get-all` |
/// | `FetchFailed` | `wiser/error/get-all` |
/// | `GatewayUnreachable` | `wiser/error/gateway-unreachable` |
/// | `ControllerUnreachable` | `wiser/error/controller-unreachable` |
/// | `ConnectionTested` | `wiser/success/test-connection` or `wiser/error/test-connection` |
/// | `NetworkInfo` | `wiser/success/get-api-network` |
/// | `NetworkInfoFailed` | `wiser/error/get-api-network` |
/// | `Schedule` | `wiser/success/get-api-schedule` |
/// | `ScheduleFailed` | `wiser/error/get-api-schedule` |
/// | `BatteryLevels` | `wiser/battery-levels` |
/// | `RoomTemperatures` | `wiser/room-temperatures` |
/// | `OfflineDevices` | `wiser/offline-devices` |
/// | `SystemState` | `wiser/system-state` |
/// | `QueryFailed` | `wiser/error/get-*` (per [`QueryKind`]) |
/// | `SetRoomTemperature` | `wiser/set/room-temperature` |
/// | `SetRoomTemperatureFailed` | `wiser/error/set/room-temperature` |
/// | `SetpointClamped` | `wiser/warn/setpoint-clamped` |
/// | `MonitorTick` | `wiser/monitor-interval` |
/// | `MonitorCreated` | `wiser/monitor-interval-created` |
/// | `MonitorRemoved` | `wiser/monitor-interval-removed` |
/// | `Debug` | `wiser/debug` |
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The controller's reachability changed.
    ///
    /// Published exactly once per transition, not on every repeated
    /// failure or success.
    Online {
        /// `true` when the controller became reachable.
        online: bool,
    },

    /// The controller's connection to the Wiser cloud changed.
    CloudConnection {
        /// `true` when the controller reports `Connected`.
        connected: bool,
    },

    /// One entity changed between the previous and latest snapshot.
    Change(ChangeRecord),

    /// The device-to-room map was rebuilt.
    RoomMapUpdated(DeviceRoomMap),

    /// A full-state fetch completed and the snapshot was stored.
    FetchSucceeded {
        /// The stored, enriched snapshot.
        snapshot: Arc<Snapshot>,
    },

    /// A full-state fetch failed.
    FetchFailed {
        /// Description of the failure.
        error: String,
    },

    /// The local network's default gateway is unreachable.
    GatewayUnreachable {
        /// Description of the failure.
        message: String,
    },

    /// The gateway responds but the controller does not.
    ControllerUnreachable {
        /// Description of the failure.
        message: String,
    },

    /// Result of a connection probe against the controller.
    ConnectionTested {
        /// `true` when the controller answered with its brand name.
        ok: bool,
        /// The failure, when the probe did not succeed.
        error: Option<String>,
    },

    /// Controller network information was fetched.
    NetworkInfo {
        /// The raw network payload.
        data: Value,
    },

    /// Fetching controller network information failed.
    NetworkInfoFailed {
        /// Description of the failure.
        error: String,
    },

    /// Schedule data was fetched.
    Schedule {
        /// The raw schedule payload.
        data: Value,
    },

    /// Fetching schedule data failed.
    ScheduleFailed {
        /// Description of the failure.
        error: String,
    },

    /// Result of the battery-levels projection.
    BatteryLevels(BatteryLevelsView),

    /// Result of the room-temperatures projection.
    RoomTemperatures(RoomTemperaturesView),

    /// Result of the offline-devices projection.
    OfflineDevices(OfflineDevicesView),

    /// Result of the system-state projection.
    SystemState(SystemStateView),

    /// A query-layer projection could not produce data.
    QueryFailed {
        /// Which projection failed.
        query: QueryKind,
        /// Why it failed.
        reason: String,
    },

    /// A room setpoint write completed.
    SetRoomTemperature(SetRoomOutcome),

    /// A room setpoint write failed.
    SetRoomTemperatureFailed(SetRoomOutcome),

    /// A requested setpoint was clamped to the allowed range.
    SetpointClamped {
        /// The target room's id.
        room_id: i64,
        /// The target room's name.
        room_name: String,
        /// The originally requested temperature in °C.
        requested: f64,
        /// The clamped temperature in °C that was sent.
        clamped: f64,
    },

    /// The monitor loop ticked.
    MonitorTick(MonitorTick),

    /// The monitor loop was started.
    MonitorCreated {
        /// The configured poll interval.
        interval: Duration,
    },

    /// The monitor loop was stopped.
    MonitorRemoved,

    /// Diagnostic trace information.
    Debug {
        /// The engine function the message originates from.
        context: &'static str,
        /// The diagnostic message.
        message: String,
    },
}

impl EngineEvent {
    /// Returns the stable topic string for this event.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Online { .. } => "wiser/online",
            Self::CloudConnection { .. } => "wiser/cloudConnection",
            Self::Change(_) => "wiser/changes",
            Self::RoomMapUpdated(_) => "wiser/success/room-map",
            Self::FetchSucceeded { .. } => "wiser/success/get-all",
            Self::FetchFailed { .. } => "wiser/error/get-all",
            Self::GatewayUnreachable { .. } => "wiser/error/gateway-unreachable",
            Self::ControllerUnreachable { .. } => "wiser/error/controller-unreachable",
            Self::ConnectionTested { ok: true, .. } => "wiser/success/test-connection",
            Self::ConnectionTested { ok: false, .. } => "wiser/error/test-connection",
            Self::NetworkInfo { .. } => "wiser/success/get-api-network",
            Self::NetworkInfoFailed { .. } => "wiser/error/get-api-network",
            Self::Schedule { .. } => "wiser/success/get-api-schedule",
            Self::ScheduleFailed { .. } => "wiser/error/get-api-schedule",
            Self::BatteryLevels(_) => "wiser/battery-levels",
            Self::RoomTemperatures(_) => "wiser/room-temperatures",
            Self::OfflineDevices(_) => "wiser/offline-devices",
            Self::SystemState(_) => "wiser/system-state",
            Self::QueryFailed { query, .. } => match query {
                QueryKind::BatteryLevels => "wiser/error/get-battery-levels",
                QueryKind::RoomTemperatures => "wiser/error/get-room-temperatures",
                QueryKind::OfflineDevices => "wiser/error/get-offline-devices",
                QueryKind::SystemState => "wiser/error/get-system-state",
            },
            Self::SetRoomTemperature(_) => "wiser/set/room-temperature",
            Self::SetRoomTemperatureFailed(_) => "wiser/error/set/room-temperature",
            Self::SetpointClamped { .. } => "wiser/warn/setpoint-clamped",
            Self::MonitorTick(_) => "wiser/monitor-interval",
            Self::MonitorCreated { .. } => "wiser/monitor-interval-created",
            Self::MonitorRemoved => "wiser/monitor-interval-removed",
            Self::Debug { .. } => "wiser/debug",
        }
    }

    /// Returns `true` for events on an error topic.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.topic().starts_with("wiser/error/")
    }

    /// Returns `true` for monitor lifecycle and tick events.
    #[must_use]
    pub fn is_monitor(&self) -> bool {
        matches!(
            self,
            Self::MonitorTick(_) | Self::MonitorCreated { .. } | Self::MonitorRemoved
        )
    }

    /// Returns `true` for connectivity transition events.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Online { .. } | Self::CloudConnection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_stable() {
        assert_eq!(EngineEvent::Online { online: true }.topic(), "wiser/online");
        assert_eq!(
            EngineEvent::FetchFailed {
                error: "boom".into()
            }
            .topic(),
            "wiser/error/get-all"
        );
        assert_eq!(
            EngineEvent::MonitorRemoved.topic(),
            "wiser/monitor-interval-removed"
        );
    }

    #[test]
    fn connection_test_topic_depends_on_outcome() {
        let ok = EngineEvent::ConnectionTested {
            ok: true,
            error: None,
        };
        assert_eq!(ok.topic(), "wiser/success/test-connection");

        let failed = EngineEvent::ConnectionTested {
            ok: false,
            error: Some("timed out".into()),
        };
        assert_eq!(failed.topic(), "wiser/error/test-connection");
        assert!(failed.is_error());
    }

    #[test]
    fn query_failure_topics() {
        let event = EngineEvent::QueryFailed {
            query: QueryKind::BatteryLevels,
            reason: "no Device in latest data".into(),
        };
        assert_eq!(event.topic(), "wiser/error/get-battery-levels");
        assert!(event.is_error());
    }

    #[test]
    fn predicates() {
        assert!(EngineEvent::MonitorRemoved.is_monitor());
        assert!(EngineEvent::Online { online: false }.is_connectivity());
        assert!(
            !EngineEvent::Debug {
                context: "test",
                message: String::new()
            }
            .is_error()
        );
    }
}
