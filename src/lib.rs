// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wiser Lib - A Rust library to monitor and control Drayton Wiser
//! smart heating systems.
//!
//! This library polls a Wiser heat-hub's local REST API, keeps a
//! point-in-time snapshot of the full controller state, and derives
//! change events, per-device online/battery status and several
//! read-only projections from it. It can also write a room's target
//! temperature, with validation and clamping.
//!
//! # Supported Features
//!
//! - **Monitoring**: timer-driven polling with structural change
//!   detection between consecutive snapshots
//! - **Connectivity**: online/offline and cloud-connection transition
//!   events, with network-down vs controller-down disambiguation
//! - **Queries**: battery levels, room temperatures, offline devices,
//!   system state
//! - **Commands**: room setpoint override with clamping and an "off"
//!   sentinel
//!
//! # Quick Start
//!
//! ```no_run
//! use wiser_lib::WiserEngine;
//!
//! #[tokio::main]
//! async fn main() -> wiser_lib::Result<()> {
//!     let engine = WiserEngine::builder("192.168.1.100", "secret-from-hub").build()?;
//!
//!     // One-shot setup fetch, then poll every 60 s
//!     engine.refresh().await?;
//!     engine.start_monitor();
//!
//!     // React to what the engine observes
//!     let mut events = engine.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("{}: {event:?}", event.topic());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Queries and Commands
//!
//! ```no_run
//! use wiser_lib::WiserEngine;
//! use wiser_lib::types::{BatteryLevel, TempComparator};
//!
//! # async fn example(engine: &WiserEngine) -> wiser_lib::Result<()> {
//! // Devices with a dead battery
//! let dead = engine.battery_levels(Some(&[BatteryLevel::Dead])).await?;
//!
//! // Rooms at or below 18°C
//! let cold = engine.room_temperatures(Some(&TempComparator::parse("<", 18.0)?)).await?;
//!
//! // Override a room's setpoint; out-of-range requests are clamped
//! let outcome = engine.set_room_temperature("Lounge", 21.5).await;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod event;
pub mod protocol;
pub mod snapshot;
pub mod types;

pub use engine::{
    BatteryLevelsView, BatteryReading, ChannelState, ChannelSummary, ConnectionState,
    EngineBuilder, OfflineDevicesView, RoomSelector, RoomTemperatureReading, RoomTemperaturesView,
    SetRoomOutcome, SystemStateView, WiserEngine,
};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{EngineEvent, EventBus, MonitorTick, QueryKind};
pub use protocol::{GatewayChecker, HubClient, HubConfig};
pub use snapshot::{ChangeRecord, DeviceRoomMap, RoomRef, Snapshot, SnapshotStore};
pub use types::{
    BatteryLevel, ClampBound, CompareOp, ProductType, Setpoint, SetpointLimits, SignalStrength,
    TempComparator, Temperature,
};
