// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only projections of the latest snapshot.
//!
//! The projection functions are pure: they read a snapshot and produce
//! a keyed, sorted view without touching engine state. The engine
//! methods wrap them, supplying the latest snapshot and publishing the
//! result (or the failure) on the event bus.
//!
//! All projections fail gracefully with [`Error::NoData`] when the
//! relevant entity list is absent or empty, rather than panicking.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Error;
use crate::event::{EngineEvent, QueryKind};
use crate::snapshot::Snapshot;
use crate::types::{BatteryLevel, ProductType, SignalStrength, TempComparator, Temperature};

use super::WiserEngine;

/// Battery status of one device.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatteryReading {
    /// Name of the room owning the device, or `"Undefined"`.
    pub room: String,
    /// Battery voltage in volts, when the device reports one.
    pub battery_voltage: Option<f64>,
    /// Battery level classification, when the device reports one.
    pub battery_level: Option<BatteryLevel>,
    /// Displayed signal strength.
    pub signal_strength: Option<SignalStrength>,
    /// The device's product type.
    pub device_type: ProductType,
    /// The device's id.
    pub device_id: i64,
    /// When the device was last seen online.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Battery status of every battery-carrying device, keyed and sorted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatteryLevelsView {
    /// Readings keyed by `{room}-{product}-{id}`.
    pub devices: BTreeMap<String, BatteryReading>,
    /// Timestamp of the underlying snapshot.
    pub updated: DateTime<Utc>,
}

/// Temperature status of one room.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoomTemperatureReading {
    /// The room's name.
    pub room: String,
    /// Measured temperature in °C.
    pub temperature: Option<f64>,
    /// Current setpoint in °C.
    pub set_point: Option<f64>,
    /// The room's mode (`Auto`, `Manual`, ...).
    pub mode: Option<String>,
    /// Heat demand percentage.
    pub percentage_demand: Option<i64>,
    /// Control output state (`On`/`Off`).
    pub control_output_state: Option<String>,
    /// Where the current setpoint originates from.
    pub setpoint_origin: Option<String>,
    /// Active schedule id.
    pub schedule_id: Option<i64>,
    /// Scheduled setpoint in °C.
    pub scheduled_set_point: Option<f64>,
    /// Window state, or `"N/A"` when window detection is inactive.
    pub window_state: String,
}

/// Temperatures of every (matching) room, keyed by room name.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomTemperaturesView {
    /// Readings keyed by room name, sorted.
    pub rooms: BTreeMap<String, RoomTemperatureReading>,
    /// Timestamp of the underlying snapshot.
    pub updated: DateTime<Utc>,
}

/// Devices currently offline to the controller, keyed and sorted.
///
/// Each entry is the device's full enriched record, with the device's
/// last-seen stamp attached as `LastSeen` when known.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OfflineDevicesView {
    /// Device records keyed by `{room}-{product}-{id}`.
    pub devices: BTreeMap<String, Value>,
    /// Timestamp of the underlying snapshot.
    pub updated: DateTime<Utc>,
}

/// State subset of one heating channel.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelState {
    /// Overall heat demand percentage.
    pub percentage_demand: Option<i64>,
    /// Demand output state.
    pub demand_on_off_output: Option<String>,
    /// Heating relay state.
    pub heating_relay_state: Option<String>,
    /// Whether a smart valve is preventing demand.
    pub is_smart_valve_preventing_demand: Option<bool>,
}

/// Heating channel portion of the system state.
///
/// With exactly one channel its fields are flattened into the view;
/// otherwise the channels appear as a `HeatingChannel` list.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum ChannelSummary {
    /// Exactly one heating channel, flattened.
    Single(ChannelState),
    /// Zero or several heating channels.
    PerChannel {
        /// Per-channel state subsets.
        #[serde(rename = "HeatingChannel")]
        channels: Vec<ChannelState>,
    },
}

/// Overall system state projection.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemStateView {
    /// Heating button override state.
    pub heating_button_override_state: Option<String>,
    /// Whether any user overrides are active.
    pub user_overrides_active: Option<bool>,
    /// Hot water button override state.
    pub hot_water_button_override_state: Option<String>,
    /// Heating channel state.
    #[serde(flatten)]
    pub channels: ChannelSummary,
    /// Timestamp of the underlying snapshot.
    #[serde(rename = "updated")]
    pub updated: DateTime<Utc>,
}

/// Builds the sorted-map key for a device: `{room}-{product}-{id}`,
/// with spaces in the room name replaced by underscores.
fn device_key(room: &str, product: &ProductType, device_id: i64) -> String {
    format!("{}-{}-{device_id}", room.replace(' ', "_"), product.as_str())
}

fn field_str(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn field_i64(record: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    record.get(key).and_then(Value::as_i64)
}

fn field_bool(record: &serde_json::Map<String, Value>, key: &str) -> Option<bool> {
    record.get(key).and_then(Value::as_bool)
}

#[allow(clippy::cast_precision_loss)]
fn scaled(tenths: i64) -> f64 {
    tenths as f64 / 10.0
}

/// Projects battery status for every device except the controller.
///
/// With a filter, only devices whose battery level is in the list are
/// included.
///
/// # Errors
///
/// Returns [`Error::NoData`] when the snapshot has no devices.
pub fn battery_levels(
    snapshot: &Snapshot,
    last_seen: &HashMap<i64, DateTime<Utc>>,
    filter: Option<&[BatteryLevel]>,
) -> Result<BatteryLevelsView, Error> {
    let devices = snapshot.devices();
    if devices.is_empty() {
        return Err(Error::NoData("Device"));
    }

    let mut out = BTreeMap::new();
    for device in devices {
        let Some(record) = device.as_object() else {
            continue;
        };
        let Some(device_id) = field_i64(record, "id") else {
            continue;
        };

        let product = record
            .get("ProductType")
            .and_then(Value::as_str)
            .map_or(ProductType::Other(String::new()), ProductType::parse);
        // Mains-powered controller has no battery to report on
        if product == ProductType::Controller {
            continue;
        }

        let level = record
            .get("BatteryLevel")
            .and_then(Value::as_str)
            .map(BatteryLevel::parse);
        if let Some(filter) = filter
            && !level.as_ref().is_some_and(|l| filter.contains(l))
        {
            continue;
        }

        let room = field_str(record, "Room").unwrap_or_else(|| "Undefined".to_string());
        out.insert(
            device_key(&room, &product, device_id),
            BatteryReading {
                battery_voltage: field_i64(record, "BatteryVoltage").map(scaled),
                battery_level: level,
                signal_strength: record
                    .get("DisplayedSignalStrength")
                    .and_then(Value::as_str)
                    .map(SignalStrength::parse),
                device_type: product,
                device_id,
                last_seen: last_seen.get(&device_id).copied(),
                room,
            },
        );
    }

    Ok(BatteryLevelsView {
        devices: out,
        updated: snapshot.updated(),
    })
}

/// Projects per-room temperatures, optionally filtered by a comparator.
///
/// Rooms with no control source and the "no sensor" temperature
/// sentinel are skipped.
///
/// # Errors
///
/// Returns [`Error::NoData`] when the snapshot has no rooms.
pub fn room_temperatures(
    snapshot: &Snapshot,
    comparator: Option<&TempComparator>,
) -> Result<RoomTemperaturesView, Error> {
    let rooms = snapshot.rooms();
    if rooms.is_empty() {
        return Err(Error::NoData("Room"));
    }

    let mut out = BTreeMap::new();
    for room in rooms {
        let Some(record) = room.as_object() else {
            continue;
        };
        let Some(name) = field_str(record, "Name") else {
            continue;
        };

        let temperature = field_i64(record, "CalculatedTemperature")
            .map(|tenths| Temperature::from_tenths(tenths as i32));
        let origin = field_str(record, "SetpointOrigin");

        // Rooms with no TRV or stat report the sentinel temperature
        if origin.as_deref() == Some("FromNoControl")
            && temperature.is_some_and(|t| t.is_no_sensor())
        {
            continue;
        }
        if let Some(comparator) = comparator
            && let Some(temperature) = temperature
            && !comparator.matches(temperature)
        {
            continue;
        }

        let window_state = if field_bool(record, "WindowDetectionActive") == Some(true) {
            field_str(record, "WindowState").unwrap_or_else(|| "N/A".to_string())
        } else {
            "N/A".to_string()
        };

        out.insert(
            name.clone(),
            RoomTemperatureReading {
                room: name,
                temperature: temperature.map(|t| t.as_celsius()),
                set_point: field_i64(record, "CurrentSetPoint").map(scaled),
                mode: field_str(record, "Mode"),
                percentage_demand: field_i64(record, "PercentageDemand"),
                control_output_state: field_str(record, "ControlOutputState"),
                setpoint_origin: origin,
                schedule_id: field_i64(record, "ScheduleId"),
                scheduled_set_point: field_i64(record, "ScheduledSetPoint").map(scaled),
                window_state,
            },
        );
    }

    Ok(RoomTemperaturesView {
        rooms: out,
        updated: snapshot.updated(),
    })
}

/// Projects every device that is not online to the controller.
///
/// # Errors
///
/// Returns [`Error::NoData`] when the snapshot has no devices.
pub fn offline_devices(
    snapshot: &Snapshot,
    last_seen: &HashMap<i64, DateTime<Utc>>,
) -> Result<OfflineDevicesView, Error> {
    let devices = snapshot.devices();
    if devices.is_empty() {
        return Err(Error::NoData("Device"));
    }

    let mut out = BTreeMap::new();
    for device in devices {
        let Some(record) = device.as_object() else {
            continue;
        };
        if record.get("Online").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        let Some(device_id) = field_i64(record, "id") else {
            continue;
        };

        let product = record
            .get("ProductType")
            .and_then(Value::as_str)
            .map_or(ProductType::Other(String::new()), ProductType::parse);
        let room = field_str(record, "Room").unwrap_or_else(|| "Undefined".to_string());

        let mut entry = record.clone();
        if let Some(seen) = last_seen.get(&device_id) {
            entry.insert("LastSeen".to_string(), serde_json::json!(seen));
        }
        out.insert(device_key(&room, &product, device_id), Value::Object(entry));
    }

    Ok(OfflineDevicesView {
        devices: out,
        updated: snapshot.updated(),
    })
}

/// Projects the overall system state.
///
/// # Errors
///
/// Returns [`Error::NoData`] when the snapshot has no `System` record.
pub fn system_state(snapshot: &Snapshot) -> Result<SystemStateView, Error> {
    let Some(system) = snapshot.system() else {
        return Err(Error::NoData("System"));
    };

    let channel_states: Vec<ChannelState> = snapshot
        .heating_channels()
        .iter()
        .filter_map(Value::as_object)
        .map(|record| ChannelState {
            percentage_demand: field_i64(record, "PercentageDemand"),
            demand_on_off_output: field_str(record, "DemandOnOffOutput"),
            heating_relay_state: field_str(record, "HeatingRelayState"),
            is_smart_valve_preventing_demand: field_bool(record, "IsSmartValvePreventingDemand"),
        })
        .collect();

    let channels = if channel_states.len() == 1 {
        let mut channel_states = channel_states;
        ChannelSummary::Single(channel_states.remove(0))
    } else {
        ChannelSummary::PerChannel {
            channels: channel_states,
        }
    };

    Ok(SystemStateView {
        heating_button_override_state: field_str(system, "HeatingButtonOverrideState"),
        user_overrides_active: field_bool(system, "UserOverridesActive"),
        hot_water_button_override_state: field_str(system, "HotWaterButtonOverrideState"),
        channels,
        updated: snapshot.updated(),
    })
}

// ============================================================================
// Engine wrappers - supply the latest snapshot, publish the outcome
// ============================================================================

impl WiserEngine {
    /// Returns battery status for every battery-carrying device,
    /// publishing the result on the event bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] (and publishes the corresponding error
    /// event) when no snapshot or no devices are available.
    pub async fn battery_levels(
        &self,
        filter: Option<&[BatteryLevel]>,
    ) -> Result<BatteryLevelsView, Error> {
        let result = match self.latest().await {
            Some(snapshot) => battery_levels(&snapshot, &self.last_seen.lock(), filter),
            None => Err(Error::NoData("Device")),
        };
        self.publish_query_result(QueryKind::BatteryLevels, result, EngineEvent::BatteryLevels)
    }

    /// Returns per-room temperatures, publishing the result on the
    /// event bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] (and publishes the corresponding error
    /// event) when no snapshot or no rooms are available.
    pub async fn room_temperatures(
        &self,
        comparator: Option<&TempComparator>,
    ) -> Result<RoomTemperaturesView, Error> {
        let result = match self.latest().await {
            Some(snapshot) => room_temperatures(&snapshot, comparator),
            None => Err(Error::NoData("Room")),
        };
        self.publish_query_result(
            QueryKind::RoomTemperatures,
            result,
            EngineEvent::RoomTemperatures,
        )
    }

    /// Returns every device that is offline to the controller,
    /// publishing the result on the event bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] (and publishes the corresponding error
    /// event) when no snapshot or no devices are available.
    pub async fn offline_devices(&self) -> Result<OfflineDevicesView, Error> {
        let result = match self.latest().await {
            Some(snapshot) => offline_devices(&snapshot, &self.last_seen.lock()),
            None => Err(Error::NoData("Device")),
        };
        self.publish_query_result(QueryKind::OfflineDevices, result, EngineEvent::OfflineDevices)
    }

    /// Returns the overall system state, publishing the result on the
    /// event bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] (and publishes the corresponding error
    /// event) when no snapshot or no `System` record is available.
    pub async fn system_state(&self) -> Result<SystemStateView, Error> {
        let result = match self.latest().await {
            Some(snapshot) => system_state(&snapshot),
            None => Err(Error::NoData("System")),
        };
        self.publish_query_result(QueryKind::SystemState, result, EngineEvent::SystemState)
    }

    fn publish_query_result<T: Clone>(
        &self,
        query: QueryKind,
        result: Result<T, Error>,
        into_event: impl FnOnce(T) -> EngineEvent,
    ) -> Result<T, Error> {
        match result {
            Ok(view) => {
                self.bus.publish(into_event(view.clone()));
                Ok(view)
            }
            Err(error) => {
                tracing::debug!(?query, error = %error, "query produced no data");
                self.bus.publish(EngineEvent::QueryFailed {
                    query,
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot::from_raw(json!({
            "System": {
                "HeatingButtonOverrideState": "Off",
                "UserOverridesActive": false,
                "HotWaterButtonOverrideState": "Off"
            },
            "HeatingChannel": [
                {
                    "id": 1,
                    "PercentageDemand": 27,
                    "DemandOnOffOutput": "On",
                    "HeatingRelayState": "On",
                    "IsSmartValvePreventingDemand": false
                }
            ],
            "Room": [
                {
                    "id": 1, "Name": "Lounge",
                    "CalculatedTemperature": 200, "CurrentSetPoint": 210,
                    "ScheduledSetPoint": 190, "Mode": "Auto",
                    "PercentageDemand": 60, "ControlOutputState": "On",
                    "SetpointOrigin": "FromSchedule", "ScheduleId": 1,
                    "WindowDetectionActive": false, "WindowState": "Closed"
                },
                {
                    "id": 2, "Name": "Master Bedroom",
                    "CalculatedTemperature": 175, "CurrentSetPoint": 160,
                    "ScheduledSetPoint": 160, "Mode": "Auto",
                    "PercentageDemand": 0, "ControlOutputState": "Off",
                    "SetpointOrigin": "FromSchedule", "ScheduleId": 2,
                    "WindowDetectionActive": true, "WindowState": "Open"
                },
                {
                    "id": 3, "Name": "Void",
                    "CalculatedTemperature": -32768,
                    "SetpointOrigin": "FromNoControl"
                }
            ],
            "Device": [
                { "id": 0, "ProductType": "Controller", "Room": "Undefined",
                  "Online": true },
                { "id": 101, "ProductType": "iTRV", "Room": "Lounge",
                  "BatteryVoltage": 30, "BatteryLevel": "Normal",
                  "DisplayedSignalStrength": "Good", "Online": true },
                { "id": 103, "ProductType": "RoomStat", "Room": "Master Bedroom",
                  "BatteryVoltage": 0, "BatteryLevel": "Dead",
                  "DisplayedSignalStrength": "Offline", "Online": false }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn battery_levels_excludes_controller() {
        let view = battery_levels(&snapshot(), &HashMap::new(), None).unwrap();
        assert_eq!(view.devices.len(), 2);
        assert!(!view.devices.keys().any(|k| k.contains("Controller")));
    }

    #[test]
    fn battery_levels_filter_keeps_only_matching_levels() {
        // 3 devices: one Dead, one Normal, one Controller
        let view =
            battery_levels(&snapshot(), &HashMap::new(), Some(&[BatteryLevel::Dead])).unwrap();
        assert_eq!(view.devices.len(), 1);

        let (key, reading) = view.devices.iter().next().unwrap();
        assert_eq!(key, "Master_Bedroom-RoomStat-103");
        assert_eq!(reading.battery_level, Some(BatteryLevel::Dead));
        assert_eq!(reading.device_id, 103);
    }

    #[test]
    fn battery_key_replaces_all_spaces() {
        let view = battery_levels(&snapshot(), &HashMap::new(), None).unwrap();
        assert!(view.devices.contains_key("Master_Bedroom-RoomStat-103"));
    }

    #[test]
    fn battery_voltage_is_scaled() {
        let view = battery_levels(&snapshot(), &HashMap::new(), None).unwrap();
        let reading = &view.devices["Lounge-iTRV-101"];
        assert_eq!(reading.battery_voltage, Some(3.0));
    }

    #[test]
    fn battery_levels_reports_no_data() {
        let empty = Snapshot::from_raw(json!({ "Room": [] })).unwrap();
        let result = battery_levels(&empty, &HashMap::new(), None);
        assert!(matches!(result, Err(Error::NoData("Device"))));
    }

    #[test]
    fn battery_levels_attaches_last_seen() {
        let mut last_seen = HashMap::new();
        let stamp = Utc::now();
        last_seen.insert(101, stamp);

        let view = battery_levels(&snapshot(), &last_seen, None).unwrap();
        assert_eq!(view.devices["Lounge-iTRV-101"].last_seen, Some(stamp));
        assert!(view.devices["Master_Bedroom-RoomStat-103"].last_seen.is_none());
    }

    #[test]
    fn room_temperatures_scales_and_sorts() {
        let view = room_temperatures(&snapshot(), None).unwrap();
        // Sentinel room skipped
        assert_eq!(view.rooms.len(), 2);

        let lounge = &view.rooms["Lounge"];
        assert_eq!(lounge.temperature, Some(20.0));
        assert_eq!(lounge.set_point, Some(21.0));
        assert_eq!(lounge.scheduled_set_point, Some(19.0));

        let keys: Vec<&String> = view.rooms.keys().collect();
        assert_eq!(keys, ["Lounge", "Master Bedroom"]);
    }

    #[test]
    fn room_temperatures_window_state_gating() {
        let view = room_temperatures(&snapshot(), None).unwrap();
        assert_eq!(view.rooms["Lounge"].window_state, "N/A");
        assert_eq!(view.rooms["Master Bedroom"].window_state, "Open");
    }

    #[test]
    fn room_temperatures_comparator_filters() {
        let below = TempComparator::parse("<", 18.0).unwrap();
        let view = room_temperatures(&snapshot(), Some(&below)).unwrap();
        assert_eq!(view.rooms.len(), 1);
        assert!(view.rooms.contains_key("Master Bedroom"));

        let above = TempComparator::parse(">", 18.0).unwrap();
        let view = room_temperatures(&snapshot(), Some(&above)).unwrap();
        assert_eq!(view.rooms.len(), 1);
        assert!(view.rooms.contains_key("Lounge"));
    }

    #[test]
    fn room_temperatures_reports_no_data() {
        let empty = Snapshot::from_raw(json!({ "Device": [] })).unwrap();
        assert!(matches!(
            room_temperatures(&empty, None),
            Err(Error::NoData("Room"))
        ));
    }

    #[test]
    fn offline_devices_keeps_only_offline() {
        let view = offline_devices(&snapshot(), &HashMap::new()).unwrap();
        assert_eq!(view.devices.len(), 1);
        let record = &view.devices["Master_Bedroom-RoomStat-103"];
        assert_eq!(record.get("BatteryLevel").unwrap(), "Dead");
    }

    #[test]
    fn offline_devices_attaches_last_seen() {
        let mut last_seen = HashMap::new();
        last_seen.insert(103, Utc::now());
        let view = offline_devices(&snapshot(), &last_seen).unwrap();
        assert!(
            view.devices["Master_Bedroom-RoomStat-103"]
                .get("LastSeen")
                .is_some()
        );
    }

    #[test]
    fn system_state_flattens_single_channel() {
        let view = system_state(&snapshot()).unwrap();
        assert_eq!(view.heating_button_override_state.as_deref(), Some("Off"));
        assert_eq!(view.user_overrides_active, Some(false));

        let ChannelSummary::Single(channel) = &view.channels else {
            panic!("expected flattened single channel");
        };
        assert_eq!(channel.percentage_demand, Some(27));
        assert_eq!(channel.heating_relay_state.as_deref(), Some("On"));

        // Serialized form carries the channel fields at the top level
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value.get("PercentageDemand").unwrap(), 27);
        assert!(value.get("HeatingChannel").is_none());
    }

    #[test]
    fn system_state_lists_multiple_channels() {
        let snap = Snapshot::from_raw(json!({
            "System": { "HeatingButtonOverrideState": "Off" },
            "HeatingChannel": [
                { "id": 1, "PercentageDemand": 10 },
                { "id": 2, "PercentageDemand": 90 }
            ]
        }))
        .unwrap();

        let view = system_state(&snap).unwrap();
        let ChannelSummary::PerChannel { channels } = &view.channels else {
            panic!("expected per-channel list");
        };
        assert_eq!(channels.len(), 2);

        let value = serde_json::to_value(&view).unwrap();
        assert!(value.get("HeatingChannel").unwrap().is_array());
        assert!(value.get("PercentageDemand").is_none());
    }

    #[test]
    fn system_state_reports_no_data() {
        let empty = Snapshot::from_raw(json!({ "Room": [] })).unwrap();
        assert!(matches!(system_state(&empty), Err(Error::NoData("System"))));
    }
}
