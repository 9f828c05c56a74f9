// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device record enrichment.
//!
//! Augments every `Device` record of a freshly-fetched snapshot with
//! derived fields: the owning room's name, synthesized dead-battery
//! values, and an `Online` flag. Runs after the room map rebuild on the
//! same fetch cycle because it depends on the map.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::types::ProductType;

use super::{DeviceRoomMap, Snapshot};

/// Fallback room name for devices absent from the room map.
const UNMAPPED_ROOM: &str = "Undefined";

/// Enriches the snapshot's device records in place.
///
/// For each device:
/// 1. `Room` is set from the map lookup, defaulting to `"Undefined"`.
/// 2. Battery-powered devices (`RoomStat`, `iTRV`) with no usable
///    `BatteryVoltage` get `BatteryVoltage = 0`, `BatteryLevel = "Dead"`
///    and `DisplayedSignalStrength = "Offline"` synthesized.
/// 3. `Online` is computed: a device is online when its battery voltage
///    is not zero (mains devices report none at all) and its signal
///    strength is not `NoSignal`. Online devices get their last-seen
///    stamp refreshed; entries are never removed.
pub(crate) fn enrich_devices(
    snapshot: &mut Snapshot,
    map: &DeviceRoomMap,
    last_seen: &mut HashMap<i64, DateTime<Utc>>,
) {
    let now = Utc::now();
    let Some(devices) = snapshot.devices_mut() else {
        return;
    };

    for device in devices {
        let Some(record) = device.as_object_mut() else {
            continue;
        };
        let device_id = record.get("id").and_then(Value::as_i64);

        let room_name = device_id
            .and_then(|id| map.room_name(id))
            .unwrap_or(UNMAPPED_ROOM);
        record.insert("Room".to_string(), json!(room_name));

        let product = record
            .get("ProductType")
            .and_then(Value::as_str)
            .map(ProductType::parse);
        let voltage = record.get("BatteryVoltage").and_then(Value::as_i64);

        if product.is_some_and(|p| p.is_battery_powered()) && voltage.unwrap_or(0) == 0 {
            record.insert("BatteryVoltage".to_string(), json!(0));
            record.insert("BatteryLevel".to_string(), json!("Dead"));
            record.insert("DisplayedSignalStrength".to_string(), json!("Offline"));
        }

        // Mains-powered devices report no voltage at all; only an
        // explicit zero marks a dead battery.
        let voltage = record.get("BatteryVoltage").and_then(Value::as_i64);
        let signal = record.get("DisplayedSignalStrength").and_then(Value::as_str);
        let online = voltage != Some(0) && signal != Some("NoSignal");
        record.insert("Online".to_string(), json!(online));

        if online && let Some(id) = device_id {
            last_seen.insert(id, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(devices: Value) -> Snapshot {
        Snapshot::from_raw(json!({
            "Room": [
                { "id": 1, "Name": "Lounge", "SmartValveIds": [101], "RoomStatId": 103 }
            ],
            "Device": devices
        }))
        .unwrap()
    }

    fn enriched(devices: Value) -> (Snapshot, HashMap<i64, DateTime<Utc>>) {
        let mut snap = snapshot(devices);
        let map = DeviceRoomMap::rebuild(&snap);
        let mut last_seen = HashMap::new();
        enrich_devices(&mut snap, &map, &mut last_seen);
        (snap, last_seen)
    }

    #[test]
    fn room_name_from_map() {
        let (snap, _) = enriched(json!([
            { "id": 101, "ProductType": "iTRV", "BatteryVoltage": 30,
              "DisplayedSignalStrength": "Good" }
        ]));
        let device = &snap.devices()[0];
        assert_eq!(device.get("Room").unwrap(), "Lounge");
    }

    #[test]
    fn unmapped_device_gets_undefined_room() {
        let (snap, _) = enriched(json!([
            { "id": 999, "ProductType": "SmartPlug",
              "DisplayedSignalStrength": "Good" }
        ]));
        let device = &snap.devices()[0];
        assert_eq!(device.get("Room").unwrap(), "Undefined");
    }

    #[test]
    fn dead_roomstat_gets_synthesized_values() {
        let (snap, last_seen) = enriched(json!([
            { "id": 103, "ProductType": "RoomStat",
              "DisplayedSignalStrength": "Good" }
        ]));
        let device = &snap.devices()[0];
        assert_eq!(device.get("BatteryVoltage").unwrap(), 0);
        assert_eq!(device.get("BatteryLevel").unwrap(), "Dead");
        assert_eq!(device.get("DisplayedSignalStrength").unwrap(), "Offline");
        assert_eq!(device.get("Online").unwrap(), false);
        // Dead devices are excluded from last-seen updates
        assert!(!last_seen.contains_key(&103));
    }

    #[test]
    fn zero_voltage_counts_as_dead() {
        let (snap, _) = enriched(json!([
            { "id": 101, "ProductType": "iTRV", "BatteryVoltage": 0,
              "DisplayedSignalStrength": "Good" }
        ]));
        let device = &snap.devices()[0];
        assert_eq!(device.get("BatteryLevel").unwrap(), "Dead");
        assert_eq!(device.get("Online").unwrap(), false);
    }

    #[test]
    fn controller_without_voltage_is_online() {
        let (snap, last_seen) = enriched(json!([
            { "id": 0, "ProductType": "Controller",
              "DisplayedSignalStrength": "VeryGood" }
        ]));
        let device = &snap.devices()[0];
        // No synthesized battery fields for mains-powered devices
        assert!(device.get("BatteryLevel").is_none());
        assert_eq!(device.get("Online").unwrap(), true);
        assert!(last_seen.contains_key(&0));
    }

    #[test]
    fn no_signal_device_is_offline() {
        let (snap, last_seen) = enriched(json!([
            { "id": 101, "ProductType": "iTRV", "BatteryVoltage": 28,
              "DisplayedSignalStrength": "NoSignal" }
        ]));
        let device = &snap.devices()[0];
        assert_eq!(device.get("Online").unwrap(), false);
        assert!(!last_seen.contains_key(&101));
    }

    #[test]
    fn online_device_refreshes_last_seen() {
        let mut snap = snapshot(json!([
            { "id": 101, "ProductType": "iTRV", "BatteryVoltage": 30,
              "DisplayedSignalStrength": "Good" }
        ]));
        let map = DeviceRoomMap::rebuild(&snap);
        let mut last_seen = HashMap::new();
        let stale = Utc::now() - chrono::Duration::hours(1);
        last_seen.insert(101, stale);

        enrich_devices(&mut snap, &map, &mut last_seen);
        assert!(last_seen[&101] > stale);
    }
}
