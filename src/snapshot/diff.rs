// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural diff between consecutive snapshots.
//!
//! Produces one [`ChangeRecord`] per entity whose properties changed
//! between the previous and latest snapshot. The diff is updated-only:
//! a property counts as changed when it is present in both records with
//! different values (nested values are compared by value). Known-noisy
//! reception counters are discarded before deciding whether anything
//! changed at all.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{DeviceRoomMap, Snapshot, record_id, record_str};

/// Fields that fluctuate continuously and are excluded from change
/// notification.
pub const NOISY_FIELDS: [&str; 3] = [
    "ReceptionOfController",
    "ReceptionOfDevice",
    "PendingZigbeeMessageMask",
];

/// One entity's changes between two consecutive snapshots.
///
/// Carries the new and prior values for exactly the changed fields, not
/// the whole entity. Created transiently during a diff pass, published
/// on the event bus, then discarded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeRecord {
    /// When the change was detected.
    pub updated: DateTime<Utc>,
    /// The entity type the change belongs to (`Room`, `Device`, ...).
    pub entity_type: String,
    /// The entity's index within its entity-type list.
    pub index: usize,
    /// The entity's stable id, when it carries one.
    pub id: Option<i64>,
    /// New values of the changed fields.
    pub changes: Map<String, Value>,
    /// Prior values of the changed fields.
    pub previous: Map<String, Value>,
    /// Room name, when resolvable: the entity's own name for `Room`
    /// changes, the mapped room for device changes.
    pub room: Option<String>,
}

/// Computes the change records between two snapshots.
///
/// Entity types are compared when present in both snapshots; records
/// are paired by index within their type.
#[must_use]
pub fn diff_snapshots(
    previous: &Snapshot,
    latest: &Snapshot,
    map: &DeviceRoomMap,
) -> Vec<ChangeRecord> {
    let mut records = Vec::new();

    for entity_type in latest.entity_types() {
        if previous.get(entity_type).is_none() {
            continue;
        }

        let prev_records = previous.records(entity_type);
        let new_records = latest.records(entity_type);

        for (index, (prev, new)) in prev_records.iter().zip(new_records).enumerate() {
            let (Some(prev_record), Some(new_record)) = (prev.as_object(), new.as_object()) else {
                continue;
            };

            let mut changes = Map::new();
            let mut prior = Map::new();
            for (field, new_value) in new_record {
                if NOISY_FIELDS.contains(&field.as_str()) {
                    continue;
                }
                if let Some(prev_value) = prev_record.get(field)
                    && prev_value != new_value
                {
                    changes.insert(field.clone(), new_value.clone());
                    prior.insert(field.clone(), prev_value.clone());
                }
            }

            if changes.is_empty() {
                continue;
            }

            let id = record_id(new);
            let room = if entity_type == "Room" {
                record_str(new, "Name").map(str::to_owned)
            } else {
                id.and_then(|id| map.room_name(id)).map(str::to_owned)
            };

            records.push(ChangeRecord {
                updated: Utc::now(),
                entity_type: entity_type.to_string(),
                index,
                id,
                changes,
                previous: prior,
                room,
            });
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(raw: Value) -> Snapshot {
        Snapshot::from_raw(raw).unwrap()
    }

    #[test]
    fn single_field_change_produces_one_record() {
        let prev = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge", "CalculatedTemperature": 200 }]
        }));
        let latest = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge", "CalculatedTemperature": 205 }]
        }));

        let records = diff_snapshots(&prev, &latest, &DeviceRoomMap::new());
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.entity_type, "Room");
        assert_eq!(record.index, 0);
        assert_eq!(record.id, Some(1));
        assert_eq!(record.changes.len(), 1);
        assert_eq!(record.changes.get("CalculatedTemperature").unwrap(), 205);
        assert_eq!(record.previous.get("CalculatedTemperature").unwrap(), 200);
        assert_eq!(record.room.as_deref(), Some("Lounge"));
    }

    #[test]
    fn identical_snapshots_produce_no_records() {
        let raw = json!({
            "Room": [{ "id": 1, "Name": "Lounge", "CalculatedTemperature": 200 }]
        });
        let prev = snapshot(raw.clone());
        let latest = snapshot(raw);
        assert!(diff_snapshots(&prev, &latest, &DeviceRoomMap::new()).is_empty());
    }

    #[test]
    fn noisy_only_changes_are_suppressed() {
        let prev = snapshot(json!({
            "Device": [{
                "id": 101,
                "ReceptionOfController": { "Rssi": -60 },
                "ReceptionOfDevice": { "Rssi": -58 },
                "PendingZigbeeMessageMask": 0
            }]
        }));
        let latest = snapshot(json!({
            "Device": [{
                "id": 101,
                "ReceptionOfController": { "Rssi": -64 },
                "ReceptionOfDevice": { "Rssi": -71 },
                "PendingZigbeeMessageMask": 4
            }]
        }));

        assert!(diff_snapshots(&prev, &latest, &DeviceRoomMap::new()).is_empty());
    }

    #[test]
    fn noisy_fields_are_dropped_from_real_changes() {
        let prev = snapshot(json!({
            "Device": [{ "id": 101, "BatteryLevel": "Normal",
                         "ReceptionOfDevice": { "Rssi": -58 } }]
        }));
        let latest = snapshot(json!({
            "Device": [{ "id": 101, "BatteryLevel": "Low",
                         "ReceptionOfDevice": { "Rssi": -71 } }]
        }));

        let records = diff_snapshots(&prev, &latest, &DeviceRoomMap::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].changes.len(), 1);
        assert!(records[0].changes.contains_key("BatteryLevel"));
    }

    #[test]
    fn nested_values_are_compared_by_value() {
        let prev = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge",
                       "RoomStat": { "SetPoint": 180, "Temp": 195 } }]
        }));
        let same = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge",
                       "RoomStat": { "SetPoint": 180, "Temp": 195 } }]
        }));
        assert!(diff_snapshots(&prev, &same, &DeviceRoomMap::new()).is_empty());

        let changed = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge",
                       "RoomStat": { "SetPoint": 200, "Temp": 195 } }]
        }));
        let records = diff_snapshots(&prev, &changed, &DeviceRoomMap::new());
        assert_eq!(records.len(), 1);
        assert!(records[0].changes.contains_key("RoomStat"));
    }

    #[test]
    fn device_change_resolves_room_via_map() {
        let with_rooms = snapshot(json!({
            "Room": [{ "id": 1, "Name": "Lounge", "SmartValveIds": [101] }]
        }));
        let map = DeviceRoomMap::rebuild(&with_rooms);

        let prev = snapshot(json!({
            "Device": [{ "id": 101, "BatteryLevel": "Normal" }]
        }));
        let latest = snapshot(json!({
            "Device": [{ "id": 101, "BatteryLevel": "Low" }]
        }));

        let records = diff_snapshots(&prev, &latest, &map);
        assert_eq!(records[0].room.as_deref(), Some("Lounge"));
    }

    #[test]
    fn system_change_is_reported_as_single_record() {
        let prev = snapshot(json!({
            "System": { "CloudConnectionStatus": "Connected", "HeatingButtonOverrideState": "Off" }
        }));
        let latest = snapshot(json!({
            "System": { "CloudConnectionStatus": "NotConnected", "HeatingButtonOverrideState": "Off" }
        }));

        let records = diff_snapshots(&prev, &latest, &DeviceRoomMap::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_type, "System");
        assert_eq!(records[0].index, 0);
        assert_eq!(records[0].id, None);
        assert!(records[0].changes.contains_key("CloudConnectionStatus"));
    }

    #[test]
    fn entity_type_missing_from_previous_is_skipped() {
        let prev = snapshot(json!({ "Room": [] }));
        let latest = snapshot(json!({
            "Device": [{ "id": 101, "BatteryLevel": "Low" }]
        }));
        assert!(diff_snapshots(&prev, &latest, &DeviceRoomMap::new()).is_empty());
    }

    #[test]
    fn multiple_entities_emit_multiple_records() {
        let prev = snapshot(json!({
            "Room": [
                { "id": 1, "Name": "Lounge", "CalculatedTemperature": 200 },
                { "id": 2, "Name": "Kitchen", "CalculatedTemperature": 190 }
            ]
        }));
        let latest = snapshot(json!({
            "Room": [
                { "id": 1, "Name": "Lounge", "CalculatedTemperature": 210 },
                { "id": 2, "Name": "Kitchen", "CalculatedTemperature": 185 }
            ]
        }));

        let records = diff_snapshots(&prev, &latest, &DeviceRoomMap::new());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].room.as_deref(), Some("Kitchen"));
    }
}
