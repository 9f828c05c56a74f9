// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-to-room lookup derived from the latest snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::ProductType;

use super::{Snapshot, record_id, record_str};

/// The room a device belongs to, plus the device's kind within the room.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RoomRef {
    /// The room's id.
    pub room_id: i64,
    /// The room's display name.
    pub room_name: String,
    /// How the room references the device.
    pub kind: ProductType,
}

/// Lookup from device id to the room that owns it.
///
/// Rebuilt in full on every successful fetch; entries from a previous
/// build never survive a rebuild.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceRoomMap {
    entries: HashMap<i64, RoomRef>,
    updated: DateTime<Utc>,
}

impl DeviceRoomMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            updated: Utc::now(),
        }
    }

    /// Builds the map from the rooms of a snapshot.
    ///
    /// Each room contributes its `SmartValveIds` (kind `SmartValve`),
    /// its singular `RoomStatId` (kind `RoomStat`) and its
    /// `SmartPlugIds` (kind `SmartPlug`). Any of these fields may be
    /// absent and is treated as empty.
    #[must_use]
    pub fn rebuild(snapshot: &Snapshot) -> Self {
        let mut entries = HashMap::new();

        for room in snapshot.rooms() {
            let Some(room_id) = record_id(room) else {
                continue;
            };
            let room_name = record_str(room, "Name").unwrap_or_default().to_string();

            let register = |entries: &mut HashMap<i64, RoomRef>, device_id: i64, kind| {
                entries.insert(
                    device_id,
                    RoomRef {
                        room_id,
                        room_name: room_name.clone(),
                        kind,
                    },
                );
            };

            if let Some(valve_ids) = room.get("SmartValveIds").and_then(Value::as_array) {
                for device_id in valve_ids.iter().filter_map(Value::as_i64) {
                    register(&mut entries, device_id, ProductType::SmartValve);
                }
            }
            if let Some(stat_id) = room.get("RoomStatId").and_then(Value::as_i64) {
                register(&mut entries, stat_id, ProductType::RoomStat);
            }
            if let Some(plug_ids) = room.get("SmartPlugIds").and_then(Value::as_array) {
                for device_id in plug_ids.iter().filter_map(Value::as_i64) {
                    register(&mut entries, device_id, ProductType::SmartPlug);
                }
            }
        }

        Self {
            entries,
            updated: Utc::now(),
        }
    }

    /// Looks up the room of a device.
    #[must_use]
    pub fn get(&self, device_id: i64) -> Option<&RoomRef> {
        self.entries.get(&device_id)
    }

    /// Looks up just the room name of a device.
    #[must_use]
    pub fn room_name(&self, device_id: i64) -> Option<&str> {
        self.entries.get(&device_id).map(|r| r.room_name.as_str())
    }

    /// Returns the number of mapped devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no devices are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns when this map was built.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }
}

impl Default for DeviceRoomMap {
    fn default() -> Self {
        Self::new()
    }
}
