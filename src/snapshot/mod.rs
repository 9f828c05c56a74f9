// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-in-time controller state snapshots and the structures derived
//! from them.
//!
//! A [`Snapshot`] holds the full domain state returned by one successful
//! "get all" call, keyed by entity type (`System`, `Room`, `Device`,
//! `HeatingChannel`, ...). The snapshot is kept semi-structured because
//! the [diff engine](diff_snapshots) works property-by-property over
//! whatever fields the controller reports.

mod diff;
mod enrich;
mod room_map;
mod store;

pub use diff::{ChangeRecord, NOISY_FIELDS, diff_snapshots};
pub(crate) use enrich::enrich_devices;
pub use room_map::{DeviceRoomMap, RoomRef};
pub use store::SnapshotStore;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ParseError;

/// Full point-in-time domain state from one successful fetch.
///
/// Entity types map to either a list of entity records or a single
/// object; [`Snapshot::records`] normalizes both shapes to a record
/// slice. Construction via [`Snapshot::from_raw`] strips the
/// controller-local clock fields (`System.UnixTime`,
/// `System.LocalDateAndTime`) and stamps the snapshot with the time it
/// was stored.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    entities: Map<String, Value>,
    updated: DateTime<Utc>,
}

impl Snapshot {
    /// Builds a snapshot from the raw "get all" payload.
    ///
    /// Removes the two controller-clock fields, which change on every
    /// poll and would otherwise drown the diff in noise.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnexpectedFormat`] if the payload is not a
    /// JSON object.
    pub fn from_raw(raw: Value) -> Result<Self, ParseError> {
        let Value::Object(mut entities) = raw else {
            return Err(ParseError::UnexpectedFormat(
                "domain payload is not an object".to_string(),
            ));
        };

        if let Some(Value::Object(system)) = entities.get_mut("System") {
            system.remove("UnixTime");
            system.remove("LocalDateAndTime");
        }

        Ok(Self {
            entities,
            updated: Utc::now(),
        })
    }

    /// Returns when this snapshot was stored.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Returns the entity-type names present in this snapshot.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Returns the raw value stored for an entity type, if present.
    #[must_use]
    pub fn get(&self, entity_type: &str) -> Option<&Value> {
        self.entities.get(entity_type)
    }

    /// Returns the records of an entity type as a uniform slice.
    ///
    /// Single-object entity types (such as `System`) are exposed as a
    /// one-record slice; absent types yield an empty slice.
    #[must_use]
    pub fn records(&self, entity_type: &str) -> &[Value] {
        match self.entities.get(entity_type) {
            Some(Value::Array(list)) => list.as_slice(),
            Some(single @ Value::Object(_)) => std::slice::from_ref(single),
            _ => &[],
        }
    }

    /// Returns the `Room` entity records.
    #[must_use]
    pub fn rooms(&self) -> &[Value] {
        self.records("Room")
    }

    /// Returns the `Device` entity records.
    #[must_use]
    pub fn devices(&self) -> &[Value] {
        self.records("Device")
    }

    /// Returns the `HeatingChannel` entity records.
    #[must_use]
    pub fn heating_channels(&self) -> &[Value] {
        self.records("HeatingChannel")
    }

    /// Returns the `System` entity record.
    #[must_use]
    pub fn system(&self) -> Option<&Map<String, Value>> {
        self.entities.get("System").and_then(Value::as_object)
    }

    /// Returns whether the controller reports a live cloud connection.
    ///
    /// `None` when the snapshot carries no `System.CloudConnectionStatus`.
    #[must_use]
    pub fn cloud_connected(&self) -> Option<bool> {
        self.system()
            .and_then(|system| system.get("CloudConnectionStatus"))
            .and_then(Value::as_str)
            .map(|status| status == "Connected")
    }

    /// Mutable access to the `Device` record list, if present.
    pub(crate) fn devices_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self.entities.get_mut("Device") {
            Some(Value::Array(list)) => Some(list),
            _ => None,
        }
    }
}

/// Extracts the stable `id` of an entity record.
#[must_use]
pub(crate) fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Extracts a string property of an entity record.
#[must_use]
pub(crate) fn record_str<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}
