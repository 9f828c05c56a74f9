// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write commands against the controller.
//!
//! Currently a single command exists: overriding a room's target
//! temperature. The command layer validates the room reference, clamps
//! the requested temperature into the allowed range, issues one PATCH,
//! and always resolves to a descriptive [`SetRoomOutcome`]. It never
//! panics or propagates transport errors past this boundary.

use std::fmt;

use serde_json::{Value, json};

use crate::event::EngineEvent;
use crate::snapshot::{Snapshot, record_id, record_str};

use super::WiserEngine;

/// Reference to a room, by numeric id or case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomSelector {
    /// The room's id.
    Id(i64),
    /// The room's name, matched case-insensitively.
    Name(String),
}

impl From<i64> for RoomSelector {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RoomSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for RoomSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for RoomSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Outcome of a room setpoint write.
///
/// The command always resolves to one of these, success or failure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SetRoomOutcome {
    /// Human-readable summary of what happened.
    pub result: String,
    /// The resolved room's id, when the room was found.
    pub room_id: Option<i64>,
    /// The resolved room's name, when the room was found.
    pub room_name: Option<String>,
    /// The controller's response, on success.
    pub response: Option<Value>,
    /// The underlying failure, on error.
    pub error: Option<String>,
}

impl SetRoomOutcome {
    /// Returns `true` if the write reached the controller.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl WiserEngine {
    /// Overrides a room's target temperature.
    ///
    /// The room may be referenced by id or by case-insensitive name,
    /// resolved against the latest snapshot. The requested temperature
    /// is clamped into the configured limits; clamping publishes a
    /// warning event naming the original and clamped values. The
    /// configured "off" sentinel (−20°C by default) bypasses clamping
    /// and is sent verbatim.
    ///
    /// Always resolves to a [`SetRoomOutcome`]; the matching success or
    /// error event is published alongside.
    pub async fn set_room_temperature(
        &self,
        room: impl Into<RoomSelector>,
        celsius: f64,
    ) -> SetRoomOutcome {
        let selector = room.into();

        let Some((room_id, room_name)) = self.resolve_room(&selector).await else {
            tracing::warn!(room = %selector, "room not found, setpoint not sent");
            let outcome = SetRoomOutcome {
                result: format!("room not found for '{selector}'"),
                room_id: None,
                room_name: None,
                response: None,
                error: Some(format!("room not found for '{selector}'")),
            };
            self.bus
                .publish(EngineEvent::SetRoomTemperatureFailed(outcome.clone()));
            return outcome;
        };

        let (setpoint, clamped) = self.limits.clamp(celsius);
        if clamped.is_some() {
            tracing::warn!(
                requested = celsius,
                clamped = setpoint.as_celsius(),
                room = %room_name,
                "requested setpoint outside allowed range, clamped"
            );
            self.bus.publish(EngineEvent::SetpointClamped {
                room_id,
                room_name: room_name.clone(),
                requested: celsius,
                clamped: setpoint.as_celsius(),
            });
        }

        let body = json!({
            "RequestOverride": {
                "Type": "Manual",
                "SetPoint": setpoint.tenths(),
            }
        });

        match self.client.patch_room(room_id, &body).await {
            Ok(response) => {
                let outcome = SetRoomOutcome {
                    result: format!("temperature in room {room_name} set to {setpoint}"),
                    room_id: Some(room_id),
                    room_name: Some(room_name),
                    response: Some(response),
                    error: None,
                };
                tracing::info!(room_id, setpoint = %setpoint, "room setpoint written");
                self.bus
                    .publish(EngineEvent::SetRoomTemperature(outcome.clone()));
                outcome
            }
            Err(error) => {
                let outcome = SetRoomOutcome {
                    result: format!(
                        "could not set temperature in room {room_name} ({room_id}): {error}"
                    ),
                    room_id: Some(room_id),
                    room_name: Some(room_name),
                    response: None,
                    error: Some(error.to_string()),
                };
                tracing::warn!(room_id, error = %error, "room setpoint write failed");
                self.bus
                    .publish(EngineEvent::SetRoomTemperatureFailed(outcome.clone()));
                outcome
            }
        }
    }

    /// Resolves a room selector against the latest snapshot.
    async fn resolve_room(&self, selector: &RoomSelector) -> Option<(i64, String)> {
        let snapshot = self.latest().await?;
        find_room(&snapshot, selector)
    }
}

/// Finds a room by id or case-insensitive name.
fn find_room(snapshot: &Snapshot, selector: &RoomSelector) -> Option<(i64, String)> {
    for room in snapshot.rooms() {
        let matched = match selector {
            RoomSelector::Id(id) => record_id(room) == Some(*id),
            RoomSelector::Name(name) => record_str(room, "Name")
                .is_some_and(|n| n.to_lowercase() == name.to_lowercase()),
        };
        if matched {
            let id = record_id(room)?;
            let name = record_str(room, "Name").unwrap_or_default().to_string();
            return Some((id, name));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot::from_raw(json!({
            "Room": [
                { "id": 1, "Name": "Lounge" },
                { "id": 2, "Name": "Master Bedroom" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn find_room_by_id() {
        let found = find_room(&snapshot(), &RoomSelector::Id(2)).unwrap();
        assert_eq!(found, (2, "Master Bedroom".to_string()));
    }

    #[test]
    fn find_room_by_name_case_insensitive() {
        let found = find_room(&snapshot(), &RoomSelector::Name("lounge".into())).unwrap();
        assert_eq!(found, (1, "Lounge".to_string()));

        let found = find_room(&snapshot(), &RoomSelector::Name("MASTER BEDROOM".into())).unwrap();
        assert_eq!(found.0, 2);
    }

    #[test]
    fn find_room_unknown_yields_none() {
        assert!(find_room(&snapshot(), &RoomSelector::Id(9)).is_none());
        assert!(find_room(&snapshot(), &RoomSelector::Name("Attic".into())).is_none());
    }

    #[test]
    fn selector_conversions() {
        assert_eq!(RoomSelector::from(3), RoomSelector::Id(3));
        assert_eq!(
            RoomSelector::from("Lounge"),
            RoomSelector::Name("Lounge".to_string())
        );
        assert_eq!(RoomSelector::Id(3).to_string(), "3");
        assert_eq!(RoomSelector::from("Lounge").to_string(), "Lounge");
    }

    #[test]
    fn outcome_success_flag() {
        let ok = SetRoomOutcome {
            result: String::new(),
            room_id: Some(1),
            room_name: Some("Lounge".into()),
            response: Some(Value::Null),
            error: None,
        };
        assert!(ok.is_success());

        let failed = SetRoomOutcome {
            error: Some("boom".into()),
            response: None,
            ..ok
        };
        assert!(!failed.is_success());
    }
}
