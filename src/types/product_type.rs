// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device product types.

use std::fmt;

/// The product type of a device reported by the controller.
///
/// Unknown product types are preserved verbatim in the
/// [`ProductType::Other`] variant so that newer controller firmware does
/// not break deserialization.
///
/// # Examples
///
/// ```
/// use wiser_lib::types::ProductType;
///
/// assert_eq!(ProductType::parse("iTRV"), ProductType::Itrv);
/// assert_eq!(ProductType::Itrv.as_str(), "iTRV");
/// assert!(ProductType::Itrv.is_battery_powered());
/// assert!(!ProductType::Controller.is_battery_powered());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductType {
    /// The heat-hub controller itself.
    Controller,
    /// Thermostatic radiator valve.
    Itrv,
    /// Wall-mounted room thermostat.
    RoomStat,
    /// Smart valve (underfloor heating actuator).
    SmartValve,
    /// Smart plug.
    SmartPlug,
    /// Any product type not known to this library.
    Other(String),
}

impl ProductType {
    /// Parses a product type from the controller's string form.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Controller" => Self::Controller,
            "iTRV" => Self::Itrv,
            "RoomStat" => Self::RoomStat,
            "SmartValve" => Self::SmartValve,
            "SmartPlug" => Self::SmartPlug,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the controller's string form of this product type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Controller => "Controller",
            Self::Itrv => "iTRV",
            Self::RoomStat => "RoomStat",
            Self::SmartValve => "SmartValve",
            Self::SmartPlug => "SmartPlug",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for product types that run on batteries.
    ///
    /// Battery-powered devices get dead-battery values synthesized by the
    /// enrichment stage when they stop reporting a voltage.
    #[must_use]
    pub fn is_battery_powered(&self) -> bool {
        matches!(self, Self::RoomStat | Self::Itrv)
    }
}

impl From<String> for ProductType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ProductType> for String {
    fn from(value: ProductType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_types() {
        assert_eq!(ProductType::parse("Controller"), ProductType::Controller);
        assert_eq!(ProductType::parse("iTRV"), ProductType::Itrv);
        assert_eq!(ProductType::parse("RoomStat"), ProductType::RoomStat);
        assert_eq!(ProductType::parse("SmartPlug"), ProductType::SmartPlug);
    }

    #[test]
    fn parse_preserves_unknown() {
        let other = ProductType::parse("HeatingActuator");
        assert_eq!(other, ProductType::Other("HeatingActuator".to_string()));
        assert_eq!(other.as_str(), "HeatingActuator");
    }

    #[test]
    fn battery_powered_types() {
        assert!(ProductType::RoomStat.is_battery_powered());
        assert!(ProductType::Itrv.is_battery_powered());
        assert!(!ProductType::Controller.is_battery_powered());
        assert!(!ProductType::SmartPlug.is_battery_powered());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&ProductType::Itrv).unwrap();
        assert_eq!(json, "\"iTRV\"");
        let back: ProductType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProductType::Itrv);
    }
}
