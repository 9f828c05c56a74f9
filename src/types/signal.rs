// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal strength and battery level classifications.

use std::fmt;

/// Displayed Zigbee signal strength of a device.
///
/// `Offline` is never reported by the controller; it is synthesized by the
/// enrichment stage for battery devices whose battery has died.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalStrength {
    /// Very good reception.
    VeryGood,
    /// Good reception.
    Good,
    /// Medium reception.
    Medium,
    /// Poor reception.
    Poor,
    /// No signal at all; the device is unreachable over Zigbee.
    NoSignal,
    /// Synthesized for devices with a dead battery.
    Offline,
    /// Any value not known to this library.
    Other(String),
}

impl SignalStrength {
    /// Parses a signal strength from the controller's string form.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "VeryGood" => Self::VeryGood,
            "Good" => Self::Good,
            "Medium" => Self::Medium,
            "Poor" => Self::Poor,
            "NoSignal" => Self::NoSignal,
            "Offline" => Self::Offline,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the controller's string form of this signal strength.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::VeryGood => "VeryGood",
            Self::Good => "Good",
            Self::Medium => "Medium",
            Self::Poor => "Poor",
            Self::NoSignal => "NoSignal",
            Self::Offline => "Offline",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SignalStrength {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<SignalStrength> for String {
    fn from(value: SignalStrength) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Battery level of a battery-powered device.
///
/// `Dead` is synthesized by the enrichment stage when a battery device
/// stops reporting a voltage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BatteryLevel {
    /// Battery is full.
    Full,
    /// Battery is in the normal operating range.
    Normal,
    /// Roughly two thirds remaining.
    TwoThirds,
    /// Roughly one third remaining.
    OneThird,
    /// Battery is low and should be replaced soon.
    Low,
    /// Battery is dead; the device no longer reports.
    Dead,
    /// Any value not known to this library.
    Other(String),
}

impl BatteryLevel {
    /// Parses a battery level from the controller's string form.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Full" => Self::Full,
            "Normal" => Self::Normal,
            "TwoThirds" => Self::TwoThirds,
            "OneThird" => Self::OneThird,
            "Low" => Self::Low,
            "Dead" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the controller's string form of this battery level.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Full => "Full",
            Self::Normal => "Normal",
            Self::TwoThirds => "TwoThirds",
            Self::OneThird => "OneThird",
            Self::Low => "Low",
            Self::Dead => "Dead",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for BatteryLevel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<BatteryLevel> for String {
    fn from(value: BatteryLevel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_parse_round_trip() {
        for s in ["VeryGood", "Good", "Medium", "Poor", "NoSignal", "Offline"] {
            assert_eq!(SignalStrength::parse(s).as_str(), s);
        }
    }

    #[test]
    fn signal_unknown_preserved() {
        let other = SignalStrength::parse("Excellent");
        assert_eq!(other, SignalStrength::Other("Excellent".to_string()));
    }

    #[test]
    fn battery_parse_round_trip() {
        for s in ["Full", "Normal", "TwoThirds", "OneThird", "Low", "Dead"] {
            assert_eq!(BatteryLevel::parse(s).as_str(), s);
        }
    }

    #[test]
    fn battery_serde() {
        let json = serde_json::to_string(&BatteryLevel::Dead).unwrap();
        assert_eq!(json, "\"Dead\"");
        let back: BatteryLevel = serde_json::from_str("\"Low\"").unwrap();
        assert_eq!(back, BatteryLevel::Low);
    }
}
