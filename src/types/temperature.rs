// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Measured temperature type.

use std::fmt;

/// A measured temperature in tenths of a degree Celsius.
///
/// The controller reports all temperatures in tenths of a degree. Rooms
/// without any temperature source report the [`Temperature::NO_SENSOR`]
/// sentinel.
///
/// # Examples
///
/// ```
/// use wiser_lib::types::Temperature;
///
/// let t = Temperature::from_tenths(205);
/// assert!((t.as_celsius() - 20.5).abs() < f64::EPSILON);
/// assert!(!t.is_no_sensor());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Temperature(i32);

impl Temperature {
    /// Sentinel reported by rooms with no temperature source.
    pub const NO_SENSOR: Self = Self(-32768);

    /// Creates a temperature from tenths of a degree Celsius.
    #[must_use]
    pub const fn from_tenths(tenths: i32) -> Self {
        Self(tenths)
    }

    /// Creates a temperature from degrees Celsius.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_celsius(celsius: f64) -> Self {
        // Safe: domain temperatures are small values, far from i32 limits
        Self((celsius * 10.0).round() as i32)
    }

    /// Returns the raw value in tenths of a degree Celsius.
    #[must_use]
    pub const fn tenths(&self) -> i32 {
        self.0
    }

    /// Returns the temperature in degrees Celsius.
    #[must_use]
    pub fn as_celsius(&self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Returns `true` if this is the "no sensor" sentinel.
    #[must_use]
    pub const fn is_no_sensor(&self) -> bool {
        self.0 == Self::NO_SENSOR.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_sensor() {
            write!(f, "no sensor")
        } else {
            write!(f, "{}°C", self.as_celsius())
        }
    }
}
