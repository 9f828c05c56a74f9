// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature comparator for filtering room temperature queries.

use std::str::FromStr;

use crate::error::ValueError;

use super::Temperature;

/// Direction of a temperature comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum CompareOp {
    /// Keep rooms at or below the threshold (`"<"`).
    Below,
    /// Keep rooms at or above the threshold (`">"`).
    Above,
}

impl FromStr for CompareOp {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Self::Below),
            ">" => Ok(Self::Above),
            other => Err(ValueError::InvalidComparator(other.to_string())),
        }
    }
}

/// A threshold filter for the room-temperature projection.
///
/// The threshold is given in degrees Celsius and scaled internally to the
/// controller's tenths-of-a-degree unit. Both directions are inclusive of
/// the threshold itself.
///
/// # Examples
///
/// ```
/// use wiser_lib::types::{TempComparator, Temperature};
///
/// let cold = TempComparator::parse("<", 18.0).unwrap();
/// assert!(cold.matches(Temperature::from_tenths(175)));
/// assert!(!cold.matches(Temperature::from_tenths(205)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TempComparator {
    op: CompareOp,
    threshold: Temperature,
}

impl TempComparator {
    /// Creates a comparator from an operator and a °C threshold.
    #[must_use]
    pub fn new(op: CompareOp, celsius: f64) -> Self {
        Self {
            op,
            threshold: Temperature::from_celsius(celsius),
        }
    }

    /// Parses a comparator from its textual operator form.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidComparator`] for any operator other
    /// than `"<"` or `">"`.
    pub fn parse(op: &str, celsius: f64) -> Result<Self, ValueError> {
        Ok(Self::new(op.parse()?, celsius))
    }

    /// Returns the comparison direction.
    #[must_use]
    pub const fn op(&self) -> CompareOp {
        self.op
    }

    /// Returns the threshold.
    #[must_use]
    pub const fn threshold(&self) -> Temperature {
        self.threshold
    }

    /// Returns `true` if a temperature passes the filter.
    #[must_use]
    pub fn matches(&self, temperature: Temperature) -> bool {
        match self.op {
            CompareOp::Below => temperature.tenths() <= self.threshold.tenths(),
            CompareOp::Above => temperature.tenths() >= self.threshold.tenths(),
        }
    }
}
