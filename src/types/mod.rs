// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! These types provide validated, unit-aware representations of the raw
//! values the controller exchanges: setpoints and temperatures in tenths
//! of a degree Celsius, and the enumerated device classifications.

mod comparator;
mod product_type;
mod setpoint;
mod signal;
mod temperature;

pub use comparator::{CompareOp, TempComparator};
pub use product_type::ProductType;
pub use setpoint::{ClampBound, Setpoint, SetpointLimits};
pub use signal::{BatteryLevel, SignalStrength};
pub use temperature::Temperature;
