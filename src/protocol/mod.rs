// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for the Wiser controller's local REST API.
//!
//! [`HubClient`] performs the authenticated GET/PATCH requests; the
//! [`GatewayChecker`] disambiguates transport failures by probing the
//! local network's default gateway.

mod gateway;
mod hub;

pub use gateway::GatewayChecker;
pub use hub::{BRAND_NAME, HubClient, HubConfig};
