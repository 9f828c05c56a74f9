// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for engine notifications.
//!
//! The engine announces everything it observes on an [`EventBus`]:
//! connectivity transitions, per-entity change records, query results,
//! command outcomes and monitor lifecycle. Events are a typed enum;
//! each variant maps to a stable topic string for external consumers.

mod engine_event;
mod event_bus;

pub use engine_event::{EngineEvent, MonitorTick, QueryKind};
pub use event_bus::EventBus;
