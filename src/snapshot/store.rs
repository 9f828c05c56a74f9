// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot repository holding the latest and previous snapshots.

use std::sync::Arc;

use super::Snapshot;

/// Holds the two retained snapshots: `latest` and `previous`.
///
/// Snapshots are stored behind `Arc` so that readers keep a consistent,
/// fully-built snapshot even while a newer one replaces it. `previous`
/// is only ever updated through [`SnapshotStore::promote`], which the
/// fetch cycle calls exactly once per diff pass.
///
/// `previous` is `None` only before the very first successful fetch.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    latest: Option<Arc<Snapshot>>,
    previous: Option<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fully-built snapshot as the new `latest`.
    ///
    /// The swap is a single pointer replacement; readers holding the old
    /// `Arc` continue to see the complete prior snapshot.
    pub fn store(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        let latest = Arc::new(snapshot);
        self.latest = Some(Arc::clone(&latest));
        latest
    }

    /// Sets `previous` equal to `latest`.
    ///
    /// Called after a diff pass has run against the old `previous`.
    pub fn promote(&mut self) {
        self.previous.clone_from(&self.latest);
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.clone()
    }

    /// Returns the snapshot before the most recent one.
    #[must_use]
    pub fn previous(&self) -> Option<Arc<Snapshot>> {
        self.previous.clone()
    }
}
