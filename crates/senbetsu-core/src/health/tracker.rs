use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::SenbetsuError;
use crate::health::{SourceStatus, StatusStore};
use crate::models::{ReleaseMarker, SourceId};

/// Gatekeeper for polling external sources.
///
/// Mutations for one source id are serialized through a per-source lock;
/// different sources never wait on each other.
pub struct SourceHealthTracker {
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
    locks: DashMap<SourceId, Arc<Mutex<()>>>,
}

impl SourceHealthTracker {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn StatusStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: DashMap::new(),
        }
    }

    /// Current status, or a fresh level-0 record for a source never seen.
    pub fn status(&self, source_id: SourceId) -> Result<SourceStatus, SenbetsuError> {
        Ok(self
            .store
            .get(source_id)?
            .unwrap_or_else(|| SourceStatus::new(source_id)))
    }

    /// Whether the source is quarantined right now.
    ///
    /// A status that cannot be read is treated as not blocked, so a broken
    /// store never silences every source.
    pub fn is_blocked(&self, source_id: SourceId) -> bool {
        match self.status(source_id) {
            Ok(status) => status.is_disabled_at(self.clock.now()),
            Err(e) => {
                warn!(source_id, error = %e, "Failed to read source status");
                false
            }
        }
    }

    /// Every status ever recorded, ordered by source id.
    pub fn all_statuses(&self) -> Result<Vec<SourceStatus>, SenbetsuError> {
        self.store.all()
    }

    /// Every known source whose quarantine has not expired yet.
    pub fn blocked_sources(&self) -> Result<Vec<SourceStatus>, SenbetsuError> {
        let now = self.clock.now();
        Ok(self
            .store
            .all()?
            .into_iter()
            .filter(|s| s.is_disabled_at(now))
            .collect())
    }

    /// Step the escalation level down by one. No-op at level 0.
    pub fn record_success(&self, source_id: SourceId) -> Result<(), SenbetsuError> {
        self.update(source_id, |status| {
            if !status.recover() {
                return false;
            }
            debug!(
                source_id,
                level = status.escalation_level,
                "Source recovered one escalation level"
            );
            true
        })
    }

    /// Escalate and quarantine the source.
    ///
    /// `minimum_backoff` (e.g. a server-supplied retry delay) pushes the level
    /// further up until the implied quarantine covers it.
    pub fn record_failure(
        &self,
        source_id: SourceId,
        minimum_backoff: Option<Duration>,
    ) -> Result<(), SenbetsuError> {
        let now = self.clock.now();
        self.update(source_id, |status| {
            status.escalate(now, minimum_backoff.filter(|m| !m.is_zero()));
            info!(
                source_id,
                level = status.escalation_level,
                disabled_until = ?status.disabled_until,
                "Source failure recorded"
            );
            true
        })
    }

    /// Remember where the last sync stopped.
    ///
    /// `fully_caught` means the sync reached the previous marker, so nothing
    /// in between was missed.
    pub fn record_sync_checkpoint(
        &self,
        source_id: SourceId,
        marker: ReleaseMarker,
        fully_caught: bool,
    ) -> Result<(), SenbetsuError> {
        let now = self.clock.now();
        self.update(source_id, |status| {
            if fully_caught {
                status.last_continuous_sync = Some(now);
            }
            status.last_sync_marker = Some(marker);
            true
        })
    }

    /// Read-modify-write under the source's lock. `apply` returns whether the
    /// status changed and needs persisting.
    fn update<F>(&self, source_id: SourceId, apply: F) -> Result<(), SenbetsuError>
    where
        F: FnOnce(&mut SourceStatus) -> bool,
    {
        let lock = self.locks.entry(source_id).or_default().clone();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut status = self.status(source_id)?;
        if apply(&mut status) {
            self.store.upsert(&status)?;
        }
        Ok(())
    }
}
