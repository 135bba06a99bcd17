use dashmap::DashMap;

use crate::error::SenbetsuError;
use crate::health::SourceStatus;
use crate::models::SourceId;

/// Persistence for source health records.
///
/// Implementations only need to be individually atomic per call; the tracker
/// serializes read-modify-write sequences per source itself.
pub trait StatusStore: Send + Sync {
    fn get(&self, source_id: SourceId) -> Result<Option<SourceStatus>, SenbetsuError>;

    fn upsert(&self, status: &SourceStatus) -> Result<(), SenbetsuError>;

    fn all(&self) -> Result<Vec<SourceStatus>, SenbetsuError>;
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: DashMap<SourceId, SourceStatus>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, source_id: SourceId) -> Result<Option<SourceStatus>, SenbetsuError> {
        Ok(self.statuses.get(&source_id).map(|s| s.clone()))
    }

    fn upsert(&self, status: &SourceStatus) -> Result<(), SenbetsuError> {
        self.statuses.insert(status.source_id, status.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<SourceStatus>, SenbetsuError> {
        let mut statuses: Vec<SourceStatus> =
            self.statuses.iter().map(|entry| entry.value().clone()).collect();
        statuses.sort_by_key(|s| s.source_id);
        Ok(statuses)
    }
}
