//! Per-source failure tracking with escalating quarantine.
//!
//! Every fetch outcome is reported here. Failures raise a source's
//! escalation level, which indexes a fixed back-off table; successes walk it
//! back down one step at a time. Callers ask [`SourceHealthTracker::is_blocked`]
//! before polling and skip the source while its quarantine lasts. Nothing in
//! here sleeps.

mod status;
mod store;
mod tracker;

pub use status::{backoff_for_level, SourceStatus, ESCALATION_BACKOFF, MAX_ESCALATION_LEVEL};
pub use store::{MemoryStatusStore, StatusStore};
pub use tracker::SourceHealthTracker;
