use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::disk::DiskProvider;
use crate::import::{DetectSample, SampleStatus, Specification, SpecificationError};
use crate::models::LocalCandidate;

/// Files modified more recently than this inside a working folder are
/// assumed to still be written.
pub const UNPACKING_FRESHNESS: Duration = Duration::from_secs(5 * 60);

// ── Not sample ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct NotSample {
    detector: DetectSample,
}

impl NotSample {
    pub const NAME: &'static str = "NotSample";
    pub const REJECTION_REASON: &'static str = "Sample";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_satisfied_by(&self, candidate: &LocalCandidate) -> Result<bool, SpecificationError> {
        if candidate.is_existing_library_file {
            debug!(path = %candidate.path().display(), "Existing file, skipping sample check");
            return Ok(true);
        }

        let content = candidate
            .content
            .as_deref()
            .ok_or_else(|| SpecificationError::Unavailable("content item".into()))?;

        let status = self.detector.is_sample(
            content,
            candidate.path(),
            candidate.is_special_episode,
            candidate.runtime,
        );
        Ok(status != SampleStatus::Sample)
    }
}

impl From<NotSample> for Specification {
    fn from(spec: NotSample) -> Self {
        Specification::new(NotSample::NAME, NotSample::REJECTION_REASON, move |c| {
            spec.is_satisfied_by(c)
        })
    }
}

// ── Not unpacking ───────────────────────────────────────────────

/// How a file inside a working folder is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpackingCheck {
    /// `ModifiedTime` on Windows, `Always` elsewhere.
    #[default]
    Auto,
    /// Reject only if the file changed within [`UNPACKING_FRESHNESS`].
    ModifiedTime,
    /// Reject whenever the folder carries a working marker.
    Always,
}

impl UnpackingCheck {
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::ModifiedTime,
            Self::Auto => Self::Always,
            other => other,
        }
    }
}

pub struct NotUnpacking {
    disk: Arc<dyn DiskProvider>,
    clock: Arc<dyn Clock>,
    working_folders: Vec<String>,
    check: UnpackingCheck,
}

impl NotUnpacking {
    pub const NAME: &'static str = "NotUnpacking";
    pub const REJECTION_REASON: &'static str = "File is still being unpacked";

    pub fn new(
        disk: Arc<dyn DiskProvider>,
        clock: Arc<dyn Clock>,
        working_folders: Vec<String>,
        check: UnpackingCheck,
    ) -> Self {
        Self {
            disk,
            clock,
            working_folders: working_folders
                .into_iter()
                .filter(|m| !m.is_empty())
                .collect(),
            check: check.resolve(),
        }
    }

    pub fn is_satisfied_by(&self, candidate: &LocalCandidate) -> Result<bool, SpecificationError> {
        let path = candidate.path();
        if candidate.is_existing_library_file {
            debug!(path = %path.display(), "Existing file, skipping unpacking check");
            return Ok(true);
        }

        let parent_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if !self
            .working_folders
            .iter()
            .any(|marker| parent_name.starts_with(marker.as_str()))
        {
            return Ok(true);
        }

        if self.check == UnpackingCheck::Always {
            debug!(path = %path.display(), "File is still being unpacked");
            return Ok(false);
        }

        let last_write = self.disk.last_write_utc(path)?;
        let freshness = TimeDelta::seconds(UNPACKING_FRESHNESS.as_secs() as i64);
        if last_write > self.clock.now() - freshness {
            debug!(path = %path.display(), %last_write, "File appears to be unpacking still");
            return Ok(false);
        }

        Ok(true)
    }
}

impl From<NotUnpacking> for Specification {
    fn from(spec: NotUnpacking) -> Self {
        Specification::new(NotUnpacking::NAME, NotUnpacking::REJECTION_REASON, move |c| {
            spec.is_satisfied_by(c)
        })
    }
}

// ── Not in use ──────────────────────────────────────────────────

pub struct NotInUse {
    disk: Arc<dyn DiskProvider>,
}

impl NotInUse {
    pub const NAME: &'static str = "NotInUse";
    pub const REJECTION_REASON: &'static str = "File is in use";

    pub fn new(disk: Arc<dyn DiskProvider>) -> Self {
        Self { disk }
    }

    pub fn is_satisfied_by(&self, candidate: &LocalCandidate) -> Result<bool, SpecificationError> {
        let path = candidate.path();
        if candidate.is_existing_library_file {
            debug!(path = %path.display(), "Existing file, skipping in use check");
            return Ok(true);
        }

        if self.disk.is_file_locked(path)? {
            debug!(path = %path.display(), "File is in use");
            return Ok(false);
        }

        Ok(true)
    }
}

impl From<NotInUse> for Specification {
    fn from(spec: NotInUse) -> Self {
        Specification::new(NotInUse::NAME, NotInUse::REJECTION_REASON, move |c| {
            spec.is_satisfied_by(c)
        })
    }
}
