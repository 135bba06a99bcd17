use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use crate::clock::Clock;
use crate::config::ImportConfig;
use crate::disk::{DiskProvider, FileSet};
use crate::error::SenbetsuError;
use crate::import::{
    ImportDecision, NotInUse, NotSample, NotUnpacking, Rejection, SpecificationRegistry,
};
use crate::models::{LocalCandidate, QualityModel};

/// Reason given to file sets the resolver could not map to any content.
pub const UNPARSEABLE_REASON: &str = "Unable to parse file";

/// Maps a file set to the content and episodes it holds. Implemented by the
/// caller's parsing/library layer.
pub trait CandidateResolver: Send + Sync {
    /// `Ok(None)` means the file could not be identified.
    fn resolve(&self, file_set: &FileSet) -> Result<Option<LocalCandidate>, SenbetsuError>;
}

/// Turns file sets into import decisions.
pub struct ImportDecisionMaker {
    disk: Arc<dyn DiskProvider>,
    specifications: SpecificationRegistry,
}

impl ImportDecisionMaker {
    pub fn new(disk: Arc<dyn DiskProvider>, specifications: SpecificationRegistry) -> Self {
        Self {
            disk,
            specifications,
        }
    }

    /// Decision maker with the built-in rules: not a sample, not still
    /// unpacking, not held open by another process.
    pub fn with_defaults(
        disk: Arc<dyn DiskProvider>,
        clock: Arc<dyn Clock>,
        config: &ImportConfig,
    ) -> Result<Self, SenbetsuError> {
        let mut specifications = SpecificationRegistry::new();
        specifications.register(NotSample::new().into())?;
        specifications.register(
            NotUnpacking::new(
                Arc::clone(&disk),
                clock,
                config.working_folders.clone(),
                config.unpacking_check,
            )
            .into(),
        )?;
        specifications.register(NotInUse::new(Arc::clone(&disk)).into())?;
        Ok(Self::new(disk, specifications))
    }

    pub fn specifications(&self) -> &SpecificationRegistry {
        &self.specifications
    }

    /// Decide every file set.
    ///
    /// A file set the resolver cannot identify gets a single
    /// [`UNPARSEABLE_REASON`] rejection. A file set that fails to resolve or
    /// whose size cannot be read is logged and left out; it will be looked at
    /// again on the next pass. `folder_quality`, when it ranks above the
    /// file's own quality in the content's profile, replaces it.
    pub fn decisions<I>(
        &self,
        file_sets: I,
        resolver: &dyn CandidateResolver,
        folder_quality: Option<QualityModel>,
    ) -> Result<Vec<ImportDecision>, SenbetsuError>
    where
        I: IntoIterator<Item = FileSet>,
    {
        let mut decisions = Vec::new();
        for file_set in file_sets {
            if let Some(decision) = self.decision(file_set, resolver, folder_quality)? {
                decisions.push(decision);
            }
        }
        debug!(count = decisions.len(), "Import decisions made");
        Ok(decisions)
    }

    fn decision(
        &self,
        file_set: FileSet,
        resolver: &dyn CandidateResolver,
        folder_quality: Option<QualityModel>,
    ) -> Result<Option<ImportDecision>, SenbetsuError> {
        let mut candidate = match resolver.resolve(&file_set) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                return Ok(Some(ImportDecision::new(
                    LocalCandidate::unresolved(file_set),
                    vec![Rejection::rejected(UNPARSEABLE_REASON)],
                )));
            }
            Err(e) => {
                error!(path = %file_set.primary.display(), error = %e, "Couldn't import file");
                return Ok(None);
            }
        };

        if let Some(content) = candidate.content.clone() {
            if let Some(folder) = folder_quality {
                if content.profile.compare(&folder, &candidate.quality).is_gt() {
                    debug!(quality = %folder, "Using quality from folder");
                    candidate.quality = folder;
                }
            }
            if let Some(library) = &content.path {
                if candidate.path().starts_with(library) {
                    candidate.is_existing_library_file = true;
                }
            }
        }

        candidate.size = match self.disk.file_size(candidate.path()) {
            Ok(size) => size,
            Err(e) => {
                error!(path = %candidate.path().display(), error = %e, "Couldn't read file size");
                return Ok(None);
            }
        };
        debug!(path = %candidate.path().display(), size = candidate.size, "Evaluating");

        self.specifications.evaluate(candidate).map(Some)
    }
}

/// Drop file sets whose primary file is already one of `known` library
/// files. Paths compare case-insensitively on Windows only.
///
/// Lazy, so a cancellable [`FileSets`](crate::disk::FileSets) stays
/// cancellable behind it.
pub fn filter_existing_files<I>(file_sets: I, known: &[PathBuf]) -> impl Iterator<Item = FileSet>
where
    I: IntoIterator<Item = FileSet>,
{
    let known: HashSet<String> = known.iter().map(|p| path_key(p)).collect();
    file_sets.into_iter().filter(move |set| {
        let existing = known.contains(&path_key(&set.primary));
        if existing {
            debug!(path = %set.primary.display(), "Already in library, skipping");
        }
        !existing
    })
}

fn path_key(path: &Path) -> String {
    let key = path.to_string_lossy();
    if cfg!(windows) {
        key.to_lowercase()
    } else {
        key.into_owned()
    }
}
