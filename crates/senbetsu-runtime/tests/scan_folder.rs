use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use senbetsu_core::clock::ManualClock;
use senbetsu_core::config::AppConfig;
use senbetsu_core::disk::{CancelFlag, FileSet, LocalDisk};
use senbetsu_core::error::SenbetsuError;
use senbetsu_core::health::MemoryStatusStore;
use senbetsu_core::import::{CandidateResolver, UNPARSEABLE_REASON};
use senbetsu_core::models::{ContentItem, Episode, LocalCandidate, QualityProfile};
use senbetsu_runtime::{Runtime, RuntimeError};

/// Resolves every file whose name starts with "show." to one content item.
struct ShowResolver {
    content: Arc<ContentItem>,
}

impl CandidateResolver for ShowResolver {
    fn resolve(&self, file_set: &FileSet) -> Result<Option<LocalCandidate>, SenbetsuError> {
        let name = file_set
            .primary
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !name.starts_with("show.") {
            return Ok(None);
        }
        let episode = Episode {
            id: 1,
            season_number: 1,
            episode_number: 1,
        };
        Ok(Some(LocalCandidate::new(
            file_set.clone(),
            Arc::clone(&self.content),
            vec![episode],
        )))
    }
}

fn resolver() -> Arc<dyn CandidateResolver> {
    Arc::new(ShowResolver {
        content: Arc::new(ContentItem {
            id: 1,
            title: "Show".into(),
            runtime_minutes: 24,
            profile: QualityProfile::default(),
            path: None,
        }),
    })
}

fn write(dir: &Path, name: &str, len: usize) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0u8; len]).unwrap();
}

fn runtime() -> Runtime {
    runtime_with(AppConfig::default())
}

fn runtime_with(config: AppConfig) -> Runtime {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    Runtime::with_parts(
        config,
        Arc::new(MemoryStatusStore::default()),
        Arc::new(LocalDisk),
        Arc::new(clock),
    )
}

#[tokio::test]
async fn test_scan_folder_decides_every_file_set() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "show.s01e01.mkv", 4096);
    write(dir.path(), "show.s01e01.srt", 16);
    write(dir.path(), "mystery.avi", 2048);
    write(dir.path(), "_UNPACK_show/show.s01e02.mkv", 1024);

    let decisions = runtime()
        .scan_folder(dir.path().to_path_buf(), Vec::new(), resolver(), CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(decisions.len(), 3);

    let by_name = |name: &str| {
        decisions
            .iter()
            .find(|d| d.candidate.path().file_name().and_then(|n| n.to_str()) == Some(name))
            .unwrap()
    };

    let settled = by_name("show.s01e01.mkv");
    assert!(
        settled.approved(),
        "{:?}",
        settled.reasons().collect::<Vec<_>>()
    );
    assert_eq!(settled.candidate.size, 4096);
    assert_eq!(settled.candidate.file_set.companions.len(), 1);

    let mystery = by_name("mystery.avi");
    assert_eq!(mystery.reasons().collect::<Vec<_>>(), vec![UNPARSEABLE_REASON]);

    // Files under a working folder are still being unpacked.
    let unpacking = by_name("show.s01e02.mkv");
    assert!(!unpacking.approved());
}

#[tokio::test]
async fn test_scan_folder_top_level_only() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "show.s01e01.mkv", 64);
    write(dir.path(), "nested/show.s01e02.mkv", 64);

    let mut config = AppConfig::default();
    config.import.recursive_scan = false;

    let decisions = runtime_with(config)
        .scan_folder(dir.path().to_path_buf(), Vec::new(), resolver(), CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(decisions.len(), 1);
}

#[tokio::test]
async fn test_scan_folder_skips_known_library_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "show.s01e01.mkv", 64);
    write(dir.path(), "show.s01e02.mkv", 64);

    let known = vec![dir.path().join("show.s01e01.mkv")];
    let decisions = runtime()
        .scan_folder(dir.path().to_path_buf(), known, resolver(), CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].candidate.path().ends_with("show.s01e02.mkv"));
}

#[tokio::test]
async fn test_scan_folder_cancelled() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "show.s01e01.mkv", 64);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = runtime()
        .scan_folder(dir.path().to_path_buf(), Vec::new(), resolver(), cancel)
        .await;
    assert!(matches!(result, Err(RuntimeError::Cancelled)));
}

#[tokio::test]
async fn test_scan_missing_folder_is_error() {
    let dir = TempDir::new().unwrap();
    let result = runtime()
        .scan_folder(dir.path().join("gone"), Vec::new(), resolver(), CancelFlag::new())
        .await;
    assert!(matches!(result, Err(RuntimeError::Storage(_))));
}
