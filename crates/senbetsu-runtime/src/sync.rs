use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use senbetsu_core::error::SenbetsuError;
use senbetsu_core::feed::parse_feed;
use senbetsu_core::health::SourceHealthTracker;
use senbetsu_core::models::{ReleaseInfo, ReleaseMarker, Source, SourceId};

use crate::{blocking, FeedFetcher, Runtime};

/// What happened to one source during a sync pass.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Quarantined; not polled.
    Skipped,
    /// Fetch or parse failed and the failure was recorded.
    Failed(String),
    Synced {
        releases: Vec<ReleaseInfo>,
        /// The previous checkpoint was seen again (or there was none), so
        /// nothing was missed since the last sync.
        fully_caught: bool,
    },
}

#[derive(Debug)]
pub struct SourceSync {
    pub source_id: SourceId,
    pub source_name: String,
    pub outcome: SyncOutcome,
}

impl Runtime {
    /// Poll every enabled source that is not quarantined, concurrently.
    ///
    /// Results come back in configuration order. A source failing never
    /// affects the others.
    pub async fn sync_feeds<F: FeedFetcher>(&self, fetcher: &F) -> Vec<SourceSync> {
        let sources: Vec<Source> = self.get_config().await.enabled_sources().cloned().collect();
        info!(count = sources.len(), "Syncing feeds");

        join_all(sources.iter().map(|source| self.sync_source(fetcher, source))).await
    }

    async fn sync_source<F: FeedFetcher>(&self, fetcher: &F, source: &Source) -> SourceSync {
        let outcome = self.sync_outcome(fetcher, source).await;
        SourceSync {
            source_id: source.id,
            source_name: source.name.clone(),
            outcome,
        }
    }

    async fn sync_outcome<F: FeedFetcher>(&self, fetcher: &F, source: &Source) -> SyncOutcome {
        let health = self.health();
        let source_id = source.id;

        let blocked = {
            let health = Arc::clone(&health);
            match blocking(move || Ok(health.is_blocked(source_id))).await {
                Ok(blocked) => blocked,
                Err(e) => {
                    warn!(source_id, error = %e, "Failed to check source health, polling anyway");
                    false
                }
            }
        };
        if blocked {
            debug!(source_id, "Source is quarantined, skipping");
            return SyncOutcome::Skipped;
        }

        let body = match fetcher.fetch(source).await {
            Ok(body) => body,
            Err(e) => {
                warn!(source_id, error = %e, "Feed fetch failed");
                record_failure(&health, source_id, e.retry_after).await;
                return SyncOutcome::Failed(e.message);
            }
        };

        let releases = match parse_feed(&body, source) {
            Ok(releases) => releases,
            Err(e) => {
                warn!(source_id, error = %e, "Feed parse failed");
                record_failure(&health, source_id, None).await;
                return SyncOutcome::Failed(e.to_string());
            }
        };

        let previous = {
            let health = Arc::clone(&health);
            match blocking(move || health.status(source_id)).await {
                Ok(status) => status.last_sync_marker,
                Err(e) => {
                    warn!(source_id, error = %e, "Failed to read source status");
                    None
                }
            }
        };
        let fully_caught = previous
            .as_ref()
            .is_none_or(|marker| releases.iter().any(|r| marker.matches(r)));
        let newest = releases
            .iter()
            .max_by_key(|r| r.publish_date)
            .map(ReleaseMarker::from);

        record(&health, move |health| {
            health.record_success(source_id)?;
            if let Some(marker) = newest {
                health.record_sync_checkpoint(source_id, marker, fully_caught)?;
            }
            Ok(())
        })
        .await;

        info!(
            source_id,
            releases = releases.len(),
            fully_caught,
            "Source synced"
        );
        SyncOutcome::Synced {
            releases,
            fully_caught,
        }
    }
}

async fn record_failure(
    health: &Arc<SourceHealthTracker>,
    source_id: SourceId,
    retry_after: Option<Duration>,
) {
    record(health, move |health| health.record_failure(source_id, retry_after)).await;
}

/// Apply a health update off the executor. Store errors are logged; losing
/// one update must not fail the sync.
async fn record<F>(health: &Arc<SourceHealthTracker>, update: F)
where
    F: FnOnce(&SourceHealthTracker) -> Result<(), SenbetsuError> + Send + 'static,
{
    let health = Arc::clone(health);
    if let Err(e) = blocking(move || update(&health)).await {
        warn!(error = %e, "Failed to record source health");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::{TimeDelta, TimeZone, Utc};

    use senbetsu_core::clock::{Clock, ManualClock};
    use senbetsu_core::config::AppConfig;
    use senbetsu_core::disk::LocalDisk;
    use senbetsu_core::health::{MemoryStatusStore, SourceStatus, StatusStore};

    use crate::FetchError;

    struct FakeFetcher {
        responses: HashMap<SourceId, Result<Vec<u8>, FetchError>>,
    }

    impl FeedFetcher for FakeFetcher {
        async fn fetch(&self, source: &Source) -> Result<Vec<u8>, FetchError> {
            self.responses
                .get(&source.id)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::new("no response")))
        }
    }

    fn feed(items: &[(&str, &str)]) -> Vec<u8> {
        let items: String = items
            .iter()
            .map(|(guid, date)| {
                format!(
                    "<item><title>Show.{guid}.720p</title><guid>{guid}</guid>\
                     <link>https://indexer.test/get/{guid}</link><pubDate>{date}</pubDate>\
                     <newznab:attr name=\"size\" value=\"1048576\"/></item>"
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\" \
             xmlns:newznab=\"http://www.newznab.com/DTD/2010/feeds/attributes/\">\
             <channel><title>t</title><link>https://indexer.test</link>\
             <description>d</description>{items}</channel></rss>"
        )
        .into_bytes()
    }

    fn source(id: SourceId) -> Source {
        Source {
            id,
            name: format!("indexer-{id}"),
            url: format!("https://indexer{id}.test/api"),
            enabled: true,
            weight: 0,
        }
    }

    fn runtime(sources: Vec<Source>) -> (Runtime, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let config = AppConfig {
            sources,
            ..AppConfig::default()
        };
        let runtime = Runtime::with_parts(
            config,
            Arc::new(MemoryStatusStore::default()),
            Arc::new(LocalDisk),
            Arc::new(clock.clone()),
        );
        (runtime, clock)
    }

    /// A store whose every call panics, as a broken backend would.
    struct PanickingStore;

    impl StatusStore for PanickingStore {
        fn get(&self, _: SourceId) -> Result<Option<SourceStatus>, SenbetsuError> {
            panic!("status backend crashed");
        }

        fn upsert(&self, _: &SourceStatus) -> Result<(), SenbetsuError> {
            panic!("status backend crashed");
        }

        fn all(&self) -> Result<Vec<SourceStatus>, SenbetsuError> {
            panic!("status backend crashed");
        }
    }

    const DAY1: &str = "Fri, 01 Mar 2024 08:00:00 +0000";
    const DAY2: &str = "Fri, 01 Mar 2024 10:00:00 +0000";

    #[tokio::test]
    async fn test_sync_records_checkpoint() {
        let (runtime, _) = runtime(vec![source(1)]);
        let fetcher = FakeFetcher {
            responses: HashMap::from([(1, Ok(feed(&[("a", DAY1), ("b", DAY2)])))]),
        };

        let results = runtime.sync_feeds(&fetcher).await;
        assert_eq!(results.len(), 1);
        match &results[0].outcome {
            SyncOutcome::Synced {
                releases,
                fully_caught,
            } => {
                assert_eq!(releases.len(), 2);
                assert!(fully_caught);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let status = runtime.health().status(1).unwrap();
        let marker = status.last_sync_marker.unwrap();
        assert_eq!(marker.guid.as_deref(), Some("b"));
        assert!(status.last_continuous_sync.is_some());
    }

    #[tokio::test]
    async fn test_sync_detects_gap() {
        let (runtime, _) = runtime(vec![source(1)]);
        let first = FakeFetcher {
            responses: HashMap::from([(1, Ok(feed(&[("a", DAY1)])))]),
        };
        runtime.sync_feeds(&first).await;

        // The previous newest release has scrolled out of the feed.
        let second = FakeFetcher {
            responses: HashMap::from([(1, Ok(feed(&[("c", DAY2)])))]),
        };
        let results = runtime.sync_feeds(&second).await;
        assert!(matches!(
            results[0].outcome,
            SyncOutcome::Synced {
                fully_caught: false,
                ..
            }
        ));
        let marker = runtime.health().status(1).unwrap().last_sync_marker.unwrap();
        assert_eq!(marker.guid.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_fetch_failure_quarantines_only_that_source() {
        let (runtime, clock) = runtime(vec![source(1), source(2)]);
        let fetcher = FakeFetcher {
            responses: HashMap::from([
                (1, Err(FetchError::new("connection refused"))),
                (2, Ok(feed(&[("a", DAY1)]))),
            ]),
        };

        let results = runtime.sync_feeds(&fetcher).await;
        assert!(matches!(results[0].outcome, SyncOutcome::Failed(_)));
        assert!(matches!(results[1].outcome, SyncOutcome::Synced { .. }));

        let health = runtime.health();
        assert!(health.is_blocked(1));
        assert!(!health.is_blocked(2));

        // Still quarantined on the next pass.
        let results = runtime.sync_feeds(&fetcher).await;
        assert!(matches!(results[0].outcome, SyncOutcome::Skipped));

        clock.advance(TimeDelta::days(1));
        let results = runtime.sync_feeds(&fetcher).await;
        assert!(matches!(results[0].outcome, SyncOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_retry_after_extends_quarantine() {
        let (runtime, clock) = runtime(vec![source(1)]);
        let fetcher = FakeFetcher {
            responses: HashMap::from([(
                1,
                Err(FetchError::new("too many requests")
                    .with_retry_after(Duration::from_secs(2 * 3600))),
            )]),
        };
        runtime.sync_feeds(&fetcher).await;

        let status = runtime.health().status(1).unwrap();
        let until = status.disabled_until.unwrap();
        assert!(until >= clock.now() + TimeDelta::hours(2));
    }

    #[tokio::test]
    async fn test_crashed_health_check_still_polls() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let runtime = Runtime::with_parts(
            AppConfig {
                sources: vec![source(1)],
                ..AppConfig::default()
            },
            Arc::new(PanickingStore),
            Arc::new(LocalDisk),
            Arc::new(clock),
        );
        let fetcher = FakeFetcher {
            responses: HashMap::from([(1, Ok(feed(&[("a", DAY1)])))]),
        };

        let results = runtime.sync_feeds(&fetcher).await;
        match &results[0].outcome {
            SyncOutcome::Synced { releases, .. } => assert_eq!(releases.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_failure_is_recorded() {
        let (runtime, _) = runtime(vec![source(1)]);
        let fetcher = FakeFetcher {
            responses: HashMap::from([(1, Ok(b"<html>maintenance</html>".to_vec()))]),
        };
        let results = runtime.sync_feeds(&fetcher).await;
        assert!(matches!(results[0].outcome, SyncOutcome::Failed(_)));
        assert_eq!(runtime.health().status(1).unwrap().escalation_level, 1);
    }

    #[tokio::test]
    async fn test_disabled_sources_are_not_polled() {
        let mut disabled = source(2);
        disabled.enabled = false;
        let (runtime, _) = runtime(vec![source(1), disabled]);
        let fetcher = FakeFetcher {
            responses: HashMap::from([(1, Ok(feed(&[])))]),
        };
        let results = runtime.sync_feeds(&fetcher).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, 1);
        // An empty feed leaves no checkpoint behind.
        assert!(runtime.health().status(1).unwrap().last_sync_marker.is_none());
    }
}
