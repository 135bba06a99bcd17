use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use senbetsu_parse::DEFAULT_RATING_CEILING;

use crate::models::{ContentItem, Episode, QualityModel};

/// Identifier of a configured feed source.
pub type SourceId = i64;

/// Community feedback attached to a release by sources that collect it.
///
/// Every counter and rating is optional: a missing value means the source
/// did not report it, which is not the same as a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRatings {
    pub up_votes: Option<u32>,
    pub down_votes: Option<u32>,
    /// Video quality on `[0, 1]`.
    pub video_rating: Option<f64>,
    /// Audio quality on `[0, 1]`.
    pub audio_rating: Option<f64>,
    pub spam_reports: Option<u32>,
    pub passworded_reports: Option<u32>,
    pub is_spam_confirmed: bool,
    pub is_passworded_confirmed: bool,
    /// Top of the source's raw rating scale, kept for display.
    pub rating_ceiling: u32,
}

impl Default for UserRatings {
    fn default() -> Self {
        Self {
            up_votes: None,
            down_votes: None,
            video_rating: None,
            audio_rating: None,
            spam_reports: None,
            passworded_reports: None,
            is_spam_confirmed: false,
            is_passworded_confirmed: false,
            rating_ceiling: DEFAULT_RATING_CEILING,
        }
    }
}

/// A normalized candidate release, produced once per feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Source-assigned unique id (RSS `<guid>`), when present.
    pub guid: Option<String>,
    pub title: String,
    /// Size in bytes; `0` when the source did not report one.
    pub size: u64,
    pub publish_date: DateTime<Utc>,
    pub source_id: SourceId,
    pub source: String,
    pub download_url: String,
    pub info_url: Option<String>,
    /// External TV database id advertised by the source.
    pub tv_id: Option<i32>,
    /// Source trust discount copied from the source configuration.
    pub weighted_quality: i32,
    pub user_ratings: Option<UserRatings>,
}

impl ReleaseInfo {
    /// Whole days since publication.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.publish_date).num_days()
    }

    /// Fractional hours since publication.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.publish_date).num_seconds() as f64 / 3600.0
    }
}

impl std::fmt::Display for ReleaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} [{}]", self.publish_date, self.title, self.size)
    }
}

/// The newest release seen during a sync, used to resume incremental
/// polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMarker {
    pub guid: Option<String>,
    pub title: String,
    pub publish_date: DateTime<Utc>,
}

impl ReleaseMarker {
    /// Whether `release` is the release this marker was taken from.
    pub fn matches(&self, release: &ReleaseInfo) -> bool {
        match (&self.guid, &release.guid) {
            (Some(a), Some(b)) => a == b,
            _ => self.title == release.title && self.publish_date == release.publish_date,
        }
    }
}

impl From<&ReleaseInfo> for ReleaseMarker {
    fn from(release: &ReleaseInfo) -> Self {
        Self {
            guid: release.guid.clone(),
            title: release.title.clone(),
            publish_date: release.publish_date,
        }
    }
}

/// A release paired with the content it resolves to and its parsed quality.
#[derive(Debug, Clone)]
pub struct DownloadDecision {
    pub release: ReleaseInfo,
    /// `None` when the release could not be mapped to a library item.
    pub content: Option<Arc<ContentItem>>,
    pub episodes: Vec<Episode>,
    pub quality: QualityModel,
}

impl DownloadDecision {
    pub fn new(
        release: ReleaseInfo,
        content: Option<Arc<ContentItem>>,
        episodes: Vec<Episode>,
        quality: QualityModel,
    ) -> Self {
        Self {
            release,
            content,
            episodes,
            quality,
        }
    }

    /// Lowest episode number covered, `0` when no episodes are attached.
    pub fn first_episode_number(&self) -> u32 {
        self.episodes
            .iter()
            .map(|e| e.episode_number)
            .min()
            .unwrap_or(0)
    }
}
