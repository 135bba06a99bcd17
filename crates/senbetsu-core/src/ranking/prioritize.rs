use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use senbetsu_parse::MEBIBYTE;

use crate::models::{DownloadDecision, QualityProfile};

/// Sizes are compared in buckets of this many bytes.
pub const SIZE_BUCKET: u64 = 200 * MEBIBYTE;

/// Round `size` to the nearest [`SIZE_BUCKET`].
pub fn size_bucket(size: u64) -> u64 {
    size.saturating_add(SIZE_BUCKET / 2) / SIZE_BUCKET * SIZE_BUCKET
}

/// Order decisions for the download trigger, best first, using the current
/// time for release age.
pub fn prioritize(decisions: Vec<DownloadDecision>) -> Vec<DownloadDecision> {
    prioritize_at(decisions, Utc::now())
}

/// Order decisions, best first, with release age measured at `now`.
///
/// Decisions are grouped by content item (groups appear in the order their
/// first decision appeared) and each group is sorted with
/// [`compare_decisions`]. Decisions that did not resolve to any content are
/// appended last in their original order.
pub fn prioritize_at(decisions: Vec<DownloadDecision>, now: DateTime<Utc>) -> Vec<DownloadDecision> {
    let total = decisions.len();
    let mut groups: Vec<Vec<DownloadDecision>> = Vec::new();
    let mut group_index: HashMap<i64, usize> = HashMap::new();
    let mut unresolved = Vec::new();

    for decision in decisions {
        let Some(content_id) = decision.content.as_ref().map(|c| c.id) else {
            unresolved.push(decision);
            continue;
        };
        let idx = *group_index.entry(content_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(decision);
    }

    let mut prioritized = Vec::with_capacity(total);
    for mut group in groups {
        // Every decision in a group shares the content item, hence the profile.
        let profile = group
            .first()
            .and_then(|d| d.content.as_ref())
            .map(|c| c.profile.clone())
            .unwrap_or_default();
        group.sort_by(|a, b| compare_decisions(a, b, &profile, now));
        prioritized.extend(group);
    }
    prioritized.extend(unresolved);
    prioritized
}

/// Compare two decisions for the same content item. `Less` means `a` should
/// be grabbed first.
///
/// Keys, in order: quality (higher first, per `profile`), lowest episode
/// number, source weighting (lower first), size per episode in
/// [`SIZE_BUCKET`] steps (smaller first), then age in days (newer first).
/// Every key is a total order, so sorting an already prioritized list leaves
/// it unchanged.
pub fn compare_decisions(
    a: &DownloadDecision,
    b: &DownloadDecision,
    profile: &QualityProfile,
    now: DateTime<Utc>,
) -> Ordering {
    profile
        .compare(&b.quality, &a.quality)
        .then_with(|| a.first_episode_number().cmp(&b.first_episode_number()))
        .then_with(|| {
            a.release
                .weighted_quality
                .cmp(&b.release.weighted_quality)
        })
        .then_with(|| size_per_episode(a).cmp(&size_per_episode(b)))
        .then_with(|| a.release.age_days(now).cmp(&b.release.age_days(now)))
}

fn size_per_episode(decision: &DownloadDecision) -> u64 {
    size_bucket(decision.release.size) / decision.episodes.len().max(1) as u64
}
