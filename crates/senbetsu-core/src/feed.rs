//! Newznab/Torznab feed normalization into [`ReleaseInfo`] records.

use std::num::ParseIntError;

use chrono::{DateTime, Utc};
use rss::extension::Extension;
use thiserror::Error;
use tracing::{error, trace, warn};

use senbetsu_parse::{
    parse_api_error, parse_feed_date, parse_flag, parse_rating, parse_size, parse_vote_count,
    DEFAULT_RATING_CEILING,
};

use crate::error::SenbetsuError;
use crate::models::{ReleaseInfo, Source, UserRatings};

/// Extension prefixes carrying `<prefix:attr name=".." value=".."/>`.
const ATTR_NAMESPACES: &[&str] = &["newznab", "torznab"];

/// Why a single feed item was dropped.
#[derive(Debug, Error)]
enum ItemError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unparseable publish date '{0}'")]
    InvalidDate(String),

    #[error("unable to parse size from '{0}'")]
    InvalidSize(String),

    #[error("invalid rating attribute: {0}")]
    InvalidRating(#[from] ParseIntError),
}

/// Parse a feed document fetched from `source`.
///
/// Items that fail to normalize are logged and skipped; the rest of the feed
/// is still returned. A document that is not a feed at all is an error,
/// except for a rate-limit response, which yields no items.
pub fn parse_feed(xml: &[u8], source: &Source) -> Result<Vec<ReleaseInfo>, SenbetsuError> {
    if let Some(api_error) = parse_api_error(&String::from_utf8_lossy(xml)) {
        if api_error.is_request_limit() {
            error!(source_id = source.id, %api_error, "Source request limit reached");
            return Ok(Vec::new());
        }
        return Err(SenbetsuError::Feed(format!("{}: {api_error}", source.name)));
    }

    let channel = rss::Channel::read_from(xml)
        .map_err(|e| SenbetsuError::Feed(format!("parse {}: {e}", source.name)))?;

    let rated = source.reports_user_ratings();
    let mut releases = Vec::with_capacity(channel.items().len());

    for item in channel.items() {
        match parse_item(item, source, rated) {
            Ok(Some(release)) => {
                trace!(title = %release.title, "Parsed");
                releases.push(release);
            }
            Ok(None) => {}
            Err(e) => warn!(
                source_id = source.id,
                title = item.title().unwrap_or_default(),
                error = %e,
                "Skipping feed item"
            ),
        }
    }

    Ok(releases)
}

/// `Ok(None)` for items deliberately dropped (confirmed spam/passworded).
fn parse_item(
    item: &rss::Item,
    source: &Source,
    rated: bool,
) -> Result<Option<ReleaseInfo>, ItemError> {
    let title = item
        .title()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ItemError::Missing("title"))?
        .to_string();

    let user_ratings = if rated {
        let ratings = user_ratings(item)?;
        if ratings.is_spam_or_passworded() {
            trace!(%title, "Dropping confirmed spam or passworded release");
            return Ok(None);
        }
        Some(ratings)
    } else {
        None
    };

    let download_url = item
        .enclosure()
        .map(|e| e.url())
        .or_else(|| item.link())
        .filter(|u| !u.is_empty())
        .ok_or(ItemError::Missing("download url"))?
        .to_string();

    Ok(Some(ReleaseInfo {
        guid: item.guid().map(|g| g.value().to_string()),
        title,
        size: size(item)?,
        publish_date: publish_date(item)?,
        source_id: source.id,
        source: source.name.clone(),
        download_url,
        info_url: item
            .comments()
            .map(|c| c.replace("#comments", ""))
            .filter(|c| !c.is_empty()),
        tv_id: attr(item, "tvdbid")
            .or_else(|| attr(item, "rageid"))
            .and_then(|id| id.trim().parse().ok()),
        weighted_quality: source.weight,
        user_ratings,
    }))
}

/// Case-insensitive lookup of a Newznab/Torznab attribute.
fn attr<'a>(item: &'a rss::Item, name: &str) -> Option<&'a str> {
    let extensions = item.extensions();
    ATTR_NAMESPACES
        .iter()
        .filter_map(|ns| extensions.get(*ns)?.get("attr"))
        .flatten()
        .find(|ext: &&Extension| {
            ext.attrs()
                .get("name")
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|ext| ext.attrs().get("value"))
        .map(String::as_str)
}

/// Prefers the `usenetdate` attribute (when the post hit usenet) over the
/// feed's own `pubDate`.
fn publish_date(item: &rss::Item) -> Result<DateTime<Utc>, ItemError> {
    let raw = attr(item, "usenetdate")
        .or_else(|| item.pub_date())
        .ok_or(ItemError::Missing("publish date"))?;
    parse_feed_date(raw).ok_or_else(|| ItemError::InvalidDate(raw.to_string()))
}

/// The `size` attribute when present, otherwise a size mentioned in the
/// description. Absent everywhere means unknown (0).
fn size(item: &rss::Item) -> Result<u64, ItemError> {
    if let Some(raw) = attr(item, "size") {
        return raw
            .trim()
            .parse()
            .map_err(|_| ItemError::InvalidSize(raw.to_string()));
    }
    Ok(item.description().map(parse_size).unwrap_or(0))
}

fn user_ratings(item: &rss::Item) -> Result<UserRatings, ItemError> {
    Ok(UserRatings {
        up_votes: parse_vote_count(attr(item, "oz_up_votes"))?,
        down_votes: parse_vote_count(attr(item, "oz_down_votes"))?,
        video_rating: parse_rating(attr(item, "oz_video_quality_rating"), DEFAULT_RATING_CEILING)?,
        audio_rating: parse_rating(attr(item, "oz_audio_quality_rating"), DEFAULT_RATING_CEILING)?,
        spam_reports: parse_vote_count(attr(item, "oz_num_spam_reports"))?,
        passworded_reports: parse_vote_count(attr(item, "oz_num_passworded_reports"))?,
        is_spam_confirmed: parse_flag(attr(item, "oz_spam_confirmed")),
        is_passworded_confirmed: parse_flag(attr(item, "oz_passworded_confirmed")),
        rating_ceiling: DEFAULT_RATING_CEILING,
    })
}
