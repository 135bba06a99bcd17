use std::cmp::Ordering;

use crate::models::UserRatings;

/// Fewer total votes than this say nothing about a release.
pub const MIN_VOTES: u32 = 5;

/// Combined ratings closer than this are treated as equal.
pub const RATING_TOLERANCE: f64 = 0.2;

const SUPERMAJORITY: f64 = 2.0 / 3.0;

/// Neutral midpoint used when a source reported no ratings.
const DEFAULT_RATING: f64 = 0.5;

/// Coarse verdict from up/down votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoteClass {
    Bad,
    Neutral,
    Good,
}

impl UserRatings {
    pub fn is_spam_or_passworded(&self) -> bool {
        self.is_spam_confirmed || self.is_passworded_confirmed
    }

    /// Both counters must be reported and sum to at least [`MIN_VOTES`];
    /// otherwise the verdict is neutral.
    pub fn vote_class(&self) -> VoteClass {
        let (Some(up), Some(down)) = (self.up_votes, self.down_votes) else {
            return VoteClass::Neutral;
        };

        let total = u64::from(up) + u64::from(down);
        if total < u64::from(MIN_VOTES) {
            return VoteClass::Neutral;
        }

        let up_share = f64::from(up) / total as f64;
        let down_share = f64::from(down) / total as f64;

        if up_share >= SUPERMAJORITY {
            VoteClass::Good
        } else if down_share >= SUPERMAJORITY {
            VoteClass::Bad
        } else {
            VoteClass::Neutral
        }
    }

    /// Average of whichever of the video/audio ratings are present.
    pub fn combined_rating(&self) -> f64 {
        match (self.video_rating, self.audio_rating) {
            (Some(video), Some(audio)) => (video + audio) / 2.0,
            (Some(video), None) => video,
            (None, Some(audio)) => audio,
            (None, None) => DEFAULT_RATING,
        }
    }
}

/// Order two sets of community ratings. `Greater` means `x` is the better
/// release.
///
/// Precedence: having ratings at all, then not being confirmed spam or
/// passworded, then the vote verdict, then the combined video/audio rating
/// (only when the gap exceeds [`RATING_TOLERANCE`]).
pub fn compare_user_ratings(x: Option<&UserRatings>, y: Option<&UserRatings>) -> Ordering {
    let (x, y) = match (x, y) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(x), Some(y)) => (x, y),
    };

    let by_spam = y.is_spam_or_passworded().cmp(&x.is_spam_or_passworded());
    if by_spam != Ordering::Equal {
        return by_spam;
    }

    let by_votes = x.vote_class().cmp(&y.vote_class());
    if by_votes != Ordering::Equal {
        return by_votes;
    }

    let (x_rating, y_rating) = (x.combined_rating(), y.combined_rating());
    if (x_rating - y_rating).abs() > RATING_TOLERANCE {
        return x_rating.total_cmp(&y_rating);
    }

    Ordering::Equal
}

/// The transitive part of [`compare_user_ratings`]: presence, then spam,
/// then the vote verdict. Usable as a sort key where the tolerance rule
/// would make the order depend on input order.
pub fn rating_tier(ratings: Option<&UserRatings>) -> (bool, bool, VoteClass) {
    match ratings {
        None => (false, false, VoteClass::Neutral),
        Some(r) => (true, !r.is_spam_or_passworded(), r.vote_class()),
    }
}
