//! Release ordering: the community-ratings comparator and the per-content
//! prioritizer that feeds the download trigger. Everything here is pure.

mod prioritize;
mod ratings;

pub use prioritize::{compare_decisions, prioritize, prioritize_at, size_bucket, SIZE_BUCKET};
pub use ratings::{compare_user_ratings, rating_tier, VoteClass, MIN_VOTES, RATING_TOLERANCE};
