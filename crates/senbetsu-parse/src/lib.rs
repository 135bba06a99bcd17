//! Normalization of source-specific release fields.
//!
//! Feed items carry sizes, dates and community ratings as free text whose
//! shape differs per source. The functions here turn those fields into
//! canonical numeric types and hold no state.

pub mod api_error;
pub mod date;
pub mod rating;
pub mod size;

pub use api_error::{parse_api_error, ApiError};
pub use date::parse_feed_date;
pub use rating::{parse_flag, parse_rating, parse_vote_count, DEFAULT_RATING_CEILING};
pub use size::{parse_size, GIBIBYTE, MEBIBYTE};
