mod candidate;
mod content;
mod quality;
mod release;
mod source;

pub use candidate::LocalCandidate;
pub use content::{ContentItem, Episode};
pub use quality::{Quality, QualityModel, QualityProfile};
pub use release::{DownloadDecision, ReleaseInfo, ReleaseMarker, SourceId, UserRatings};
pub use source::Source;
