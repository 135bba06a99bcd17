use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::SourceId;

/// Hosts whose feeds carry community votes and quality ratings.
const RATED_HOSTS: &[&str] = &["oznzb.com"];

/// A configured release feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Trust discount applied to every release from this source. Lower is
    /// preferred when releases otherwise tie on quality.
    #[serde(default)]
    pub weight: i32,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    /// Whether items from this source carry `UserRatings`.
    pub fn reports_user_ratings(&self) -> bool {
        let Ok(url) = Url::parse(&self.url) else {
            return false;
        };
        url.host_str().is_some_and(|host| {
            RATED_HOSTS
                .iter()
                .any(|rated| host == *rated || host.ends_with(&format!(".{rated}")))
        })
    }
}
