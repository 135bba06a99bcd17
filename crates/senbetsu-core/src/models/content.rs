use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::QualityProfile;

/// A library entity (a show) that releases and files resolve to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    /// Typical episode length in minutes.
    pub runtime_minutes: u32,
    pub profile: QualityProfile,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub season_number: u32,
    pub episode_number: u32,
}

impl Episode {
    pub fn is_special(&self) -> bool {
        self.season_number == 0
    }
}
