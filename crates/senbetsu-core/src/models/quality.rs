use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Source/resolution tier of a release or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Unknown,
    Sdtv,
    Dvd,
    WebDl480p,
    Hdtv720p,
    Hdtv1080p,
    RawHd,
    WebDl720p,
    Bluray720p,
    WebDl1080p,
    Bluray1080p,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Sdtv => "SDTV",
            Self::Dvd => "DVD",
            Self::WebDl480p => "WEBDL-480p",
            Self::Hdtv720p => "HDTV-720p",
            Self::Hdtv1080p => "HDTV-1080p",
            Self::RawHd => "Raw-HD",
            Self::WebDl720p => "WEBDL-720p",
            Self::Bluray720p => "Bluray-720p",
            Self::WebDl1080p => "WEBDL-1080p",
            Self::Bluray1080p => "Bluray-1080p",
        }
    }

    pub const ALL: &[Quality] = &[
        Self::Unknown,
        Self::Sdtv,
        Self::Dvd,
        Self::WebDl480p,
        Self::Hdtv720p,
        Self::Hdtv1080p,
        Self::RawHd,
        Self::WebDl720p,
        Self::Bluray720p,
        Self::WebDl1080p,
        Self::Bluray1080p,
    ];
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quality plus its revision (2 for a PROPER/REPACK of the same tier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityModel {
    pub quality: Quality,
    pub revision: u32,
}

impl QualityModel {
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            revision: 1,
        }
    }

    pub fn proper(quality: Quality) -> Self {
        Self {
            quality,
            revision: 2,
        }
    }
}

impl Default for QualityModel {
    fn default() -> Self {
        Self::new(Quality::Unknown)
    }
}

impl std::fmt::Display for QualityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.revision > 1 {
            write!(f, "{} Proper", self.quality)
        } else {
            write!(f, "{}", self.quality)
        }
    }
}

/// The user's ordering of acceptable qualities for a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,
    /// Allowed qualities, least preferred first.
    pub items: Vec<Quality>,
}

impl QualityProfile {
    /// Position of `quality` in the profile; qualities outside the profile
    /// rank below every allowed one.
    pub fn rank(&self, quality: Quality) -> Option<usize> {
        self.items.iter().position(|q| *q == quality)
    }

    /// Compare two qualities under this profile. `Greater` means `a` is
    /// preferred.
    pub fn compare(&self, a: &QualityModel, b: &QualityModel) -> Ordering {
        self.rank(a.quality)
            .cmp(&self.rank(b.quality))
            .then(a.revision.cmp(&b.revision))
    }
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self {
            name: "Any".into(),
            items: Quality::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hd_profile() -> QualityProfile {
        QualityProfile {
            name: "HD".into(),
            items: vec![Quality::Hdtv720p, Quality::WebDl720p, Quality::Bluray1080p],
        }
    }

    #[test]
    fn test_profile_order() {
        let p = hd_profile();
        assert_eq!(
            p.compare(
                &QualityModel::new(Quality::Bluray1080p),
                &QualityModel::new(Quality::Hdtv720p)
            ),
            Ordering::Greater
        );
    }

    #[test]
    fn test_outside_profile_ranks_lowest() {
        let p = hd_profile();
        assert_eq!(
            p.compare(
                &QualityModel::new(Quality::Sdtv),
                &QualityModel::new(Quality::Hdtv720p)
            ),
            Ordering::Less
        );
    }

    #[test]
    fn test_revision_breaks_ties() {
        let p = hd_profile();
        assert_eq!(
            p.compare(
                &QualityModel::proper(Quality::Hdtv720p),
                &QualityModel::new(Quality::Hdtv720p)
            ),
            Ordering::Greater
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(QualityModel::new(Quality::WebDl1080p).to_string(), "WEBDL-1080p");
        assert_eq!(QualityModel::proper(Quality::Hdtv720p).to_string(), "HDTV-720p Proper");
    }
}
