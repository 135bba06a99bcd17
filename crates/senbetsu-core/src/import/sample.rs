use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::models::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    NotSample,
    Sample,
    /// Runtime unknown; nothing can be said either way.
    Indeterminate,
}

/// Shortest runtime a real episode of `content` can have.
pub fn minimum_runtime(content: &ContentItem) -> Duration {
    let seconds = match content.runtime_minutes {
        // Shorts
        0..=3 => 15,
        // Webisodes
        4..=10 => 90,
        11..=30 => 300,
        _ => 600,
    };
    Duration::from_secs(seconds)
}

/// Runtime heuristic for telling sample clips from full episodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectSample;

impl DetectSample {
    pub fn is_sample(
        &self,
        content: &ContentItem,
        path: &Path,
        is_special: bool,
        runtime: Option<Duration>,
    ) -> SampleStatus {
        if is_special {
            debug!(path = %path.display(), "Special, skipping sample check");
            return SampleStatus::NotSample;
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if matches!(extension.as_deref(), Some("flv" | "strm")) {
            debug!(path = %path.display(), "Skipping sample check for this file type");
            return SampleStatus::NotSample;
        }

        let Some(runtime) = runtime else {
            debug!(path = %path.display(), "Runtime unknown, can't tell if sample");
            return SampleStatus::Indeterminate;
        };

        let minimum = minimum_runtime(content);
        if runtime < minimum {
            debug!(
                path = %path.display(),
                runtime_secs = runtime.as_secs(),
                minimum_secs = minimum.as_secs(),
                "Runtime below minimum, treating as sample"
            );
            return SampleStatus::Sample;
        }

        SampleStatus::NotSample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityProfile;

    fn content(runtime_minutes: u32) -> ContentItem {
        ContentItem {
            id: 1,
            title: "Show".into(),
            runtime_minutes,
            profile: QualityProfile::default(),
            path: None,
        }
    }

    #[test]
    fn test_minimum_runtime_scales_with_content() {
        assert_eq!(minimum_runtime(&content(2)), Duration::from_secs(15));
        assert_eq!(minimum_runtime(&content(3)), Duration::from_secs(15));
        assert_eq!(minimum_runtime(&content(10)), Duration::from_secs(90));
        assert_eq!(minimum_runtime(&content(22)), Duration::from_secs(300));
        assert_eq!(minimum_runtime(&content(30)), Duration::from_secs(300));
        assert_eq!(minimum_runtime(&content(45)), Duration::from_secs(600));
    }

    #[test]
    fn test_short_runtime_is_sample() {
        let status = DetectSample.is_sample(
            &content(45),
            Path::new("show.s01e01.mkv"),
            false,
            Some(Duration::from_secs(60)),
        );
        assert_eq!(status, SampleStatus::Sample);
    }

    #[test]
    fn test_short_content_tolerates_short_runtime() {
        let status = DetectSample.is_sample(
            &content(2),
            Path::new("short.s01e01.mkv"),
            false,
            Some(Duration::from_secs(60)),
        );
        assert_eq!(status, SampleStatus::NotSample);
    }

    #[test]
    fn test_specials_and_streams_bypass() {
        let short = Some(Duration::from_secs(5));
        let c = content(45);
        assert_eq!(
            DetectSample.is_sample(&c, Path::new("show.s00e01.mkv"), true, short),
            SampleStatus::NotSample
        );
        assert_eq!(
            DetectSample.is_sample(&c, Path::new("show.s01e01.FLV"), false, short),
            SampleStatus::NotSample
        );
        assert_eq!(
            DetectSample.is_sample(&c, Path::new("show.s01e01.strm"), false, short),
            SampleStatus::NotSample
        );
    }

    #[test]
    fn test_unknown_runtime() {
        let status = DetectSample.is_sample(&content(45), Path::new("a.mkv"), false, None);
        assert_eq!(status, SampleStatus::Indeterminate);
    }
}
