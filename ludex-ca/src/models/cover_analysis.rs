//! Cover analysis results
//!
//! `CoverMetrics` holds the raw band statistics extracted from a cover image,
//! `CoverAnalysis` the scored verdict persisted into the audit report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Score below which a cover is flagged for review
pub const REVIEW_THRESHOLD: u8 = 70;

/// Statistical measurements over the horizontal bands of a cover image
///
/// Ephemeral per analysis run. Band entropy is a detail proxy (sum of
/// per-channel standard deviations); the variance fields repeat the edge band
/// statistic in its second role and stay zero when the cheap pass already
/// cleared the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverMetrics {
    pub top_entropy: f64,
    pub middle_entropy: f64,
    pub bottom_entropy: f64,
    /// Middle band entropy over the mean of the edge bands, capped so the
    /// serialized value stays finite
    pub entropy_ratio: f64,
    pub top_color_variance: f64,
    pub bottom_color_variance: f64,
    /// Strongest horizontal discontinuity found at the probe rows, 0.0 to 1.0
    pub edge_gradient_score: f64,
}

/// Quality defects a cover can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverIssue {
    /// Uniform filler bands above and/or below the artwork
    PillarboxFill,
    /// Edge band carries almost no visual detail
    LowEntropyEdges,
    /// Sharp horizontal seam where filler meets artwork
    HorizontalBoundary,
    /// File missing, truncated, or not decodable as an image
    Corrupt,
}

impl fmt::Display for CoverIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            CoverIssue::PillarboxFill => "pillarbox_fill",
            CoverIssue::LowEntropyEdges => "low_entropy_edges",
            CoverIssue::HorizontalBoundary => "horizontal_boundary",
            CoverIssue::Corrupt => "corrupt",
        };
        write!(f, "{tag}")
    }
}

/// Scored audit verdict for a single cover file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverAnalysis {
    pub game_id: i64,
    pub file_path: PathBuf,
    /// 100 is a clean cover, 0 unusable
    pub score: u8,
    pub issues: Vec<CoverIssue>,
    pub metrics: CoverMetrics,
    /// Always equal to `score < REVIEW_THRESHOLD`
    pub flagged_for_review: bool,
    pub analyzed_at: DateTime<Utc>,
}

impl CoverAnalysis {
    /// Build a verdict from scorer output, deriving the review flag
    pub fn new(game_id: i64, file_path: PathBuf, score: u8, issues: Vec<CoverIssue>, metrics: CoverMetrics) -> Self {
        Self {
            game_id,
            file_path,
            score,
            issues,
            metrics,
            flagged_for_review: score < REVIEW_THRESHOLD,
            analyzed_at: Utc::now(),
        }
    }

    /// Sentinel verdict for an unreadable cover: zeroed metrics, score 0,
    /// tagged corrupt and flagged
    pub fn corrupt(game_id: i64, file_path: PathBuf) -> Self {
        Self::new(game_id, file_path, 0, vec![CoverIssue::Corrupt], CoverMetrics::default())
    }

    pub fn is_corrupt(&self) -> bool {
        self.issues.contains(&CoverIssue::Corrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_flag_follows_threshold() {
        let clean = CoverAnalysis::new(1, PathBuf::from("covers/1.png"), 100, vec![], CoverMetrics::default());
        assert!(!clean.flagged_for_review);

        let borderline = CoverAnalysis::new(1, PathBuf::from("covers/1.png"), 70, vec![], CoverMetrics::default());
        assert!(!borderline.flagged_for_review);

        let flagged = CoverAnalysis::new(
            1,
            PathBuf::from("covers/1.png"),
            69,
            vec![CoverIssue::PillarboxFill],
            CoverMetrics::default(),
        );
        assert!(flagged.flagged_for_review);
    }

    #[test]
    fn corrupt_sentinel_is_flagged_with_zero_score() {
        let verdict = CoverAnalysis::corrupt(42, PathBuf::from("covers/42.png"));
        assert_eq!(verdict.score, 0);
        assert!(verdict.flagged_for_review);
        assert!(verdict.is_corrupt());
        assert_eq!(verdict.metrics, CoverMetrics::default());
    }

    #[test]
    fn serializes_with_camel_case_keys_and_snake_case_issues() {
        let verdict = CoverAnalysis::new(
            7,
            PathBuf::from("covers/7.jpg"),
            45,
            vec![CoverIssue::PillarboxFill, CoverIssue::HorizontalBoundary],
            CoverMetrics {
                top_entropy: 1.5,
                middle_entropy: 210.0,
                bottom_entropy: 2.0,
                entropy_ratio: 120.0,
                top_color_variance: 1.5,
                bottom_color_variance: 2.0,
                edge_gradient_score: 0.4,
            },
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["gameId"], 7);
        assert_eq!(json["flaggedForReview"], true);
        assert_eq!(json["metrics"]["entropyRatio"], 120.0);
        assert_eq!(json["metrics"]["edgeGradientScore"], 0.4);
        assert_eq!(json["issues"][0], "pillarbox_fill");
        assert_eq!(json["issues"][1], "horizontal_boundary");
    }
}
