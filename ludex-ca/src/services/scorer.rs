//! Cover quality scorer
//!
//! Turns raw band metrics into a 0..=100 score and issue tags. Scoring is a
//! pure function of the metrics so the same measurements always produce the
//! same verdict, and the thresholds here are part of the audit contract:
//! changing them reshuffles which covers get flagged across every library.

use std::path::Path;

use crate::models::{CoverAnalysis, CoverIssue, CoverMetrics};
use crate::services::MetricsExtractor;

/// Detail ratio above which filler bands count as pillarboxing
pub const PILLARBOX_RATIO: f64 = 1.5;
/// Edge band detail below this is uniform enough to be filler
pub const PILLARBOX_ENTROPY: f64 = 50.0;
pub const PILLARBOX_VARIANCE: f64 = 500.0;
pub const PILLARBOX_PENALTY: i32 = 40;

/// Near-empty edge band thresholds
pub const LOW_ENTROPY: f64 = 30.0;
pub const LOW_VARIANCE: f64 = 300.0;
pub const LOW_ENTROPY_PENALTY: i32 = 15;

/// Gradient above which a probe row counts as a filler seam
pub const BOUNDARY_GRADIENT: f64 = 0.3;
pub const BOUNDARY_PENALTY: i32 = 20;

/// Score a set of cover metrics
///
/// Starts from 100 and applies each penalty at most once. The low entropy
/// penalty is charged once even when both edge bands qualify.
pub fn score_metrics(metrics: &CoverMetrics) -> (u8, Vec<CoverIssue>) {
    let mut score: i32 = 100;
    let mut issues = Vec::new();

    let top_filler = metrics.top_entropy < PILLARBOX_ENTROPY && metrics.top_color_variance < PILLARBOX_VARIANCE;
    let bottom_filler =
        metrics.bottom_entropy < PILLARBOX_ENTROPY && metrics.bottom_color_variance < PILLARBOX_VARIANCE;
    if metrics.entropy_ratio > PILLARBOX_RATIO && (top_filler || bottom_filler) {
        score -= PILLARBOX_PENALTY;
        issues.push(CoverIssue::PillarboxFill);
    }

    let top_empty = metrics.top_entropy < LOW_ENTROPY && metrics.top_color_variance < LOW_VARIANCE;
    let bottom_empty = metrics.bottom_entropy < LOW_ENTROPY && metrics.bottom_color_variance < LOW_VARIANCE;
    if top_empty || bottom_empty {
        score -= LOW_ENTROPY_PENALTY;
        issues.push(CoverIssue::LowEntropyEdges);
    }

    if metrics.edge_gradient_score > BOUNDARY_GRADIENT {
        score -= BOUNDARY_PENALTY;
        issues.push(CoverIssue::HorizontalBoundary);
    }

    (score.max(0) as u8, issues)
}

/// Analyze one cover file end to end
///
/// Never fails: an unreadable cover becomes the corrupt sentinel verdict
/// rather than an error, so one bad file cannot derail a batch.
pub fn analyze_cover(extractor: &MetricsExtractor, game_id: i64, path: &Path) -> CoverAnalysis {
    match extractor.extract(path) {
        Ok(metrics) => {
            let (score, issues) = score_metrics(&metrics);
            CoverAnalysis::new(game_id, path.to_path_buf(), score, issues, metrics)
        }
        Err(e) => {
            tracing::warn!(game_id, error = %e, "Cover unreadable, marking corrupt");
            CoverAnalysis::corrupt(game_id, path.to_path_buf())
        }
    }
}
