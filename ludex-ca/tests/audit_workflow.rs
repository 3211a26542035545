//! End-to-end audit runs against synthetic cover libraries

use image::{ImageBuffer, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use ludex_ca::error::Error;
use ludex_ca::models::{AuditPhase, CoverIssue};
use ludex_ca::services::{AuditConfig, AuditOrchestrator};
use ludex_ca::store::AuditReportStore;

fn noise_pixel(x: u32, y: u32) -> Rgb<u8> {
    let mut v = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
    v ^= v >> 13;
    v = v.wrapping_mul(0xC2B2_AE35);
    v ^= v >> 16;
    let b = v.to_le_bytes();
    Rgb([b[0], b[1], b[2]])
}

/// Full-frame noise at the standard 600x900 cover size, the signature of
/// a legitimate busy cover
fn write_noise_cover(covers: &Path, game_id: i64, ext: &str) -> PathBuf {
    let img: RgbImage = ImageBuffer::from_fn(600, 900, noise_pixel);
    let path = covers.join(format!("{game_id}.{ext}"));
    img.save(&path).unwrap();
    path
}

/// Landscape art padded into a 600x900 portrait frame: uniform 100px bands
/// top and bottom
fn write_pillarboxed_cover(covers: &Path, game_id: i64) -> PathBuf {
    let img: RgbImage = ImageBuffer::from_fn(600, 900, |x, y| {
        if y < 100 || y >= 800 {
            Rgb([10, 10, 10])
        } else {
            noise_pixel(x, y)
        }
    });
    let path = covers.join(format!("{game_id}.png"));
    img.save(&path).unwrap();
    path
}

fn write_corrupt_cover(covers: &Path, game_id: i64) -> PathBuf {
    let path = covers.join(format!("{game_id}.png"));
    std::fs::write(&path, b"these bytes are not an image").unwrap();
    path
}

fn library() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let covers = dir.path().join("covers");
    std::fs::create_dir_all(&covers).unwrap();
    (dir, covers)
}

fn orchestrator(dir: &TempDir, covers: PathBuf, batch_size: usize) -> AuditOrchestrator {
    let store = Arc::new(AuditReportStore::new(dir.path().join("cover-audit.json")));
    let mut config = AuditConfig::new(covers);
    config.worker_count = 2;
    config.batch_size = batch_size;
    AuditOrchestrator::new(config, store).unwrap()
}

#[tokio::test]
async fn mixed_library_lands_every_cover_in_one_bucket() {
    let (dir, covers) = library();
    write_pillarboxed_cover(&covers, 1);
    write_noise_cover(&covers, 2, "png");
    write_corrupt_cover(&covers, 3);
    write_noise_cover(&covers, 17, "png");
    write_noise_cover(&covers, 44, "png");

    let orch = orchestrator(&dir, covers, 2);
    let report = orch.run_audit().await.unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.passed + report.flagged + report.failed + report.errors, report.total);
    assert_eq!(report.passed, 3);
    assert_eq!(report.flagged, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors, 0);

    // Worst first: corrupt, then pillarboxed, then the clean covers by id
    let order: Vec<i64> = report.results.iter().map(|r| r.game_id).collect();
    assert_eq!(order, vec![3, 1, 2, 17, 44]);

    let corrupt = &report.results[0];
    assert_eq!(corrupt.score, 0);
    assert!(corrupt.issues.contains(&CoverIssue::Corrupt));
    assert!(corrupt.flagged_for_review);

    let pillarboxed = &report.results[1];
    assert!(pillarboxed.score <= 60);
    assert!(pillarboxed.issues.contains(&CoverIssue::PillarboxFill));
    assert!(pillarboxed.flagged_for_review);

    let clean = &report.results[2];
    assert!(clean.score >= 70);
    assert!(clean.issues.is_empty());
    assert!(!clean.flagged_for_review);

    let session = orch.session().unwrap();
    assert_eq!(session.phase, AuditPhase::Completed);
    assert_eq!(session.progress.completed, 5);
    assert!(session.ended_at.is_some());
}

#[tokio::test]
async fn snapshot_file_uses_the_wire_format() {
    let (dir, covers) = library();
    write_noise_cover(&covers, 12, "png");
    write_corrupt_cover(&covers, 4);

    let orch = orchestrator(&dir, covers, 50);
    orch.run_audit().await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("cover-audit.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["total"], 2);
    assert!(json.get("durationMs").is_some());
    assert!(json.get("completedAt").is_some());

    let first = &json["results"][0];
    assert_eq!(first["gameId"], 4);
    assert_eq!(first["flaggedForReview"], true);
    assert_eq!(first["issues"][0], "corrupt");
    assert!(first["metrics"].get("entropyRatio").is_some());
    assert!(first["metrics"].get("edgeGradientScore").is_some());
    assert!(first.get("analyzedAt").is_some());
}

#[tokio::test]
async fn rerun_replaces_the_snapshot_wholesale() {
    let (dir, covers) = library();
    write_noise_cover(&covers, 1, "png");
    write_noise_cover(&covers, 2, "png");
    let broken = write_corrupt_cover(&covers, 3);

    let orch = orchestrator(&dir, covers.clone(), 50);
    let first = orch.run_audit().await.unwrap();
    assert_eq!(first.failed, 1);

    // Repair the broken cover and audit again
    std::fs::remove_file(&broken).unwrap();
    write_noise_cover(&covers, 3, "png");
    let second = orch.run_audit().await.unwrap();
    assert_eq!(second.total, 3);
    assert_eq!(second.failed, 0);
    assert_eq!(second.passed, 3);

    let store = AuditReportStore::new(dir.path().join("cover-audit.json"));
    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted.failed, 0);
    assert_eq!(persisted.results.len(), 3);
}

#[tokio::test]
async fn junk_files_and_duplicate_extensions_are_not_double_counted() {
    let (dir, covers) = library();
    write_noise_cover(&covers, 7, "jpg");
    write_noise_cover(&covers, 7, "png");
    std::fs::write(covers.join("notes.txt"), b"not a cover").unwrap();
    std::fs::create_dir(covers.join("archive")).unwrap();
    write_noise_cover(&covers.join("archive"), 9, "png");

    let orch = orchestrator(&dir, covers, 50);
    let report = orch.run_audit().await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.results[0].game_id, 7);
    assert!(report.results[0].file_path.ends_with("7.jpg"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn progress_is_observable_and_second_run_rejected_while_busy() {
    let (dir, covers) = library();
    for game_id in 1..=80 {
        write_noise_cover(&covers, game_id, "png");
    }

    let store = Arc::new(AuditReportStore::new(dir.path().join("cover-audit.json")));
    let mut config = AuditConfig::new(covers);
    config.worker_count = 1;
    config.batch_size = 5;
    let orch = Arc::new(AuditOrchestrator::new(config, store).unwrap());

    let runner = Arc::clone(&orch);
    let handle = tokio::spawn(async move { runner.run_audit().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    if !handle.is_finished() {
        assert!(matches!(orch.run_audit().await, Err(Error::AuditInProgress)));
        let session = orch.session().unwrap();
        assert!(session.progress.completed <= session.progress.total);
        assert!(session.progress.percentage <= 100.0);
    }

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.total, 80);
    assert_eq!(report.passed, 80);

    // The busy flag is released, so a fresh run goes through
    assert!(!orch.is_running());
    assert!(orch.run_audit().await.is_ok());
}
