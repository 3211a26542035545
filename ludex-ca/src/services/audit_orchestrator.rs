//! Audit orchestration
//!
//! Runs the full cover audit: enumerate the covers directory, analyze in
//! parallel batches on a bounded worker pool, aggregate per batch, persist
//! the report. One audit at a time; progress is published as poll-only
//! snapshots after every settled batch.

use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::error::Error;
use crate::models::{AuditPhase, AuditReport, AuditSession, CoverAnalysis};
use crate::services::{analyze_cover, CoverFile, CoverScanner, MetricsExtractor};
use crate::store::AuditReportStore;

/// Covers analyzed per batch; counters and progress move once per batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Leave one core for the rest of the system
pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub covers_dir: PathBuf,
    pub worker_count: usize,
    pub batch_size: usize,
}

impl AuditConfig {
    pub fn new(covers_dir: PathBuf) -> Self {
        Self {
            covers_dir,
            worker_count: default_worker_count(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Clears a busy flag when dropped, covering every exit path
pub(crate) struct RunningGuard {
    flag: Arc<AtomicBool>,
}

impl RunningGuard {
    /// Claim the flag, or `None` when it is already held
    pub(crate) fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag: Arc::clone(flag) })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives complete audit runs
pub struct AuditOrchestrator {
    config: AuditConfig,
    scanner: CoverScanner,
    extractor: Arc<MetricsExtractor>,
    store: Arc<AuditReportStore>,
    pool: Arc<rayon::ThreadPool>,
    running: Arc<AtomicBool>,
    // Published for synchronous pollers. Guards wrap a single clone or
    // store, never an await, so a panic cannot poison these locks.
    current: RwLock<Option<AuditSession>>,
    latest: RwLock<Option<AuditReport>>,
}

impl AuditOrchestrator {
    pub fn new(config: AuditConfig, store: Arc<AuditReportStore>) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(|i| format!("cover-audit-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build worker pool: {e}")))?;

        Ok(Self {
            config,
            scanner: CoverScanner::new(),
            extractor: Arc::new(MetricsExtractor::new()),
            store,
            pool: Arc::new(pool),
            running: Arc::new(AtomicBool::new(false)),
            current: RwLock::new(None),
            latest: RwLock::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the current (or most recently finished) session
    pub fn session(&self) -> Option<AuditSession> {
        self.current.read().unwrap().clone()
    }

    /// Most recent completed report, from memory or the persisted snapshot
    pub async fn latest_report(&self) -> Result<Option<AuditReport>, Error> {
        if let Some(report) = self.latest.read().unwrap().clone() {
            return Ok(Some(report));
        }
        Ok(self.store.load().await?)
    }

    /// Run one full audit
    ///
    /// Rejects immediately with [`Error::AuditInProgress`] when another run
    /// holds the busy flag; the rejected call leaves no trace in session
    /// state or counters.
    pub async fn run_audit(&self) -> Result<AuditReport, Error> {
        let _run = RunningGuard::claim(&self.running).ok_or(Error::AuditInProgress)?;

        let started = Instant::now();
        let mut session = AuditSession::new(self.config.covers_dir.display().to_string());
        tracing::info!(
            session_id = %session.session_id,
            covers_dir = %self.config.covers_dir.display(),
            workers = self.config.worker_count,
            "Starting cover audit"
        );
        self.publish(&session);

        let covers = match self.scanner.scan(&self.config.covers_dir) {
            Ok(covers) => covers,
            Err(e) => {
                session.transition_to(AuditPhase::Failed);
                self.publish(&session);
                return Err(e.into());
            }
        };

        session.begin_analysis(covers.len());
        self.publish(&session);

        let batch_size = self.config.batch_size.max(1);
        let mut results: Vec<CoverAnalysis> = Vec::with_capacity(covers.len());
        for chunk in covers.chunks(batch_size) {
            let settled = self.analyze_batch(chunk.to_vec()).await;

            let (mut passed, mut flagged, mut failed, mut errors) = (0, 0, 0, 0);
            for (verdict, task_failed) in settled {
                if task_failed {
                    errors += 1;
                } else if verdict.is_corrupt() {
                    failed += 1;
                } else if verdict.flagged_for_review {
                    flagged += 1;
                } else {
                    passed += 1;
                }
                results.push(verdict);
            }
            session.record_batch(passed, flagged, failed, errors);
            self.publish(&session);
            tracing::debug!(
                session_id = %session.session_id,
                completed = session.progress.completed,
                total = session.progress.total,
                "Audit batch settled"
            );
        }

        let report = AuditReport::from_run(&session.progress, results, started.elapsed().as_millis() as u64);
        if let Err(e) = self.store.save(&report).await {
            session.transition_to(AuditPhase::Failed);
            self.publish(&session);
            return Err(e.into());
        }
        *self.latest.write().unwrap() = Some(report.clone());

        session.transition_to(AuditPhase::Completed);
        self.publish(&session);
        tracing::info!(
            session_id = %session.session_id,
            total = report.total,
            passed = report.passed,
            flagged = report.flagged,
            failed = report.failed,
            errors = report.errors,
            duration_ms = report.duration_ms,
            "Cover audit completed"
        );
        Ok(report)
    }

    /// Analyze one batch on the worker pool
    ///
    /// Each verdict is paired with a task-failure flag. A panicking item is
    /// contained and comes back as a corrupt verdict flagged as a task
    /// failure; the rest of the batch is unaffected.
    async fn analyze_batch(&self, batch: Vec<CoverFile>) -> Vec<(CoverAnalysis, bool)> {
        let pool = Arc::clone(&self.pool);
        let extractor = Arc::clone(&self.extractor);
        let fallback = batch.clone();

        let handle = tokio::task::spawn_blocking(move || {
            pool.install(|| {
                batch
                    .par_iter()
                    .map(|cover| {
                        let outcome = catch_unwind(AssertUnwindSafe(|| {
                            analyze_cover(&extractor, cover.game_id, &cover.path)
                        }));
                        match outcome {
                            Ok(verdict) => (verdict, false),
                            Err(_) => {
                                tracing::error!(
                                    game_id = cover.game_id,
                                    path = %cover.path.display(),
                                    "Cover analysis panicked"
                                );
                                (CoverAnalysis::corrupt(cover.game_id, cover.path.clone()), true)
                            }
                        }
                    })
                    .collect()
            })
        });

        match handle.await {
            Ok(settled) => settled,
            Err(e) => {
                // The whole blocking task died; every cover in the batch
                // becomes a task failure
                tracing::error!(error = %e, batch_len = fallback.len(), "Audit batch task failed");
                fallback
                    .into_iter()
                    .map(|cover| (CoverAnalysis::corrupt(cover.game_id, cover.path), true))
                    .collect()
            }
        }
    }

    fn publish(&self, session: &AuditSession) {
        *self.current.write().unwrap() = Some(session.clone());
    }
}
