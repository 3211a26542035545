//! ludex-ca: Cover Audit service entry point

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ludex_ca::config::CaConfig;
use ludex_ca::models::{AuditReport, FixHistoryEntry, FixRequest};
use ludex_ca::services::{
    AuditConfig, AuditOrchestrator, DiskAssetCache, RemediationEngine, SteamGridDbClient,
};
use ludex_ca::store::{AuditReportStore, FixHistoryStore};
use ludex_common::config::resolve_library_root;
use ludex_common::human_time::format_eta;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "ludex-ca", about = "Ludex cover quality audit and remediation", version)]
struct Cli {
    /// Library root (falls back to LUDEX_ROOT, the shared config file,
    /// then the OS default)
    #[arg(long, global = true)]
    library_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Audit every cover in the library
    Audit {
        /// Worker threads (default: cores minus one)
        #[arg(long)]
        workers: Option<usize>,
        /// Covers per progress batch
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Print the most recent audit report
    Report {
        /// How many of the worst covers to list
        #[arg(long, default_value_t = 10)]
        worst: usize,
    },
    /// Replace one game's cover with the best untried candidate
    Fix {
        #[arg(long)]
        game_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        steam_app_id: Option<u32>,
    },
    /// Fix a list of games from a JSON request file
    FixBatch {
        /// JSON array of {gameId, title, steamAppId?} objects
        requests: PathBuf,
    },
    /// Inspect or clear the fix attempt history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Show recorded attempts
    Show {
        #[arg(long)]
        game_id: Option<i64>,
    },
    /// Forget attempts for one game, or all of them
    Clear {
        #[arg(long)]
        game_id: Option<i64>,
        /// Required to clear the whole history
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let root = resolve_library_root(cli.library_root.as_deref());
    let config = CaConfig::load(root);
    config.paths.ensure_directories()?;
    tracing::info!(library_root = %config.paths.root().display(), "ludex-ca starting");

    match cli.command {
        Command::Audit { workers, batch_size } => run_audit(&config, workers, batch_size).await,
        Command::Report { worst } => show_report(&config, worst).await,
        Command::Fix { game_id, title, steam_app_id } => {
            run_fix(&config, FixRequest { game_id, title, steam_app_id }).await
        }
        Command::FixBatch { requests } => run_fix_batch(&config, &requests).await,
        Command::History { command } => run_history(&config, command).await,
    }
}

async fn run_audit(config: &CaConfig, workers: Option<usize>, batch_size: Option<usize>) -> anyhow::Result<()> {
    let mut audit_config = AuditConfig::new(config.paths.covers_dir());
    audit_config.worker_count = workers.unwrap_or(config.worker_count);
    audit_config.batch_size = batch_size.unwrap_or(config.batch_size);

    let store = Arc::new(AuditReportStore::new(config.paths.audit_report_path()));
    let orchestrator = Arc::new(AuditOrchestrator::new(audit_config, store)?);

    let runner = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move { runner.run_audit().await });

    while !handle.is_finished() {
        tokio::time::sleep(POLL_INTERVAL).await;
        if let Some(session) = orchestrator.session() {
            let p = session.progress;
            println!(
                "[{:?}] {}/{} covers  {:.1}%  passed {}  flagged {}  failed {}  errors {}  eta {}",
                session.phase,
                p.completed,
                p.total,
                p.percentage,
                p.passed,
                p.flagged,
                p.failed,
                p.errors,
                format_eta(p.estimated_remaining_seconds),
            );
        }
    }
    let report = handle.await??;

    println!();
    println!("Audit complete");
    print_report(&report, 10);
    Ok(())
}

async fn show_report(config: &CaConfig, worst: usize) -> anyhow::Result<()> {
    let store = AuditReportStore::new(config.paths.audit_report_path());
    match store.load().await? {
        Some(report) => {
            println!("Last audit finished {}", report.completed_at.to_rfc3339());
            print_report(&report, worst);
        }
        None => println!("No audit has completed yet; run `ludex-ca audit` first"),
    }
    Ok(())
}

fn print_report(report: &AuditReport, worst: usize) {
    println!("{} covers audited in {} ms", report.total, report.duration_ms);
    println!("  passed  {}", report.passed);
    println!("  flagged {}", report.flagged);
    println!("  failed  {}", report.failed);
    println!("  errors  {}", report.errors);

    let worst_covers = report.worst(worst);
    if !worst_covers.is_empty() {
        println!();
        println!("Worst covers:");
        for verdict in worst_covers {
            let issues: Vec<String> = verdict.issues.iter().map(ToString::to_string).collect();
            println!(
                "  game {:>8}  score {:>3}  {}",
                verdict.game_id,
                verdict.score,
                issues.join(", ")
            );
        }
    }
}

fn build_engine(config: &CaConfig) -> anyhow::Result<RemediationEngine<SteamGridDbClient, DiskAssetCache>> {
    let api_key = config.require_api_key()?.to_string();
    let source = SteamGridDbClient::new(api_key)?;
    let cache = DiskAssetCache::new(config.paths.covers_dir())?;
    let history = Arc::new(FixHistoryStore::new(config.paths.fix_history_path()));
    Ok(RemediationEngine::new(source, cache, history))
}

async fn run_fix(config: &CaConfig, request: FixRequest) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    match engine.fix_cover(&request).await {
        Ok(success) => {
            println!("Fixed cover for game {}", success.game_id);
            println!("  candidate {}", success.candidate_id);
            println!("  source    {}", success.resolved_url);
            println!("  installed {}", success.local_path.display());
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Fix failed for game {}: {e}", request.game_id)),
    }
}

async fn run_fix_batch(config: &CaConfig, requests_path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(requests_path)?;
    let requests: Vec<FixRequest> = serde_json::from_str(&raw)?;
    if requests.is_empty() {
        println!("Nothing to fix");
        return Ok(());
    }

    let engine = Arc::new(build_engine(config)?);
    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.fix_batch(&requests).await });

    while !handle.is_finished() {
        tokio::time::sleep(POLL_INTERVAL).await;
        if let Some(p) = engine.batch_progress() {
            match p.current_game_id {
                Some(id) => println!(
                    "{}/{}  fixed {}  failed {}  fixing game {}",
                    p.completed, p.total, p.succeeded, p.failed, id
                ),
                None => println!("{}/{}  fixed {}  failed {}", p.completed, p.total, p.succeeded, p.failed),
            }
        }
    }
    let report = handle.await??;

    println!();
    println!("Batch fix complete: {} succeeded, {} failed", report.succeeded, report.failed);
    for item in &report.items {
        match (&item.resolved_url, &item.error) {
            (Some(url), _) => println!("  game {:>8}  ok    {url}", item.game_id),
            (None, Some(error)) => println!("  game {:>8}  fail  {error}", item.game_id),
            _ => println!("  game {:>8}  fail", item.game_id),
        }
    }
    Ok(())
}

async fn run_history(config: &CaConfig, command: HistoryCommand) -> anyhow::Result<()> {
    let store = FixHistoryStore::new(config.paths.fix_history_path());
    match command {
        HistoryCommand::Show { game_id: Some(game_id) } => {
            let entry = store.entry_for(game_id).await?;
            if entry.attempt_count() == 0 && entry.tried_urls.is_empty() {
                println!("No attempts recorded for game {game_id}");
            } else {
                print_history_entry(game_id, &entry);
            }
        }
        HistoryCommand::Show { game_id: None } => {
            let history = store.load_all().await?;
            if history.is_empty() {
                println!("No fix attempts recorded");
            }
            for (game_id, entry) in &history {
                print_history_entry(*game_id, entry);
            }
        }
        HistoryCommand::Clear { game_id: Some(game_id), .. } => {
            if store.clear_game(game_id).await? {
                println!("Cleared fix history for game {game_id}");
            } else {
                println!("No fix history for game {game_id}");
            }
        }
        HistoryCommand::Clear { game_id: None, all: true } => {
            store.clear_all().await?;
            println!("Cleared all fix history");
        }
        HistoryCommand::Clear { game_id: None, all: false } => {
            anyhow::bail!("Pass --game-id <id> or --all");
        }
    }
    Ok(())
}

fn print_history_entry(game_id: i64, entry: &FixHistoryEntry) {
    let last = entry
        .last_attempt_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "game {:>8}: {} candidates tried, last attempt {}",
        game_id,
        entry.attempt_count(),
        last
    );
    for candidate_id in &entry.tried_candidate_ids {
        println!("    candidate {candidate_id}");
    }
}
