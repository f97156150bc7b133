use crate::modules::backup::export::ExportBundle;
use crate::modules::billing::core::index::BillingIndex;
use crate::shared::core::week::WeekBucket;
use crate::shell::config::AppConfig;
use crate::shell::context::AppContext;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "freelance_ops: local-first time, statistics and billing records",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override FREELANCE_OPS_DATA_DIR.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Show this week's totals and the retry queue.
    Status,

    /// Recompute weekly statistics from stored time entries.
    Backfill {
        /// Number of weeks, ending with the current one.
        #[arg(long)]
        weeks: Option<usize>,
    },

    /// Replay queued writes now.
    Flush,

    /// List invoices with their balances.
    Invoices,

    /// Write every collection to a JSON bundle.
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Restore records from a JSON bundle.
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// Remove all local data. Requires the phrase "DELETE ALL DATA".
    Purge {
        #[arg(long)]
        confirm: String,
    },
}

pub async fn run(command: Commands, context: &AppContext, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Status => status(context, out).await,
        Commands::Backfill { weeks } => {
            let weeks = weeks.unwrap_or(context.config.backfill_weeks);
            let report = context.backfill(weeks).await?;
            for totals in &report.weeks {
                writeln!(
                    out,
                    "{}  {:>5} / {} min",
                    totals.week_bucket, totals.total_minutes, totals.target_minutes
                )?;
            }
            Ok(())
        }
        Commands::Flush => {
            let report = context.queue.flush().await;
            writeln!(
                out,
                "replayed {}, failed {}, exhausted {}, deferred {}",
                report.succeeded, report.failed, report.exhausted, report.deferred
            )?;
            for op in context.queue.exhausted().await {
                writeln!(
                    out,
                    "gave up: {} {} {} ({})",
                    op.operation_kind,
                    op.entity_type,
                    op.record_id(),
                    op.last_error.as_deref().unwrap_or("unknown error")
                )?;
            }
            Ok(())
        }
        Commands::Invoices => invoices(context, out).await,
        Commands::Export { out: path } => {
            let bundle = context.export().await?;
            let json = serde_json::to_vec_pretty(&bundle)?;
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "exported {} records to {}", bundle.record_count(), path.display())?;
            Ok(())
        }
        Commands::Import { file } => {
            let raw = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let bundle: ExportBundle = serde_json::from_slice(&raw)
                .with_context(|| format!("decoding {}", file.display()))?;
            let report = context.import(&bundle, |_| {}).await?;
            writeln!(out, "imported {} of {} records", report.imported, report.total)?;
            for issue in &report.errors {
                writeln!(
                    out,
                    "skipped {}/{}: {}",
                    issue.collection,
                    issue.id.as_deref().unwrap_or("-"),
                    issue.message
                )?;
            }
            Ok(())
        }
        Commands::Purge { confirm } => {
            let report = context.purge(&confirm).await?;
            let removed: usize = report.removed.values().sum();
            writeln!(out, "removed {removed} records")?;
            for error in &report.errors {
                writeln!(out, "error: {error}")?;
            }
            Ok(())
        }
    }
}

async fn status(context: &AppContext, out: &mut dyn Write) -> anyhow::Result<()> {
    let week = WeekBucket::containing(context.clock.now());
    let totals = context.engine.weekly_totals(week).await;
    writeln!(
        out,
        "{}: {} / {} min",
        totals.week_bucket, totals.total_minutes, totals.target_minutes
    )?;
    for (job_id, minutes) in context.engine.per_job_totals(week).await {
        writeln!(out, "  {job_id}: {minutes} min")?;
    }
    let depth = context.queue.depth().await;
    if depth > 0 {
        let exhausted = context.queue.exhausted().await.len();
        writeln!(out, "unsynced ({depth}), {exhausted} gave up")?;
    } else {
        writeln!(out, "all writes synced")?;
    }
    Ok(())
}

async fn invoices(context: &AppContext, out: &mut dyn Write) -> anyhow::Result<()> {
    let snapshot = context.billing_snapshot().await?;
    let index = BillingIndex::build(&snapshot);
    for computed in index.computed_invoices() {
        let invoice = &computed.invoice.data;
        writeln!(
            out,
            "{}  {:?}  total {:.2}  paid {:.2}  outstanding {:.2}",
            invoice.number, invoice.status, invoice.total, computed.paid_total, computed.outstanding
        )?;
    }
    for (client_id, outstanding) in index.outstanding_by_client() {
        let name = index
            .client(&client_id)
            .map(|client| client.data.name.as_str())
            .unwrap_or("unknown client");
        writeln!(out, "{name}: {outstanding:.2} outstanding")?;
    }
    Ok(())
}
