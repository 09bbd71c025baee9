use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockwatch_core::ops;
use stockwatch_core::scoring::{scorer_from_settings, BatchPick, Scorer, ScoringOptions};
use stockwatch_core::storage;

#[derive(Debug, Parser)]
#[command(name = "stockwatch_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replace the equity catalog with the fixed reference list and re-score
    /// the featured symbols.
    ImportCatalog,

    /// Parse a CSV file and replace the equity catalog with its rows.
    IngestCsv {
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Score a batch of stored equities and replace the recommendation store.
    Generate {
        /// Scoring strategy (heuristic|llm). Defaults to the SCORER env var.
        #[arg(long)]
        scorer: Option<String>,

        /// Batch size cap.
        #[arg(long)]
        limit: Option<usize>,

        /// Batch selection (first|random|top_market_cap).
        #[arg(long)]
        pick: Option<String>,

        /// Score and log without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = stockwatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    storage::migrate(&pool).await?;

    let result = match args.command {
        Command::ImportCatalog => run_locked(&pool, "import_catalog", ops::import_catalog(&pool)).await,
        Command::IngestCsv { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            run_locked(&pool, "ingest_csv", ops::ingest_csv(&pool, &text)).await
        }
        Command::Generate {
            scorer,
            limit,
            pick,
            dry_run,
        } => {
            if let Some(s) = scorer {
                settings.scorer = Some(s);
            }
            let scorer = scorer_from_settings(&settings)?;

            let mut options = ScoringOptions::from_env();
            if let Some(n) = limit {
                anyhow::ensure!(n >= 1, "--limit must be >= 1");
                options.limit = n;
            }
            if let Some(p) = pick {
                options.pick = BatchPick::parse(&p)?;
            }

            if dry_run {
                run_dry(&pool, scorer.as_ref(), &options).await?;
                return Ok(());
            }

            run_locked(
                &pool,
                "generate",
                ops::generate_recommendations(&pool, scorer.as_ref(), &options),
            )
            .await
        }
    };

    match result {
        Ok(Some(outcome)) => {
            tracing::info!(
                success = outcome.success,
                count = outcome.count,
                message = %outcome.message,
                "operation finished"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "operation failed");
            Err(err)
        }
    }
}

/// Runs a mutating operation under its advisory lock. Returns None when the
/// lock is already held by another run.
async fn run_locked(
    pool: &sqlx::PgPool,
    op: &str,
    fut: impl std::future::Future<Output = anyhow::Result<ops::ActionOutcome>>,
) -> anyhow::Result<Option<ops::ActionOutcome>> {
    let Some(lock) = storage::lock::try_acquire_op_lock(pool, op).await? else {
        tracing::warn!(op, "lock not acquired; another run in progress");
        return Ok(None);
    };

    let result = fut.await;
    if let Err(err) = lock.release().await {
        tracing::warn!(op, error = %err, "failed to release advisory lock");
    }
    result.map(Some)
}

async fn run_dry(
    pool: &sqlx::PgPool,
    scorer: &dyn Scorer,
    options: &ScoringOptions,
) -> anyhow::Result<()> {
    let batch = storage::equities::select_batch(pool, options.pick, options.limit).await?;
    if batch.is_empty() {
        tracing::warn!("no stocks available to analyze");
        return Ok(());
    }

    let advices = scorer.score_batch(&batch).await?;
    for advice in &advices {
        let advice = advice.clone().clamped();
        tracing::info!(
            symbol = %advice.symbol,
            recommendation = advice.recommendation_type.as_str(),
            confidence = advice.confidence_score,
            target_price = advice.target_price,
            "dry-run advice"
        );
    }
    tracing::info!(
        scorer = scorer.name(),
        count = advices.len(),
        dry_run = true,
        "scoring run complete (no writes)"
    );
    Ok(())
}

fn init_sentry(settings: &stockwatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
