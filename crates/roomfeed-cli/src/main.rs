mod collect;
mod publish;
mod runs;
mod stats_artifact;

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use roomfeed_core::{AppConfig, DailyStatsStore};
use roomfeed_db::{store_label, PgStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "roomfeed")]
#[command(about = "Collect Rakuten products and publish them to ROOM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Acquire products and append new rows.
    Collect,
    /// Publish unposted rows under the daily quota.
    Post,
    /// Collect, then post.
    Full,
}

impl Mode {
    fn collects(self) -> bool {
        matches!(self, Mode::Collect | Mode::Full)
    }

    fn posts(self) -> bool {
        matches!(self, Mode::Post | Mode::Full)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the pipeline once.
    Run {
        #[arg(long, value_enum, default_value_t = Mode::Collect)]
        mode: Mode,
        /// Products to collect per keyword.
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..=30))]
        products: u16,
        /// Upper bound on posts this run; never raises the daily limit.
        #[arg(long, default_value_t = 3)]
        max_posts: u32,
        /// Report what would happen without writing rows or opening a browser.
        #[arg(long)]
        dry_run: bool,
    },
    /// Database operations.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Show today's posting counters, recent days and recent runs.
    Stats {
        /// How many days and runs to list.
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = roomfeed_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run {
            mode,
            products,
            max_posts,
            dry_run,
        } => run_pipeline(&config, mode, usize::from(products), max_posts, dry_run).await,
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Stats { days } => run_stats(&config, days).await,
    }
}

async fn run_pipeline(
    config: &AppConfig,
    mode: Mode,
    products: usize,
    max_posts: u32,
    dry_run: bool,
) -> anyhow::Result<()> {
    // Configuration problems surface before any network activity.
    if mode.posts() && !dry_run {
        config.posting_credentials()?;
    }
    let categories = if mode.collects() {
        Some(roomfeed_core::load_categories(&config.categories_path)?)
    } else {
        None
    };

    let pool = connect(config).await?;
    roomfeed_db::run_migrations(&pool).await?;
    let store = PgStore::new(pool.clone(), store_label(&config.database_url));

    tracing::info!(?mode, products, max_posts, dry_run, "pipeline starting");

    if let Some(categories) = &categories {
        collect::run_collect(&pool, &store, config, categories, products, dry_run).await?;
    }
    if mode.posts() {
        publish::run_post(&pool, &store, config, max_posts, dry_run).await?;
    }

    pool.close().await;
    Ok(())
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            roomfeed_db::ping(&pool).await?;
            println!("database ok: {}", store_label(&config.database_url));
        }
        DbCommands::Migrate => {
            let applied = roomfeed_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
    }
    pool.close().await;
    Ok(())
}

async fn run_stats(config: &AppConfig, days: u32) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let store = PgStore::new(pool.clone(), store_label(&config.database_url));

    let day = roomfeed_core::calendar_day(Utc::now(), config.stats_utc_offset_hours);
    let today = store.load_day(day).await?;
    println!(
        "{day}: {} succeeded, {} failed, {} of {} posts remaining",
        today.succeeded,
        today.failed,
        today.remaining(config.daily_post_limit),
        config.daily_post_limit
    );

    for stats in store.recent_days(days).await? {
        let last_post = stats
            .last_post_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
        println!(
            "  {}  attempted={} succeeded={} failed={} last_post={last_post}",
            stats.date, stats.attempted, stats.succeeded, stats.failed
        );
    }

    let runs = roomfeed_db::list_pipeline_runs(&pool, i64::from(days)).await?;
    if !runs.is_empty() {
        println!("recent runs:");
    }
    for run in runs {
        let records = run.records_processed;
        let error = run.error_message.as_deref().unwrap_or("");
        println!(
            "  {}  {:<7} {:<9} records={records} {error}",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.run_type,
            run.status
        );
    }

    pool.close().await;
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = roomfeed_db::PoolConfig::from_app_config(config);
    roomfeed_db::connect_pool(&config.database_url, pool_config)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "store {} is unavailable: {e}",
                store_label(&config.database_url)
            )
        })
}

#[cfg(test)]
mod test_support;
