use clap::{Parser, Subcommand};
use harvester::{run_pool, AuthOutcome, HarvestOptions, WorkerReport};
use recommender_core::{
    create_directory_structure, CoreError, EnvFile, ErrorExt, ErrorReporter, ProjectLayout,
    Settings, Taxonomy,
};
use reddit_client::RedditEndpoints;
use std::path::PathBuf;
use std::process::ExitCode;
use taxonomy_scraper::TaxonomyScraper;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "subreddit_recommender=info,harvester=info,reddit_client=info,taxonomy_scraper=info,recommender_core=info";

#[derive(Parser)]
#[command(name = "subreddit-recommender")]
#[command(about = "Collect subreddit text for the recommender")]
#[command(version)]
struct Cli {
    /// Project directory holding src/ and data/ (searched upwards by default)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Credentials file (defaults to <base-dir>/.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// TOML file with harvest settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the list-of-subreddits wiki into the taxonomy JSON
    Taxonomy,

    /// Create the category/subcategory/subreddit directory tree
    Plan {
        /// Delete existing downloaded data first
        #[arg(long)]
        overwrite: bool,
    },

    /// Create the directory tree and download every subreddit
    Download {
        /// Number of workers, at most one per credential pair
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Scrape the taxonomy, plan and download
    Run {
        #[arg(long)]
        overwrite: bool,

        #[arg(long)]
        workers: Option<usize>,
    },
}

struct Context {
    layout: ProjectLayout,
    env: EnvFile,
    settings: Settings,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, CoreError> {
        let layout = match &cli.base_dir {
            Some(dir) => ProjectLayout::new(dir),
            None => ProjectLayout::discover(&std::env::current_dir()?)?,
        };
        let env_path = cli.env_file.clone().unwrap_or_else(|| layout.env_file());
        let env = EnvFile::load(&env_path)?;
        let settings = Settings::load(cli.config.as_deref())?.apply_env(&env);

        info!("Project directory: {}", layout.base_dir().display());
        Ok(Self {
            layout,
            env,
            settings,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let reporter = ErrorReporter::new();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                reporter.report_error(&e);
                eprintln!("Error: {}", e.user_friendly_message());
                ExitCode::FAILURE
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            ExitCode::SUCCESS
        }
    }
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let ctx = Context::load(&cli)?;

    match cli.command {
        Commands::Taxonomy => scrape_taxonomy(&ctx).await,
        Commands::Plan { overwrite } => plan(&ctx, overwrite).map(|_| ()),
        Commands::Download { workers } => download(&ctx, workers).await,
        Commands::Run { overwrite, workers } => {
            scrape_taxonomy(&ctx).await?;
            plan(&ctx, overwrite)?;
            download(&ctx, workers).await
        }
    }
}

async fn scrape_taxonomy(ctx: &Context) -> Result<(), CoreError> {
    let scraper = TaxonomyScraper::new(&ctx.env.user_agent()?)?;
    let page = scraper.scrape().await?;
    taxonomy_scraper::persist(&ctx.layout, &ctx.settings, &page)?;
    Ok(())
}

fn plan(ctx: &Context, overwrite: bool) -> Result<Taxonomy, CoreError> {
    let taxonomy = Taxonomy::load(&ctx.layout.taxonomy_path(&ctx.settings))?;
    let root = ctx.layout.reddit_data_dir(&ctx.settings);
    create_directory_structure(&taxonomy, &root, overwrite)?;
    Ok(taxonomy)
}

async fn download(ctx: &Context, workers: Option<usize>) -> Result<(), CoreError> {
    let taxonomy = plan(ctx, false)?;
    let mut options = HarvestOptions::from(&ctx.settings);
    if workers.is_some() {
        options.workers = workers;
    }

    let reports = run_pool(
        taxonomy.flatten(),
        &ctx.env.client_pairs()?,
        &ctx.env.user_agent()?,
        &options,
        &ctx.layout.reddit_data_dir(&ctx.settings),
        &RedditEndpoints::default(),
    )
    .await?;

    for report in &reports {
        log_report(report);
    }
    Ok(())
}

fn log_report(report: &WorkerReport) {
    match &report.auth {
        AuthOutcome::Authenticated => info!(
            "Worker {}: {} attempted, {} completed, {} failed, {} skipped, {} submissions written",
            report.worker_id,
            report.attempted,
            report.completed,
            report.failed,
            report.skipped,
            report.submissions_written
        ),
        AuthOutcome::Failed { reason } => warn!(
            "Worker {}: {} subreddits not downloaded ({})",
            report.worker_id, report.failed, reason
        ),
        AuthOutcome::Unknown => warn!(
            "Worker {} stopped early, {} subreddits not accounted for",
            report.worker_id, report.failed
        ),
    }
}
