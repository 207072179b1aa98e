//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use prepnest_core::{
    BatchOptions, BatchProgress, BatchRewriter, BatchSummary, LessonOutcome,
};
use prepnest_generator::{AnthropicGenerator, ContentGenerator, PlaceholderGenerator};
use prepnest_shared::{AppConfig, WorkerConfig, config_file_path, init_config, load_config};
use prepnest_store::{ContentStore, SanityStore};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Prepnest: AI rewriting of OCR-extracted lessons.
#[derive(Parser)]
#[command(
    name = "prepnest",
    version,
    about = "Rewrite pending lessons with curriculum alignment and write them back for review.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process one batch of pending lessons.
    Rewrite {
        /// Lessons per batch (overrides BATCH_SIZE).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pause between lessons in milliseconds (overrides DELAY_MS).
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Read and generate, but write nothing back.
        #[arg(long)]
        dry_run: bool,

        /// Use deterministic placeholder output instead of the generation service.
        /// Only allowed in dry-run mode.
        #[arg(long)]
        placeholder: bool,
    },

    /// List lessons waiting to be rewritten.
    Pending {
        /// Maximum lessons to list.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prepnest=info",
        1 => "prepnest=debug",
        _ => "prepnest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Rewrite {
            batch_size,
            delay_ms,
            dry_run,
            placeholder,
        } => cmd_rewrite(batch_size, delay_ms, dry_run, placeholder).await,
        Command::Pending { limit } => cmd_pending(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// File config, then environment, then flags.
fn resolve_worker_config(
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    dry_run: bool,
) -> Result<WorkerConfig> {
    let app = load_config()?;
    let mut worker = WorkerConfig::from_env(&app)?;
    apply_flags(&mut worker, batch_size, delay_ms, dry_run);
    worker.validate()?;
    Ok(worker)
}

fn apply_flags(
    worker: &mut WorkerConfig,
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    dry_run: bool,
) {
    if let Some(size) = batch_size {
        worker.batch_size = size;
    }
    if let Some(ms) = delay_ms {
        worker.delay_ms = ms;
    }
    if dry_run {
        worker.dry_run = true;
    }
}

/// Placeholder output is only allowed in dry-run mode.
fn check_placeholder(worker: &WorkerConfig, placeholder: bool) -> Result<()> {
    if placeholder && !worker.dry_run {
        return Err(eyre!(
            "--placeholder writes stub content; combine it with --dry-run (or DRY_RUN=true)"
        ));
    }
    Ok(())
}

/// The generation service when a key is configured, placeholder output otherwise.
fn select_generator(
    worker: &WorkerConfig,
    placeholder: bool,
) -> Result<Box<dyn ContentGenerator>> {
    if placeholder {
        info!("using placeholder generator");
        return Ok(Box::new(PlaceholderGenerator::new()));
    }
    if worker.generator_api_key.is_none() {
        warn!(
            key = %worker.api_key_env,
            "no generation API key set, using placeholder output"
        );
        return Ok(Box::new(PlaceholderGenerator::new()));
    }
    Ok(Box::new(AnthropicGenerator::from_config(worker)?))
}

async fn cmd_rewrite(
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    dry_run: bool,
    placeholder: bool,
) -> Result<()> {
    let worker = resolve_worker_config(batch_size, delay_ms, dry_run)?;
    check_placeholder(&worker, placeholder)?;
    let store = SanityStore::new(&worker)?;
    let generator = select_generator(&worker, placeholder)?;

    info!(
        project = %worker.project_id,
        dataset = %worker.dataset,
        batch_size = worker.batch_size,
        delay_ms = worker.delay_ms,
        dry_run = worker.dry_run,
        model = generator.model_id(),
        "starting lesson rewrite"
    );

    let rewriter = BatchRewriter::new(&store, generator.as_ref(), BatchOptions::from(&worker));
    let reporter = CliProgress::new();
    let summary = rewriter.run_batch(&reporter).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!();
    if summary.fetched == 0 {
        println!("  No pending lessons.");
    }
    if summary.dry_run {
        println!("  Dry run: nothing was written.");
    }
    println!("  Successful: {}", summary.successful);
    println!("  Failed:     {}", summary.failed);
    println!(
        "  Duration:   {:.1}s",
        summary.elapsed.as_secs_f64()
    );
    for (id, error) in &summary.failures {
        println!("    {id}: {error}");
    }
    println!();
}

async fn cmd_pending(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(eyre!("--limit must be a positive integer"));
    }

    let app = load_config()?;
    let worker = WorkerConfig::from_env(&app)?;
    let store = SanityStore::new(&worker)?;

    info!(limit, "listing pending lessons");
    let lessons = store.fetch_pending(limit).await?;

    if lessons.is_empty() {
        println!("No pending lessons.");
        return Ok(());
    }

    for lesson in &lessons {
        println!("{}", lesson.preview_title());
        println!("    {}", lesson.preview_subtitle());
    }
    println!();
    println!("{} lesson(s) pending", lessons.len());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");

    let worker = WorkerConfig::from_env(&config)?;
    println!("# environment");
    println!("# {} = {}", worker.token_env, presence(worker.store_token.is_some()));
    println!(
        "# {} = {}",
        worker.api_key_env,
        presence(worker.generator_api_key.is_some())
    );
    println!(
        "# batch size = {}, delay = {} ms, dry run = {}",
        worker.batch_size, worker.delay_ms, worker.dry_run
    );
    Ok(())
}

fn presence(set: bool) -> &'static str {
    if set { "set" } else { "unset" }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message("Fetching pending lessons");
        Self { spinner }
    }
}

impl BatchProgress for CliProgress {
    fn batch_fetched(&self, count: usize) {
        self.spinner.set_message(format!("Found {count} pending lesson(s)"));
    }

    fn lesson_started(&self, index: usize, total: usize, title: &str) {
        self.spinner.set_message(format!("Rewriting [{index}/{total}] {title}"));
    }

    fn lesson_finished(&self, id: &str, outcome: &LessonOutcome) {
        match outcome {
            LessonOutcome::Completed => self.spinner.println(format!("  ✓ {id}")),
            LessonOutcome::Failed { error } => self.spinner.println(format!("  ✗ {id}: {error}")),
        }
    }

    fn done(&self, _summary: &BatchSummary) {
        self.spinner.finish_and_clear();
    }
}
