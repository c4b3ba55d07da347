//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use promptkit_core::ProgressReporter;
use promptkit_core::{ads, advisor, datagen, input, leads, outreach, research, tasks, tracker, videos};
use promptkit_providers::{Anthropic, ChatModel, OpenAiCompatible, Tavily};
use promptkit_reports::{render_outreach, render_tasks};
use promptkit_scrape::PageFetcher;
use promptkit_shared::{AppConfig, FanoutConfig, init_config, load_config, load_config_from};
use tracing::info;

use crate::prompt::{ask_text, ask_until, flag_or_ask};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// promptkit: LLM and web-search pipelines.
#[derive(Parser)]
#[command(
    name = "promptkit",
    version,
    about = "LLM and web-search pipelines for research, outreach, lead collection and data generation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.promptkit/promptkit.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Research a question: plan queries, search the web concurrently,
    /// synthesize a numbered markdown report.
    Research {
        /// The question to research.
        question: Option<String>,

        /// Use the lighter search model.
        #[arg(long)]
        fast: bool,

        /// Run the change tracker on the current directory first.
        #[arg(long)]
        track: bool,

        /// Searches in flight at once (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Research an industry and draft cold-outreach messages.
    Outreach {
        /// Industry or market to research.
        industry: Option<String>,

        /// Also save the drafts as JSON to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Collect Instagram business leads into a deduplicated JSON file.
    Leads {
        /// Business niche, e.g. "coffee shop".
        #[arg(long)]
        niche: Option<String>,

        /// Location, e.g. "Miami, FL".
        #[arg(long)]
        location: Option<String>,

        /// Store only numbered profile URLs.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        minimal: Option<bool>,

        /// Lead file (defaults to the configured one).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Upper bound on search rounds.
        #[arg(long)]
        max_rounds: Option<u32>,
    },

    /// Collect advertiser profile links from the ads library.
    Ads {
        /// Up to five comma-separated keywords.
        keywords: Option<String>,

        /// Two-letter country filter (overrides config).
        #[arg(long)]
        country: Option<String>,
    },

    /// Rank a scraped video list and write a channel analysis.
    Videos {
        /// JSON file with the scraped videos.
        input: Option<PathBuf>,

        /// Channel URL (read from the file when present there).
        #[arg(long)]
        channel: Option<String>,

        /// Number of top videos analyzed.
        #[arg(long)]
        top: Option<usize>,

        /// Analysis file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Diff tracked files against the last snapshot and log a summary.
    Track {
        /// Directory whose files are tracked.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Interactive task list with model-assigned priorities.
    Tasks,

    /// Turn a business idea into a strategy, then answer questions about it.
    Advisor {
        /// Business idea or skills.
        idea: Option<String>,
    },

    /// Generate new rows for a CSV file.
    Datagen {
        /// CSV file to analyze and extend.
        csv: Option<PathBuf>,

        /// Number of rows to generate.
        #[arg(long)]
        rows: Option<usize>,

        /// Copy of the grown file (defaults to the configured one).
        #[arg(long)]
        output: Option<PathBuf>,
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
        0 => "promptkit=info",
        1 => "promptkit=debug",
        _ => "promptkit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.config.as_deref())?;

    match cli.command {
        Command::Research {
            question,
            fast,
            track,
            concurrency,
        } => cmd_research(&ctx, question, fast, track, concurrency).await,
        Command::Outreach { industry, save } => cmd_outreach(&ctx, industry, save).await,
        Command::Leads {
            niche,
            location,
            minimal,
            output,
            max_rounds,
        } => cmd_leads(&ctx, niche, location, minimal, output, max_rounds).await,
        Command::Ads { keywords, country } => cmd_ads(&ctx, keywords, country).await,
        Command::Videos {
            input,
            channel,
            top,
            output,
        } => cmd_videos(&ctx, input, channel, top, output).await,
        Command::Track { root } => cmd_track(&ctx, &root).await,
        Command::Tasks => cmd_tasks(&ctx).await,
        Command::Advisor { idea } => cmd_advisor(&ctx, idea).await,
        Command::Datagen { csv, rows, output } => cmd_datagen(&ctx, csv, rows, output).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&ctx),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Loaded config plus the client constructors built from it.
struct Context {
    config: AppConfig,
}

impl Context {
    fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => load_config_from(p)?,
            None => load_config()?,
        };
        Ok(Self { config })
    }

    fn timeout(&self) -> Duration {
        self.config.fanout.timeout()
    }

    /// Resolve a configured file name against the output directory.
    fn output_path(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            Path::new(&self.config.defaults.output_dir).join(file)
        }
    }

    fn openai(&self) -> Result<OpenAiCompatible> {
        Ok(OpenAiCompatible::from_config("openai", &self.config.providers.openai, self.timeout())?)
    }

    fn perplexity(&self) -> Result<OpenAiCompatible> {
        Ok(OpenAiCompatible::from_config(
            "perplexity",
            &self.config.providers.perplexity,
            self.timeout(),
        )?)
    }

    fn xai(&self) -> Result<OpenAiCompatible> {
        Ok(OpenAiCompatible::from_config("xai", &self.config.providers.xai, self.timeout())?)
    }

    fn anthropic(&self) -> Result<Anthropic> {
        Ok(Anthropic::from_config(&self.config.providers.anthropic, self.timeout())?)
    }

    fn tavily(&self) -> Result<Tavily> {
        Ok(Tavily::from_config(&self.config.providers.tavily, self.timeout())?)
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_research(
    ctx: &Context,
    question: Option<String>,
    fast: bool,
    track: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    if track {
        run_tracker(ctx, Path::new(".")).await?;
    }

    let question = flag_or_ask(question, "What would you like to research?", |s| {
        input::require_text("question", s)
    })?;

    let providers = &ctx.config.providers;
    let planner = ctx.openai()?;
    let search: Arc<dyn ChatModel> = Arc::new(ctx.perplexity()?);
    let mode = if fast {
        research::ResearchMode::Fast
    } else {
        research::ResearchMode::Quality
    };

    let mut fanout = FanoutConfig::from(&ctx.config);
    if let Some(n) = concurrency {
        fanout.concurrency = n.max(1);
    }

    let config = research::ResearchConfig {
        planner_model: providers.openai.default_model.clone(),
        search_model: mode.search_model(&providers.perplexity).to_string(),
        fanout,
        report_dir: ctx.output_path(&ctx.config.defaults.research_dir),
    };

    info!(
        search_model = %config.search_model,
        concurrency = config.fanout.concurrency,
        "starting research"
    );

    let reporter = CliProgress::new();
    let outcome = research::run(&planner, search, &config, &question, &reporter).await?;

    let failed = outcome.findings.iter().filter(|f| !f.is_ok()).count();
    println!();
    println!("{}", outcome.answer);
    println!();
    println!("  Queries:  {} ({failed} failed)", outcome.findings.len());
    println!("  Report:   {}", outcome.report_path.display());
    println!("  Time:     {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_outreach(ctx: &Context, industry: Option<String>, save: Option<PathBuf>) -> Result<()> {
    let industry = flag_or_ask(industry, "Enter the industry or market to research", |s| {
        input::require_text("industry", s)
    })?;

    let providers = &ctx.config.providers;
    let writer = ctx.openai()?;
    let search = ctx.perplexity()?;
    let config = outreach::OutreachConfig {
        writer_model: providers.openai.default_model.clone(),
        search_model: providers.perplexity.default_model.clone(),
    };

    let reporter = CliProgress::new();
    let drafts =
        outreach::run(&writer, &search, &config, &industry, save.as_deref(), &reporter).await?;

    print!("{}", render_outreach(&drafts));
    Ok(())
}

async fn cmd_leads(
    ctx: &Context,
    niche: Option<String>,
    location: Option<String>,
    minimal: Option<bool>,
    output: Option<PathBuf>,
    max_rounds: Option<u32>,
) -> Result<()> {
    let niche = flag_or_ask(niche, "Enter the niche (e.g. coffee shop)", |s| {
        input::require_text("niche", s)
    })?;
    let location = flag_or_ask(location, "Enter the location (e.g. Miami, FL)", |s| {
        input::require_text("location", s)
    })?;
    let minimal = match minimal {
        Some(m) => m,
        None => ask_until("Store only profile URLs? (y/n)", input::parse_yes_no)?,
    };

    let output_file = output.unwrap_or_else(|| ctx.output_path(&ctx.config.leads.output_file));
    let mut search = leads::LeadSearch::new(&niche, &location, minimal, &ctx.config.leads, output_file);
    if let Some(n) = max_rounds {
        search.max_rounds = n.max(1);
    }

    let engine = ctx.tavily()?;
    let reporter = CliProgress::new();
    let summary = leads::run(&engine, &search, &reporter).await?;

    let stop = match &summary.stop {
        leads::StopReason::NoNewLeads => "no new leads in the last round".to_string(),
        leads::StopReason::NoResults => "search returned no results".to_string(),
        leads::StopReason::SearchFailed(e) => format!("search failed: {e}"),
        leads::StopReason::MaxRounds => "round limit reached".to_string(),
    };

    println!();
    println!("  New leads:  {}", summary.new_leads);
    println!("  Total:      {}", summary.total);
    println!("  Rounds:     {} ({stop})", summary.rounds);
    println!("  File:       {}", search.output_file.display());
    println!();

    Ok(())
}

async fn cmd_ads(ctx: &Context, keywords: Option<String>, country: Option<String>) -> Result<()> {
    let keywords = flag_or_ask(
        keywords,
        "Enter up to 5 keywords, comma-separated",
        input::parse_keywords,
    )?;

    let mut config = ctx.config.ads.clone();
    if let Some(c) = country {
        config.country = c;
    }

    let fetcher = PageFetcher::new(ctx.timeout())?;
    let reporter = CliProgress::new();
    let outcome = ads::run(
        &fetcher,
        &config,
        ctx.output_path(&config.results_dir),
        &keywords,
        &reporter,
    )
    .await?;

    println!();
    println!("  Links:   {}", outcome.links.len());
    if !outcome.failed_keywords.is_empty() {
        println!("  Failed:  {}", outcome.failed_keywords.join(", "));
    }
    println!("  File:    {}", outcome.output_file.display());
    println!();

    Ok(())
}

async fn cmd_videos(
    ctx: &Context,
    input_file: Option<PathBuf>,
    channel: Option<String>,
    top: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = match input_file {
        Some(p) => p,
        None => PathBuf::from(ask_until("Path to the scraped videos JSON", |s| {
            input::require_text("path", s)
        })?),
    };
    let (file_channel, list) = videos::load_videos(&path)?;
    let channel = flag_or_ask(channel.or(file_channel), "Channel URL", |s| {
        input::require_text("channel URL", s)
    })?;

    let config = videos::VideosConfig {
        model: ctx.config.providers.xai.default_model.clone(),
        top_n: top.unwrap_or(videos::DEFAULT_TOP_N).max(1),
        output_file: output.unwrap_or_else(|| ctx.output_path("youtube_analysis.md")),
    };

    let chat = ctx.xai()?;
    let reporter = CliProgress::new();
    let analysis = videos::run(&chat, &config, &channel, list, &reporter).await?;

    println!();
    println!("{analysis}");
    Ok(())
}

async fn cmd_track(ctx: &Context, root: &Path) -> Result<()> {
    run_tracker(ctx, root).await
}

async fn run_tracker(ctx: &Context, root: &Path) -> Result<()> {
    let chat = ctx.openai()?;
    let t = tracker::Tracker::new(
        root,
        &ctx.config.tracker,
        ctx.config.providers.openai.default_model.clone(),
    );

    match tracker::run(&chat, &t).await? {
        tracker::ChangeReport::InitialState => println!("Initial state saved"),
        tracker::ChangeReport::NoChanges => println!("No changes detected"),
        tracker::ChangeReport::Summary(summary) => {
            println!("\nChanges logged to {}:\n\n{summary}\n", t.progress_file.display());
        }
    }
    Ok(())
}

async fn cmd_tasks(ctx: &Context) -> Result<()> {
    let chat = ctx.anthropic()?;
    let model = ctx.config.providers.anthropic.default_model.clone();
    let mut board = tasks::TaskBoard::new();

    loop {
        let name = ask_text("Enter task name (or 'quit' to exit)")?;
        if input::is_exit(&name, "quit") {
            break;
        }
        if name.is_empty() {
            continue;
        }

        let reporter = CliProgress::new();
        reporter.phase("Prioritizing task");
        let added = board.add(&chat, &model, &name).await;
        reporter.done("");
        added?;

        println!("\n{}", render_tasks(board.tasks()));
    }
    Ok(())
}

async fn cmd_advisor(ctx: &Context, idea: Option<String>) -> Result<()> {
    let idea = flag_or_ask(idea, "Tell me about your business idea or skills", |s| {
        input::require_text("idea", s)
    })?;

    let chat = ctx.openai()?;
    let model = ctx.config.providers.openai.default_model.clone();
    let reporter = CliProgress::new();
    let consultation = advisor::consult(&chat, &model, &idea, &reporter).await?;

    let rule = "=".repeat(50);
    println!("\n{rule}\nFINAL BUSINESS STRATEGY\n{rule}");
    println!("{}", consultation.strategy);
    println!("{rule}\n");

    loop {
        let question = ask_text("Do you have any questions about the strategy? (type 'exit' to end)")?;
        if input::is_exit(&question, "exit") {
            println!("\nGood luck with your business!");
            break;
        }
        if question.is_empty() {
            continue;
        }

        let answer =
            advisor::answer_follow_up(&chat, &model, &consultation.strategy, &question).await?;
        println!("\nAnswer:\n{answer}\n");
    }
    Ok(())
}

async fn cmd_datagen(
    ctx: &Context,
    csv: Option<PathBuf>,
    rows: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source = match csv {
        Some(p) => p,
        None => PathBuf::from(ask_until("Path to your CSV file", |s| {
            input::require_text("path", s)
        })?),
    };
    let rows = flag_or_ask(
        rows.map(|n| n.to_string()),
        "How many new rows would you like to generate?",
        input::parse_row_count,
    )?;

    let job = datagen::DatagenRun {
        model: ctx.config.datagen.model.clone(),
        source,
        output_file: output.unwrap_or_else(|| ctx.output_path(&ctx.config.datagen.output_file)),
        rows,
    };

    let chat = ctx.anthropic()?;
    let reporter = CliProgress::new();
    let outcome = datagen::run(&chat, &job, &reporter).await?;

    println!("\nAnalysis:\n{}\n", outcome.analysis);
    println!("Analysis Summary:\n{}\n", outcome.summary);

    let generation = &outcome.generation;
    if generation.shortfall() > 0 {
        println!(
            "Warning: could only generate {} out of {} requested rows ({} attempts)",
            generation.rows.len(),
            generation.requested,
            generation.attempts
        );
    } else {
        println!("Generated all {} requested rows", generation.requested);
    }

    if !generation.rows.is_empty() {
        println!("\nPreview of generated data (first 3 rows):");
        for row in generation.rows.iter().take(3) {
            println!("{row:?}");
        }
        println!("\nSaved to {}", job.output_file.display());
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(ctx: &Context) -> Result<()> {
    let toml_str = toml::to_string_pretty(&ctx.config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    phase: Mutex<String>,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self {
            spinner,
            phase: Mutex::new(String::new()),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = name.to_string();
        }
        self.spinner.set_message(name.to_string());
    }

    fn step(&self, current: usize, total: usize) {
        let phase = self.phase.lock().map(|p| p.clone()).unwrap_or_default();
        self.spinner.set_message(format!("{phase} [{current}/{total}]"));
    }

    fn done(&self, message: &str) {
        self.spinner.finish_and_clear();
        if !message.is_empty() {
            println!("{message}");
        }
    }
}
