//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursebuilder_core::{Pipeline, PipelineRun, ProgressReporter, StageId};
use coursebuilder_generation::{AnthropicClient, AnthropicOptions};
use coursebuilder_shared::{
    AppConfig, CourseBuilderError, CURRENT_SCHEMA_VERSION, DeployTarget, PipelineConfig, RunId,
    SiteManifest, init_config, load_config, resolve_api_key,
};
use coursebuilder_site::{SiteLayout, slugify, write_manifest};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseBuilder: generate an intelligent textbook from a topic.
#[derive(Parser)]
#[command(
    name = "coursebuilder",
    version,
    about = "Generate a complete intelligent-textbook site (chapters, quizzes, simulations, learning graph) from a topic.",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub generate: GenerateArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Flags for a generation run. Unset flags fall back to the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct GenerateArgs {
    /// Course topic, e.g. "Introduction to Graph Theory".
    pub topic: Option<String>,

    /// Number of chapters.
    #[arg(long)]
    pub chapters: Option<u32>,

    /// Number of interactive simulations (0 to skip).
    #[arg(long = "sims")]
    pub simulations: Option<u32>,

    /// Number of concepts in the learning graph.
    #[arg(long)]
    pub concepts: Option<u32>,

    /// Output directory (defaults to a slug of the topic).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Deployment target: github-pages or none.
    #[arg(long)]
    pub deploy: Option<String>,

    /// GitHub repository (`owner/name`) for the site.
    #[arg(long = "repo")]
    pub repo_name: Option<String>,

    /// Maximum concurrent generation requests.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
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
        0 => "coursebuilder=warn",
        1 => "coursebuilder=info",
        2 => "coursebuilder=debug",
        _ => "coursebuilder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
        None => cmd_generate(cli.generate).await,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let app_config = load_config()?;

    // Fail on a missing key before any stage runs.
    let api_key = resolve_api_key(&app_config)?;

    let config = build_pipeline_config(&args, &app_config)?;
    config.validate()?;

    let mut options = AnthropicOptions::from_config(&app_config.anthropic, api_key);
    options.model = config.model.clone();
    options.max_tokens = config.max_tokens;
    let client = Arc::new(AnthropicClient::new(options)?);

    info!(
        topic = %config.topic,
        chapters = config.chapters,
        concepts = config.concepts,
        simulations = config.simulations,
        model = %config.model,
        out = %config.output_dir.display(),
        "generating course"
    );

    let reporter = CliProgress::new();
    let pipeline = Pipeline::standard();
    let run = match pipeline.run(config.clone(), client.clone(), &reporter).await {
        Ok(run) => run,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(report_failure(e));
        }
    };

    let layout = SiteLayout::new(config.output_dir.clone());
    let manifest = SiteManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: RunId::new(),
        topic: config.topic.clone(),
        model: config.model.clone(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: Utc::now(),
        chapters: config.chapters,
        concepts: run.context.concepts().map_or(0, <[_]>::len),
        artifacts: run.artifacts.clone(),
        stages: run.timings.clone(),
        usage: client.usage(),
    };
    let manifest_path = write_manifest(&layout, &manifest)?;

    print_summary(&config, &run, &manifest);
    println!("  Manifest:  {}", manifest_path.display());
    println!();
    Ok(())
}

/// Merge CLI flags over the config file's `[defaults]`.
fn build_pipeline_config(args: &GenerateArgs, app: &AppConfig) -> Result<PipelineConfig> {
    let topic = args
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| eyre!("missing TOPIC; run `coursebuilder --help` for usage"))?
        .to_string();

    let deploy: DeployTarget = args
        .deploy
        .as_deref()
        .unwrap_or(&app.defaults.deploy)
        .parse()?;

    let output_dir = match &args.out {
        Some(p) => p.clone(),
        None => PathBuf::from(slugify(&topic)),
    };

    Ok(PipelineConfig {
        chapters: args.chapters.unwrap_or(app.defaults.chapters),
        simulations: args.simulations.unwrap_or(app.defaults.simulations),
        concepts: args.concepts.unwrap_or(app.defaults.concepts),
        output_dir,
        model: args
            .model
            .clone()
            .unwrap_or_else(|| app.anthropic.default_model.clone()),
        deploy,
        repo_name: args.repo_name.clone(),
        concurrency: args.concurrency.unwrap_or(app.defaults.concurrency),
        max_tokens: app.anthropic.max_tokens,
        topic,
    })
}

fn report_failure(err: CourseBuilderError) -> color_eyre::Report {
    match err.stage_name() {
        Some(stage) => {
            eprintln!();
            eprintln!("  Generation failed during stage: {stage}");
            eprintln!("  Files from completed stages were kept.");
            eprintln!();
            eyre!(err)
        }
        None => eyre!(err),
    }
}

fn print_summary(config: &PipelineConfig, run: &PipelineRun, manifest: &SiteManifest) {
    println!();
    println!("  Course generated successfully!");
    println!("  Topic:     {}", config.topic);
    println!("  Chapters:  {}", run.context.outlines().map_or(0, <[_]>::len));
    println!("  Concepts:  {}", manifest.concepts);
    println!("  Files:     {}", run.artifacts.len());
    println!(
        "  Tokens:    {} in / {} out ({} requests)",
        manifest.usage.input_tokens, manifest.usage.output_tokens, manifest.usage.requests
    );
    println!("  Path:      {}", config.output_dir.display());
    println!("  Time:      {:.1}s", run.elapsed.as_secs_f64());
    if config.deploy == DeployTarget::GithubPages {
        println!("  Deploy:    push to GitHub; the Pages workflow publishes the site");
    } else {
        println!("  Preview:   cd {} && mkdocs serve", config.output_dir.display());
    }
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: StageId, index: usize, total: usize) {
        self.spinner.reset_elapsed();
        self.spinner.set_message(format!("[{index}/{total}] {stage}"));
    }

    fn stage_finished(&self, stage: StageId, elapsed: Duration) {
        self.spinner
            .println(format!("  ✓ {stage} ({:.1}s)", elapsed.as_secs_f64()));
    }

    fn stage_failed(&self, stage: StageId, error: &CourseBuilderError) {
        self.spinner.println(format!("  ✗ {stage}: {error}"));
    }

    fn done(&self, _run: &PipelineRun) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("coursebuilder").chain(args.iter().copied()))
            .expect("parse args")
    }

    #[test]
    fn topic_with_flags() {
        let cli = parse(&[
            "Graph Theory",
            "--chapters",
            "6",
            "--sims",
            "0",
            "--deploy",
            "github-pages",
            "--repo",
            "acme/graphs",
            "-vv",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.generate.topic.as_deref(), Some("Graph Theory"));
        assert_eq!(cli.generate.chapters, Some(6));
        assert_eq!(cli.generate.simulations, Some(0));
        assert_eq!(cli.generate.repo_name.as_deref(), Some("acme/graphs"));
    }

    #[test]
    fn config_subcommand() {
        let cli = parse(&["config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn flags_override_config_defaults() {
        let app = AppConfig::default();
        let args = GenerateArgs {
            topic: Some("  Widgets 101 ".into()),
            chapters: Some(3),
            deploy: Some("gh-pages".into()),
            ..Default::default()
        };

        let config = build_pipeline_config(&args, &app).unwrap();
        assert_eq!(config.topic, "Widgets 101");
        assert_eq!(config.chapters, 3);
        assert_eq!(config.simulations, app.defaults.simulations);
        assert_eq!(config.concepts, app.defaults.concepts);
        assert_eq!(config.concurrency, app.defaults.concurrency);
        assert_eq!(config.model, app.anthropic.default_model);
        assert_eq!(config.deploy, DeployTarget::GithubPages);
        assert_eq!(config.output_dir, PathBuf::from("widgets-101"));
    }

    #[test]
    fn missing_topic_is_an_error() {
        let err = build_pipeline_config(&GenerateArgs::default(), &AppConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("missing TOPIC"));
    }

    #[test]
    fn bad_deploy_target_is_an_error() {
        let args = GenerateArgs {
            topic: Some("Widgets".into()),
            deploy: Some("netlify".into()),
            ..Default::default()
        };
        let err = build_pipeline_config(&args, &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("invalid deploy target"));
    }
}
