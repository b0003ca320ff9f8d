//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadsift_core::{
    CleanReport, CleanRequest, ProgressReporter, Signal, SortReport, SortRequest,
};
use leadsift_reference::{
    FetchOptions, ReferenceSource, load_categories, load_reference_tables,
};
use leadsift_shared::{AppConfig, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadSift: clean, filter and sort business-listing exports.
#[derive(Parser)]
#[command(
    name = "leadsift",
    version,
    about = "Clean, filter and sort business-listing CSV exports against a blacklist and category map.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.leadsift/leadsift.toml.
    #[arg(long, global = true, env = "LEADSIFT_CONFIG")]
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
    /// Project, deduplicate and blacklist-filter a listing export.
    Clean {
        /// Export file to clean.
        input: PathBuf,

        /// Cleaning profile: legacy, contacts, or one defined in the config file.
        #[arg(short, long, default_value = "legacy")]
        profile: String,

        /// Keep only rows whose category belongs to this group.
        #[arg(short, long)]
        group: Option<String>,

        /// Output directory (defaults to [output].dir, then the Desktop).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Blacklist table URL or path (overrides [reference].blacklist).
        #[arg(long)]
        blacklist: Option<String>,

        /// Category map URL or path (overrides [reference].categories).
        #[arg(long)]
        categories: Option<String>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Split an export into top, trusted and cold-call files.
    Sort {
        /// Export file to sort.
        input: PathBuf,

        /// Output directory (defaults to [output].dir, then the Desktop).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the category groups of the category map.
    Groups {
        /// Category map URL or path (overrides [reference].categories).
        #[arg(long)]
        categories: Option<String>,
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
        0 => "leadsift=info",
        1 => "leadsift=debug",
        _ => "leadsift=trace",
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
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config;
    match cli.command {
        Command::Clean {
            input,
            profile,
            group,
            out,
            blacklist,
            categories,
            json,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let args = CleanArgs {
                input,
                profile,
                group,
                out,
                blacklist,
                categories,
                json,
            };
            cmd_clean(&config, args).await
        }
        Command::Sort { input, out, json } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_sort(&config, input, out, json)
        }
        Command::Groups { categories } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_groups(&config, categories.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct CleanArgs {
    input: PathBuf,
    profile: String,
    group: Option<String>,
    out: Option<PathBuf>,
    blacklist: Option<String>,
    categories: Option<String>,
    json: bool,
}

async fn cmd_clean(config: &AppConfig, args: CleanArgs) -> Result<ExitCode> {
    let profile = config.profile(&args.profile)?;
    let output_dir = match args.out {
        Some(dir) => dir,
        None => config.output_dir()?,
    };

    let blacklist_src = args
        .blacklist
        .or_else(|| config.reference.blacklist.clone())
        .ok_or_else(|| {
            eyre!("no blacklist source: pass --blacklist or set [reference].blacklist")
        })?;
    let blacklist_src: ReferenceSource = blacklist_src.parse()?;

    let categories_src = match &args.group {
        Some(_) => {
            let src = args
                .categories
                .or_else(|| config.reference.categories.clone())
                .ok_or_else(|| {
                    eyre!("--group needs a category map: pass --categories or set [reference].categories")
                })?;
            Some(src.parse::<ReferenceSource>()?)
        }
        None => None,
    };

    info!(
        input = %args.input.display(),
        profile = %args.profile,
        group = args.group.as_deref().unwrap_or("-"),
        "cleaning export"
    );

    let reporter = CliProgress::new();
    reporter.phase("Loading reference tables");
    let fetch = FetchOptions {
        timeout_secs: config.reference.timeout_secs,
    };
    let references =
        match load_reference_tables(&blacklist_src, categories_src.as_ref(), &fetch).await {
            Ok(tables) => tables,
            Err(e) => {
                reporter.clear();
                return Ok(report_failure(&e, args.json));
            }
        };

    let request = CleanRequest {
        input: args.input,
        profile_name: args.profile,
        profile,
        group: args.group,
        output_dir,
        clean_suffix: config.output.clean_suffix.clone(),
    };

    let result = leadsift_core::clean(&request, &references, &reporter);
    reporter.clear();

    match result {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_clean_summary(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e, args.json)),
    }
}

fn cmd_sort(
    config: &AppConfig,
    input: PathBuf,
    out: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let output_dir = match out {
        Some(dir) => dir,
        None => config.output_dir()?,
    };

    info!(input = %input.display(), "sorting export");

    let request = SortRequest {
        input,
        output_dir,
        settings: config.sort.clone(),
    };

    let reporter = CliProgress::new();
    let result = leadsift_core::sort(&request, &reporter);
    reporter.clear();

    match result {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_sort_summary(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e, json)),
    }
}

async fn cmd_groups(config: &AppConfig, categories: Option<&str>) -> Result<ExitCode> {
    let src = categories
        .map(str::to_string)
        .or_else(|| config.reference.categories.clone())
        .ok_or_else(|| eyre!("no category map: pass --categories or set [reference].categories"))?;
    let source: ReferenceSource = src.parse()?;

    let fetch = FetchOptions {
        timeout_secs: config.reference.timeout_secs,
    };
    let map = load_categories(&source, &fetch)
        .await
        .wrap_err_with(|| format!("failed to load category map from {source}"))?;

    for (group, labels) in map.groups() {
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        println!("{group} ({}): {}", labels.len(), labels.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(path: Option<&Path>) -> Result<ExitCode> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Print a failed run as a categorized message and map it to an exit code.
fn report_failure(err: &leadsift_shared::LeadSiftError, json: bool) -> ExitCode {
    let signal = Signal::from(err);
    if json {
        match serde_json::to_string_pretty(&signal) {
            Ok(s) => println!("{s}"),
            Err(_) => eprintln!("{}", signal.message()),
        }
    } else {
        eprintln!("{}", signal.message());
    }
    u8::try_from(signal.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn print_clean_summary(report: &CleanReport) {
    let stats = &report.stats;
    println!();
    println!("  Export cleaned.");
    println!("  Run:        {}", report.run_id);
    println!("  Profile:    {}", report.profile);
    println!("  Separator:  {}", report.separator);
    println!("  Loaded:     {} rows", stats.rows_loaded);
    println!("  Duplicates: {}", stats.duplicates_removed);
    println!(
        "  Excluded:   {} rows, {} cells redacted",
        stats.exclusion.removed(),
        stats.exclusion.cells_redacted
    );
    if stats.exclusion.comparison_faults > 0 {
        println!("  Faults:     {}", stats.exclusion.comparison_faults);
    }
    if let Some(group) = &report.group {
        println!("  Group:      {group} ({} rows dropped)", stats.filtered_out);
    }
    println!("  Written:    {} rows", stats.rows_written);
    println!("  Path:       {}", report.output.display());
    println!("  Time:       {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();
}

fn print_sort_summary(report: &SortReport) {
    println!();
    println!("  Export sorted.");
    println!("  Run:       {}", report.run_id);
    println!("  Separator: {}", report.separator);
    println!("  Loaded:    {} rows", report.rows_loaded);
    if report.skipped_lines > 0 {
        println!("  Skipped:   {} malformed lines", report.skipped_lines);
    }
    for output in &report.outputs {
        println!("  {:>5} rows → {}", output.rows, output.path.display());
    }
    println!("  Time:      {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outputs: &[PathBuf]) {
        self.spinner.finish_and_clear();
    }
}
