//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use medusa_package_tools::converter::{self, ConverterBackend};
use medusa_package_tools::core::config::Config;
use medusa_package_tools::core::errors::PkgError;
use medusa_package_tools::logger;
use medusa_package_tools::package::profile::Profile;
use medusa_package_tools::rectifier::{
    ConvergenceOutcome, ConvergenceReport, RectifyReport, Rectifier, converge,
};
use medusa_package_tools::rules::IssueCategory;
use medusa_package_tools::scanner::patterns::JunkPatternRegistry;
use medusa_package_tools::scanner::shadow::shadow_clone;
use medusa_package_tools::validator::{EVERYTHING_OK, Report, Validator};

/// Medusa Package Tools: validate and rectify preservation packages.
#[derive(Debug, Parser)]
#[command(
    name = "mpt",
    author,
    version,
    about = "Medusa Package Tools - preservation package validator and rectifier",
    long_about = None,
    arg_required_else_help = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Package root to analyze (shorthand for `mpt analyze <PATH>`).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Package profile (nested, flat or current).
    #[arg(long, global = true, value_name = "PROFILE")]
    profile: Option<Profile>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Report every way a package deviates from its profile.
    Analyze(AnalyzeArgs),
    /// Apply the profile's transformations to a package.
    Rectify(RectifyArgs),
    /// Alternate analyze and rectify until the package is conformant.
    Converge(ConvergeArgs),
    /// Copy a package's structure with every file emptied.
    Clone(CloneArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// Package root.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Validate metadata records against this schema version.
    #[arg(long, value_name = "VERSION")]
    schema_version: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Package root.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Raster conversion backend (imagemagick, kakadu or none).
    #[arg(long, value_name = "BACKEND")]
    converter: Option<ConverterBackend>,
}

#[derive(Debug, Clone, Args)]
struct ConvergeArgs {
    /// Package root.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Upper bound on rectify runs.
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,
    /// Raster conversion backend (imagemagick, kakadu or none).
    #[arg(long, value_name = "BACKEND")]
    converter: Option<ConverterBackend>,
}

#[derive(Debug, Clone, Args)]
struct CloneArgs {
    /// Package to copy.
    #[arg(value_name = "SOURCE")]
    source: PathBuf,
    /// Directory that receives the copy.
    #[arg(value_name = "DEST")]
    dest: PathBuf,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// The package is not conformant. Already reported on stdout.
    #[error("{0} issue(s) found")]
    Issues(usize),
    /// Invalid invocation.
    #[error("{0}")]
    Usage(String),
    /// Environment failure: missing root, unusable converter, bad config.
    #[error("{0}")]
    Runtime(String),
    /// Environment failure already explained on stdout.
    #[error("{0}")]
    Reported(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Issues(_) => 1,
            Self::Usage(_) | Self::Runtime(_) | Self::Reported(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }

    /// True when the failure was already reported on stdout.
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Issues(_) | Self::Reported(_))
    }
}

impl From<PkgError> for CliError {
    fn from(err: PkgError) -> Self {
        if err.is_environmental() || matches!(err, PkgError::Io { .. }) {
            Self::Runtime(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || !io::stdout().is_terminal() {
        control::set_override(false);
    }

    match (&cli.command, &cli.path) {
        (None, Some(path)) => run_analyze(cli, path, None),
        (None, None) => Err(CliError::Usage(
            "missing package path; see `mpt --help`".to_string(),
        )),
        (Some(Command::Analyze(args)), _) => {
            run_analyze(cli, &args.path, args.schema_version.as_deref())
        }
        (Some(Command::Rectify(args)), _) => run_rectify(cli, args),
        (Some(Command::Converge(args)), _) => run_converge(cli, args),
        (Some(Command::Clone(args)), _) => run_clone(cli, args),
        (Some(Command::Config(args)), _) => run_config(cli, args),
        (Some(Command::Completions(args)), _) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

fn profile_for(cli: &Cli, config: &Config) -> Profile {
    cli.profile.unwrap_or(config.package.profile)
}

/// Print the operator-facing missing-root line before failing.
fn report_missing_root(err: PkgError) -> CliError {
    if let PkgError::RootMissing { path } = &err {
        println!("{} does not exist.", path.display());
        return CliError::Reported(err.to_string());
    }
    err.into()
}

fn build_rectifier(config: &Config, backend: Option<ConverterBackend>) -> Rectifier {
    let mut converter_config = config.converter.clone();
    if let Some(backend) = backend {
        converter_config.backend = backend;
    }
    let junk = JunkPatternRegistry::default().with_custom(&config.package.extra_junk_names);
    let rectifier = Rectifier::new(converter::from_config(&converter_config), junk);
    match logger::open_journal(&config.paths) {
        Some(journal) => rectifier.with_journal(journal),
        None => rectifier,
    }
}

fn run_analyze(cli: &Cli, path: &Path, schema_version: Option<&str>) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(version) = schema_version {
        config.schema.enabled = true;
        config.schema.version = version.to_string();
    }
    let profile = profile_for(cli, &config);
    let validator = Validator::from_config(&config, profile)?;
    let report = validator.validate(path).map_err(report_missing_root)?;

    match output_mode(cli) {
        OutputMode::Human => print_report_human(&report)?,
        OutputMode::Json => write_json_line(&json!({
            "command": "analyze",
            "report": report,
        }))?,
    }
    if report.conformant() {
        Ok(())
    } else {
        Err(CliError::Issues(report.issues.len()))
    }
}

fn print_report_human(report: &Report) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    if report.conformant() {
        writeln!(stdout, "{}", EVERYTHING_OK.green())?;
        return Ok(());
    }
    for issue in &report.issues {
        let line = issue.to_string();
        let painted = match issue.category {
            IssueCategory::MissingFolder
            | IssueCategory::MissingMasterSet
            | IssueCategory::MissingMetadata => line.red(),
            IssueCategory::ExtraneousFolder => line.yellow(),
            IssueCategory::SchemaInvalid => line.magenta(),
            IssueCategory::InvalidBibId
            | IssueCategory::InvalidFilenameFormat
            | IssueCategory::InvalidExtension
            | IssueCategory::CrossSetMismatch => line.normal(),
        };
        writeln!(stdout, "{painted}")?;
    }
    Ok(())
}

fn run_rectify(cli: &Cli, args: &RectifyArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let profile = profile_for(cli, &config);
    let mut rectifier = build_rectifier(&config, args.converter);
    let report = rectifier
        .rectify(&args.path, profile)
        .map_err(report_missing_root)?;

    match output_mode(cli) {
        OutputMode::Human => print_rectify_human(&report)?,
        OutputMode::Json => write_json_line(&json!({
            "command": "rectify",
            "report": report,
        }))?,
    }
    rectify_exit(&report)
}

fn print_rectify_human(report: &RectifyReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for transformation in &report.applied {
        writeln!(stdout, "{transformation}")?;
    }
    for failure in &report.failures {
        writeln!(stdout, "{}", failure.to_string().yellow())?;
    }
    if let Some(abort) = &report.aborted {
        writeln!(stdout, "{}", abort.to_string().red())?;
    }
    Ok(())
}

fn rectify_exit(report: &RectifyReport) -> Result<(), CliError> {
    if let Some(abort) = &report.aborted {
        return Err(CliError::Partial(format!(
            "rectification aborted during {} [{}]",
            abort.step, abort.code
        )));
    }
    if !report.failures.is_empty() {
        return Err(CliError::Partial(format!(
            "{} transformation(s) failed",
            report.failures.len()
        )));
    }
    Ok(())
}

fn run_converge(cli: &Cli, args: &ConvergeArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let profile = profile_for(cli, &config);
    let max_iterations = args.max_iterations.unwrap_or(config.converge.max_iterations);
    if max_iterations == 0 {
        return Err(CliError::Usage(
            "--max-iterations must be at least 1".to_string(),
        ));
    }
    let validator = Validator::from_config(&config, profile)?;
    let mut rectifier = build_rectifier(&config, args.converter);
    let result = converge(&validator, &mut rectifier, &args.path, max_iterations)
        .map_err(report_missing_root)?;

    match output_mode(cli) {
        OutputMode::Human => print_converge_human(&result)?,
        OutputMode::Json => write_json_line(&json!({
            "command": "converge",
            "result": result,
        }))?,
    }
    match result.outcome {
        ConvergenceOutcome::Converged => Ok(()),
        ConvergenceOutcome::Aborted => Err(CliError::Partial(
            "rectification aborted before convergence".to_string(),
        )),
        ConvergenceOutcome::Stalled | ConvergenceOutcome::Exhausted => {
            Err(CliError::Issues(result.final_report.issues.len()))
        }
    }
}

fn print_converge_human(result: &ConvergenceReport) -> io::Result<()> {
    for (iteration, run) in result.rectifications.iter().enumerate() {
        println!("{}", format!("Pass {}", iteration + 1).bold());
        print_rectify_human(run)?;
    }
    print_report_human(&result.final_report)?;
    let summary = format!(
        "Result: {} after {} pass(es)",
        result.outcome, result.iterations
    );
    match result.outcome {
        ConvergenceOutcome::Converged => println!("{}", summary.green()),
        _ => println!("{}", summary.yellow()),
    }
    Ok(())
}

fn run_clone(cli: &Cli, args: &CloneArgs) -> Result<(), CliError> {
    if args.dest.exists() && !args.dest.is_dir() {
        let line = format!("{} exists and is not a directory.", args.dest.display());
        println!("{line}");
        return Err(CliError::Reported(line));
    }
    let report = shadow_clone(&args.source, &args.dest).map_err(report_missing_root)?;

    match output_mode(cli) {
        OutputMode::Human => println!(
            "Cloned {} to {} ({} folders, {} files)",
            report.source.display(),
            report.destination.display(),
            report.directories,
            report.files
        ),
        OutputMode::Json => write_json_line(&json!({
            "command": "clone",
            "report": report,
        }))?,
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    write_json_line(&json!({
                        "command": "config show",
                        "config": value,
                    }))?;
                }
            }
            Ok(())
        }
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("MPT_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// Plain lines are the operator contract, so anything but an explicit
/// request for JSON stays human.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
