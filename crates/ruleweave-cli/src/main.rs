//! # ruleweave
//!
//! Loads a rules directory and prints the composed guidance bundle for one
//! target file.
//!
//! Exit codes: `0` success (the bundle may be empty), `1` load or settings
//! failure, `2` composition failure. Errors are printed to stderr as
//! `<ErrorClass>: <message>`.

#![deny(unsafe_code)]

mod config;
mod logging;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ruleweave_rules::{CancellationToken, RuleError, RuleSet, compose};
use ruleweave_settings::{
    RejectedOverride, RuleweaveSettings, SettingsError, load_settings_deferred, settings_path,
};

/// Exit status for load and settings failures.
const EXIT_LOAD_FAILURE: u8 = 1;

/// Exit status for composition failures.
const EXIT_COMPOSE_FAILURE: u8 = 2;

/// Compose glob-scoped rule guidance for a file.
#[derive(Parser, Debug)]
#[command(name = "ruleweave", version, about = "Compose glob-scoped rule guidance for a file")]
struct Cli {
    /// Settings file (defaults to `~/.ruleweave/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composed bundle for a target path.
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// Target file path.
    path: PathBuf,

    /// Rules directory (overrides settings).
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Byte budget for the bundle (overrides settings).
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Maximum reference nesting depth (overrides settings).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Entry texts separated by blank lines.
    Text,
    /// The bundle as pretty-printed JSON.
    Json,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_LOAD_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", error_class(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (settings, rejected) = load_settings(cli.settings)?;
    logging::init_subscriber(settings.logging.level.as_filter_str());
    for override_ in &rejected {
        override_.log();
    }

    match cli.command {
        Command::Compose(args) => run_compose(&settings, &args),
    }
}

/// Settings plus the env overrides that were ignored, to be logged once the
/// subscriber is installed.
fn load_settings(explicit: Option<PathBuf>) -> Result<(RuleweaveSettings, Vec<RejectedOverride>)> {
    let path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(SettingsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("settings file not found: {}", path.display()),
            ))
            .into());
        }
        Some(path) => path,
        None => settings_path(),
    };
    Ok(load_settings_deferred(&path)?)
}

fn run_compose(settings: &RuleweaveSettings, args: &ComposeArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let discovery = config::discovery_config(settings, args.rules_dir.as_deref());
    let options = config::compose_options(settings, args.max_bytes, args.max_depth);
    let target = config::target_path(&args.path, &cwd);

    let rule_set = RuleSet::load_dir(&discovery, &CancellationToken::new())?;
    let bundle = compose(&rule_set, &target, &options)?;
    tracing::info!(
        path = %target,
        entries = bundle.len(),
        truncated = bundle.truncated,
        "composed bundle"
    );

    let mut stdout = std::io::stdout().lock();
    match args.format {
        OutputFormat::Text => {
            if !bundle.is_empty() {
                writeln!(stdout, "{}", bundle.render()).context("failed to write bundle")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &bundle).context("failed to write bundle")?;
            writeln!(stdout).context("failed to write bundle")?;
        }
    }
    Ok(())
}

fn error_class(err: &anyhow::Error) -> &'static str {
    if let Some(rule_err) = err.downcast_ref::<RuleError>() {
        rule_err.kind()
    } else if err.downcast_ref::<SettingsError>().is_some() {
        "SettingsError"
    } else {
        "Error"
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RuleError>() {
        Some(rule_err) if !rule_err.is_load_error() => EXIT_COMPOSE_FAILURE,
        _ => EXIT_LOAD_FAILURE,
    }
}
