//! FerroMirror - one-way directory mirroring tool
//!
//! Keeps a replica directory identical to a source directory, re-checking on a
//! fixed interval and logging every change it applies.

mod control;
mod display;
mod json_output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use ferromirror_config::{ConfigBuilder, ConfigFormat, ConfigLoader, SyncConfig, ENV_PREFIX};
use ferromirror_sync::{detect_changes, LogSink, Scheduler, SnapshotBuilder, SyncEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// FerroMirror - one-way directory mirroring tool
#[derive(Parser)]
#[command(
    name = "ferromirror",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way directory mirroring tool",
    long_about = "FerroMirror keeps a replica directory identical to a source directory.\n\
                  Every interval it fingerprints both trees, copies new and changed files,\n\
                  removes files the source no longer has, and logs each change."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Settings that may override the configuration file
#[derive(Args, Debug, Default)]
struct SyncArgs {
    /// Source directory
    #[arg(short, long)]
    source: Option<PathBuf>,
    /// Replica directory
    #[arg(short, long)]
    replica: Option<PathBuf>,
    /// Change log file
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    /// Seconds between sync passes
    #[arg(short, long)]
    interval: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror the source into the replica until stopped
    Run {
        #[command(flatten)]
        sync: SyncArgs,
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
        /// Print the pass summary as JSON (with --once)
        #[arg(long, requires = "once")]
        json: bool,
        /// Do not read control commands from stdin
        #[arg(long)]
        no_console: bool,
    },
    /// Show what the next pass would change
    Plan {
        #[command(flatten)]
        sync: SyncArgs,
        /// Print the changes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: FormatArg,
        /// Write the configuration to this file instead of printing it
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum FormatArg {
    Toml,
    Yaml,
    Json,
}

impl From<FormatArg> for ConfigFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Toml => ConfigFormat::Toml,
            FormatArg::Yaml => ConfigFormat::Yaml,
            FormatArg::Json => ConfigFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.quiet, cli.verbose, cli.json_logs) {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = execute(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    info!("FerroMirror v{} starting", env!("CARGO_PKG_VERSION"));
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            sync,
            once,
            json,
            no_console,
        } => {
            let config = load_config(config_file, &sync)?;
            if once {
                run_once(config, json, cli.quiet).await
            } else {
                run_command(config, no_console, cli.quiet).await
            }
        }
        Commands::Plan { sync, json } => {
            let config = load_config(config_file, &sync)?;
            plan_command(&config, json).await
        }
        Commands::Config {
            default,
            format,
            write,
        } => {
            let config = if default {
                SyncConfig::default()
            } else {
                load_config(config_file, &SyncArgs::default())?
            };
            config_command(&config, format.into(), write.as_deref())
        }
    }
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

/// Layer defaults, the config file, `FERROMIRROR_*` variables and flags
fn load_config(config_file: Option<&Path>, args: &SyncArgs) -> Result<SyncConfig> {
    let mut builder = ConfigBuilder::new().add_env_prefix(ENV_PREFIX);

    let file = config_file
        .map(Path::to_path_buf)
        .or_else(|| ConfigLoader::find_default_file(Path::new(".")));
    if let Some(file) = file {
        debug!("Using configuration file {}", file.display());
        builder = builder.add_source_file(file);
    }

    if let Some(source) = &args.source {
        builder = builder.source(source);
    }
    if let Some(replica) = &args.replica {
        builder = builder.replica(replica);
    }
    if let Some(log_file) = &args.log_file {
        builder = builder.log_file(log_file);
    }
    if let Some(interval) = &args.interval {
        builder = builder.interval(interval.as_str());
    }

    builder.build().context("Invalid configuration")
}

async fn run_once(config: SyncConfig, json: bool, quiet: bool) -> Result<()> {
    let config = Arc::new(config);
    // change lines on stdout would corrupt the JSON document
    let sink = LogSink::open(config.log_file(), !json)
        .await
        .context("Failed to start sync engine")?;
    let mut engine = SyncEngine::with_sink(Arc::clone(&config), sink);

    let report = engine.run_cycle().await.context("Sync pass failed")?;

    if json {
        json_output::print_json(&json_output::CycleJson::new(&config, &report))?;
    } else if !quiet {
        display::print_cycle_report(&report);
    }
    Ok(())
}

async fn run_command(config: SyncConfig, no_console: bool, quiet: bool) -> Result<()> {
    let config = Arc::new(config);
    let engine = SyncEngine::new(Arc::clone(&config))
        .await
        .context("Failed to start sync engine")?;

    if !quiet {
        display::print_banner(&config);
    }

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
        }
        ctrl_c.cancel();
    });

    let scheduler = Scheduler::new(engine, token.clone()).spawn();

    if !no_console {
        if !quiet {
            display::print_help();
        }
        let lines = control::spawn_stdin_reader();
        control::Console::new(&config, &scheduler, token.clone())
            .run(lines)
            .await;
    }

    token.cancelled().await;
    scheduler.join().await?;

    println!("Goodbye!");
    info!("FerroMirror stopped");
    Ok(())
}

async fn plan_command(config: &SyncConfig, json: bool) -> Result<()> {
    let source = SnapshotBuilder::new(config.source()).build().await?;
    let replica = SnapshotBuilder::new(config.replica()).build().await?;
    let changes = detect_changes(&source, &replica);

    if json {
        json_output::print_json(&json_output::PlanJson::new(config, &changes))
    } else {
        display::print_plan(&changes);
        Ok(())
    }
}

fn config_command(config: &SyncConfig, format: ConfigFormat, write: Option<&Path>) -> Result<()> {
    if let Some(path) = write {
        ConfigLoader::save_to_file(config, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        display::print_success(&format!("Configuration written to {}", path.display()));
        return Ok(());
    }

    print!("{}", config.render(format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "ferromirror",
            "--debug",
            "run",
            "--source",
            "a",
            "--replica",
            "b",
            "--interval",
            "5",
            "--once",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Commands::Run { sync, once, .. } => {
                assert!(once);
                assert_eq!(sync.source, Some(PathBuf::from("a")));
                assert_eq!(sync.replica, Some(PathBuf::from("b")));
                assert_eq!(sync.interval.as_deref(), Some("5"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_json_requires_once() {
        assert!(Cli::try_parse_from(["ferromirror", "run", "--json"]).is_err());
    }

    #[test]
    fn test_load_config_rejects_non_numeric_interval() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("s");
        let replica = temp_dir.path().join("r");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&replica).unwrap();

        let args = SyncArgs {
            source: Some(source),
            replica: Some(replica),
            log_file: Some(temp_dir.path().join("log")),
            interval: Some("soon".to_string()),
        };
        let error = load_config(None, &args).unwrap_err();
        assert!(format!("{:#}", error).contains("Invalid configuration"));
    }

    #[test]
    fn test_load_config_applies_flags() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("s");
        let replica = temp_dir.path().join("r");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&replica).unwrap();
        let config_file = temp_dir.path().join("ferromirror.toml");
        std::fs::write(&config_file, "interval_secs = 7\n").unwrap();

        let args = SyncArgs {
            source: Some(source.clone()),
            replica: Some(replica.clone()),
            log_file: Some(temp_dir.path().join("log")),
            interval: None,
        };
        let config = load_config(Some(&config_file), &args).unwrap();

        assert_eq!(config.source(), source);
        assert_eq!(config.replica(), replica);
        assert_eq!(config.interval_secs(), 7);
    }
}
