//! tc66c CLI - Command-line tool for RDTech TC66/TC66C USB-C power meters.
//!
//! ## Features
//!
//! - Live measurement readout (human-readable or JSON)
//! - Continuous polling
//! - On-device recording download
//! - Screen control (page flips and rotation)
//! - Firmware updates with progress display
//! - Interactive serial port selection
//! - Shell completion generation

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Set by the Ctrl-C handler, polled by long-running commands.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Whether Ctrl-C was pressed at any point.
fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

mod commands;
mod config;
mod serial;

use config::Config;
use serial::{SerialOptions, ask_remember_port, select_serial_port};

/// Errors carrying a specific process exit code.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Bad invocation or environment (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// Stopped by the user (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

/// tc66c - talk to RDTech TC66/TC66C USB-C power meters.
///
/// Environment variables:
///   TC66C_PORT             - Default serial port
///   TC66C_NON_INTERACTIVE  - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "tc66c")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "TC66C_PORT")]
    port: Option<String>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "TC66C_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Confirm port selection even for auto-detected ports.
    #[arg(long, global = true)]
    confirm_port: bool,

    /// List all available ports (including unknown types).
    #[arg(long, global = true)]
    list_all_ports: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Flash a firmware image (the meter must be in bootloader mode).
    Update {
        /// Path to the firmware binary.
        firmware: PathBuf,
    },

    /// Read one measurement from the meter.
    Get {
        /// Output the reading as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Poll measurements until interrupted with Ctrl-C.
    Poll {
        /// Seconds between readings (default: 1).
        #[arg(short, long)]
        interval: Option<f64>,

        /// Output one JSON object per reading to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Download recorded samples from the meter.
    Recording {
        /// Output samples as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Control the meter's display.
    Screen {
        /// Action to perform.
        #[arg(value_enum)]
        action: ScreenAction,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions (auto-detected if not specified with --install).
        #[arg(value_enum)]
        shell: Option<Shell>,

        /// Automatically install completions to your shell configuration.
        #[arg(long)]
        install: bool,
    },
}

/// Display actions for the `screen` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScreenAction {
    /// Switch to the previous display page.
    Prev,
    /// Switch to the next display page.
    Next,
    /// Rotate the display by 90 degrees.
    Rotate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "tc66c v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    setup_interrupt_handler();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(exit_code_for(&err))
        },
    }
}

/// Dispatch the parsed command.
fn run(cli: &Cli) -> Result<()> {
    // Load configuration
    let mut config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Update { firmware } => commands::update::cmd_update(cli, &mut config, firmware),
        Commands::Get { json } => commands::measure::cmd_get(cli, &mut config, *json),
        Commands::Poll { interval, json } => {
            commands::measure::cmd_poll(cli, &mut config, *interval, *json)
        },
        Commands::Recording { json } => {
            commands::recording::cmd_recording(cli, &mut config, *json)
        },
        Commands::Screen { action } => commands::screen::cmd_screen(cli, &mut config, *action),
        Commands::ListPorts { json } => {
            commands::ports::cmd_list_ports(*json);
            Ok(())
        },
        Commands::Completions { shell, install } => {
            if *install {
                commands::completions::cmd_completions_install(*shell)
            } else if let Some(shell) = shell {
                commands::completions::cmd_completions(*shell);
                Ok(())
            } else {
                Err(CliError::Usage(
                    "specify a shell (e.g. `tc66c completions bash`) or pass --install".to_string(),
                )
                .into())
            }
        },
    }
}

/// Register the Ctrl-C handler and expose it to library loops.
fn setup_interrupt_handler() {
    tc66c::set_interrupt_checker(was_interrupted);
    if let Err(e) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        debug!("Could not install Ctrl-C handler: {e}");
    }
}

/// Map an error to the exit code contract: 2 for usage errors, 130 when
/// the user cancelled, 1 for everything else.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::Usage(_) => 2,
            CliError::Cancelled(_) => 130,
        };
    }
    if matches!(
        err.downcast_ref::<tc66c::Error>(),
        Some(tc66c::Error::Cancelled)
    ) {
        return 130;
    }
    1
}

/// Get serial port from CLI args or interactive selection.
fn get_port(cli: &Cli, config: &mut Config) -> Result<String> {
    let options = SerialOptions {
        port: cli.port.clone(),
        list_all_ports: cli.list_all_ports,
        non_interactive: cli.non_interactive,
        confirm_port: cli.confirm_port,
    };

    let selected = select_serial_port(&options, config)?;

    // Ask to remember if not a known device and interactive mode
    if !selected.is_known && !cli.non_interactive {
        ask_remember_port(&selected.port, config)?;
    }

    Ok(selected.port.name)
}
