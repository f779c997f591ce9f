//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod completions;
pub(crate) mod measure;
pub(crate) mod ports;
pub(crate) mod recording;
pub(crate) mod screen;
pub(crate) mod update;

use anyhow::{Context, Result};
use console::style;
use log::debug;
use tc66c::{NativePort, Tc66};

use crate::Cli;

/// Open the meter on `port` with the fixed link settings and attach.
pub(crate) fn connect_meter(cli: &Cli, port: &str) -> Result<Tc66<NativePort>> {
    if !cli.quiet {
        eprintln!(
            "{} Connecting to {}...",
            style("🔌").cyan(),
            style(port).bold()
        );
    }
    let meter = Tc66::open(port).with_context(|| format!("Failed to connect to {port}"))?;
    debug!("Meter attached in {} mode", meter.mode());
    Ok(meter)
}
