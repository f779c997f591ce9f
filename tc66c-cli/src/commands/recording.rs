//! Recording download command implementation.

use anyhow::Result;
use console::style;
use tc66c::RecordingEntry;

use crate::config::Config;
use crate::{Cli, get_port};

/// Recording command implementation.
pub(crate) fn cmd_recording(cli: &Cli, config: &mut Config, json: bool) -> Result<()> {
    let port = get_port(cli, config)?;
    let mut meter = super::connect_meter(cli, &port)?;

    let result = meter.get_recordings();
    let _ = meter.close();
    let entries = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("{}", style("No recorded samples on the device").dim());
        return Ok(());
    }

    eprintln!("{} {} recorded samples", style("ℹ").blue(), entries.len());
    for (index, entry) in entries.iter().enumerate() {
        eprintln!("{}", format_entry(index, entry));
    }

    Ok(())
}

fn format_entry(index: usize, entry: &RecordingEntry) -> String {
    format!(
        "  [{index:4}] {:.4} V  {:.5} A",
        entry.voltage, entry.current
    )
}
