//! Measurement commands: one-shot reading and continuous polling.

use anyhow::Result;
use console::style;
use std::time::Duration;
use tc66c::{NativePort, Tc66};

use crate::config::Config;
use crate::{Cli, CliError, get_port, was_interrupted};

/// Get command implementation.
pub(crate) fn cmd_get(cli: &Cli, config: &mut Config, json: bool) -> Result<()> {
    let port = get_port(cli, config)?;
    let mut meter = super::connect_meter(cli, &port)?;

    let result = meter.get_reading();
    let _ = meter.close();
    let reading = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        eprintln!("{reading}");
    }

    Ok(())
}

/// Poll command implementation.
pub(crate) fn cmd_poll(
    cli: &Cli,
    config: &mut Config,
    interval: Option<f64>,
    json: bool,
) -> Result<()> {
    let seconds = resolve_interval(interval, config);
    let delay = validate_interval(seconds)?;

    let port = get_port(cli, config)?;
    let mut meter = super::connect_meter(cli, &port)?;

    if !cli.quiet && !json {
        eprintln!("{}", style("Polling; press Ctrl-C to stop").dim());
    }

    let result = poll_loop(&mut meter, delay, json);
    let _ = meter.close();
    result
}

/// Flag wins over config, config over the 1-second default.
fn resolve_interval(flag: Option<f64>, config: &Config) -> f64 {
    flag.or(config.poll.interval).unwrap_or(1.0)
}

fn validate_interval(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| CliError::Usage(format!("invalid poll interval: {seconds}")).into())
}

fn poll_loop(meter: &mut Tc66<NativePort>, delay: Duration, json: bool) -> Result<()> {
    loop {
        if was_interrupted() {
            eprintln!();
            return Err(CliError::Cancelled("polling stopped".to_string()).into());
        }

        let reading = meter.get_reading()?;
        if json {
            // One JSON object per line, so the stream can be piped to jq
            println!("{}", serde_json::to_string(&reading)?);
        } else {
            eprintln!("{}", reading.summary());
        }

        sleep_interruptible(delay);
    }
}

/// Sleep in short slices so Ctrl-C is honored promptly.
fn sleep_interruptible(total: Duration) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && !was_interrupted() {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
