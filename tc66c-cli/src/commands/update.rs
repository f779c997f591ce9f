//! Firmware update command implementation.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tc66c::FirmwareUpdater;
use tc66c::protocol::{Phase, REPLY_FIRMWARE};

use crate::config::Config;
use crate::{Cli, get_port, use_fancy_output};

/// Update command implementation.
pub(crate) fn cmd_update(cli: &Cli, config: &mut Config, firmware: &Path) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "{} Loading firmware image {}",
            style("📦").cyan(),
            style(firmware.display()).bold()
        );
    }

    // Load and sanity-check the image before touching any port
    let image = tc66c::load_image(firmware)?;
    if !cli.quiet {
        eprintln!(
            "{} {} bytes, {} chunks of up to 64 bytes",
            style("ℹ").blue(),
            image.len(),
            image.len().div_ceil(64)
        );
    }

    // Get port
    let port = get_port(cli, config)?;
    if !cli.quiet {
        eprintln!("{} Using port {}", style("🔌").cyan(), style(&port).bold());
    }

    let mut updater = FirmwareUpdater::open(&port)
        .with_context(|| format!("Failed to connect to {port}"))?;

    // Create progress bar
    let pb = if cli.quiet || !use_fancy_output() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb
    };

    let result = updater.run(&image, |progress| {
        pb.set_position(u64::from(progress.percent()));
        pb.set_message(format!(
            "chunk {}/{}",
            progress.chunks_sent, progress.total_chunks
        ));
    });

    if let Err(err) = result {
        pb.abandon_with_message("failed".to_string());
        if bootloader_hint_applies(&err) {
            eprintln!(
                "{} The meter is still running its normal firmware",
                style("ℹ").blue()
            );
            eprintln!(
                "{}",
                style(
                    "Hold the middle button while plugging in power to enter the bootloader, \
                     then retry."
                )
                .dim()
            );
        }
        return Err(err.into());
    }

    pb.finish_with_message("done".to_string());

    if !cli.quiet {
        eprintln!(
            "\n{} Firmware update complete",
            style("🎉").green().bold()
        );
        eprintln!("Power-cycle the meter to boot the new firmware.");
    }

    Ok(())
}

/// True when the handshake failed because the meter answered `firm`,
/// meaning it never entered the bootloader.
fn bootloader_hint_applies(err: &tc66c::Error) -> bool {
    matches!(
        err,
        tc66c::Error::UnexpectedResponse {
            phase: Phase::Query,
            got,
            ..
        } if got.as_slice() == REPLY_FIRMWARE
    )
}
