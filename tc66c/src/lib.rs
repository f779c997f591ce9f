//! # tc66c
//!
//! A library for talking to RDTech TC66 and TC66C USB-C power meters.
//!
//! This crate provides the core functionality for communicating with the
//! meter over its USB serial interface, including:
//!
//! - Live measurement readout (AES-encrypted `getva` packets)
//! - On-device recording download
//! - Screen control (page flips and rotation)
//! - Firmware updates through the bootloader protocol
//!
//! ## Supported Devices
//!
//! - TC66C (built-in USB-C data port)
//! - TC66 (same wire protocol behind a USB serial bridge)
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via the `serialport` crate
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tc66c::Tc66;
//!
//! fn main() -> tc66c::Result<()> {
//!     // Connect and read one measurement (native only)
//!     #[cfg(feature = "native")]
//!     {
//!         let mut meter = Tc66::open("/dev/ttyACM0")?;
//!         let reading = meter.get_reading()?;
//!         println!("{}", reading.summary());
//!         meter.close()?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod device;
pub mod error;
pub mod host;
pub mod port;
pub mod protocol;
pub mod reading;
pub mod updater;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications). The firmware
/// updater polls it between chunks.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupt_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

/// Serializes tests that toggle the process-global interrupt flag.
#[cfg(test)]
pub(crate) static INTERRUPT_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn test_set_interrupted(value: bool) {
    use std::sync::atomic::{AtomicBool, Ordering};

    static TEST_INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    let flag = TEST_INTERRUPT_FLAG
        .get_or_init(|| {
            let shared = Arc::new(AtomicBool::new(false));
            let checker = Arc::clone(&shared);
            set_interrupt_checker(move || checker.load(Ordering::Relaxed));
            shared
        })
        .clone();

    flag.store(value, Ordering::Relaxed);
}

// Re-exports for convenience
// Native-specific re-exports
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator};
pub use {
    device::{DeviceMode, Tc66},
    error::{Error, Result},
    host::{
        DetectedPort, DeviceKind, auto_detect_port, detect_meter_ports, detect_ports,
        find_port_by_pattern, format_port_list,
    },
    port::{Port, PortEnumerator, PortInfo, SerialConfig},
    protocol::Phase,
    reading::{Reading, RecordingEntry, parse_recordings},
    updater::{FirmwareUpdater, UpdateProgress, UpdateState, load_image},
};
