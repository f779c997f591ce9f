//! Error types for the TC66 toolkit.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::device::DeviceMode;
use crate::protocol::Phase;

/// Result type for TC66 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for TC66 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Serial port could not be opened.
    #[cfg(feature = "native")]
    #[error("Failed to open {port}: {source}")]
    Connection {
        /// Name of the port that failed to open.
        port: String,
        /// Underlying serial error.
        #[source]
        source: serialport::Error,
    },

    /// Firmware file does not exist.
    #[error("Firmware file not found: {}", .0.display())]
    FirmwareNotFound(PathBuf),

    /// Firmware image contains no bytes.
    #[error("Firmware image is empty")]
    EmptyFirmware,

    /// The device answered an exchange with something other than the
    /// protocol-mandated reply. A timed-out read folds into this: `got`
    /// holds whatever arrived before the timeout, possibly nothing.
    #[error("Unexpected reply during {phase}: expected \"{}\", got \"{}\" after {bytes_sent} bytes sent", .expected.escape_ascii(), .got.escape_ascii())]
    UnexpectedResponse {
        /// Protocol step the exchange belonged to.
        phase: Phase,
        /// Reply the protocol mandates.
        expected: &'static [u8],
        /// Bytes actually received before the timeout.
        got: Vec<u8>,
        /// Bytes written to the transport so far. For a rejected firmware
        /// chunk this includes the chunk itself: its bytes went out even
        /// though the device did not acknowledge them.
        bytes_sent: usize,
    },

    /// A write did not complete within the write timeout.
    #[error("Write timed out during {phase}")]
    WriteTimeout {
        /// Protocol step the write belonged to.
        phase: Phase,
    },

    /// The mode query returned neither `firm` nor `boot`.
    #[error("Device reported unknown mode \"{}\"", .0.escape_ascii())]
    UnknownMode(Vec<u8>),

    /// Operation requires a different device mode.
    #[error("Device is in {current} mode, {required} mode required")]
    WrongMode {
        /// Mode the operation needs.
        required: DeviceMode,
        /// Mode the device is actually in.
        current: DeviceMode,
    },

    /// The device went quiet before a fixed-size response was complete.
    #[error("Short response to {command:?}: expected {expected} bytes, got {got}")]
    ShortResponse {
        /// Command that was sent.
        command: &'static str,
        /// Response size the protocol mandates.
        expected: usize,
        /// Bytes actually received.
        got: usize,
    },

    /// Measurement packet malformed beyond the checksum level.
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// CRC checksum mismatch in a measurement block.
    #[error("CRC mismatch in {block}: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Which packet block failed.
        block: &'static str,
        /// CRC stored in the packet.
        expected: u16,
        /// CRC computed over the payload.
        actual: u16,
    },

    /// No usable serial port found.
    #[error("No TC66 device found")]
    DeviceNotFound,

    /// Interrupt requested while an operation was running.
    #[error("Operation cancelled")]
    Cancelled,
}
