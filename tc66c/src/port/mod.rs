//! Port abstraction for serial communication with the meter.
//!
//! The `Port` trait separates I/O from protocol logic: the device client
//! and the firmware updater are written against the trait and exercised
//! in tests with scripted doubles, while real hardware goes through the
//! `serialport`-backed implementation.
//!
//! ```text
//! +------------------+   +------------------+
//! |  Device client   |   | Firmware updater |
//! |   (normal mode)  |   |   (bootloader)   |
//! +--------+---------+   +--------+---------+
//!          |                      |
//!          v                      v
//! +--------+----------------------+---------+
//! |               Port trait                |
//! +--------+----------------------+---------+
//!          |                      |
//!          v                      v
//! +--------+---------+   +--------+---------+
//! |    NativePort    |   |    test double   |
//! |   (serialport)   |   |                  |
//! +------------------+   +------------------+
//! ```
//!
//! The meter never signals how many bytes a reply will carry; the protocol
//! fixes the sizes instead. [`Port::read_until_timeout`] therefore treats a
//! timed-out read as a short (possibly empty) result, never as an error,
//! and callers compare what arrived against what the protocol mandates.

#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "native")]
pub mod native;

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::{BAUD_RATE, IO_TIMEOUT};

/// Serial port configuration.
///
/// The meter's link settings are fixed (115200 baud, 8N1, 2 s timeout);
/// the defaults are the protocol values and rarely need touching.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyACM0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: BAUD_RATE,
            timeout: IO_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Create a configuration for `port_name` at the fixed link settings.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port information.
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial_number: Option<String>,
}

/// Unified port trait for serial communication.
pub trait Port: Read + Write + Send {
    /// Set the read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Get the current timeout.
    fn timeout(&self) -> Duration;

    /// Discard any buffered input and output.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Close the port and release resources.
    ///
    /// Idempotent: closing an already-closed port is a no-op. Further
    /// reads and writes fail with a `NotConnected` I/O error.
    fn close(&mut self) -> Result<()>;

    /// Write all bytes, blocking until complete.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)?;
        Ok(())
    }

    /// Read until `buf` is full or the read timeout expires.
    ///
    /// Returns how many bytes actually arrived. A timeout is not an
    /// error here: the device simply had nothing more to say, and the
    /// caller decides whether the short result violates the protocol.
    fn read_until_timeout(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(filled)
    }
}

/// Trait for listing available serial ports.
///
/// Separated from `Port` because enumeration is a static operation that
/// does not require an open port instance.
pub trait PortEnumerator {
    /// List all available serial ports.
    fn list_ports() -> Result<Vec<PortInfo>>;

    /// Find ports matching the given VID/PID.
    fn find_by_vid_pid(vid: u16, pid: u16) -> Result<Vec<PortInfo>> {
        let ports = Self::list_ports()?;
        Ok(ports
            .into_iter()
            .filter(|p| p.vid == Some(vid) && p.pid == Some(pid))
            .collect())
    }
}

#[cfg(feature = "native")]
pub use native::{NativePort, NativePortEnumerator};
