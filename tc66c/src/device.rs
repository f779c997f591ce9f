//! Normal-mode device client.
//!
//! `Tc66` wraps an open port, queries which mode the meter booted into and
//! exposes the firmware-mode operations: measurement polling, recording
//! dumps and screen control. It is generic over [`Port`], so it runs
//! against real hardware and scripted test doubles alike.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tc66c::Tc66;
//!
//! fn main() -> tc66c::Result<()> {
//!     let mut meter = Tc66::open("/dev/ttyACM0")?;
//!     let reading = meter.get_reading()?;
//!     println!("{reading}");
//!     meter.close()?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::port::Port;
use crate::protocol::crypto::decrypt_packet;
use crate::protocol::{
    CMD_GET_READING, CMD_GET_RECORDINGS, CMD_NEXT_PAGE, CMD_PREVIOUS_PAGE, CMD_QUERY, CMD_ROTATE,
    PACKET_SIZE, RECORD_SIZE, REPLY_BOOTLOADER, REPLY_FIRMWARE,
};
use crate::reading::{Reading, RecordingEntry, parse_recordings};

/// Settle time after a command write. The meter is slow to switch command
/// contexts and drops input sent during the switch.
const COMMAND_SETTLE: Duration = Duration::from_millis(50);

/// Operating mode the meter reported at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Normal operating mode: measurements, recordings, screen control.
    Firmware,
    /// Bootloader mode: only firmware updates are possible.
    Bootloader,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Firmware => write!(f, "firmware"),
            DeviceMode::Bootloader => write!(f, "bootloader"),
        }
    }
}

/// TC66/TC66C device client.
///
/// Generic over the port type `P` so the protocol logic is testable
/// without hardware.
#[derive(Debug)]
pub struct Tc66<P: Port> {
    port: P,
    mode: DeviceMode,
}

impl<P: Port> Tc66<P> {
    /// Attach to an already-open port.
    ///
    /// Flushes stale input and queries which mode the meter is in. A reply
    /// that is neither `firm` nor `boot` fails with [`Error::UnknownMode`].
    pub fn connect(mut port: P) -> Result<Self> {
        send_command(&mut port, CMD_QUERY)?;
        let mut reply = [0u8; 4];
        let received = port.read_until_timeout(&mut reply)?;
        let mode = match &reply[..received] {
            r if r == REPLY_FIRMWARE => DeviceMode::Firmware,
            r if r == REPLY_BOOTLOADER => DeviceMode::Bootloader,
            other => return Err(Error::UnknownMode(other.to_vec())),
        };
        debug!("Device on {} is in {mode} mode", port.name());
        Ok(Self { port, mode })
    }

    /// Mode the meter reported when this client attached.
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Poll one measurement packet and decode it.
    pub fn get_reading(&mut self) -> Result<Reading> {
        self.require_firmware_mode()?;
        send_command(&mut self.port, CMD_GET_READING)?;

        let mut packet = [0u8; PACKET_SIZE];
        let received = self.port.read_until_timeout(&mut packet)?;
        if received != PACKET_SIZE {
            return Err(Error::ShortResponse {
                command: "getva",
                expected: PACKET_SIZE,
                got: received,
            });
        }

        let plain = decrypt_packet(&packet)?;
        Reading::from_packet(&plain)
    }

    /// Dump the on-device recording buffer.
    ///
    /// The meter streams 8-byte entries and never announces the count; the
    /// dump ends when the link goes quiet for a full read timeout.
    pub fn get_recordings(&mut self) -> Result<Vec<RecordingEntry>> {
        self.require_firmware_mode()?;
        send_command(&mut self.port, CMD_GET_RECORDINGS)?;

        let mut raw = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let received = self.port.read_until_timeout(&mut chunk)?;
            raw.extend_from_slice(&chunk[..received]);
            if received < chunk.len() {
                break;
            }
        }
        debug!(
            "Recording dump: {} bytes, {} entries",
            raw.len(),
            raw.len() / RECORD_SIZE
        );
        Ok(parse_recordings(&raw))
    }

    /// Switch the screen to the previous page.
    pub fn previous_page(&mut self) -> Result<()> {
        self.require_firmware_mode()?;
        send_command(&mut self.port, CMD_PREVIOUS_PAGE)
    }

    /// Switch the screen to the next page.
    pub fn next_page(&mut self) -> Result<()> {
        self.require_firmware_mode()?;
        send_command(&mut self.port, CMD_NEXT_PAGE)
    }

    /// Rotate the display by 90 degrees.
    pub fn rotate_screen(&mut self) -> Result<()> {
        self.require_firmware_mode()?;
        send_command(&mut self.port, CMD_ROTATE)
    }

    /// Close the underlying port. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.port.close()
    }

    /// Consume the client and return the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    fn require_firmware_mode(&self) -> Result<()> {
        if self.mode == DeviceMode::Firmware {
            Ok(())
        } else {
            Err(Error::WrongMode {
                required: DeviceMode::Firmware,
                current: self.mode,
            })
        }
    }
}

/// Flush stale input, write a command and give the meter time to settle.
/// Screen commands have no reply, so the settle delay is all that paces
/// back-to-back commands.
fn send_command<P: Port>(port: &mut P, command: &'static [u8]) -> Result<()> {
    port.clear_buffers()?;
    trace!("Sending {:?}", command.escape_ascii().to_string());
    port.write_all_bytes(command)?;
    thread::sleep(COMMAND_SETTLE);
    Ok(())
}

// Native-specific convenience functions
#[cfg(feature = "native")]
mod native_impl {
    use super::Tc66;
    use crate::error::Result;
    use crate::port::NativePort;

    impl Tc66<NativePort> {
        /// Open `port_name` at the meter's fixed link settings and attach.
        pub fn open(port_name: &str) -> Result<Self> {
            let port = NativePort::open_simple(port_name)?;
            Self::connect(port)
        }
    }
}
