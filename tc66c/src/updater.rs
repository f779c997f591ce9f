//! Firmware update orchestration.
//!
//! The bootloader protocol is a strict linear session:
//!
//! ```text
//! host              device
//!  |--- "query" ---->|
//!  |<--- "boot" -----|    bootloader confirmed
//!  |--- "update" --->|
//!  |<--- "uprdy" ----|    update mode confirmed
//!  |--- chunk 1 ---->|    64 bytes
//!  |<---- "OK" ------|
//!  |      ...        |
//!  |--- chunk N ---->|    last chunk may be short
//!  |<---- "OK" ------|    complete
//! ```
//!
//! Every reply is matched byte-exactly over its full length; any
//! divergence aborts the session, and there are no retries or resume. The
//! port is closed on every exit path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tc66c::FirmwareUpdater;
//!
//! fn main() -> tc66c::Result<()> {
//!     let image = tc66c::load_image(Path::new("firmware.bin"))?;
//!     let mut updater = FirmwareUpdater::open("/dev/ttyACM0")?;
//!     updater.run(&image, |progress| {
//!         eprintln!("{}%", progress.percent());
//!     })?;
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::Path;

use log::{debug, info, trace};

use crate::error::{Error, Result};
use crate::is_interrupt_requested;
use crate::port::Port;
use crate::protocol::{
    CHUNK_SIZE, CMD_QUERY, CMD_UPDATE, Phase, REPLY_BOOTLOADER, REPLY_CHUNK_OK, REPLY_UPDATE_READY,
};

/// Session states of an update run.
///
/// The session only moves forward; a failure from any state lands in
/// [`UpdateState::Failed`] with the port closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Transport open, nothing sent yet.
    Connected,
    /// "query" answered with "boot".
    BootloaderConfirmed,
    /// "update" answered with "uprdy".
    UpdateModeConfirmed,
    /// Chunk loop in progress.
    Transferring,
    /// All chunks acknowledged, transport closed.
    Complete,
    /// Session aborted, transport closed.
    Failed,
}

/// Progress snapshot delivered after each acknowledged chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    /// Bytes acknowledged so far.
    pub bytes_sent: usize,
    /// Total bytes in the image.
    pub total_bytes: usize,
    /// Chunks acknowledged so far.
    pub chunks_sent: usize,
    /// Total number of chunks.
    pub total_chunks: usize,
}

impl UpdateProgress {
    /// Percentage of bytes acknowledged, rounded to the nearest integer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        ((self.bytes_sent as f64 / self.total_bytes as f64) * 100.0).round() as u8
    }
}

/// Firmware updater.
///
/// Generic over the port type `P`. A session is single-shot: construct,
/// [`run`](Self::run), done. The port is closed when the run finishes,
/// successfully or not.
pub struct FirmwareUpdater<P: Port> {
    port: P,
    state: UpdateState,
}

impl<P: Port> FirmwareUpdater<P> {
    /// Create an updater from an open port.
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: UpdateState::Connected,
        }
    }

    /// Current session state.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Consume the updater and return the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Drive a full update session.
    ///
    /// `progress` fires after every acknowledged chunk; on success its
    /// final invocation carries the full byte and chunk totals. The port
    /// is closed before this returns, on success and failure alike.
    pub fn run<F>(&mut self, firmware: &[u8], progress: F) -> Result<()>
    where
        F: FnMut(UpdateProgress),
    {
        match self.drive(firmware, progress) {
            Ok(()) => {
                self.port.close()?;
                self.state = UpdateState::Complete;
                info!("Firmware update complete: {} bytes", firmware.len());
                Ok(())
            }
            Err(err) => {
                let _ = self.port.close();
                self.state = UpdateState::Failed;
                Err(err)
            }
        }
    }

    fn drive<F>(&mut self, firmware: &[u8], mut progress: F) -> Result<()>
    where
        F: FnMut(UpdateProgress),
    {
        if firmware.is_empty() {
            return Err(Error::EmptyFirmware);
        }

        self.port.clear_buffers()?;

        self.exchange(CMD_QUERY, REPLY_BOOTLOADER, Phase::Query, 0)?;
        self.state = UpdateState::BootloaderConfirmed;
        debug!("Bootloader confirmed on {}", self.port.name());

        self.exchange(CMD_UPDATE, REPLY_UPDATE_READY, Phase::EnterUpdate, 0)?;
        self.state = UpdateState::UpdateModeConfirmed;
        debug!("Device ready for firmware data");

        self.state = UpdateState::Transferring;
        let total_bytes = firmware.len();
        let total_chunks = total_bytes.div_ceil(CHUNK_SIZE);
        info!("Sending {total_bytes} bytes in {total_chunks} chunks");

        let mut bytes_sent = 0;
        for (index, chunk) in firmware.chunks(CHUNK_SIZE).enumerate() {
            if is_interrupt_requested() {
                return Err(Error::Cancelled);
            }
            let phase = Phase::Chunk(index + 1);
            self.exchange(chunk, REPLY_CHUNK_OK, phase, bytes_sent + chunk.len())?;
            bytes_sent += chunk.len();
            trace!("{phase} acknowledged ({bytes_sent}/{total_bytes} bytes)");
            progress(UpdateProgress {
                bytes_sent,
                total_bytes,
                chunks_sent: index + 1,
                total_chunks,
            });
        }

        Ok(())
    }

    /// One request/reply exchange. The reply must match `expected`
    /// byte-exactly over its full length; anything else, including a short
    /// or empty read, fails the session. `bytes_sent` is what the error
    /// reports as written so far, counting the request itself when the
    /// request is a firmware chunk.
    fn exchange(
        &mut self,
        request: &[u8],
        expected: &'static [u8],
        phase: Phase,
        bytes_sent: usize,
    ) -> Result<()> {
        if let Err(err) = self.port.write_all_bytes(request) {
            return Err(write_error(err, phase));
        }

        let mut reply = vec![0u8; expected.len()];
        let received = self.port.read_until_timeout(&mut reply)?;
        reply.truncate(received);

        if reply != expected {
            return Err(Error::UnexpectedResponse {
                phase,
                expected,
                got: reply,
                bytes_sent,
            });
        }
        Ok(())
    }
}

/// A stalled write is its own terminal error; everything else passes
/// through untouched.
fn write_error(err: Error, phase: Phase) -> Error {
    match err {
        Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => Error::WriteTimeout { phase },
        other => other,
    }
}

/// Read a firmware image from disk.
///
/// The path is validated before any port is touched, so a typo never
/// opens a connection. Zero-byte images are rejected here as well; the
/// device would hang waiting for data that never comes.
pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::FirmwareNotFound(path.to_path_buf()));
    }
    let image = fs::read(path)?;
    if image.is_empty() {
        return Err(Error::EmptyFirmware);
    }
    debug!("Loaded firmware image: {} bytes from {}", image.len(), path.display());
    Ok(image)
}

// Native-specific convenience functions
#[cfg(feature = "native")]
mod native_impl {
    use super::FirmwareUpdater;
    use crate::error::Result;
    use crate::port::NativePort;

    impl FirmwareUpdater<NativePort> {
        /// Open `port_name` at the meter's fixed link settings.
        ///
        /// An open failure surfaces as a connection error before any
        /// updater exists, so nothing is ever written to a port that did
        /// not open.
        pub fn open(port_name: &str) -> Result<Self> {
            let port = NativePort::open_simple(port_name)?;
            Ok(Self::new(port))
        }
    }
}
