//! TC66 wire protocol: commands, sizes, and exchange phases.
//!
//! The meter speaks a fixed request/reply protocol over a 115200 baud 8N1
//! serial link. Commands are bare ASCII with no terminator:
//!
//! ```text
//! +----------+-------+------------------------+-------------+
//! | Request  | Bytes | Reply                  | Reply bytes |
//! +----------+-------+------------------------+-------------+
//! | "query"  |   5   | "firm" or "boot"       |      4      |
//! | "getva"  |   5   | encrypted packet       |     192     |
//! | "gtrec"  |   5   | 8-byte entries         |  until idle |
//! | "lastp"  |   5   | (none)                 |      0      |
//! | "nextp"  |   5   | (none)                 |      0      |
//! | "rotat"  |   5   | (none)                 |      0      |
//! | "update" |   6   | "uprdy"                |      5      |
//! | chunk    | <=64  | "OK"                   |      2      |
//! +----------+-------+------------------------+-------------+
//! ```
//!
//! Replies are matched with exact byte equality against the full expected
//! length. Firmware chunks follow "update"; each chunk must be acknowledged
//! before the next one is sent.

pub mod crc;
pub mod crypto;

use std::fmt;
use std::time::Duration;

/// Fixed link speed. The meter does not negotiate.
pub const BAUD_RATE: u32 = 115_200;

/// Read and write budget for a single exchange.
pub const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Firmware transfer chunk size. The last chunk may be shorter.
pub const CHUNK_SIZE: usize = 64;

/// Size of an encrypted measurement packet.
pub const PACKET_SIZE: usize = 192;

/// Size of one measurement block inside a packet.
pub const BLOCK_SIZE: usize = 64;

/// Size of one recording entry (two little-endian u32 fields).
pub const RECORD_SIZE: usize = 8;

/// Mode query. Replies [`REPLY_FIRMWARE`] or [`REPLY_BOOTLOADER`].
pub const CMD_QUERY: &[u8] = b"query";

/// Measurement poll. Replies with one encrypted 192-byte packet.
pub const CMD_GET_READING: &[u8] = b"getva";

/// Recording dump. Replies with 8-byte entries until the device goes quiet.
pub const CMD_GET_RECORDINGS: &[u8] = b"gtrec";

/// Screen: previous page. No reply.
pub const CMD_PREVIOUS_PAGE: &[u8] = b"lastp";

/// Screen: next page. No reply.
pub const CMD_NEXT_PAGE: &[u8] = b"nextp";

/// Screen: rotate the display. No reply.
pub const CMD_ROTATE: &[u8] = b"rotat";

/// Enter firmware-update mode (bootloader only). Replies [`REPLY_UPDATE_READY`].
pub const CMD_UPDATE: &[u8] = b"update";

/// Mode query reply in normal operating mode.
pub const REPLY_FIRMWARE: &[u8] = b"firm";

/// Mode query reply in bootloader mode.
pub const REPLY_BOOTLOADER: &[u8] = b"boot";

/// Update-mode acknowledgment.
pub const REPLY_UPDATE_READY: &[u8] = b"uprdy";

/// Firmware chunk acknowledgment.
pub const REPLY_CHUNK_OK: &[u8] = b"OK";

/// Protocol step an exchange belongs to. Carried in errors so a failed
/// update reports where the session died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Mode query ("query" -> "firm"/"boot").
    Query,
    /// Update-mode entry ("update" -> "uprdy").
    EnterUpdate,
    /// Firmware chunk, 1-based.
    Chunk(usize),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Query => write!(f, "mode query"),
            Phase::EnterUpdate => write!(f, "update handshake"),
            Phase::Chunk(index) => write!(f, "chunk {index}"),
        }
    }
}
