//! CRC-16/MODBUS, as stored in the measurement packet blocks.

use crate::error::{Error, Result};

/// Compute the CRC-16/MODBUS of `data`.
///
/// Reflected polynomial 0xA001, initial value 0xFFFF, no final xor. Each
/// decrypted measurement block stores this over its first 60 bytes as a
/// little-endian u16 at offset 60.
#[must_use]
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Check `data` against the CRC stored in the packet, naming `block` in
/// the error on mismatch.
pub fn verify_checksum(block: &'static str, data: &[u8], stored: u16) -> Result<()> {
    let actual = crc16_modbus(data);
    if actual == stored {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            block,
            expected: stored,
            actual,
        })
    }
}
