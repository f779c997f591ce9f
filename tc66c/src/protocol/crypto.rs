//! Measurement packet cipher.
//!
//! The meter encrypts `getva` replies with AES-256-ECB under a key baked
//! into its firmware; every host implementation carries the same key. The
//! decrypted packet is three 64-byte blocks, self-identifying through
//! their ASCII prefixes `pac1`/`pac2`/`pac3`.

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};

use crate::error::{Error, Result};
use crate::protocol::{BLOCK_SIZE, PACKET_SIZE};

/// AES-256 key baked into the meter firmware.
const PACKET_KEY: [u8; 32] = [
    0x58, 0x21, 0xfa, 0x56, 0x01, 0xb2, 0xf0, 0x26, 0x87, 0xff, 0x12, 0x04,
    0x62, 0x2a, 0x4f, 0xb0, 0x86, 0xf4, 0x02, 0x60, 0x81, 0x6f, 0x9a, 0x0b,
    0xa7, 0xf1, 0x06, 0x61, 0x9a, 0xb8, 0x72, 0x88,
];

/// Decrypt a raw `getva` reply and order its blocks as pac1, pac2, pac3.
pub fn decrypt_packet(encrypted: &[u8]) -> Result<Vec<u8>> {
    if encrypted.len() != PACKET_SIZE {
        return Err(Error::InvalidPacket(format!(
            "expected {PACKET_SIZE} bytes, got {}",
            encrypted.len()
        )));
    }
    let cipher = Aes256::new(GenericArray::from_slice(&PACKET_KEY));
    let mut plain = encrypted.to_vec();
    for block in plain.chunks_exact_mut(16) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    reorder_blocks(plain)
}

/// The meter sometimes returns the blocks out of order; the prefixes make
/// the intended order unambiguous. Errors if a prefix is missing, which
/// indicates garbage input or a failed decrypt.
fn reorder_blocks(plain: Vec<u8>) -> Result<Vec<u8>> {
    let in_order = plain[..4] == *b"pac1"
        && plain[BLOCK_SIZE..BLOCK_SIZE + 4] == *b"pac2"
        && plain[2 * BLOCK_SIZE..2 * BLOCK_SIZE + 4] == *b"pac3";
    if in_order {
        return Ok(plain);
    }
    let mut ordered = Vec::with_capacity(PACKET_SIZE);
    for prefix in [b"pac1", b"pac2", b"pac3"] {
        let block = plain
            .chunks_exact(BLOCK_SIZE)
            .find(|block| block[..4] == *prefix)
            .ok_or_else(|| {
                Error::InvalidPacket(format!(
                    "block \"{}\" missing after decrypt",
                    prefix.escape_ascii()
                ))
            })?;
        ordered.extend_from_slice(block);
    }
    Ok(ordered)
}

/// Test helper: encrypt a plaintext packet the way the meter would.
#[cfg(test)]
pub(crate) fn encrypt_packet(plain: &[u8]) -> Vec<u8> {
    use aes::cipher::BlockEncrypt;

    let cipher = Aes256::new(GenericArray::from_slice(&PACKET_KEY));
    let mut out = plain.to_vec();
    for block in out.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    out
}
