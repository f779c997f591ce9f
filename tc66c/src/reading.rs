//! Decoded measurement data.
//!
//! A decrypted `getva` packet carries three 64-byte blocks:
//!
//! ```text
//! pac1: +0 "pac1"  +4 product  +8 version  +12 serial  +44 run count
//!       +48 voltage(1e-4 V)  +52 current(1e-5 A)  +56 power(1e-4 W)
//!       +60 crc16
//! pac2: +4 resistance(1e-2 ohm)  +8/+12 group0 mAh/mWh
//!       +16/+20 group1 mAh/mWh  +24 temp sign  +28 temperature(C)
//!       +32 D+(1e-2 V)  +36 D-(1e-2 V)  +60 crc16
//! pac3: +0 "pac3"  +60 crc16  (payload reserved)
//! ```
//!
//! All fields are little-endian u32 unless noted. Each block stores a
//! CRC-16/MODBUS over its first 60 bytes.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::crc::verify_checksum;
use crate::protocol::{BLOCK_SIZE, PACKET_SIZE, RECORD_SIZE};

/// One decoded measurement sample, plus the device identity fields the
/// meter reports alongside it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Product name (e.g. "TC66").
    pub product: String,
    /// Firmware version (e.g. "1.14").
    pub version: String,
    /// Device serial number.
    pub serial_number: u32,
    /// How many times the device has booted.
    pub run_count: u32,
    /// Bus voltage in volts.
    pub voltage: f64,
    /// Current in amperes.
    pub current: f64,
    /// Power in watts.
    pub power: f64,
    /// Load resistance in ohms.
    pub resistance: f64,
    /// Accumulated charge of group 0 in mAh.
    pub group0_mah: u32,
    /// Accumulated energy of group 0 in mWh.
    pub group0_mwh: u32,
    /// Accumulated charge of group 1 in mAh.
    pub group1_mah: u32,
    /// Accumulated energy of group 1 in mWh.
    pub group1_mwh: u32,
    /// Board temperature in degrees Celsius, signed.
    pub temperature: f64,
    /// USB D+ line voltage in volts.
    pub d_plus: f64,
    /// USB D- line voltage in volts.
    pub d_minus: f64,
}

impl Reading {
    /// Parse a decrypted, pac1/pac2/pac3-ordered measurement packet.
    ///
    /// Verifies the prefix and the stored CRC of every block before any
    /// field is trusted.
    pub fn from_packet(packet: &[u8]) -> Result<Self> {
        if packet.len() != PACKET_SIZE {
            return Err(Error::InvalidPacket(format!(
                "expected {PACKET_SIZE} bytes, got {}",
                packet.len()
            )));
        }

        let pac1 = &packet[..BLOCK_SIZE];
        let pac2 = &packet[BLOCK_SIZE..2 * BLOCK_SIZE];
        let pac3 = &packet[2 * BLOCK_SIZE..];
        for (name, block) in [("pac1", pac1), ("pac2", pac2), ("pac3", pac3)] {
            if block[..4] != *name.as_bytes() {
                return Err(Error::InvalidPacket(format!(
                    "block {name} has prefix \"{}\"",
                    block[..4].escape_ascii()
                )));
            }
            verify_checksum(name, &block[..60], LittleEndian::read_u16(&block[60..62]))?;
        }

        let temperature_raw = f64::from(LittleEndian::read_u32(&pac2[28..32]));
        let temperature = if LittleEndian::read_u32(&pac2[24..28]) == 0 {
            temperature_raw
        } else {
            -temperature_raw
        };

        Ok(Self {
            product: trimmed_ascii(&pac1[4..8]),
            version: trimmed_ascii(&pac1[8..12]),
            serial_number: LittleEndian::read_u32(&pac1[12..16]),
            run_count: LittleEndian::read_u32(&pac1[44..48]),
            voltage: f64::from(LittleEndian::read_u32(&pac1[48..52])) / 10_000.0,
            current: f64::from(LittleEndian::read_u32(&pac1[52..56])) / 100_000.0,
            power: f64::from(LittleEndian::read_u32(&pac1[56..60])) / 10_000.0,
            resistance: f64::from(LittleEndian::read_u32(&pac2[4..8])) / 100.0,
            group0_mah: LittleEndian::read_u32(&pac2[8..12]),
            group0_mwh: LittleEndian::read_u32(&pac2[12..16]),
            group1_mah: LittleEndian::read_u32(&pac2[16..20]),
            group1_mwh: LittleEndian::read_u32(&pac2[20..24]),
            temperature,
            d_plus: f64::from(LittleEndian::read_u32(&pac2[32..36])) / 100.0,
            d_minus: f64::from(LittleEndian::read_u32(&pac2[36..40])) / 100.0,
        })
    }

    /// Compact single-line rendering, for polling output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "V: {:.4} V | I: {:.5} A | P: {:.4} W | R: {:.2} Ω | T: {:.1} °C",
            self.voltage, self.current, self.power, self.resistance, self.temperature
        )
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} v{} (serial {}, {} runs)",
            self.product, self.version, self.serial_number, self.run_count
        )?;
        writeln!(f, "Voltage:     {:.4} V", self.voltage)?;
        writeln!(f, "Current:     {:.5} A", self.current)?;
        writeln!(f, "Power:       {:.4} W", self.power)?;
        writeln!(f, "Resistance:  {:.2} Ω", self.resistance)?;
        writeln!(f, "Group 0:     {} mAh / {} mWh", self.group0_mah, self.group0_mwh)?;
        writeln!(f, "Group 1:     {} mAh / {} mWh", self.group1_mah, self.group1_mwh)?;
        writeln!(f, "Temperature: {:.1} °C", self.temperature)?;
        write!(f, "USB data:    D+ {:.2} V, D- {:.2} V", self.d_plus, self.d_minus)
    }
}

/// One sample from the on-device recording buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordingEntry {
    /// Bus voltage in volts.
    pub voltage: f64,
    /// Current in amperes.
    pub current: f64,
}

/// Parse a raw `gtrec` stream into entries.
///
/// Entries are two little-endian u32 values (voltage in 1e-4 V, current
/// in 1e-5 A). A trailing partial entry is dropped.
#[must_use]
pub fn parse_recordings(data: &[u8]) -> Vec<RecordingEntry> {
    data.chunks_exact(RECORD_SIZE)
        .map(|entry| RecordingEntry {
            voltage: f64::from(LittleEndian::read_u32(&entry[..4])) / 10_000.0,
            current: f64::from(LittleEndian::read_u32(&entry[4..8])) / 100_000.0,
        })
        .collect()
}

fn trimmed_ascii(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .to_string()
}

/// Test helper: assemble a CRC-valid plaintext packet with representative
/// field values (5.1234 V, 1.23456 A, -3 °C).
#[cfg(test)]
pub(crate) fn sample_packet() -> Vec<u8> {
    use crate::protocol::crc::crc16_modbus;

    let mut pac1 = [0u8; BLOCK_SIZE];
    pac1[..4].copy_from_slice(b"pac1");
    pac1[4..8].copy_from_slice(b"TC66");
    pac1[8..12].copy_from_slice(b"1.14");
    LittleEndian::write_u32(&mut pac1[12..16], 16_777);
    LittleEndian::write_u32(&mut pac1[44..48], 42);
    LittleEndian::write_u32(&mut pac1[48..52], 51_234); // 5.1234 V
    LittleEndian::write_u32(&mut pac1[52..56], 123_456); // 1.23456 A
    LittleEndian::write_u32(&mut pac1[56..60], 63_255); // 6.3255 W

    let mut pac2 = [0u8; BLOCK_SIZE];
    pac2[..4].copy_from_slice(b"pac2");
    LittleEndian::write_u32(&mut pac2[4..8], 415); // 4.15 ohm
    LittleEndian::write_u32(&mut pac2[8..12], 1_200);
    LittleEndian::write_u32(&mut pac2[12..16], 6_100);
    LittleEndian::write_u32(&mut pac2[16..20], 7);
    LittleEndian::write_u32(&mut pac2[20..24], 35);
    LittleEndian::write_u32(&mut pac2[24..28], 1); // negative temperature
    LittleEndian::write_u32(&mut pac2[28..32], 3);
    LittleEndian::write_u32(&mut pac2[32..36], 280); // 2.80 V
    LittleEndian::write_u32(&mut pac2[36..40], 59); // 0.59 V

    let mut pac3 = [0u8; BLOCK_SIZE];
    pac3[..4].copy_from_slice(b"pac3");

    let mut packet = Vec::with_capacity(PACKET_SIZE);
    for block in [&mut pac1, &mut pac2, &mut pac3] {
        let crc = crc16_modbus(&block[..60]);
        LittleEndian::write_u16(&mut block[60..62], crc);
        packet.extend_from_slice(&block[..]);
    }
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc16_modbus;

    #[test]
    fn test_from_packet_decodes_fields() {
        let reading = Reading::from_packet(&sample_packet()).unwrap();
        assert_eq!(reading.product, "TC66");
        assert_eq!(reading.version, "1.14");
        assert_eq!(reading.serial_number, 16_777);
        assert_eq!(reading.run_count, 42);
        assert!((reading.voltage - 5.1234).abs() < 1e-9);
        assert!((reading.current - 1.23456).abs() < 1e-9);
        assert!((reading.power - 6.3255).abs() < 1e-9);
        assert!((reading.resistance - 4.15).abs() < 1e-9);
        assert_eq!(reading.group0_mah, 1_200);
        assert_eq!(reading.group0_mwh, 6_100);
        assert_eq!(reading.group1_mah, 7);
        assert_eq!(reading.group1_mwh, 35);
        assert!((reading.temperature - (-3.0)).abs() < 1e-9);
        assert!((reading.d_plus - 2.80).abs() < 1e-9);
        assert!((reading.d_minus - 0.59).abs() < 1e-9);
    }

    #[test]
    fn test_from_packet_rejects_corrupted_block() {
        let mut packet = sample_packet();
        packet[BLOCK_SIZE + 10] ^= 0xFF; // inside pac2 payload
        let err = Reading::from_packet(&packet).unwrap_err();
        match err {
            Error::ChecksumMismatch { block, .. } => assert_eq!(block, "pac2"),
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn test_from_packet_rejects_bad_prefix() {
        let mut packet = sample_packet();
        packet[0] = b'q';
        assert!(matches!(
            Reading::from_packet(&packet),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_from_packet_rejects_short_input() {
        assert!(matches!(
            Reading::from_packet(&[0u8; 100]),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_positive_temperature() {
        let mut packet = sample_packet();
        LittleEndian::write_u32(&mut packet[BLOCK_SIZE + 24..BLOCK_SIZE + 28], 0);
        LittleEndian::write_u32(&mut packet[BLOCK_SIZE + 28..BLOCK_SIZE + 32], 26);
        let crc = crc16_modbus(&packet[BLOCK_SIZE..BLOCK_SIZE + 60]);
        LittleEndian::write_u16(&mut packet[BLOCK_SIZE + 60..BLOCK_SIZE + 62], crc);

        let reading = Reading::from_packet(&packet).unwrap();
        assert!((reading.temperature - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_recordings() {
        let mut data = Vec::new();
        for (volts, amps) in [(50_000u32, 10_000u32), (49_500, 20_000), (51_000, 0)] {
            let mut entry = [0u8; RECORD_SIZE];
            LittleEndian::write_u32(&mut entry[..4], volts);
            LittleEndian::write_u32(&mut entry[4..], amps);
            data.extend_from_slice(&entry);
        }
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]); // trailing partial entry

        let entries = parse_recordings(&data);
        assert_eq!(entries.len(), 3);
        assert!((entries[0].voltage - 5.0).abs() < 1e-9);
        assert!((entries[0].current - 0.1).abs() < 1e-9);
        assert!((entries[1].voltage - 4.95).abs() < 1e-9);
        assert!((entries[2].current).abs() < 1e-9);
    }

    #[test]
    fn test_summary_is_single_line() {
        let reading = Reading::from_packet(&sample_packet()).unwrap();
        let line = reading.summary();
        assert!(!line.contains('\n'));
        assert!(line.contains("5.1234"));
    }
}
