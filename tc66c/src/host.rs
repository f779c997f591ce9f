//! Host-side serial port discovery.
//!
//! The TC66C enumerates directly as an STM32 virtual COM port, while the
//! plain TC66 reaches the host through an external USB-UART bridge. Both
//! are classified from USB VID/PID so callers can pick a port without
//! probing it.

use crate::error::{Error, Result};

#[cfg(feature = "native")]
use log::{debug, info, trace};

/// Known USB device kinds a TC66 can show up as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// TC66/TC66C enumerating as an STM32 virtual COM port.
    Meter,
    /// CH340/CH341 USB-to-Serial converter.
    Ch340,
    /// Silicon Labs CP210x USB-to-Serial converter.
    Cp210x,
    /// FTDI FT232/FT2232/FT4232 USB-to-Serial converter.
    Ftdi,
    /// Prolific PL2303 USB-to-Serial converter.
    Prolific,
    /// Unknown device.
    Unknown,
}

/// Known USB VID/PID pairs: the meter's own VCP plus common UART bridges.
const KNOWN_USB_DEVICES: &[(u16, &[u16], DeviceKind)] = &[
    (0x0483, &[0x5740], DeviceKind::Meter),
    (
        0x1A86,
        &[0x7523, 0x7522, 0x5523, 0x5512, 0x55D4],
        DeviceKind::Ch340,
    ),
    (0x10C4, &[0xEA60, 0xEA70, 0xEA71, 0xEA63], DeviceKind::Cp210x),
    (
        0x0403,
        &[0x6001, 0x6010, 0x6011, 0x6014, 0x6015],
        DeviceKind::Ftdi,
    ),
    (0x067B, &[0x2303, 0x23A3, 0x23C3, 0x23D3], DeviceKind::Prolific),
];

impl DeviceKind {
    /// Classify a USB VID/PID combination.
    #[must_use]
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        for (known_vid, pids, device) in KNOWN_USB_DEVICES {
            if vid == *known_vid && pids.contains(&pid) {
                return *device;
            }
        }
        Self::Unknown
    }

    /// Get a human-readable name for the device kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Meter => "TC66 meter",
            Self::Ch340 => "CH340/CH341",
            Self::Cp210x => "CP210x",
            Self::Ftdi => "FTDI",
            Self::Prolific => "PL2303",
            Self::Unknown => "Unknown",
        }
    }

    /// Check if this is a known/expected device kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Check if this is a USB-UART bridge rather than the meter itself.
    pub fn is_bridge(&self) -> bool {
        matches!(self, Self::Ch340 | Self::Cp210x | Self::Ftdi | Self::Prolific)
    }
}

/// Discovered serial endpoint information.
#[derive(Debug, Clone)]
pub struct DetectedPort {
    /// Endpoint name/path (e.g., "/dev/ttyACM0" or "COM3").
    pub name: String,
    /// Classified device kind.
    pub device: DeviceKind,
    /// USB Vendor ID (if available).
    pub vid: Option<u16>,
    /// USB Product ID (if available).
    pub pid: Option<u16>,
    /// Device manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Device product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial: Option<String>,
}

impl DetectedPort {
    /// Check if this endpoint is likely a TC66 or its serial bridge.
    pub fn is_likely_meter(&self) -> bool {
        self.device.is_known()
    }
}

/// Detect all available serial endpoints with metadata.
#[cfg(feature = "native")]
pub fn detect_ports() -> Vec<DetectedPort> {
    let mut result = Vec::new();

    match serialport::available_ports() {
        Ok(ports) => {
            for port_info in ports {
                let mut detected = DetectedPort {
                    name: port_info.port_name.clone(),
                    device: DeviceKind::Unknown,
                    vid: None,
                    pid: None,
                    manufacturer: None,
                    product: None,
                    serial: None,
                };

                if let serialport::SerialPortType::UsbPort(usb_info) = port_info.port_type {
                    detected.vid = Some(usb_info.vid);
                    detected.pid = Some(usb_info.pid);
                    detected.manufacturer = usb_info.manufacturer;
                    detected.product = usb_info.product;
                    detected.serial = usb_info.serial_number;
                    detected.device = DeviceKind::from_vid_pid(usb_info.vid, usb_info.pid);

                    trace!(
                        "Found USB port: {} (VID: {:04X}, PID: {:04X}, Device: {:?})",
                        port_info.port_name, usb_info.vid, usb_info.pid, detected.device
                    );
                }

                result.push(detected);
            }
        },
        Err(e) => {
            debug!("Failed to enumerate serial ports: {e}");
        },
    }

    result
}

/// Detect all available serial endpoints (stub without native support).
#[cfg(not(feature = "native"))]
pub fn detect_ports() -> Vec<DetectedPort> {
    Vec::new()
}

/// Detect endpoints that are likely TC66 meters or their serial bridges.
pub fn detect_meter_ports() -> Vec<DetectedPort> {
    detect_ports()
        .into_iter()
        .filter(DetectedPort::is_likely_meter)
        .collect()
}

/// Auto-detect the meter's serial port.
///
/// Preference order: a port with the meter's own USB IDs, then a known
/// USB-UART bridge, then a lone remaining port. Multiple unclassified
/// ports fail detection instead of guessing.
#[cfg(feature = "native")]
pub fn auto_detect_port() -> Result<DetectedPort> {
    let ports = detect_ports();

    if let Some(port) = ports.iter().find(|p| p.device == DeviceKind::Meter) {
        info!("Auto-detected TC66 meter: {}", port.name);
        return Ok(port.clone());
    }

    if let Some(port) = ports.iter().find(|p| p.device.is_bridge()) {
        info!(
            "Auto-detected {} USB-UART bridge: {}",
            port.device.name(),
            port.name
        );
        return Ok(port.clone());
    }

    if let [port] = ports.as_slice() {
        info!("Using the only available port: {}", port.name);
        return Ok(port.clone());
    }

    Err(Error::DeviceNotFound)
}

/// Auto-detect the meter's serial port (stub without native support).
#[cfg(not(feature = "native"))]
pub fn auto_detect_port() -> Result<DetectedPort> {
    Err(Error::DeviceNotFound)
}

/// Find an endpoint whose name contains `pattern`.
#[cfg(feature = "native")]
pub fn find_port_by_pattern(pattern: &str) -> Result<DetectedPort> {
    let ports = detect_ports();

    ports
        .into_iter()
        .find(|p| p.name.contains(pattern))
        .ok_or(Error::DeviceNotFound)
}

/// Find an endpoint by name pattern (stub without native support).
#[cfg(not(feature = "native"))]
pub fn find_port_by_pattern(_pattern: &str) -> Result<DetectedPort> {
    Err(Error::DeviceNotFound)
}

/// Format a list of detected endpoints for display.
pub fn format_port_list(ports: &[DetectedPort]) -> Vec<String> {
    let mut result = Vec::new();

    for port in ports {
        let device_info = if port.device.is_known() {
            format!(" [{}]", port.device.name())
        } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            format!(" [VID:{vid:04X} PID:{pid:04X}]")
        } else {
            String::new()
        };

        let product_info = port
            .product
            .as_ref()
            .map(|p| format!(" - {p}"))
            .unwrap_or_default();

        result.push(format!("{}{}{}", port.name, device_info, product_info));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, device: DeviceKind, vid: Option<u16>, pid: Option<u16>) -> DetectedPort {
        DetectedPort {
            name: name.to_string(),
            device,
            vid,
            pid,
            manufacturer: None,
            product: None,
            serial: None,
        }
    }

    #[test]
    fn test_device_kind_from_vid_pid() {
        assert_eq!(DeviceKind::from_vid_pid(0x0483, 0x5740), DeviceKind::Meter);
        assert_eq!(DeviceKind::from_vid_pid(0x1A86, 0x7523), DeviceKind::Ch340);
        assert_eq!(DeviceKind::from_vid_pid(0x10C4, 0xEA60), DeviceKind::Cp210x);
        assert_eq!(DeviceKind::from_vid_pid(0x0403, 0x6001), DeviceKind::Ftdi);
        assert_eq!(DeviceKind::from_vid_pid(0x067B, 0x2303), DeviceKind::Prolific);
        assert_eq!(DeviceKind::from_vid_pid(0x1234, 0x5678), DeviceKind::Unknown);
    }

    #[test]
    fn test_st_vid_with_other_pid_is_unknown() {
        // VID 0x0483 covers all of STMicroelectronics; only the VCP PID
        // marks a meter.
        assert_eq!(DeviceKind::from_vid_pid(0x0483, 0x3748), DeviceKind::Unknown);
    }

    #[test]
    fn test_device_kind_classification() {
        assert!(DeviceKind::Meter.is_known());
        assert!(!DeviceKind::Meter.is_bridge());
        assert!(DeviceKind::Ch340.is_known());
        assert!(DeviceKind::Ch340.is_bridge());
        assert!(!DeviceKind::Unknown.is_known());
        assert!(!DeviceKind::Unknown.is_bridge());
    }

    #[test]
    fn test_detected_port_is_likely_meter() {
        let meter = port("/dev/ttyACM0", DeviceKind::Meter, Some(0x0483), Some(0x5740));
        assert!(meter.is_likely_meter());

        let bridge = port("/dev/ttyUSB0", DeviceKind::Ch340, Some(0x1A86), Some(0x7523));
        assert!(bridge.is_likely_meter());

        let unknown = port("/dev/ttyS0", DeviceKind::Unknown, None, None);
        assert!(!unknown.is_likely_meter());
    }

    #[test]
    fn test_format_port_list() {
        let mut with_product = port(
            "/dev/ttyACM0",
            DeviceKind::Meter,
            Some(0x0483),
            Some(0x5740),
        );
        with_product.product = Some("TC66C".to_string());
        let ports = vec![with_product, port("/dev/ttyUSB1", DeviceKind::Unknown, None, None)];

        let formatted = format_port_list(&ports);
        assert_eq!(formatted.len(), 2);
        assert!(formatted[0].contains("/dev/ttyACM0"));
        assert!(formatted[0].contains("TC66 meter"));
        assert!(formatted[0].contains("TC66C"));
        assert!(formatted[1].contains("/dev/ttyUSB1"));
    }

    #[test]
    fn test_format_port_list_unknown_usb_ids() {
        let unknown_usb = port("/dev/ttyUSB2", DeviceKind::Unknown, Some(0x1234), Some(0x5678));
        let formatted = format_port_list(&[unknown_usb]);
        assert!(formatted[0].contains("VID:1234"));
        assert!(formatted[0].contains("PID:5678"));
    }
}
