//! Port listing command implementation.

use console::style;
use serde_json::json;
use tc66c::{DetectedPort, auto_detect_port, detect_ports};

/// List-ports command implementation.
pub(crate) fn cmd_list_ports(json: bool) {
    let ports = detect_ports();

    if json {
        let list: Vec<serde_json::Value> = ports.iter().map(port_json).collect();
        println!("{:#}", serde_json::Value::Array(list));
        return;
    }

    eprintln!("{}", style("Available serial ports:").bold());

    if ports.is_empty() {
        eprintln!("{}", style("  (none found)").dim());
        return;
    }

    for port in &ports {
        let device_info = if port.device.is_known() {
            format!(" [{}]", style(port.device.name()).yellow())
        } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            format!(" ({vid:04X}:{pid:04X})")
        } else {
            String::new()
        };

        let product = port
            .product
            .as_ref()
            .map(|p| format!(" - {}", style(p).dim()))
            .unwrap_or_default();

        eprintln!(
            "  {} {}{device_info}{product}",
            style("•").dim(),
            style(&port.name).bold()
        );
    }

    if let Ok(auto) = auto_detect_port() {
        eprintln!(
            "\n{} Would auto-select: {}",
            style("ℹ").blue(),
            style(&auto.name).bold()
        );
    }
}

fn port_json(port: &DetectedPort) -> serde_json::Value {
    json!({
        "name": port.name,
        "device": port.device.name(),
        "known": port.device.is_known(),
        "vid": port.vid,
        "pid": port.pid,
        "manufacturer": port.manufacturer,
        "product": port.product,
        "serial": port.serial,
    })
}
