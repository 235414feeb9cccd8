//! Per-metric formatting rules.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use super::metric::NOT_AVAILABLE;
use super::probes::{ActiveNetwork, NetworkKind};

pub const WIFI_DISCONNECTED: &str = "Wifi disconnected";
pub const ALARM_NOT_SET: &str = "Alarm not set";

/// Number of buckets RSSI is quantised into.
pub const SIGNAL_LEVELS: u32 = 10;

const MIN_RSSI: i32 = -100;
const MAX_RSSI: i32 = -55;

/// Battery percentage, or the sentinel when the reading is missing or out of range.
pub fn format_battery(level: Option<i32>) -> String {
    match level {
        Some(pct) if (0..=100).contains(&pct) => format!("{}%", pct),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Quantise an RSSI reading (dBm) into `0..levels`.
pub fn signal_level(rssi: i32, levels: u32) -> u32 {
    if levels < 2 {
        return 0;
    }
    if rssi <= MIN_RSSI {
        0
    } else if rssi >= MAX_RSSI {
        levels - 1
    } else {
        let span = (MAX_RSSI - MIN_RSSI) as u64;
        let level = (rssi - MIN_RSSI) as u64 * u64::from(levels - 1) / span;
        level as u32
    }
}

/// Dotted quad from an address whose first octet lives in the low byte.
///
/// This is little-endian, not network byte order, and must stay that way.
pub fn format_ip(ip: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        ip & 0xff,
        ip >> 8 & 0xff,
        ip >> 16 & 0xff,
        ip >> 24 & 0xff
    )
}

/// Pack IPv4 octets the way `format_ip` expects them.
pub fn pack_ip(octets: [u8; 4]) -> u32 {
    u32::from_le_bytes(octets)
}

pub fn format_wifi(network: Option<&ActiveNetwork>) -> String {
    match network {
        Some(net) if net.connected && net.kind == NetworkKind::Wifi => {
            let strength = u64::from(signal_level(net.rssi, net.signal_levels)) * 10;
            format!(
                "{}, signal strength is {}%, IP {}",
                net.ssid,
                strength,
                format_ip(net.ip_address)
            )
        }
        _ => WIFI_DISCONNECTED.to_string(),
    }
}

/// `"<HH> hrs <MM> mins"`; hours are not wrapped at 24.
pub fn format_uptime(millis: u64) -> String {
    let total_minutes = millis / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes - hours * 60;
    format!("{:02} hrs {:02} mins", hours, minutes)
}

/// `"Tue, Mar 4, 07:30"` in whatever zone `at` carries.
pub fn format_alarm<Tz>(at: Option<DateTime<Tz>>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match at {
        Some(at) => at.format("%a, %b %-d, %H:%M").to_string(),
        None => ALARM_NOT_SET.to_string(),
    }
}
