//! Probe collaborators — read-only accessors to live device state.
//!
//! Each probe is a single best-effort snapshot. Implementations that can
//! block are expected to enforce their own deadline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::metric::Color;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe not available on this device")]
    Unavailable,
    #[error("probe returned no reading")]
    NoReading,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command `{program}` failed or timed out")]
    Command { program: String },
    #[error("could not parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

pub type ProbeResult<T> = Result<T, ProbeError>;

pub trait DeviceIdentity: Send + Sync {
    fn model(&self) -> ProbeResult<String>;
    fn os_version(&self) -> ProbeResult<String>;
    fn build_id(&self) -> ProbeResult<String>;
}

pub trait BatteryProbe: Send + Sync {
    /// Charge level as a percentage, `None` when there is no reading.
    fn level(&self) -> ProbeResult<Option<i32>>;
}

pub trait CarrierProbe: Send + Sync {
    fn operator_name(&self) -> ProbeResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Wifi,
    Mobile,
    Ethernet,
    Other,
}

/// Snapshot of the active network as reported by the connectivity source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNetwork {
    pub connected: bool,
    pub kind: NetworkKind,
    pub ssid: String,
    pub rssi: i32,
    /// IPv4 address packed with the first octet in bits 0–7.
    pub ip_address: u32,
    pub signal_levels: u32,
}

pub trait ConnectivityProbe: Send + Sync {
    /// `None` when there is no active network at all.
    fn active_network(&self) -> ProbeResult<Option<ActiveNetwork>>;
}

pub trait AlarmProbe: Send + Sync {
    fn next_alarm(&self) -> ProbeResult<Option<DateTime<Utc>>>;
}

pub trait UptimeProbe: Send + Sync {
    /// Milliseconds since boot on a monotonic clock.
    fn uptime_millis(&self) -> ProbeResult<u64>;
}

pub trait LockProbe: Send + Sync {
    fn is_locked(&self) -> ProbeResult<bool>;
}

/// Read-only settings store backing visibility toggles and colors.
pub trait SettingsSource: Send + Sync {
    fn get_bool(&self, name: &str, default: bool) -> bool;
    fn get_color(&self, name: &str, default: Color) -> Color;
}

/// The set of collaborators the registry may consult. Any may be absent.
#[derive(Clone, Default)]
pub struct Probes {
    pub identity: Option<Arc<dyn DeviceIdentity>>,
    pub battery: Option<Arc<dyn BatteryProbe>>,
    pub carrier: Option<Arc<dyn CarrierProbe>>,
    pub connectivity: Option<Arc<dyn ConnectivityProbe>>,
    pub alarm: Option<Arc<dyn AlarmProbe>>,
    pub uptime: Option<Arc<dyn UptimeProbe>>,
}

impl Probes {
    pub fn identity(&self) -> ProbeResult<&dyn DeviceIdentity> {
        self.identity.as_deref().ok_or(ProbeError::Unavailable)
    }

    pub fn battery(&self) -> ProbeResult<&dyn BatteryProbe> {
        self.battery.as_deref().ok_or(ProbeError::Unavailable)
    }

    pub fn carrier(&self) -> ProbeResult<&dyn CarrierProbe> {
        self.carrier.as_deref().ok_or(ProbeError::Unavailable)
    }

    pub fn connectivity(&self) -> ProbeResult<&dyn ConnectivityProbe> {
        self.connectivity.as_deref().ok_or(ProbeError::Unavailable)
    }

    pub fn alarm(&self) -> ProbeResult<&dyn AlarmProbe> {
        self.alarm.as_deref().ok_or(ProbeError::Unavailable)
    }

    pub fn uptime(&self) -> ProbeResult<&dyn UptimeProbe> {
        self.uptime.as_deref().ok_or(ProbeError::Unavailable)
    }
}
