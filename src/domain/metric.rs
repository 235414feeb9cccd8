//! Metric keys, resolved values, and the render items handed to presenters.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEVICE_MODEL: &str = "device_model";
pub const DEVICE_ANDROID_VERSION: &str = "device_android_version";
pub const DEVICE_BUILD_VERSION: &str = "device_build_version";
pub const DEVICE_BATTERY_LEVEL: &str = "device_battery_level";
pub const DEVICE_NETWORK_NAME: &str = "device_network_name";
pub const DEVICE_WIFI_INFO: &str = "device_wifi_info";
pub const DEVICE_NEXT_ALARM: &str = "device_next_alarm";
pub const DEVICE_UP_TIME: &str = "device_up_time";

/// Every key the registry knows, in default render order.
pub const KNOWN_KEYS: [&str; 8] = [
    DEVICE_MODEL,
    DEVICE_ANDROID_VERSION,
    DEVICE_BUILD_VERSION,
    DEVICE_BATTERY_LEVEL,
    DEVICE_NETWORK_NAME,
    DEVICE_WIFI_INFO,
    DEVICE_NEXT_ALARM,
    DEVICE_UP_TIME,
];

/// Titles paired with `KNOWN_KEYS` by position.
pub const DEFAULT_TITLES: [&str; 8] = [
    "Model",
    "OS version",
    "Build number",
    "Battery level",
    "Network",
    "Wi-Fi",
    "Next alarm",
    "Up time",
];

/// Sentinel shown when a probe has nothing usable to report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Opaque metric identifier. Unknown keys are valid and resolve to "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricKey(String);

impl MetricKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resolved display string for a key. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricValue(String);

impl MetricValue {
    pub fn not_available() -> Self {
        Self(NOT_AVAILABLE.to_string())
    }

    /// Wrap a probe result, falling back to the sentinel when it is blank.
    pub fn from_display(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::not_available()
        } else {
            Self(value)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_available(&self) -> bool {
        self.0 != NOT_AVAILABLE
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const BLACK: Color = Color(0xFF00_0000);

    pub fn red(self) -> u8 {
        (self.0 >> 16 & 0xff) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8 & 0xff) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let raw = u32::from_str_radix(hex, 16)
                .with_context(|| format!("invalid hex color '{}'", s))?;
            return match hex.len() {
                6 => Ok(Color(0xFF00_0000 | raw)),
                8 => Ok(Color(raw)),
                _ => bail!("hex color '{}' must be #RRGGBB or #AARRGGBB", s),
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(Color::WHITE),
            "black" => Ok(Color::BLACK),
            "red" => Ok(Color(0xFFFF_0000)),
            "green" => Ok(Color(0xFF00_FF00)),
            "blue" => Ok(Color(0xFF00_00FF)),
            "yellow" => Ok(Color(0xFFFF_FF00)),
            "cyan" => Ok(Color(0xFF00_FFFF)),
            "magenta" => Ok(Color(0xFFFF_00FF)),
            "gray" | "grey" => Ok(Color(0xFF88_8888)),
            other => other
                .parse::<i64>()
                .map(|v| Color(v as u32))
                .with_context(|| format!("unknown color '{}'", other)),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStyle {
    pub title_color: Color,
    pub value_color: Color,
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self {
            title_color: Color::WHITE,
            value_color: Color::WHITE,
        }
    }
}

/// One (title, value) row of the render sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderItem {
    pub key: MetricKey,
    pub title: String,
    pub value: MetricValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ItemStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_fall_back_to_sentinel() {
        assert_eq!(MetricValue::from_display("").as_str(), NOT_AVAILABLE);
        assert_eq!(MetricValue::from_display("   ").as_str(), NOT_AVAILABLE);
        assert_eq!(MetricValue::from_display("Pixel 7").as_str(), "Pixel 7");
        assert!(!MetricValue::not_available().is_available());
    }

    #[test]
    fn known_keys_and_titles_line_up() {
        assert_eq!(KNOWN_KEYS.len(), DEFAULT_TITLES.len());
        assert_eq!(MetricKey::from(DEVICE_UP_TIME).as_str(), "device_up_time");
    }

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!("#FF8800".parse::<Color>().unwrap(), Color(0xFFFF_8800));
        assert_eq!("#80FF8800".parse::<Color>().unwrap(), Color(0x80FF_8800));
        assert_eq!("White".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("-1".parse::<Color>().unwrap(), Color::WHITE);
        assert!("#FFF".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn color_channels() {
        let c = Color(0x80112233);
        assert_eq!((c.red(), c.green(), c.blue()), (0x11, 0x22, 0x33));
        assert_eq!(c.to_string(), "#80112233");
    }
}
