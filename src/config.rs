use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::metric::{Color, MetricKey, DEFAULT_TITLES, KNOWN_KEYS};
use crate::domain::probes::SettingsSource;
use crate::domain::report_service::{
    MetricLayout, TITLE_COLOR_SETTING, VALUE_COLOR_SETTING, VISIBILITY_SETTING,
};

const ENV_PREFIX: &str = "DEVINFO_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deadline for any external command a probe runs.
    pub probe_timeout_ms: u64,
    /// Resolve metrics on scoped threads instead of one after another.
    pub parallel_probes: bool,
    pub display: DisplayConfig,
    pub settings: BTreeMap<String, SettingValue>,
    pub watch: WatchConfig,
    pub daemon: DaemonConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut settings = BTreeMap::new();
        settings.insert(VISIBILITY_SETTING.to_string(), SettingValue::Bool(true));
        settings.insert(
            TITLE_COLOR_SETTING.to_string(),
            SettingValue::Text(Color::WHITE.to_string()),
        );
        settings.insert(
            VALUE_COLOR_SETTING.to_string(),
            SettingValue::Text(Color::WHITE.to_string()),
        );
        for key in KNOWN_KEYS {
            settings.insert(key.to_string(), SettingValue::Bool(true));
        }

        Self {
            probe_timeout_ms: 2000,
            parallel_probes: false,
            display: DisplayConfig::default(),
            settings,
            watch: WatchConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub keys: Vec<String>,
    pub titles: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            keys: KNOWN_KEYS.iter().map(|k| k.to_string()).collect(),
            titles: DEFAULT_TITLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub http_addr: String,
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:9190".into(),
            log_level: "info".into(),
        }
    }
}

/// A raw setting as stored in the file or environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("devinfo").join("config.yaml"))
    }

    /// Defaults, then the YAML file, then `DEVINFO_*` environment variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("parsing configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate keys. Length mismatches are left for the report
    /// build to surface.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.display.keys {
            if !seen.insert(key.as_str()) {
                bail!("metric key '{}' is listed more than once", key);
            }
        }
        Ok(())
    }
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::path()?,
    };
    Config::from_figment(Config::figment(&path))
        .with_context(|| format!("loading {}", path.display()))
}

/// Write the default configuration, refusing to clobber an existing file
/// unless `force` is set.
pub fn write_default(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let content = serde_yaml::to_string(&Config::default()).context("serializing config")?;
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

impl SettingsSource for Config {
    fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.settings.get(name) {
            Some(SettingValue::Bool(b)) => *b,
            Some(SettingValue::Int(i)) => *i != 0,
            Some(SettingValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => {
                    warn!(setting = name, value = %s, "not a boolean, using default");
                    default
                }
            },
            None => default,
        }
    }

    fn get_color(&self, name: &str, default: Color) -> Color {
        match self.settings.get(name) {
            Some(SettingValue::Int(i)) => Color(*i as u32),
            Some(SettingValue::Text(s)) => s.parse().unwrap_or_else(|e| {
                warn!(setting = name, error = %e, "invalid color, using default");
                default
            }),
            _ => default,
        }
    }
}

impl MetricLayout for Config {
    fn keys(&self) -> Vec<MetricKey> {
        self.display.keys.iter().map(|k| MetricKey::new(k.as_str())).collect()
    }

    fn titles(&self) -> Vec<String> {
        self.display.titles.clone()
    }
}
