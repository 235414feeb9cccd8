//! Report service — reads visibility, lock state and colors for one build
//! and wraps the render sequence into a `DeviceReport`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::host_probes::HostProbes;
use super::metric::{Color, ItemStyle, MetricKey, RenderItem};
use super::probes::{LockProbe, Probes, SettingsSource};
use super::registry::MetricRegistry;
use super::report_builder::{ReportBuilder, ReportError};

/// Master toggle for the whole report.
pub const VISIBILITY_SETTING: &str = "device_info_visibility";
pub const TITLE_COLOR_SETTING: &str = "gear_info_names_color";
pub const VALUE_COLOR_SETTING: &str = "gear_info_values_color";

/// Source of the ordered key list and its position-matched titles.
pub trait MetricLayout: Send + Sync {
    fn keys(&self) -> Vec<MetricKey>;
    fn titles(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub visible: bool,
    pub items: Vec<RenderItem>,
}

pub struct ReportService {
    registry: MetricRegistry,
    lock: Option<Arc<dyn LockProbe>>,
    parallel: bool,
}

impl ReportService {
    pub fn new(probes: Probes, lock: Option<Arc<dyn LockProbe>>) -> Self {
        Self {
            registry: MetricRegistry::new(probes),
            lock,
            parallel: false,
        }
    }

    /// Service backed by this machine's probes.
    pub fn for_host(probe_timeout: Duration) -> Self {
        let host = HostProbes::new(probe_timeout);
        Self::new(host.probes(), Some(host.lock_probe()))
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Build one report. Settings are consulted fresh on every call.
    pub fn snapshot(
        &self,
        layout: &dyn MetricLayout,
        settings: &dyn SettingsSource,
    ) -> Result<DeviceReport, ReportError> {
        let visible = settings.get_bool(VISIBILITY_SETTING, true) && !self.is_locked();

        let style = ItemStyle {
            title_color: settings.get_color(TITLE_COLOR_SETTING, Color::WHITE),
            value_color: settings.get_color(VALUE_COLOR_SETTING, Color::WHITE),
        };

        let items = ReportBuilder::new(&self.registry)
            .with_style(style)
            .parallel(self.parallel)
            .build(&layout.keys(), &layout.titles(), visible, |key| {
                settings.get_bool(key.as_str(), true)
            })?;

        Ok(DeviceReport {
            timestamp: Utc::now(),
            hostname: gethostname(),
            visible,
            items,
        })
    }

    fn is_locked(&self) -> bool {
        let Some(lock) = &self.lock else {
            return false;
        };
        match lock.is_locked() {
            Ok(locked) => locked,
            Err(e) => {
                debug!(error = %e, "lock state unavailable, treating as unlocked");
                false
            }
        }
    }
}

fn gethostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric;
    use crate::domain::probes::{ProbeError, ProbeResult};
    use crate::domain::registry::tests::{stub_probes, StubDevice};
    use std::collections::HashMap;

    struct Layout(Vec<(&'static str, &'static str)>);

    impl MetricLayout for Layout {
        fn keys(&self) -> Vec<MetricKey> {
            self.0.iter().map(|(k, _)| MetricKey::from(*k)).collect()
        }
        fn titles(&self) -> Vec<String> {
            self.0.iter().map(|(_, t)| t.to_string()).collect()
        }
    }

    #[derive(Default)]
    struct MemorySettings {
        bools: HashMap<&'static str, bool>,
        colors: HashMap<&'static str, Color>,
    }

    impl SettingsSource for MemorySettings {
        fn get_bool(&self, name: &str, default: bool) -> bool {
            self.bools.get(name).copied().unwrap_or(default)
        }
        fn get_color(&self, name: &str, default: Color) -> Color {
            self.colors.get(name).copied().unwrap_or(default)
        }
    }

    struct FixedLock(ProbeResult<bool>);

    impl LockProbe for FixedLock {
        fn is_locked(&self) -> ProbeResult<bool> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(_) => Err(ProbeError::Unavailable),
            }
        }
    }

    fn layout() -> Layout {
        Layout(vec![
            (metric::DEVICE_MODEL, "Model"),
            (metric::DEVICE_BATTERY_LEVEL, "Battery"),
        ])
    }

    fn service(lock: Option<ProbeResult<bool>>) -> ReportService {
        let lock = lock.map(|l| Arc::new(FixedLock(l)) as Arc<dyn LockProbe>);
        ReportService::new(stub_probes(StubDevice::default()), lock)
    }

    #[test]
    fn defaults_show_everything_in_white() {
        let report = service(None)
            .snapshot(&layout(), &MemorySettings::default())
            .unwrap();
        assert!(report.visible);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].style, Some(ItemStyle::default()));
    }

    #[test]
    fn master_toggle_hides_report() {
        let mut settings = MemorySettings::default();
        settings.bools.insert(VISIBILITY_SETTING, false);
        let report = service(None).snapshot(&layout(), &settings).unwrap();
        assert!(!report.visible);
        assert!(report.items.is_empty());
    }

    #[test]
    fn locked_session_hides_report() {
        let report = service(Some(Ok(true)))
            .snapshot(&layout(), &MemorySettings::default())
            .unwrap();
        assert!(report.items.is_empty());
    }

    #[test]
    fn unknown_lock_state_counts_as_unlocked() {
        let report = service(Some(Err(ProbeError::Unavailable)))
            .snapshot(&layout(), &MemorySettings::default())
            .unwrap();
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn per_key_setting_and_colors_apply() {
        let mut settings = MemorySettings::default();
        settings.bools.insert(metric::DEVICE_MODEL, false);
        settings.colors.insert(VALUE_COLOR_SETTING, Color(0xFF00_FF00));

        let report = service(None).snapshot(&layout(), &settings).unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].title, "Battery");
        assert_eq!(
            report.items[0].style.map(|s| s.value_color),
            Some(Color(0xFF00_FF00))
        );
    }

    #[test]
    fn settings_changes_show_up_on_next_build() {
        let svc = service(None);
        let mut settings = MemorySettings::default();
        assert_eq!(svc.snapshot(&layout(), &settings).unwrap().items.len(), 2);

        settings.bools.insert(metric::DEVICE_BATTERY_LEVEL, false);
        assert_eq!(svc.snapshot(&layout(), &settings).unwrap().items.len(), 1);
    }
}
