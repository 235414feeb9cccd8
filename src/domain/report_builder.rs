//! Report builder — turns the configured key/title lists into the ordered
//! render sequence for one invocation.
//!
//! Nothing is memoized: visibility and values are re-read on every build.

use thiserror::Error;
use tracing::debug;

use super::metric::{ItemStyle, MetricKey, MetricValue, RenderItem};
use super::registry::MetricRegistry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("configured {keys} metric keys but {titles} titles")]
    ConfigMismatch { keys: usize, titles: usize },
}

pub struct ReportBuilder<'a> {
    registry: &'a MetricRegistry,
    style: Option<ItemStyle>,
    parallel: bool,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(registry: &'a MetricRegistry) -> Self {
        Self {
            registry,
            style: None,
            parallel: false,
        }
    }

    /// Attach the same title/value colors to every emitted item.
    pub fn with_style(mut self, style: ItemStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Resolve visible keys on scoped threads. Emission order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn build<F>(
        &self,
        keys: &[MetricKey],
        titles: &[String],
        global_visible: bool,
        per_key_visible: F,
    ) -> Result<Vec<RenderItem>, ReportError>
    where
        F: Fn(&MetricKey) -> bool,
    {
        if keys.len() != titles.len() {
            return Err(ReportError::ConfigMismatch {
                keys: keys.len(),
                titles: titles.len(),
            });
        }

        if !global_visible {
            debug!("report hidden by global visibility");
            return Ok(Vec::new());
        }

        let shown: Vec<(&MetricKey, &String)> = keys
            .iter()
            .zip(titles)
            .filter(|(key, _)| per_key_visible(*key))
            .collect();

        let values = if self.parallel {
            self.resolve_parallel(&shown)
        } else {
            shown
                .iter()
                .map(|(key, _)| self.registry.resolve(key))
                .collect()
        };

        Ok(shown
            .into_iter()
            .zip(values)
            .map(|((key, title), value)| RenderItem {
                key: key.clone(),
                title: title.clone(),
                value,
                style: self.style,
            })
            .collect())
    }

    fn resolve_parallel(&self, shown: &[(&MetricKey, &String)]) -> Vec<MetricValue> {
        let registry = self.registry;
        std::thread::scope(|s| {
            let handles: Vec<_> = shown
                .iter()
                .map(|(key, _)| s.spawn(move || registry.resolve(key)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|_| MetricValue::not_available()))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric::{self, Color};
    use crate::domain::registry::tests::{panicking_uptime_probes, stub_probes, StubDevice};

    fn registry() -> MetricRegistry {
        MetricRegistry::new(stub_probes(StubDevice::default()))
    }

    fn lists(pairs: &[(&str, &str)]) -> (Vec<MetricKey>, Vec<String>) {
        pairs
            .iter()
            .map(|(k, t)| (MetricKey::from(*k), t.to_string()))
            .unzip()
    }

    fn default_lists() -> (Vec<MetricKey>, Vec<String>) {
        let pairs: Vec<(&str, &str)> = metric::KNOWN_KEYS
            .iter()
            .copied()
            .zip(metric::DEFAULT_TITLES.iter().copied())
            .collect();
        lists(&pairs)
    }

    #[test]
    fn global_hidden_yields_nothing() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let items = ReportBuilder::new(&registry)
            .build(&keys, &titles, false, |_| true)
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn all_visible_keeps_input_order() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let items = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |_| true)
            .unwrap();

        assert_eq!(items.len(), keys.len());
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.key, keys[i]);
            assert_eq!(item.title, titles[i]);
        }
        assert_eq!(items[3].value.as_str(), "42%");
    }

    #[test]
    fn hidden_key_is_skipped_without_touching_neighbours() {
        let registry = registry();
        let (keys, titles) = lists(&[
            (metric::DEVICE_MODEL, "Model"),
            (metric::DEVICE_BATTERY_LEVEL, "Battery"),
            (metric::DEVICE_UP_TIME, "Up time"),
        ]);
        let items = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |k| k.as_str() != metric::DEVICE_BATTERY_LEVEL)
            .unwrap();

        let rows: Vec<(&str, &str)> = items
            .iter()
            .map(|i| (i.title.as_str(), i.value.as_str()))
            .collect();
        assert_eq!(rows, vec![("Model", "Pixel 7"), ("Up time", "01 hrs 30 mins")]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let registry = registry();
        let keys = vec![MetricKey::from(metric::DEVICE_MODEL)];
        let titles = vec!["Model".to_string(), "Extra".to_string()];

        let err = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |_| true)
            .unwrap_err();
        assert_eq!(err, ReportError::ConfigMismatch { keys: 1, titles: 2 });

        let err = ReportBuilder::new(&registry)
            .build(&keys, &titles, false, |_| true)
            .unwrap_err();
        assert!(matches!(err, ReportError::ConfigMismatch { .. }));
    }

    #[test]
    fn unknown_keys_render_as_not_available() {
        let registry = registry();
        let (keys, titles) = lists(&[("device_legacy_thing", "Legacy"), (metric::DEVICE_MODEL, "Model")]);
        let items = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |_| true)
            .unwrap();
        assert_eq!(items[0].value.as_str(), "N/A");
        assert_eq!(items[1].value.as_str(), "Pixel 7");
    }

    #[test]
    fn consecutive_builds_are_identical() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let builder = ReportBuilder::new(&registry);
        let first = builder.build(&keys, &titles, true, |_| true).unwrap();
        let second = builder.build(&keys, &titles, true, |_| true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_resolution_preserves_order() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let serial = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |_| true)
            .unwrap();
        let parallel = ReportBuilder::new(&registry)
            .parallel(true)
            .build(&keys, &titles, true, |_| true)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn style_is_attached_to_every_item() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let style = ItemStyle {
            title_color: Color(0xFF00_FF00),
            value_color: Color::WHITE,
        };
        let items = ReportBuilder::new(&registry)
            .with_style(style)
            .build(&keys, &titles, true, |_| true)
            .unwrap();
        assert!(items.iter().all(|i| i.style == Some(style)));
    }

    #[test]
    fn panicking_probe_is_contained_serial_and_parallel() {
        let registry = MetricRegistry::new(panicking_uptime_probes());
        let (keys, titles) = lists(&[
            (metric::DEVICE_UP_TIME, "Up time"),
            (metric::DEVICE_MODEL, "Model"),
        ]);

        for parallel in [false, true] {
            let items = ReportBuilder::new(&registry)
                .parallel(parallel)
                .build(&keys, &titles, true, |_| true)
                .unwrap();
            let values: Vec<&str> = items.iter().map(|i| i.value.as_str()).collect();
            assert_eq!(values, vec!["N/A", "Pixel 7"], "parallel = {}", parallel);
        }
    }

    #[test]
    fn concurrent_callers_see_identical_reports() {
        let registry = registry();
        let (keys, titles) = default_lists();
        let expected = ReportBuilder::new(&registry)
            .build(&keys, &titles, true, |_| true)
            .unwrap();

        let results: Vec<Vec<RenderItem>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let registry = &registry;
                    let (keys, titles) = (&keys, &titles);
                    s.spawn(move || {
                        ReportBuilder::new(registry)
                            .parallel(i % 2 == 0)
                            .build(keys, titles, true, |_| true)
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|items| *items == expected));
    }
}
