//! Metric registry — maps each known key to a resolver over the probes.
//!
//! Resolution never fails the caller: a missing probe, a probe error, a
//! panicking probe or an unknown key come back as "N/A" for that key alone.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Local;
use tracing::debug;

use super::formatting;
use super::metric::{self, MetricKey, MetricValue};
use super::probes::{ProbeResult, Probes};

type Resolver = fn(&Probes) -> ProbeResult<String>;

pub struct MetricRegistry {
    probes: Probes,
    resolvers: HashMap<&'static str, Resolver>,
}

impl MetricRegistry {
    pub fn new(probes: Probes) -> Self {
        let resolvers: HashMap<&'static str, Resolver> = [
            (metric::DEVICE_MODEL, model as Resolver),
            (metric::DEVICE_ANDROID_VERSION, os_version as Resolver),
            (metric::DEVICE_BUILD_VERSION, build_id as Resolver),
            (metric::DEVICE_BATTERY_LEVEL, battery as Resolver),
            (metric::DEVICE_NETWORK_NAME, carrier as Resolver),
            (metric::DEVICE_WIFI_INFO, wifi as Resolver),
            (metric::DEVICE_NEXT_ALARM, next_alarm as Resolver),
            (metric::DEVICE_UP_TIME, uptime as Resolver),
        ]
        .into_iter()
        .collect();

        Self { probes, resolvers }
    }

    pub fn supports(&self, key: &MetricKey) -> bool {
        self.resolvers.contains_key(key.as_str())
    }

    /// Keys with a resolver, in default render order.
    pub fn keys(&self) -> Vec<MetricKey> {
        metric::KNOWN_KEYS
            .iter()
            .filter(|k| self.resolvers.contains_key(*k))
            .map(|k| MetricKey::from(*k))
            .collect()
    }

    pub fn resolve(&self, key: &MetricKey) -> MetricValue {
        let Some(resolver) = self.resolvers.get(key.as_str()) else {
            debug!(key = %key, "no resolver for metric key");
            return MetricValue::not_available();
        };

        match catch_unwind(AssertUnwindSafe(|| resolver(&self.probes))) {
            Ok(Ok(value)) => MetricValue::from_display(value),
            Ok(Err(e)) => {
                debug!(key = %key, error = %e, "probe unavailable");
                MetricValue::not_available()
            }
            Err(_) => {
                debug!(key = %key, "probe panicked");
                MetricValue::not_available()
            }
        }
    }
}

fn model(p: &Probes) -> ProbeResult<String> {
    p.identity()?.model()
}

fn os_version(p: &Probes) -> ProbeResult<String> {
    p.identity()?.os_version()
}

fn build_id(p: &Probes) -> ProbeResult<String> {
    p.identity()?.build_id()
}

fn battery(p: &Probes) -> ProbeResult<String> {
    Ok(formatting::format_battery(p.battery()?.level()?))
}

fn carrier(p: &Probes) -> ProbeResult<String> {
    p.carrier()?.operator_name()
}

fn wifi(p: &Probes) -> ProbeResult<String> {
    let network = p.connectivity()?.active_network()?;
    Ok(formatting::format_wifi(network.as_ref()))
}

fn next_alarm(p: &Probes) -> ProbeResult<String> {
    let at = p.alarm()?.next_alarm()?;
    Ok(formatting::format_alarm(at.map(|t| t.with_timezone(&Local))))
}

fn uptime(p: &Probes) -> ProbeResult<String> {
    Ok(formatting::format_uptime(p.uptime()?.uptime_millis()?))
}
