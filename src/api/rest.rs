use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::config::{self, Config};
use crate::domain::metric::{MetricKey, MetricValue};
use crate::domain::probes::SettingsSource;
use crate::domain::report_builder::ReportError;
use crate::domain::report_service::{DeviceReport, ReportService};

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
    pub config_path: Option<Arc<PathBuf>>,
}

type ApiError = (StatusCode, String);

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key: MetricKey,
    pub known: bool,
    pub enabled: bool,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricReading {
    pub key: MetricKey,
    pub known: bool,
    pub enabled: bool,
    pub value: MetricValue,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/report", get(report))
        .route("/api/v1/keys", get(keys))
        .route("/api/v1/metrics/{key}", get(metric_reading))
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Rebuild the report from fresh settings and probes on every request.
async fn report(State(state): State<AppState>) -> Result<Json<DeviceReport>, ApiError> {
    blocking(state, |service, cfg| {
        service.snapshot(&cfg, &cfg).map_err(|e| match e {
            ReportError::ConfigMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        })
    })
    .await
    .map(Json)
}

async fn keys(State(state): State<AppState>) -> Result<Json<Vec<KeyInfo>>, ApiError> {
    blocking(state, |service, cfg| {
        let registry = service.registry();
        let mut out: Vec<KeyInfo> = cfg
            .display
            .keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let key = MetricKey::new(k.as_str());
                KeyInfo {
                    known: registry.supports(&key),
                    enabled: cfg.get_bool(k, true),
                    title: cfg.display.titles.get(i).cloned(),
                    key,
                }
            })
            .collect();

        for key in registry.keys() {
            if !out.iter().any(|info| info.key == key) {
                out.push(KeyInfo {
                    known: true,
                    enabled: cfg.get_bool(key.as_str(), true),
                    title: None,
                    key,
                });
            }
        }
        Ok(out)
    })
    .await
    .map(Json)
}

async fn metric_reading(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MetricReading>, ApiError> {
    blocking(state, move |service, cfg| {
        let key = MetricKey::new(key);
        Ok(MetricReading {
            known: service.registry().supports(&key),
            enabled: cfg.get_bool(key.as_str(), true),
            value: service.registry().resolve(&key),
            key,
        })
    })
    .await
    .map(Json)
}

/// Load config and run `f` off the async runtime; probes may shell out.
async fn blocking<T, F>(state: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ReportService, Config) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let cfg = config::load(state.config_path.as_deref().map(|p| p.as_path()))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))?;
        f(&state.service, cfg)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric;
    use crate::domain::registry::tests::{stub_probes, StubDevice};
    use std::io::Write;

    fn state_with(yaml: &str) -> (AppState, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let state = AppState {
            service: Arc::new(ReportService::new(stub_probes(StubDevice::default()), None)),
            config_path: Some(Arc::new(file.path().to_path_buf())),
        };
        (state, file)
    }

    #[tokio::test]
    async fn report_follows_configured_order() {
        let (state, _file) = state_with(
            "display:\n  keys: [device_up_time, device_model]\n  titles: [Up, Model]\n",
        );
        let Json(report) = report(State(state)).await.unwrap();
        let rows: Vec<(&str, &str)> = report
            .items
            .iter()
            .map(|i| (i.title.as_str(), i.value.as_str()))
            .collect();
        assert_eq!(rows, vec![("Up", "01 hrs 30 mins"), ("Model", "Pixel 7")]);
    }

    #[tokio::test]
    async fn report_mismatch_is_unprocessable() {
        let (state, _file) = state_with("display:\n  keys: [device_model]\n  titles: [A, B]\n");
        let (status, _) = report(State(state)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn hidden_report_is_empty_not_an_error() {
        let (state, _file) = state_with("settings:\n  device_info_visibility: false\n");
        let Json(report) = report(State(state)).await.unwrap();
        assert!(!report.visible);
        assert!(report.items.is_empty());
    }

    #[tokio::test]
    async fn single_metric_lookup() {
        let (state, _file) = state_with("settings:\n  device_battery_level: 0\n");
        let Json(reading) = metric_reading(State(state.clone()), Path(metric::DEVICE_BATTERY_LEVEL.into()))
            .await
            .unwrap();
        assert_eq!(reading.value.as_str(), "42%");
        assert!(reading.known);
        assert!(!reading.enabled);

        let Json(reading) = metric_reading(State(state), Path("device_sim_slot".into())).await.unwrap();
        assert!(!reading.known);
        assert_eq!(reading.value.as_str(), "N/A");
    }

    #[tokio::test]
    async fn keys_lists_configured_then_remaining() {
        let (state, _file) = state_with(
            "display:\n  keys: [device_legacy, device_model]\n  titles: [Legacy, Model]\n",
        );
        let Json(keys) = keys(State(state)).await.unwrap();
        assert_eq!(keys[0].key.as_str(), "device_legacy");
        assert!(!keys[0].known);
        assert_eq!(keys[1].title.as_deref(), Some("Model"));
        assert_eq!(keys.len(), 1 + metric::KNOWN_KEYS.len());
    }
}
