pub mod daemon;
pub mod init_config;
pub mod keys;
pub mod report;
pub mod watch;

use std::time::Duration;

use crate::config::Config;
use crate::domain::report_service::ReportService;

/// Report service wired to this machine, tuned by the loaded config.
pub fn host_service(cfg: &Config) -> ReportService {
    ReportService::for_host(Duration::from_millis(cfg.probe_timeout_ms))
        .parallel(cfg.parallel_probes)
}
