pub mod formatting;
pub mod host_probes;
pub mod metric;
pub mod probes;
pub mod registry;
pub mod report_builder;
pub mod report_service;
