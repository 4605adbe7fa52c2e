//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http-classifier")]
pub mod http_classifier_adapter;
pub mod quote_file_adapter;
