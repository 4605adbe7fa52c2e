//! Core domain types and logic.

pub mod aggregator;
pub mod classification;
pub mod column_mapping;
pub mod config_validation;
pub mod costs;
pub mod error;
pub mod execution;
pub mod format;
pub mod import_plan;
pub mod ingest;
pub mod metrics;
pub mod normalizer;
pub mod parsers;
pub mod portfolio;
pub mod position;
pub mod raw_table;
pub mod trade;
pub mod validator;
