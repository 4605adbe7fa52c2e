//! Port traits the domain depends on; adapters implement them.

pub mod classifier_port;
pub mod config_port;
pub mod price_port;
