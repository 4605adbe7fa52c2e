//! tradeledger: brokerage trade-history ingestion, pre-trade risk checks,
//! and portfolio aggregation.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the command-line driver in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
