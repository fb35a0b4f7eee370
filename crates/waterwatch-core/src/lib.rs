//! Waterwatch Core - Domain models, error taxonomy, configuration and ports
//!
//! This crate contains the domain types shared by the acquisition orchestrator
//! and the verification reconciler, plus the port traits adapters implement.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{ProviderError, Result, WaterwatchError};
