//! Waterwatch Store - Verification record storage
//!
//! This crate defines the verdict storage port and an in-memory adapter.

pub mod memory;
pub mod ports;

pub use memory::MemoryVerdictStore;
pub use ports::VerdictStore;
