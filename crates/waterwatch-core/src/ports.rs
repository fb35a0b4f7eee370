//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod classifier;
pub mod provider;

pub use classifier::Classifier;
pub use provider::{ImageryProvider, DEFAULT_HALF_EXTENT_DEG};
