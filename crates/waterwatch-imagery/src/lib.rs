//! Waterwatch Imagery - Satellite image acquisition
//!
//! This crate provides the image cache, the provider adapters and the
//! orchestrator that tries providers in priority order until one succeeds.

pub mod cache;
pub mod orchestrator;
pub mod providers;
pub mod token;

pub use cache::ImageCache;
pub use orchestrator::ImageryOrchestrator;
pub use providers::{default_providers, EarthEngineProvider, NasaEarthProvider, SentinelHubProvider};
pub use token::{AccessToken, TokenCache};
