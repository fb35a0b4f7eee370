//! Waterwatch Verify - Reconciling user reports with satellite imagery
//!
//! This crate provides the verification reconciler, the colour-heuristic and
//! HTTP classifiers, and the pipeline that ties acquisition, classification,
//! reconciliation and storage together.

pub mod classifier;
pub mod color;
pub mod pipeline;
pub mod reconciler;

pub use classifier::HttpClassifier;
pub use color::{ChannelMeans, ColorHeuristicClassifier, ColorIndication};
pub use pipeline::{VerificationOutcome, VerificationPipeline};
pub use reconciler::{category_similarity, reconcile, ReconcilePolicy, Reconciler};
