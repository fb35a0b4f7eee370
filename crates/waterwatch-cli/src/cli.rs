use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Waterwatch - Satellite verification of water pollution reports
#[derive(Parser, Debug)]
#[command(name = "waterwatch")]
#[command(about = "Satellite verification of water pollution reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./waterwatch.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory satellite images are cached in
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Seconds each provider attempt may take
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a satellite image for a location and date
    Acquire(AcquireArgs),

    /// Reconcile a user classification with a satellite classification
    Reconcile(ReconcileArgs),

    /// Verify a pollution report end to end
    Verify(VerifyArgs),

    /// Check provider credentials, cache directory and taxonomy coverage
    Doctor(DoctorArgs),

    /// Show configuration values and where they came from
    Config,

    /// List pollution categories and their similarity groups
    Categories,
}

#[derive(Parser, Debug)]
pub struct AcquireArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Capture date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// Category predicted for the user's photo
    #[arg(long)]
    pub user_category: Option<String>,

    /// Confidence of the user prediction
    #[arg(long, default_value = "0")]
    pub user_confidence: f64,

    /// Category predicted for the satellite image
    #[arg(long)]
    pub satellite_category: Option<String>,

    /// Confidence of the satellite prediction
    #[arg(long, default_value = "0")]
    pub satellite_confidence: f64,

    /// Minimum confidence each prediction needs
    #[arg(long)]
    pub confidence_threshold: Option<f64>,

    /// Minimum similarity for differing categories
    #[arg(long)]
    pub similarity_threshold: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Path to the user's photo
    #[arg(long)]
    pub image: PathBuf,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Report date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,

    /// Report identifier (defaults to a generated one)
    #[arg(long)]
    pub report_id: Option<String>,

    /// Model server URL, overriding the configured classifier
    #[arg(long)]
    pub classifier_url: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Show provider endpoints and classifier labels
    #[arg(long)]
    pub verbose: bool,
}
