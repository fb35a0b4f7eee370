use async_trait::async_trait;
use waterwatch_core::error::Result;
use waterwatch_core::models::{RecordId, VerificationRecord, VerificationStats};

/// Port for persisting verification outcomes
#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Store a record and return its id
    async fn save(&self, record: &VerificationRecord) -> Result<RecordId>;

    /// All records for a report, oldest first
    async fn get_by_report(&self, report_id: &str) -> Result<Vec<VerificationRecord>>;

    /// The most recent records, newest first
    async fn history(&self, limit: usize) -> Result<Vec<VerificationRecord>>;

    /// Aggregate counts over every stored record
    async fn stats(&self) -> Result<VerificationStats>;
}
