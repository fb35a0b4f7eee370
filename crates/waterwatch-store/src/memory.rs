//! In-memory verdict store for development and testing.
//!
//! Records are kept in insertion order. A poisoned lock is recovered rather
//! than propagated: every write is a single push, so the vector is never left
//! half-updated.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{RecordId, VerificationRecord, VerificationStats};

use crate::ports::VerdictStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryVerdictStore {
    records: Arc<RwLock<Vec<VerificationRecord>>>,
}

impl MemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn save(&self, record: &VerificationRecord) -> Result<RecordId> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        if records.iter().any(|r| r.id == record.id) {
            return Err(WaterwatchError::Store(format!("record {} already exists", record.id)));
        }

        records.push(record.clone());
        tracing::debug!(
            record_id = %record.id,
            report_id = %record.report_id,
            verified = record.verdict.verified,
            "Stored verification record"
        );
        Ok(record.id)
    }

    async fn get_by_report(&self, report_id: &str) -> Result<Vec<VerificationRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.iter().filter(|r| r.report_id == report_id).cloned().collect())
    }

    async fn history(&self, limit: usize) -> Result<Vec<VerificationRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);

        // Later inserts win ties on timestamp.
        let mut newest: Vec<VerificationRecord> = records.iter().rev().cloned().collect();
        newest.sort_by(|a, b| b.verdict.timestamp.cmp(&a.verdict.timestamp));
        newest.truncate(limit);
        Ok(newest)
    }

    async fn stats(&self) -> Result<VerificationStats> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(VerificationStats::from_records(records.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::PathBuf;
    use waterwatch_core::models::VerificationVerdict;

    fn create_test_record(report_id: &str, minutes: i64, verified: bool) -> VerificationRecord {
        VerificationRecord {
            id: RecordId::new(),
            report_id: report_id.to_string(),
            user_image_path: PathBuf::from(format!("/tmp/{}.jpg", report_id)),
            satellite_image_path: None,
            satellite_provider: None,
            verdict: VerificationVerdict {
                verified,
                reason: "test".to_string(),
                user_category: Some("oil_spill".to_string()),
                satellite_category: Some("oil_spill".to_string()),
                user_confidence: 0.9,
                satellite_confidence: 0.9,
                timestamp: Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap()
                    + Duration::minutes(minutes),
            },
        }
    }

    #[tokio::test]
    async fn test_save_and_get_by_report() {
        let store = MemoryVerdictStore::new();
        let first = create_test_record("r-1", 0, true);
        let other = create_test_record("r-2", 1, false);
        let second = create_test_record("r-1", 2, false);

        assert_eq!(store.save(&first).await.unwrap(), first.id);
        store.save(&other).await.unwrap();
        store.save(&second).await.unwrap();

        let found = store.get_by_report("r-1").await.unwrap();
        assert_eq!(found, vec![first, second]);
        assert!(store.get_by_report("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = MemoryVerdictStore::new();
        let record = create_test_record("r-1", 0, true);

        store.save(&record).await.unwrap();
        let err = store.save(&record).await.unwrap_err();

        assert!(matches!(err, WaterwatchError::Store(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let store = MemoryVerdictStore::new();
        for (report, minutes) in [("a", 5), ("b", 1), ("c", 9), ("d", 3)] {
            store.save(&create_test_record(report, minutes, true)).await.unwrap();
        }

        let history = store.history(3).await.unwrap();
        let reports: Vec<&str> = history.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(reports, vec!["c", "a", "d"]);

        assert_eq!(store.history(0).await.unwrap().len(), 0);
        assert_eq!(store.history(100).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_history_tie_prefers_later_insert() {
        let store = MemoryVerdictStore::new();
        store.save(&create_test_record("first", 0, true)).await.unwrap();
        store.save(&create_test_record("second", 0, true)).await.unwrap();

        let history = store.history(1).await.unwrap();
        assert_eq!(history[0].report_id, "second");
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryVerdictStore::new();
        store.save(&create_test_record("a", 0, true)).await.unwrap();
        store.save(&create_test_record("b", 1, false)).await.unwrap();
        store.save(&create_test_record("c", 2, true)).await.unwrap();
        store.save(&create_test_record("d", 3, true)).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.verified, 3);
        assert_eq!(stats.rejected, 1);
        assert!((stats.verification_rate - 75.0).abs() < 1e-9);
        assert_eq!(stats.category_breakdown["oil_spill"], 4);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryVerdictStore::new();
        let handle = store.clone();

        handle.save(&create_test_record("a", 0, true)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }
}
