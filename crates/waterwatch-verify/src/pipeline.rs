//! End-to-end verification of a pollution report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use waterwatch_core::error::Result;
use waterwatch_core::models::{
    PollutionReport, ProviderAttempt, RecordId, VerificationRecord,
};
use waterwatch_core::ports::Classifier;
use waterwatch_imagery::ImageryOrchestrator;
use waterwatch_store::VerdictStore;

use crate::reconciler::Reconciler;

/// The stored record plus how the satellite image was obtained
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub record: VerificationRecord,
    pub attempts: Vec<ProviderAttempt>,
    pub from_cache: bool,
    /// Set when a store is attached and the record was saved
    pub stored: bool,
}

pub struct VerificationPipeline {
    orchestrator: Arc<ImageryOrchestrator>,
    classifier: Arc<dyn Classifier>,
    reconciler: Reconciler,
    store: Option<Arc<dyn VerdictStore>>,
}

impl VerificationPipeline {
    /// Fails if the classifier can emit a label the taxonomy does not know
    pub fn new(
        orchestrator: Arc<ImageryOrchestrator>,
        classifier: Arc<dyn Classifier>,
        reconciler: Reconciler,
    ) -> Result<Self> {
        reconciler.taxonomy().ensure_covers(classifier.labels())?;

        Ok(Self {
            orchestrator,
            classifier,
            reconciler,
            store: None,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn VerdictStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Verify a report against satellite imagery as of now
    pub async fn verify(&self, report: &PollutionReport) -> Result<VerificationOutcome> {
        self.verify_at(report, Utc::now()).await
    }

    /// Verify a report, stamping the verdict with `evaluated_at`
    pub async fn verify_at(
        &self,
        report: &PollutionReport,
        evaluated_at: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        tracing::info!(
            report_id = %report.report_id,
            location = %report.coordinate,
            date = %report.date,
            classifier = self.classifier.name(),
            "Verifying pollution report"
        );

        let user = self.classifier.classify(&report.user_image).await?;

        let acquisition = self.orchestrator.acquire(report.coordinate, report.date).await?;
        let satellite = self.classifier.classify(&acquisition.image.path).await?;

        let verdict = self.reconciler.reconcile(&user, &satellite, evaluated_at)?;

        let record = VerificationRecord {
            id: RecordId::new(),
            report_id: report.report_id.clone(),
            user_image_path: report.user_image.clone(),
            satellite_image_path: Some(acquisition.image.path.clone()),
            satellite_provider: Some(acquisition.image.provider.clone()),
            verdict,
        };

        let stored = match &self.store {
            Some(store) => {
                store.save(&record).await?;
                true
            }
            None => false,
        };

        tracing::info!(
            report_id = %record.report_id,
            verified = record.verdict.verified,
            provider = %acquisition.image.provider,
            reason = %record.verdict.reason,
            "Verification complete"
        );

        Ok(VerificationOutcome {
            record,
            attempts: acquisition.attempts,
            from_cache: acquisition.from_cache,
            stored,
        })
    }
}
