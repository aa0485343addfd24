//! # Kaldor Analyzer
//!
//! The orchestration layer between the request surface and the statistical core.
//! `AnalyticsFacade` fetches the window a computation needs from a
//! `MeasurementSource`, hands it to the matching `analytics` component, and shapes
//! the result. It performs no statistics of its own.
//!
//! The measurement source is injected, so the same facade runs against PostgreSQL
//! in production and against an `InMemorySource` offline and in tests.

use crate::error::AnalyzerError;
use analytics::{
    AnalyticsError, AnomalyDetector, AnomalyPoint, AnomalyReport, HealthAssessment, LoomSummary,
    QualityAggregator, QualityReport, TrendEstimator,
};
use chrono::{DateTime, TimeDelta, Utc};
use configuration::{Analytics, Lookback};
use core_types::{MeasurementWindow, TimeOrder};
use std::sync::Arc;

pub mod error;
pub mod source;

pub use source::{InMemorySource, MeasurementSource};

/// Entry point used by the HTTP handlers and the CLI.
#[derive(Clone)]
pub struct AnalyticsFacade {
    source: Arc<dyn MeasurementSource>,
    detector: AnomalyDetector,
    estimator: TrendEstimator,
    aggregator: QualityAggregator,
    lookback: Lookback,
}

impl AnalyticsFacade {
    pub fn new(source: Arc<dyn MeasurementSource>, settings: &Analytics) -> Self {
        Self {
            source,
            detector: AnomalyDetector::new(settings.thresholds.z_score),
            estimator: TrendEstimator::new(settings.thresholds),
            aggregator: QualityAggregator::new(),
            lookback: settings.lookback,
        }
    }

    /// Flags `bbw_avg` outliers over the last `hours` (default from settings).
    ///
    /// A loom with no readings yields an empty, zeroed report rather than an error.
    pub async fn detect_anomalies(
        &self,
        loom_id: &str,
        hours: Option<i64>,
    ) -> Result<AnomalyReport, AnalyzerError> {
        let hours = hours.unwrap_or(self.lookback.anomaly_hours);
        let lookback = positive_hours(hours)?;

        let records = self.source.recent_measurements(loom_id, lookback).await?;
        let window = MeasurementWindow::new(loom_id, TimeOrder::Descending, records)?;
        let scan = self.detector.detect(&window);

        tracing::info!(
            loom_id,
            hours,
            total = scan.total_measurements,
            anomalies = scan.anomalies.len(),
            "Anomaly detection complete."
        );

        Ok(AnomalyReport {
            loom_id: loom_id.to_string(),
            period_hours: hours,
            total_measurements: scan.total_measurements,
            anomaly_count: scan.anomalies.len(),
            anomalies: scan.anomalies.iter().map(AnomalyPoint::from).collect(),
            statistics: scan.statistics,
        })
    }

    /// Assesses maintenance needs from the hourly variability trend.
    ///
    /// Unlike the other reports, no data here is an `InsufficientData` error.
    pub async fn predict_maintenance(
        &self,
        loom_id: &str,
    ) -> Result<HealthAssessment, AnalyzerError> {
        let lookback = TimeDelta::try_days(self.lookback.maintenance_days)
            .filter(|d| *d > TimeDelta::zero())
            .ok_or_else(|| {
                AnalyticsError::InvalidRange(format!(
                    "maintenance lookback of {} days is not usable",
                    self.lookback.maintenance_days
                ))
            })?;

        let buckets = self.source.hourly_buckets(loom_id, lookback).await?;
        let assessment = self.estimator.assess(loom_id, &buckets)?;

        tracing::info!(
            loom_id,
            buckets = buckets.len(),
            health_score = assessment.health_score,
            urgency = %assessment.urgency,
            "Maintenance assessment complete."
        );
        Ok(assessment)
    }

    /// Quality summary for `[start, end]`; `end` defaults to now.
    pub async fn quality_report(
        &self,
        loom_id: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<QualityReport, AnalyzerError> {
        let end = end.unwrap_or_else(|| self.source.now());
        if end < start {
            return Err(AnalyticsError::InvalidRange(format!(
                "end {end} is before start {start}"
            ))
            .into());
        }

        let records = self.source.measurements_between(loom_id, start, end).await?;
        let window = MeasurementWindow::new(loom_id, TimeOrder::Ascending, records)?;
        let report = self.aggregator.summarize(&window, start, end)?;

        tracing::info!(
            loom_id,
            %start,
            %end,
            total = report.measurements.total_count,
            "Quality report complete."
        );
        Ok(report)
    }

    /// Roll-up of the loom's recent readings for dashboards.
    pub async fn summary(&self, loom_id: &str) -> Result<LoomSummary, AnalyzerError> {
        let hours = self.lookback.summary_hours;
        let records = self
            .source
            .recent_measurements(loom_id, positive_hours(hours)?)
            .await?;
        let window = MeasurementWindow::new(loom_id, TimeOrder::Descending, records)?;
        Ok(self.aggregator.summarize_recent(&window, hours))
    }
}

fn positive_hours(hours: i64) -> Result<TimeDelta, AnalyticsError> {
    if hours <= 0 {
        return Err(AnalyticsError::InvalidRange(format!(
            "lookback must be a positive number of hours, got {hours}"
        )));
    }
    TimeDelta::try_hours(hours).ok_or_else(|| {
        AnalyticsError::InvalidRange(format!("lookback of {hours} hours is too large"))
    })
}
