use crate::error::AnalyticsError;
use crate::report::{LoomSummary, Period, QualityMeasurements, QualityReport, SummaryFigures};
use crate::stats;
use chrono::{DateTime, Utc};
use core_types::{MeasurementRecord, MeasurementWindow};

/// Window-level roll-ups of BBW quality.
///
/// Aggregates follow SQL semantics: missing optional readings are skipped, and
/// anything left undefined (no rows, or a metric that is null everywhere) reports as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAggregator;

impl QualityAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Summarizes the records of `window` that fall within `[start, end]`.
    pub fn summarize(
        &self,
        window: &MeasurementWindow,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<QualityReport, AnalyticsError> {
        if end < start {
            return Err(AnalyticsError::InvalidRange(format!(
                "end {end} is before start {start}"
            )));
        }

        let records: Vec<&MeasurementRecord> = window.between(start, end).collect();
        let bbw: Vec<f64> = records.iter().map(|r| r.bbw_avg).collect();
        let quality: Vec<f64> = records.iter().filter_map(|r| r.quality_flag).collect();

        Ok(QualityReport {
            loom_id: window.loom_id().to_string(),
            period: Period { start, end },
            measurements: QualityMeasurements {
                total_count: records.len(),
                average_bbw: stats::mean(&bbw).unwrap_or(0.0),
                std_deviation: stats::sample_std_dev(&bbw).unwrap_or(0.0),
                min_bbw: stats::min(records.iter().filter_map(|r| r.bbw_min)).unwrap_or(0.0),
                max_bbw: stats::max(records.iter().filter_map(|r| r.bbw_max)).unwrap_or(0.0),
                quality_score: stats::mean(&quality).unwrap_or(0.0),
            },
        })
    }

    /// Dashboard summary over a whole recent window.
    pub fn summarize_recent(&self, window: &MeasurementWindow, period_hours: i64) -> LoomSummary {
        let records = window.records();
        let mean_of = |pick: fn(&MeasurementRecord) -> Option<f64>| {
            let values: Vec<f64> = records.iter().filter_map(pick).collect();
            stats::mean(&values).unwrap_or(0.0)
        };

        LoomSummary {
            loom_id: window.loom_id().to_string(),
            period_hours,
            summary: SummaryFigures {
                total_measurements: records.len(),
                avg_bbw: mean_of(|r| Some(r.bbw_avg)),
                min_bbw: stats::min(records.iter().filter_map(|r| r.bbw_min)).unwrap_or(0.0),
                max_bbw: stats::max(records.iter().filter_map(|r| r.bbw_max)).unwrap_or(0.0),
                avg_temperature: mean_of(|r| r.temperature),
                avg_vibration: mean_of(|r| r.vibration),
                avg_quality: mean_of(|r| r.quality_flag),
            },
        }
    }
}
