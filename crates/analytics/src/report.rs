use crate::stats::round2;
use chrono::{DateTime, Utc};
use core_types::{MeasurementRecord, TrendDirection, Urgency};
use serde::{Deserialize, Serialize, Serializer};

/// Serializes an `f64` rounded to two decimals. Internal values keep full precision.
fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

/// A measurement whose `bbw_avg` lies outside the z-score threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ZScoreResult {
    pub record: MeasurementRecord,
    pub z_score: f64,
}

/// Mean, spread, and range of `bbw_avg` across a window. Undefined values are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// One flagged reading as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPoint {
    pub time: DateTime<Utc>,
    pub bbw_avg: f64,
    pub bbw_stddev: f64,
    pub z_score: f64,
}

impl From<&ZScoreResult> for AnomalyPoint {
    fn from(result: &ZScoreResult) -> Self {
        Self {
            time: result.record.time,
            bbw_avg: result.record.bbw_avg,
            bbw_stddev: result.record.bbw_stddev,
            z_score: result.z_score,
        }
    }
}

/// Output of an anomaly scan over a recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub loom_id: String,
    pub period_hours: i64,
    pub total_measurements: usize,
    pub anomaly_count: usize,
    pub anomalies: Vec<AnomalyPoint>,
    pub statistics: WindowStatistics,
}

/// Maintenance outlook derived from the variability trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub loom_id: String,
    #[serde(serialize_with = "two_decimals")]
    pub health_score: f64,
    pub maintenance_needed: bool,
    pub urgency: Urgency,
    #[serde(rename = "trend")]
    pub trend_direction: TrendDirection,
    pub recommendation: String,
    /// Fitted slope of hourly `avg_stddev`. Not part of the wire format.
    #[serde(skip)]
    pub slope: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMeasurements {
    pub total_count: usize,
    #[serde(serialize_with = "two_decimals")]
    pub average_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub std_deviation: f64,
    #[serde(serialize_with = "two_decimals")]
    pub min_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub max_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub quality_score: f64,
}

/// Production-run quality summary for an explicit period. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub loom_id: String,
    pub period: Period,
    pub measurements: QualityMeasurements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryFigures {
    pub total_measurements: usize,
    #[serde(serialize_with = "two_decimals")]
    pub avg_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub min_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub max_bbw: f64,
    #[serde(serialize_with = "two_decimals")]
    pub avg_temperature: f64,
    #[serde(serialize_with = "two_decimals")]
    pub avg_vibration: f64,
    #[serde(serialize_with = "two_decimals")]
    pub avg_quality: f64,
}

/// Dashboard roll-up of a loom's recent readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoomSummary {
    pub loom_id: String,
    pub period_hours: i64,
    pub summary: SummaryFigures,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn health_assessment_wire_shape() {
        let assessment = HealthAssessment {
            loom_id: "LOOM-001".to_string(),
            health_score: 87.654_321,
            maintenance_needed: false,
            urgency: Urgency::Low,
            trend_direction: TrendDirection::Increasing,
            recommendation: "Increasing variability detected. Schedule preventive maintenance."
                .to_string(),
            slope: 0.001_234_567_9,
        };

        let value = serde_json::to_value(&assessment).unwrap();
        assert_eq!(
            value,
            json!({
                "loom_id": "LOOM-001",
                "health_score": 87.65,
                "maintenance_needed": false,
                "urgency": "low",
                "trend": "increasing",
                "recommendation": "Increasing variability detected. Schedule preventive maintenance."
            })
        );
    }

    #[test]
    fn quality_report_nests_period_and_measurements() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let report = QualityReport {
            loom_id: "LOOM-002".to_string(),
            period: Period { start, end },
            measurements: QualityMeasurements {
                total_count: 3,
                average_bbw: 125.123,
                std_deviation: 0.456_7,
                min_bbw: 120.0,
                max_bbw: 130.009,
                quality_score: 0.987,
            },
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["period"]["start"], json!("2025-06-01T00:00:00Z"));
        assert_eq!(value["measurements"]["total_count"], json!(3));
        assert_eq!(value["measurements"]["average_bbw"], json!(125.12));
        assert_eq!(value["measurements"]["std_deviation"], json!(0.46));
        assert_eq!(value["measurements"]["max_bbw"], json!(130.01));
        assert_eq!(value["measurements"]["quality_score"], json!(0.99));
    }
}
