use crate::error::AnalyticsError;
use crate::report::HealthAssessment;
use crate::stats;
use configuration::Thresholds;
use core_types::{HourlyBucket, TrendDirection, Urgency};

pub const IMMEDIATE_MAINTENANCE: &str =
    "Immediate maintenance required. Schedule inspection within 24 hours.";
pub const MAINTENANCE_THIS_WEEK: &str =
    "Maintenance recommended within the next week. Monitor closely.";
pub const PREVENTIVE_MAINTENANCE: &str =
    "Increasing variability detected. Schedule preventive maintenance.";
pub const OPERATING_NORMALLY: &str = "System operating normally. Continue regular monitoring.";

/// Turns a run of hourly buckets into a maintenance outlook.
///
/// A straight line is fitted to `avg_stddev` against bucket index; the steeper the
/// slope in either direction, the lower the health score.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendEstimator {
    thresholds: Thresholds,
}

impl TrendEstimator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Assesses the buckets, which must be in ascending hour order.
    ///
    /// # Errors
    ///
    /// * `InsufficientData` if `buckets` is empty.
    /// * `InvalidInput` if the buckets are out of order.
    pub fn assess(
        &self,
        loom_id: &str,
        buckets: &[HourlyBucket],
    ) -> Result<HealthAssessment, AnalyticsError> {
        if buckets.is_empty() {
            return Err(AnalyticsError::InsufficientData(format!(
                "no hourly buckets for loom {loom_id}"
            )));
        }
        if let Some(pair) = buckets.windows(2).find(|pair| pair[0].hour >= pair[1].hour) {
            return Err(AnalyticsError::InvalidInput(format!(
                "hourly buckets must be strictly ascending, found {} before {}",
                pair[0].hour, pair[1].hour
            )));
        }

        let slope = Self::slope(buckets);
        let health_score = self.health_score(slope);
        let (maintenance_needed, urgency) = self.classify(health_score);

        tracing::debug!(loom_id, buckets = buckets.len(), slope, health_score, "Trend fitted.");

        Ok(HealthAssessment {
            loom_id: loom_id.to_string(),
            health_score,
            maintenance_needed,
            urgency,
            trend_direction: TrendDirection::from_slope(slope),
            recommendation: self.recommend(health_score, slope).to_string(),
            slope,
        })
    }

    /// Least-squares slope of `avg_stddev` per bucket. Flat (0) for fewer than two buckets.
    pub fn slope(buckets: &[HourlyBucket]) -> f64 {
        let y: Vec<f64> = buckets.iter().map(|b| b.avg_stddev).collect();
        stats::index_slope(&y)
    }

    /// `100 - min(100, |slope| * health_scale)`, always within [0, 100].
    pub fn health_score(&self, slope: f64) -> f64 {
        100.0 - (slope.abs() * self.thresholds.health_scale).min(100.0)
    }

    pub fn classify(&self, health_score: f64) -> (bool, Urgency) {
        if health_score < self.thresholds.high_urgency_below {
            (true, Urgency::High)
        } else if health_score < self.thresholds.medium_urgency_below {
            (true, Urgency::Medium)
        } else {
            (false, Urgency::Low)
        }
    }

    pub fn recommend(&self, health_score: f64, slope: f64) -> &'static str {
        if health_score < self.thresholds.high_urgency_below {
            IMMEDIATE_MAINTENANCE
        } else if health_score < self.thresholds.medium_urgency_below {
            MAINTENANCE_THIS_WEEK
        } else if slope > self.thresholds.rising_trend_above {
            PREVENTIVE_MAINTENANCE
        } else {
            OPERATING_NORMALLY
        }
    }
}
