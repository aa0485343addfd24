use crate::report::{WindowStatistics, ZScoreResult};
use crate::stats;
use core_types::MeasurementWindow;

/// Result of scanning one window: the outliers plus the statistics they were judged against.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScan {
    /// Outliers in the window's original order.
    pub anomalies: Vec<ZScoreResult>,
    pub total_measurements: usize,
    pub statistics: WindowStatistics,
}

/// Flags readings whose `bbw_avg` sits more than `threshold` standard deviations from the window mean.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Scores every record in the window and keeps those with `|z| > threshold`.
    ///
    /// When the standard deviation is zero or undefined (fewer than two records)
    /// every z-score is taken as 0, so nothing is flagged.
    pub fn detect(&self, window: &MeasurementWindow) -> AnomalyScan {
        let values: Vec<f64> = window.records().iter().map(|r| r.bbw_avg).collect();
        let statistics = Self::statistics(&values);

        if statistics.std == 0.0 {
            if !values.is_empty() {
                tracing::debug!(
                    loom_id = window.loom_id(),
                    n = values.len(),
                    "Degenerate bbw_avg distribution; no anomalies flagged."
                );
            }
            return AnomalyScan {
                anomalies: Vec::new(),
                total_measurements: values.len(),
                statistics,
            };
        }

        let anomalies = window
            .records()
            .iter()
            .filter_map(|record| {
                let z_score = (record.bbw_avg - statistics.mean) / statistics.std;
                (z_score.abs() > self.threshold).then(|| ZScoreResult {
                    record: record.clone(),
                    z_score,
                })
            })
            .collect();

        AnomalyScan {
            anomalies,
            total_measurements: values.len(),
            statistics,
        }
    }

    fn statistics(values: &[f64]) -> WindowStatistics {
        WindowStatistics {
            mean: stats::mean(values).unwrap_or(0.0),
            std: stats::sample_std_dev(values).unwrap_or(0.0),
            min: stats::min(values.iter().copied()).unwrap_or(0.0),
            max: stats::max(values.iter().copied()).unwrap_or(0.0),
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(configuration::Thresholds::default().z_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{MeasurementRecord, TimeOrder};

    fn window(values: &[f64]) -> MeasurementWindow {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &v)| MeasurementRecord {
                time: start + Duration::minutes(i as i64),
                bbw_avg: v,
                bbw_stddev: 0.5,
                bbw_min: None,
                bbw_max: None,
                temperature: None,
                vibration: None,
                quality_flag: None,
            })
            .collect();
        MeasurementWindow::new("LOOM-001", TimeOrder::Ascending, records).unwrap()
    }

    #[test]
    fn empty_window_is_not_an_error() {
        let scan = AnomalyDetector::default().detect(&window(&[]));
        assert!(scan.anomalies.is_empty());
        assert_eq!(scan.total_measurements, 0);
        assert_eq!(scan.statistics, WindowStatistics::default());
    }

    #[test]
    fn identical_values_yield_no_anomalies() {
        let scan = AnomalyDetector::default().detect(&window(&[125.0; 40]));
        assert!(scan.anomalies.is_empty());
        assert_eq!(scan.total_measurements, 40);
        assert_eq!(scan.statistics.std, 0.0);
        assert_eq!(scan.statistics.mean, 125.0);
    }

    #[test]
    fn single_record_has_zero_spread() {
        let scan = AnomalyDetector::default().detect(&window(&[42.0]));
        assert!(scan.anomalies.is_empty());
        assert_eq!(scan.statistics.std, 0.0);
        assert_eq!(scan.statistics.min, 42.0);
        assert_eq!(scan.statistics.max, 42.0);
    }

    #[test]
    fn small_sample_outlier_stays_below_threshold() {
        let scan = AnomalyDetector::default().detect(&window(&[10.0, 10.0, 10.0, 10.0, 100.0]));

        assert!(scan.anomalies.is_empty());
        assert_eq!(scan.statistics.mean, 28.0);
        assert!((scan.statistics.std - 1620.0_f64.sqrt()).abs() < 1e-12);
        let z = (100.0 - scan.statistics.mean) / scan.statistics.std;
        assert!((z - 72.0 / 1620.0_f64.sqrt()).abs() < 1e-12);
        assert!(z < 3.0);
        assert_eq!(scan.statistics.min, 10.0);
        assert_eq!(scan.statistics.max, 100.0);
    }

    #[test]
    fn large_sample_outlier_is_flagged_in_place() {
        let mut values = vec![10.0; 20];
        values.insert(7, 100.0);
        let w = window(&values);

        let scan = AnomalyDetector::default().detect(&w);

        assert_eq!(scan.anomalies.len(), 1);
        let hit = &scan.anomalies[0];
        assert_eq!(hit.record, w.records()[7]);
        // mean = 300/21, deviation = 1800/21, s = sqrt(7714.2857/20)
        assert!(hit.z_score > 4.3 && hit.z_score < 4.4, "z = {}", hit.z_score);
    }

    #[test]
    fn every_flag_exceeds_threshold_and_count_is_bounded() {
        let mut values: Vec<f64> = (0..60).map(|i| 125.0 + ((i % 7) as f64 - 3.0) * 0.1).collect();
        values[12] = 140.0;
        values[45] = 110.0;
        let detector = AnomalyDetector::new(3.0);

        let scan = detector.detect(&window(&values));

        assert!(scan.anomalies.len() <= scan.total_measurements);
        assert_eq!(scan.anomalies.len(), 2);
        assert!(scan.anomalies.iter().all(|a| a.z_score.abs() > 3.0));
        assert!(scan.anomalies[0].z_score > 0.0);
        assert!(scan.anomalies[1].z_score < 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        // Two symmetric points give z = +/- 1/sqrt(2) each, exactly on the threshold.
        let boundary = 1.0 / 2.0_f64.sqrt();
        let scan = AnomalyDetector::new(boundary).detect(&window(&[0.0, 2.0]));
        assert!(scan.anomalies.is_empty());

        let scan = AnomalyDetector::new(boundary - 1e-9).detect(&window(&[0.0, 2.0]));
        assert_eq!(scan.anomalies.len(), 2);
    }
}
