use analytics::AnalyticsError;
use analyzer::error::AnalyzerError;
use analyzer::{AnalyticsFacade, InMemorySource, MeasurementSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeDelta, TimeZone, Utc};
use configuration::Analytics;
use core_types::{HourlyBucket, MeasurementRecord, TrendDirection, Urgency};
use database::DbError;
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap()
}

fn reading(minutes_ago: i64, bbw: f64, stddev: f64) -> MeasurementRecord {
    MeasurementRecord {
        time: now() - Duration::minutes(minutes_ago),
        bbw_avg: bbw,
        bbw_stddev: stddev,
        bbw_min: Some(bbw - 1.0),
        bbw_max: Some(bbw + 1.0),
        temperature: Some(24.0),
        vibration: Some(0.3),
        quality_flag: Some(1.0),
    }
}

fn facade(source: impl MeasurementSource + 'static) -> AnalyticsFacade {
    AnalyticsFacade::new(Arc::new(source), &Analytics::default())
}

/// Fails every call, standing in for an unreachable database.
struct BrokenSource;

#[async_trait]
impl MeasurementSource for BrokenSource {
    async fn recent_measurements(
        &self,
        _loom_id: &str,
        _lookback: TimeDelta,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        Err(DbError::ConnectionConfigError("pool closed".to_string()).into())
    }

    async fn hourly_buckets(
        &self,
        _loom_id: &str,
        _lookback: TimeDelta,
    ) -> Result<Vec<HourlyBucket>, AnalyzerError> {
        Err(DbError::ConnectionConfigError("pool closed".to_string()).into())
    }

    async fn measurements_between(
        &self,
        _loom_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        Err(DbError::ConnectionConfigError("pool closed".to_string()).into())
    }
}

#[tokio::test]
async fn anomaly_scan_only_sees_the_lookback() {
    let mut records: Vec<MeasurementRecord> = (0..30).map(|m| reading(m, 125.0, 0.5)).collect();
    records[4].bbw_avg = 160.0;
    // Outside a 1 hour lookback and would dominate the statistics if included.
    records.push(reading(180, 900.0, 0.5));
    let facade = facade(InMemorySource::new(now()).with_records("LOOM-001", records));

    let report = facade.detect_anomalies("LOOM-001", Some(1)).await.unwrap();

    assert_eq!(report.loom_id, "LOOM-001");
    assert_eq!(report.period_hours, 1);
    assert_eq!(report.total_measurements, 30);
    assert_eq!(report.anomaly_count, 1);
    assert_eq!(report.anomalies[0].bbw_avg, 160.0);
    assert_eq!(report.anomalies[0].time, now() - Duration::minutes(4));
    assert!(report.anomalies[0].z_score > 3.0);
    assert_eq!(report.statistics.max, 160.0);
}

#[tokio::test]
async fn anomaly_scan_defaults_to_configured_lookback() {
    let facade = facade(InMemorySource::new(now()).with_records("LOOM-001", vec![reading(60 * 23, 125.0, 0.5)]));
    let report = facade.detect_anomalies("LOOM-001", None).await.unwrap();
    assert_eq!(report.period_hours, 24);
    assert_eq!(report.total_measurements, 1);
}

#[tokio::test]
async fn unknown_loom_gives_empty_anomaly_and_quality_reports() {
    let facade = facade(InMemorySource::new(now()));

    let anomalies = facade.detect_anomalies("LOOM-404", None).await.unwrap();
    assert!(anomalies.anomalies.is_empty());
    assert_eq!(anomalies.anomaly_count, 0);
    assert_eq!(anomalies.total_measurements, 0);

    let quality = facade
        .quality_report("LOOM-404", now() - Duration::days(1), None)
        .await
        .unwrap();
    assert_eq!(quality.measurements.total_count, 0);
    assert_eq!(quality.measurements.average_bbw, 0.0);
    assert_eq!(quality.period.end, now());
}

#[tokio::test]
async fn unknown_loom_is_insufficient_for_maintenance() {
    let err = facade(InMemorySource::new(now()))
        .predict_maintenance("LOOM-404")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AnalyzerError::Analytics(AnalyticsError::InsufficientData(_))
    ));
}

#[tokio::test]
async fn maintenance_uses_hourly_buckets() {
    // Two readings inside each of the last 48 hours; stddev climbs 0.006 per hour.
    let records: Vec<MeasurementRecord> = (0..48)
        .flat_map(|h| {
            let stddev = 0.5 + 0.006 * (47 - h) as f64;
            [reading(h * 60 + 10, 125.0, stddev), reading(h * 60 + 40, 125.0, stddev)]
        })
        .collect();
    let facade = facade(InMemorySource::new(now()).with_records("LOOM-007", records));

    let assessment = facade.predict_maintenance("LOOM-007").await.unwrap();

    assert!((assessment.slope - 0.006).abs() < 1e-9, "slope = {}", assessment.slope);
    assert!((assessment.health_score - 40.0).abs() < 1e-6);
    assert!(assessment.maintenance_needed);
    assert_eq!(assessment.urgency, Urgency::High);
    assert_eq!(assessment.trend_direction, TrendDirection::Increasing);
}

#[tokio::test]
async fn quality_report_covers_the_explicit_period() {
    let records = vec![
        reading(120, 100.0, 0.5),
        reading(60, 124.0, 0.5),
        reading(30, 126.0, 0.5),
    ];
    let facade = facade(InMemorySource::new(now()).with_records("LOOM-002", records));

    let report = facade
        .quality_report("LOOM-002", now() - Duration::minutes(90), Some(now()))
        .await
        .unwrap();

    assert_eq!(report.measurements.total_count, 2);
    assert_eq!(report.measurements.average_bbw, 125.0);
    assert_eq!(report.measurements.min_bbw, 123.0);
    assert_eq!(report.measurements.max_bbw, 127.0);
    assert_eq!(report.measurements.quality_score, 1.0);
}

#[tokio::test]
async fn reversed_period_is_rejected_before_any_io() {
    let err = facade(BrokenSource)
        .quality_report("LOOM-002", now(), Some(now() - Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AnalyzerError::Analytics(AnalyticsError::InvalidRange(_))
    ));
}

#[tokio::test]
async fn non_positive_lookback_is_rejected() {
    let facade = facade(InMemorySource::new(now()));
    for hours in [0, -6] {
        let err = facade.detect_anomalies("LOOM-001", Some(hours)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::Analytics(AnalyticsError::InvalidRange(_))
        ));
    }
}

#[tokio::test]
async fn source_failures_propagate_unchanged() {
    let facade = facade(BrokenSource);

    let err = facade.detect_anomalies("LOOM-001", None).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Database(DbError::ConnectionConfigError(ref m)) if m == "pool closed"));

    let err = facade.predict_maintenance("LOOM-001").await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Database(_)));

    let err = facade.summary("LOOM-001").await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Database(_)));
}

#[tokio::test]
async fn summary_rolls_up_recent_readings() {
    let records = vec![reading(10, 120.0, 0.5), reading(20, 130.0, 0.5), reading(60 * 30, 1.0, 0.5)];
    let facade = facade(InMemorySource::new(now()).with_records("LOOM-005", records));

    let summary = facade.summary("LOOM-005").await.unwrap();

    assert_eq!(summary.period_hours, 24);
    assert_eq!(summary.summary.total_measurements, 2);
    assert_eq!(summary.summary.avg_bbw, 125.0);
    assert_eq!(summary.summary.avg_temperature, 24.0);
}

#[tokio::test]
async fn anchored_source_clock_sits_at_latest_record() {
    let records = vec![reading(90, 125.0, 0.5), reading(5, 125.0, 0.5)];
    let source = InMemorySource::anchored_at_latest("LOOM-001", records).unwrap();
    assert_eq!(source.now(), now() - Duration::minutes(5));
    assert!(InMemorySource::anchored_at_latest("LOOM-001", Vec::new()).is_none());
}
