use crate::error::AnalyzerError;
use analytics::AnalyticsError;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use core_types::{HourlyBucket, MeasurementRecord, MeasurementWindow, TimeOrder};
use database::DbRepository;
use std::collections::HashMap;

/// Where the facade gets its measurements from.
///
/// All blocking I/O lives behind this trait; the statistics run only after it returns.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Measurements from the last `lookback`, newest first.
    async fn recent_measurements(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError>;

    /// Hourly aggregates over the last `lookback`, oldest first.
    async fn hourly_buckets(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<HourlyBucket>, AnalyzerError>;

    /// Measurements within `[start, end]`, oldest first.
    async fn measurements_between(
        &self,
        loom_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError>;

    /// The instant lookbacks and open-ended periods are measured from.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn cutoff(now: DateTime<Utc>, lookback: TimeDelta) -> Result<DateTime<Utc>, AnalyzerError> {
    now.checked_sub_signed(lookback).ok_or_else(|| {
        AnalyticsError::InvalidRange(format!("lookback of {lookback} reaches past the calendar"))
            .into()
    })
}

#[async_trait]
impl MeasurementSource for DbRepository {
    async fn recent_measurements(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        let since = cutoff(self.now(), lookback)?;
        Ok(self.get_measurements_since(loom_id, since).await?)
    }

    async fn hourly_buckets(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<HourlyBucket>, AnalyzerError> {
        let since = cutoff(self.now(), lookback)?;
        Ok(self.get_hourly_buckets(loom_id, since).await?)
    }

    async fn measurements_between(
        &self,
        loom_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        Ok(self.get_measurements_between(loom_id, start, end).await?)
    }
}

/// A measurement source backed by records held in memory, with a fixed clock.
///
/// Used for offline analysis of exported data and for exercising the facade in tests.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    looms: HashMap<String, Vec<MeasurementRecord>>,
    now: DateTime<Utc>,
}

impl InMemorySource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            looms: HashMap::new(),
            now,
        }
    }

    /// Adds records for a loom. Records may arrive in any order.
    pub fn with_records(
        mut self,
        loom_id: impl Into<String>,
        records: impl IntoIterator<Item = MeasurementRecord>,
    ) -> Self {
        let entry = self.looms.entry(loom_id.into()).or_default();
        entry.extend(records);
        entry.sort_by_key(|r| r.time);
        self
    }

    /// Builds a single-loom source whose clock sits at the newest record.
    ///
    /// Returns `None` when there are no records to anchor on.
    pub fn anchored_at_latest(loom_id: impl Into<String>, records: Vec<MeasurementRecord>) -> Option<Self> {
        let latest = records.iter().map(|r| r.time).max()?;
        Some(Self::new(latest).with_records(loom_id, records))
    }

    fn since(&self, loom_id: &str, since: DateTime<Utc>) -> impl Iterator<Item = &MeasurementRecord> {
        self.looms
            .get(loom_id)
            .into_iter()
            .flatten()
            .filter(move |r| r.time >= since)
    }
}

#[async_trait]
impl MeasurementSource for InMemorySource {
    async fn recent_measurements(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        let since = cutoff(self.now, lookback)?;
        let mut records: Vec<MeasurementRecord> = self.since(loom_id, since).cloned().collect();
        records.reverse();
        Ok(records)
    }

    async fn hourly_buckets(
        &self,
        loom_id: &str,
        lookback: TimeDelta,
    ) -> Result<Vec<HourlyBucket>, AnalyzerError> {
        let since = cutoff(self.now, lookback)?;
        let records = self.since(loom_id, since).cloned().collect();
        let window = MeasurementWindow::new(loom_id, TimeOrder::Ascending, records)?;
        Ok(HourlyBucket::from_window(&window)?)
    }

    async fn measurements_between(
        &self,
        loom_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, AnalyzerError> {
        Ok(self
            .since(loom_id, start)
            .filter(|r| r.time <= end)
            .cloned()
            .collect())
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
