use crate::enums::TimeOrder;
use crate::error::CoreError;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// A single BBW sensor reading as stored in `bbw_measurements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MeasurementRecord {
    pub time: DateTime<Utc>,
    pub bbw_avg: f64,
    pub bbw_stddev: f64,
    #[serde(default)]
    pub bbw_min: Option<f64>,
    #[serde(default)]
    pub bbw_max: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    /// Fraction of good readings in the sample, in [0, 1].
    #[serde(default)]
    pub quality_flag: Option<f64>,
}

/// An ordered, read-only run of measurements for one loom.
///
/// The ordering direction is fixed at construction and checked against the
/// timestamps, so downstream code can rely on index order being time order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementWindow {
    loom_id: String,
    records: Vec<MeasurementRecord>,
}

impl MeasurementWindow {
    pub fn new(
        loom_id: impl Into<String>,
        order: TimeOrder,
        records: Vec<MeasurementRecord>,
    ) -> Result<Self, CoreError> {
        if let Some(pos) = records
            .windows(2)
            .position(|pair| !order.permits(pair[0].time, pair[1].time))
        {
            return Err(CoreError::OutOfOrder {
                index: pos + 1,
                time: records[pos + 1].time,
                order,
            });
        }

        Ok(Self {
            loom_id: loom_id.into(),
            records,
        })
    }

    pub fn loom_id(&self) -> &str {
        &self.loom_id
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose timestamp falls within `[start, end]`, both ends inclusive.
    pub fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &MeasurementRecord> {
        self.records
            .iter()
            .filter(move |r| r.time >= start && r.time <= end)
    }
}

/// One hour of measurements collapsed into averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HourlyBucket {
    pub hour: DateTime<Utc>,
    pub avg_bbw: f64,
    pub avg_stddev: f64,
    pub avg_temp: Option<f64>,
    pub avg_vib: Option<f64>,
}

#[derive(Default)]
struct BucketSums {
    count: usize,
    bbw: f64,
    stddev: f64,
    temp: (f64, usize),
    vib: (f64, usize),
}

impl BucketSums {
    fn add(&mut self, record: &MeasurementRecord) {
        self.count += 1;
        self.bbw += record.bbw_avg;
        self.stddev += record.bbw_stddev;
        if let Some(t) = record.temperature {
            self.temp.0 += t;
            self.temp.1 += 1;
        }
        if let Some(v) = record.vibration {
            self.vib.0 += v;
            self.vib.1 += 1;
        }
    }

    fn into_bucket(self, hour: DateTime<Utc>) -> HourlyBucket {
        let n = self.count as f64;
        HourlyBucket {
            hour,
            avg_bbw: self.bbw / n,
            avg_stddev: self.stddev / n,
            avg_temp: (self.temp.1 > 0).then(|| self.temp.0 / self.temp.1 as f64),
            avg_vib: (self.vib.1 > 0).then(|| self.vib.0 / self.vib.1 as f64),
        }
    }
}

impl HourlyBucket {
    /// Groups a window by hour, returning one bucket per distinct hour in ascending order.
    ///
    /// Optional metrics are averaged over the readings that carry them, the same way
    /// SQL `AVG` skips nulls.
    pub fn from_window(window: &MeasurementWindow) -> Result<Vec<HourlyBucket>, CoreError> {
        let mut hours: BTreeMap<DateTime<Utc>, BucketSums> = BTreeMap::new();

        for record in window.records() {
            let hour = record
                .time
                .duration_trunc(TimeDelta::hours(1))
                .map_err(|e| CoreError::HourTruncation {
                    time: record.time,
                    reason: e.to_string(),
                })?;
            hours.entry(hour).or_default().add(record);
        }

        Ok(hours
            .into_iter()
            .map(|(hour, sums)| sums.into_bucket(hour))
            .collect())
    }
}
