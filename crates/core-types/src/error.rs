use crate::enums::TimeOrder;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Measurement {index} at {time} breaks {order} ordering")]
    OutOfOrder {
        index: usize,
        time: DateTime<Utc>,
        order: TimeOrder,
    },

    #[error("Cannot truncate {time} to the hour: {reason}")]
    HourTruncation { time: DateTime<Utc>, reason: String },
}
