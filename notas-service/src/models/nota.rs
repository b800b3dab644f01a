use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::NotasError;

/// Storage format of `notas.data`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format of a calendar day, as produced by SQLite's `date()`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A ticket rating in 0..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self, NotasError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(NotasError::InvalidScore(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = NotasError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

/// A rated ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nota {
    pub ticket: String,
    pub agente: String,
    pub data: NaiveDateTime,
    pub score: Score,
}

/// Mean score of one agent on one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAverage {
    pub day: NaiveDate,
    pub average: f64,
}
