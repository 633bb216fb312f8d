//! Pollution sample data model.
//!
//! One `Sample` is created per successful tick and appended to the day log
//! as a single pipe-delimited line.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Separator between the six fields of a day-log line.
pub(crate) const FIELD_SEPARATOR: &str = " | ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// One reading: where the device was and how much PM10 was in the air.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    /// Meters per second.
    pub speed: f64,
    /// PM10 concentration, µg/m³. `0.0` when the pollution query degraded.
    pub pm10: f64,
}

impl Sample {
    /// ISO day key (`YYYY-MM-DD`) of the day log this sample belongs to.
    pub fn day_key(&self) -> String {
        self.timestamp.format(DAY_KEY_FORMAT).to_string()
    }

    /// Renders the six-field log line, newline excluded.
    pub fn to_log_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.latitude,
            self.longitude,
            self.altitude,
            self.speed,
            self.pm10,
            sep = FIELD_SEPARATOR,
        )
    }

    /// Parses one day-log line. Lines that do not split into exactly six
    /// fields, or whose fields do not parse, yield `None`.
    pub fn parse_log_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != 6 {
            return None;
        }

        let naive = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT).ok()?;
        let timestamp = Local.from_local_datetime(&naive).earliest()?;

        Some(Self {
            timestamp,
            latitude: fields[1].parse().ok()?,
            longitude: fields[2].parse().ok()?,
            altitude: fields[3].parse().ok()?,
            speed: fields[4].parse().ok()?,
            pm10: fields[5].parse().ok()?,
        })
    }
}
