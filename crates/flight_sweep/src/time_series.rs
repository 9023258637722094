//! Simulator output: one row per integration step.
//!
//! The simulator writes a headed CSV where every field is numeric. Seven
//! columns are required (time, geodetic position and NED velocity); every
//! other column is kept as a named domain channel such as `Dynamic Pressure`
//! or `Thrust`.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header names of the required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub velocity_north: String,
    pub velocity_east: String,
    pub velocity_down: String,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            time: "Time".to_string(),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
            altitude: "Altitude".to_string(),
            velocity_north: "V_north".to_string(),
            velocity_east: "V_east".to_string(),
            velocity_down: "V_down".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TimeSeriesError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: time goes backwards")]
    NonMonotonicTime { row: usize },

    #[error("time series has no samples")]
    Empty,
}

/// One sample of the required channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// North, east, down in m/s.
    pub velocity: [f64; 3],
}

/// Column-major flight record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub altitude: Vec<f64>,
    pub velocity_north: Vec<f64>,
    pub velocity_east: Vec<f64>,
    pub velocity_down: Vec<f64>,
    channels: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut series = Self::default();
        for sample in samples {
            series.push(*sample);
        }
        series
    }

    pub fn push(&mut self, sample: Sample) {
        self.time.push(sample.time);
        self.latitude.push(sample.latitude);
        self.longitude.push(sample.longitude);
        self.altitude.push(sample.altitude);
        self.velocity_north.push(sample.velocity[0]);
        self.velocity_east.push(sample.velocity[1]);
        self.velocity_down.push(sample.velocity[2]);
    }

    /// Attach a domain channel. Must have one value per sample.
    pub fn with_channel(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.channels.insert(name.into(), values);
        self
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Velocity magnitude at sample `index`.
    pub fn speed(&self, index: usize) -> f64 {
        let north = self.velocity_north[index];
        let east = self.velocity_east[index];
        let down = self.velocity_down[index];
        (north * north + east * east + down * down).sqrt()
    }

    pub fn sample(&self, index: usize) -> Sample {
        Sample {
            time: self.time[index],
            latitude: self.latitude[index],
            longitude: self.longitude[index],
            altitude: self.altitude[index],
            velocity: [
                self.velocity_north[index],
                self.velocity_east[index],
                self.velocity_down[index],
            ],
        }
    }

    /// Parse a headed, all-numeric CSV.
    pub fn from_csv<R: Read>(reader: R, channels: &ChannelMap) -> Result<Self, TimeSeriesError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| TimeSeriesError::MissingColumn(name.to_string()))
        };
        let required = [
            position(&channels.time)?,
            position(&channels.latitude)?,
            position(&channels.longitude)?,
            position(&channels.altitude)?,
            position(&channels.velocity_north)?,
            position(&channels.velocity_east)?,
            position(&channels.velocity_down)?,
        ];

        let mut series = Self::default();
        let extra: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !required.contains(idx))
            .collect();
        for (_, name) in &extra {
            series.channels.insert((*name).to_string(), Vec::new());
        }

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let field = |idx: usize| -> Result<f64, TimeSeriesError> {
                let raw = record.get(idx).unwrap_or("");
                raw.parse::<f64>().map_err(|_| TimeSeriesError::InvalidValue {
                    row,
                    column: headers.get(idx).unwrap_or("").to_string(),
                    value: raw.to_string(),
                })
            };

            let sample = Sample {
                time: field(required[0])?,
                latitude: field(required[1])?,
                longitude: field(required[2])?,
                altitude: field(required[3])?,
                velocity: [field(required[4])?, field(required[5])?, field(required[6])?],
            };
            if series.time.last().is_some_and(|previous| sample.time < *previous) {
                return Err(TimeSeriesError::NonMonotonicTime { row });
            }
            series.push(sample);

            for (idx, name) in &extra {
                let value = field(*idx)?;
                if let Some(column) = series.channels.get_mut(*name) {
                    column.push(value);
                }
            }
        }

        if series.is_empty() {
            return Err(TimeSeriesError::Empty);
        }
        Ok(series)
    }
}
