//! Per-run scalar summaries and extrema extraction.
//!
//! Everything here is a pure function of one [`TimeSeries`]; nothing reads
//! the filesystem or the parameter set directly.

use flight_sweep_core::ParameterSet;
use serde::Serialize;

use crate::geo::{offset_from, GeoOffset, LandingZone};
use crate::time_series::TimeSeries;

pub const DYNAMIC_PRESSURE_CHANNEL: &str = "Dynamic Pressure";
pub const THRUST_CHANNEL: &str = "Thrust";
pub const ACCELERATION_CHANNELS: [&str; 3] = ["X-Acceleration", "Y-Acceleration", "Z-Acceleration"];
/// Angle of attack including the design gust, in degrees.
pub const GUST_AOA_CHANNEL: &str = "Angle of Attack(gust)";
pub const PARACHUTE_DEPLOY_CHANNEL: &str = "parachute_deploy_gain";

pub const LAUNCH_ELEVATION: &str = "launch.elevation";
pub const LAUNCHER_LENGTH: &str = "launch.launcher_length";
pub const LAUNCH_PITCH: &str = "launch.pitch";

/// Inputs to the summary that do not come from the time series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryOptions {
    /// Altitude treated as the ground when detecting the landing.
    pub ground_level: f64,
    /// Altitude at which the vehicle leaves the launch rail.
    pub launch_clear_height: Option<f64>,
}

impl SummaryOptions {
    /// Options for one run: the configured ground level plus the rail exit
    /// height when the parameter set describes the launcher.
    pub fn for_parameter_set(ground_level: f64, set: &ParameterSet) -> Self {
        Self {
            ground_level,
            launch_clear_height: launch_clear_height(set),
        }
    }
}

/// Rail exit height: elevation + launcher length * sin(pitch).
pub fn launch_clear_height(set: &ParameterSet) -> Option<f64> {
    let elevation = set.get_f64(LAUNCH_ELEVATION)?;
    let length = set.get_f64(LAUNCHER_LENGTH)?;
    let pitch_deg = set.get_f64(LAUNCH_PITCH)?;
    Some(elevation + length * pitch_deg.to_radians().sin())
}

/// Scalar results of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub max_altitude: f64,
    pub apogee_time: f64,
    pub max_speed: f64,
    pub max_speed_time: f64,
    pub landing_time: f64,
    /// Time from the first sample's clock origin to touchdown.
    pub flight_duration: f64,
    pub landing_latitude: f64,
    pub landing_longitude: f64,
    pub landing_north_m: f64,
    pub landing_east_m: f64,
    pub landing_range_m: f64,
    pub max_dynamic_pressure: Option<f64>,
    pub max_thrust: Option<f64>,
    pub launch_clear_speed: Option<f64>,
}

/// The series never descends through ground level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeverLanded;

/// Interpolated touchdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingEvent {
    pub time: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Index of the sample at or below ground level that ends the crossing.
    pub index: usize,
}

/// Last descending crossing of `ground_level`, linearly interpolated
/// between the bracketing samples.
///
/// A dip below ground on the rail or a bounce after touchdown produces an
/// earlier crossing; only the final one is the landing.
pub fn landing_event(series: &TimeSeries, ground_level: f64) -> Option<LandingEvent> {
    (1..series.len()).rev().find_map(|idx| {
        let above = series.altitude[idx - 1] - ground_level;
        let below = series.altitude[idx] - ground_level;
        if above > 0.0 && below <= 0.0 {
            let fraction = above / (above - below);
            let lerp = |column: &[f64]| column[idx - 1] + fraction * (column[idx] - column[idx - 1]);
            Some(LandingEvent {
                time: lerp(&series.time),
                latitude: lerp(&series.latitude),
                longitude: lerp(&series.longitude),
                index: idx,
            })
        } else {
            None
        }
    })
}

pub fn summarize(series: &TimeSeries, options: &SummaryOptions) -> Result<SummaryMetrics, NeverLanded> {
    if series.is_empty() {
        return Err(NeverLanded);
    }
    let landing = landing_event(series, options.ground_level).ok_or(NeverLanded)?;

    let apogee_idx = argmax(&series.altitude);
    let speeds: Vec<f64> = (0..series.len()).map(|idx| series.speed(idx)).collect();
    let max_speed_idx = argmax(&speeds);

    let offset = offset_from(
        series.latitude[0],
        series.longitude[0],
        landing.latitude,
        landing.longitude,
    );

    let launch_clear_speed = options.launch_clear_height.and_then(|height| {
        series
            .altitude
            .iter()
            .position(|altitude| *altitude > height)
            .map(|idx| speeds[idx])
    });

    Ok(SummaryMetrics {
        max_altitude: series.altitude[apogee_idx],
        apogee_time: series.time[apogee_idx],
        max_speed: speeds[max_speed_idx],
        max_speed_time: series.time[max_speed_idx],
        landing_time: landing.time,
        flight_duration: landing.time,
        landing_latitude: landing.latitude,
        landing_longitude: landing.longitude,
        landing_north_m: offset.north_m,
        landing_east_m: offset.east_m,
        landing_range_m: offset.range_m,
        max_dynamic_pressure: channel_max(series, DYNAMIC_PRESSURE_CHANNEL),
        max_thrust: channel_max(series, THRUST_CHANNEL),
        launch_clear_speed,
    })
}

fn channel_max(series: &TimeSeries, name: &str) -> Option<f64> {
    series
        .channel(name)
        .filter(|values| !values.is_empty())
        .map(|values| values[argmax(values)])
}

/// Index of the first maximum. NaN samples are skipped; an empty slice gives 0.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if values[best].is_nan() || *value > values[best] {
            best = idx;
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremaKind {
    InitialPoint,
    LaunchClear,
    MaxSpeed,
    MaxDynamicPressure,
    MaxAcceleration,
    MaxQbarAoa,
    MaxAltitude,
    FinalPoint,
    ParachuteDeploy,
    MaxThrust,
}

impl ExtremaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialPoint => "initial_point",
            Self::LaunchClear => "launch_clear",
            Self::MaxSpeed => "max_speed",
            Self::MaxDynamicPressure => "max_dynamic_pressure",
            Self::MaxAcceleration => "max_acceleration",
            Self::MaxQbarAoa => "max_qbar_aoa",
            Self::MaxAltitude => "max_altitude",
            Self::FinalPoint => "final_point",
            Self::ParachuteDeploy => "parachute_deploy",
            Self::MaxThrust => "max_thrust",
        }
    }
}

/// State of the vehicle at one notable sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremaPoint {
    pub kind: ExtremaKind,
    /// Value of the metric that selected this sample.
    pub value: f64,
    pub time: f64,
    pub altitude: f64,
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub offset: GeoOffset,
    /// Signed distance to the landing-zone boundary, positive inside.
    pub landing_margin_m: Option<f64>,
}

/// Notable samples of one run, each with its offset from the launch point.
///
/// Kinds whose source data is absent (no thrust channel, unknown rail
/// geometry) are omitted.
pub fn extrema_table(series: &TimeSeries, options: &SummaryOptions) -> Vec<ExtremaPoint> {
    extrema_points(series, options, None)
}

/// Like [`extrema_table`], with each point's margin to `zone` filled in.
pub fn extrema_table_in_zone(
    series: &TimeSeries,
    options: &SummaryOptions,
    zone: &LandingZone,
) -> Vec<ExtremaPoint> {
    extrema_points(series, options, Some(zone))
}

/// Per-sample magnitude of the three body accelerations.
fn acceleration_magnitude(series: &TimeSeries) -> Option<Vec<f64>> {
    let [x, y, z] = ACCELERATION_CHANNELS.map(|name| full_channel(series, name));
    let (x, y, z) = (x?, y?, z?);
    Some(
        (0..series.len())
            .map(|idx| (x[idx].powi(2) + y[idx].powi(2) + z[idx].powi(2)).sqrt())
            .collect(),
    )
}

/// Dynamic pressure times gust angle of attack.
fn qbar_aoa(series: &TimeSeries) -> Option<Vec<f64>> {
    let qbar = full_channel(series, DYNAMIC_PRESSURE_CHANNEL)?;
    let aoa = full_channel(series, GUST_AOA_CHANNEL)?;
    Some(qbar.iter().zip(aoa).map(|(q, a)| q * a).collect())
}

fn full_channel<'a>(series: &'a TimeSeries, name: &str) -> Option<&'a [f64]> {
    series
        .channel(name)
        .filter(|values| values.len() == series.len())
}

fn extrema_points(
    series: &TimeSeries,
    options: &SummaryOptions,
    zone: Option<&LandingZone>,
) -> Vec<ExtremaPoint> {
    if series.is_empty() {
        return Vec::new();
    }

    let speeds: Vec<f64> = (0..series.len()).map(|idx| series.speed(idx)).collect();
    let mut selected = vec![(ExtremaKind::InitialPoint, 0, series.altitude[0])];

    if let Some(height) = options.launch_clear_height {
        if let Some(idx) = series.altitude.iter().position(|altitude| *altitude > height) {
            selected.push((ExtremaKind::LaunchClear, idx, series.altitude[idx]));
        }
    }

    let max_speed_idx = argmax(&speeds);
    selected.push((ExtremaKind::MaxSpeed, max_speed_idx, speeds[max_speed_idx]));

    let mut push_max = |kind, values: Option<&[f64]>| {
        if let Some(values) = values {
            let idx = argmax(values);
            selected.push((kind, idx, values[idx]));
        }
    };
    push_max(
        ExtremaKind::MaxDynamicPressure,
        full_channel(series, DYNAMIC_PRESSURE_CHANNEL),
    );
    push_max(ExtremaKind::MaxAcceleration, acceleration_magnitude(series).as_deref());
    push_max(ExtremaKind::MaxQbarAoa, qbar_aoa(series).as_deref());
    push_max(ExtremaKind::MaxAltitude, Some(series.altitude.as_slice()));

    let last = series.len() - 1;
    selected.push((ExtremaKind::FinalPoint, last, series.altitude[last]));

    for (kind, channel) in [
        (ExtremaKind::ParachuteDeploy, PARACHUTE_DEPLOY_CHANNEL),
        (ExtremaKind::MaxThrust, THRUST_CHANNEL),
    ] {
        if let Some(values) = full_channel(series, channel) {
            let idx = argmax(values);
            selected.push((kind, idx, values[idx]));
        }
    }

    let (origin_lat, origin_lon) = (series.latitude[0], series.longitude[0]);
    selected
        .into_iter()
        .map(|(kind, idx, value)| ExtremaPoint {
            kind,
            value,
            time: series.time[idx],
            altitude: series.altitude[idx],
            speed: speeds[idx],
            latitude: series.latitude[idx],
            longitude: series.longitude[idx],
            offset: offset_from(origin_lat, origin_lon, series.latitude[idx], series.longitude[idx]),
            landing_margin_m: zone
                .map(|zone| zone.signed_distance_m(series.latitude[idx], series.longitude[idx])),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::Sample;

    fn sample(time: f64, altitude: f64, latitude: f64, velocity: [f64; 3]) -> Sample {
        Sample {
            time,
            latitude,
            longitude: 139.99,
            altitude,
            velocity,
        }
    }

    #[test]
    fn test_landing_interpolation() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 10.0, 40.0, [0.0, 0.0, 5.0]),
            sample(1.0, 5.0, 40.1, [0.0, 0.0, 5.0]),
            sample(2.0, -5.0, 40.2, [0.0, 0.0, 10.0]),
        ]);
        let metrics = summarize(&series, &SummaryOptions::default()).unwrap();
        assert_eq!(metrics.landing_time, 1.5);
        assert_eq!(metrics.flight_duration, 1.5);
        assert!((metrics.landing_latitude - 40.15).abs() < 1e-12);
        assert_eq!(metrics.max_altitude, 10.0);
        assert_eq!(metrics.apogee_time, 0.0);
        assert_eq!(metrics.max_speed, 10.0);
        assert!(metrics.landing_north_m > 0.0);
    }

    #[test]
    fn test_landing_on_exact_ground_sample() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, 50.0, 40.0, [0.0, 0.0, -50.0]),
            sample(2.0, 0.0, 40.0, [3.0, 4.0, 0.0]),
        ]);
        let event = landing_event(&series, 0.0).unwrap();
        assert_eq!(event.time, 2.0);
        assert_eq!(event.index, 2);
    }

    #[test]
    fn test_never_landing_is_reported() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, 120.0, 40.0, [0.0, 0.0, -80.0]),
            sample(2.0, 90.0, 40.0, [0.0, 0.0, 10.0]),
        ]);
        assert_eq!(summarize(&series, &SummaryOptions::default()), Err(NeverLanded));
    }

    #[test]
    fn test_ground_level_offset() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 30.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, 60.0, 40.0, [0.0, 0.0, -30.0]),
            sample(2.0, 10.0, 40.0, [0.0, 0.0, 50.0]),
        ]);
        let options = SummaryOptions {
            ground_level: 20.0,
            launch_clear_height: None,
        };
        let metrics = summarize(&series, &options).unwrap();
        assert!((metrics.landing_time - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_optional_channels_and_launch_clear() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.0, [0.0, 0.0, 0.0]),
            sample(0.5, 4.0, 40.0, [0.0, 0.0, -20.0]),
            sample(1.0, 40.0, 40.0, [0.0, 0.0, -60.0]),
            sample(2.0, -1.0, 40.0, [0.0, 0.0, 30.0]),
        ])
        .with_channel(THRUST_CHANNEL, vec![0.0, 900.0, 400.0, 0.0])
        .with_channel(DYNAMIC_PRESSURE_CHANNEL, vec![0.0, 300.0, 2200.0, 500.0])
        .with_channel(ACCELERATION_CHANNELS[0], vec![0.0, 3.0, 1.0, 0.0])
        .with_channel(ACCELERATION_CHANNELS[1], vec![0.0, 0.0, 0.0, 0.0])
        .with_channel(ACCELERATION_CHANNELS[2], vec![0.0, 4.0, 1.0, 0.0])
        .with_channel(GUST_AOA_CHANNEL, vec![0.0, 10.0, 0.5, 2.0])
        .with_channel(PARACHUTE_DEPLOY_CHANNEL, vec![0.0, 0.0, 1.0, 1.0]);
        let options = SummaryOptions {
            ground_level: 0.0,
            launch_clear_height: Some(3.0),
        };
        let metrics = summarize(&series, &options).unwrap();
        assert_eq!(metrics.max_thrust, Some(900.0));
        assert_eq!(metrics.max_dynamic_pressure, Some(2200.0));
        assert_eq!(metrics.launch_clear_speed, Some(20.0));
        assert_eq!(metrics.max_speed_time, 1.0);

        let table = extrema_table(&series, &options);
        let kinds: Vec<ExtremaKind> = table.iter().map(|point| point.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ExtremaKind::InitialPoint,
                ExtremaKind::LaunchClear,
                ExtremaKind::MaxSpeed,
                ExtremaKind::MaxDynamicPressure,
                ExtremaKind::MaxAcceleration,
                ExtremaKind::MaxQbarAoa,
                ExtremaKind::MaxAltitude,
                ExtremaKind::FinalPoint,
                ExtremaKind::ParachuteDeploy,
                ExtremaKind::MaxThrust,
            ]
        );
        assert_eq!(table[4].value, 5.0);
        assert_eq!(table[4].time, 0.5);
        assert_eq!(table[5].value, 3000.0);
        assert_eq!(table[5].time, 0.5);
        assert_eq!(table[6].altitude, 40.0);
        assert_eq!(table[8].time, 1.0);
        assert_eq!(table[0].offset.range_m, 0.0);
        assert!(table.iter().all(|point| point.landing_margin_m.is_none()));
    }

    #[test]
    fn test_acceleration_needs_all_three_axes() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, 10.0, 40.0, [0.0, 0.0, -10.0]),
        ])
        .with_channel(ACCELERATION_CHANNELS[0], vec![1.0, 2.0])
        .with_channel(ACCELERATION_CHANNELS[2], vec![1.0, 2.0]);
        let table = extrema_table(&series, &SummaryOptions::default());
        assert!(table.iter().all(|point| point.kind != ExtremaKind::MaxAcceleration));
    }

    #[test]
    fn test_extrema_landing_margin_in_zone() {
        let zone = LandingZone::noshiro_sea();
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.24, [0.0, 0.0, 0.0]),
            sample(1.0, 10.0, 40.24, [0.0, 0.0, -10.0]),
        ]);
        let table = extrema_table_in_zone(&series, &SummaryOptions::default(), &zone);
        let expected = zone.signed_distance_m(40.24, 139.99);
        assert!(table
            .iter()
            .all(|point| point.landing_margin_m == Some(expected)));
    }

    #[test]
    fn test_landing_uses_last_descending_crossing() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 1.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, -0.5, 40.0, [0.0, 0.0, 1.0]),
            sample(2.0, 80.0, 40.0, [0.0, 0.0, -40.0]),
            sample(3.0, 20.0, 40.1, [0.0, 0.0, 20.0]),
            sample(4.0, -20.0, 40.2, [0.0, 0.0, 20.0]),
        ]);
        let event = landing_event(&series, 0.0).unwrap();
        assert_eq!(event.index, 4);
        assert_eq!(event.time, 3.5);
        assert!((event.latitude - 40.15).abs() < 1e-12);
    }

    #[test]
    fn test_extrema_table_skips_missing_channels() {
        let series = TimeSeries::from_samples(&[
            sample(0.0, 0.0, 40.0, [0.0, 0.0, 0.0]),
            sample(1.0, 10.0, 40.0, [0.0, 0.0, -10.0]),
        ]);
        let table = extrema_table(&series, &SummaryOptions::default());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_argmax_prefers_first_and_skips_nan() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[f64::NAN, 2.0, 1.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
