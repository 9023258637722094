//! Power-law wind profile handed to the simulator as a lookup table.

use std::io::Write;

use flight_sweep_core::ParameterSet;
use serde::Serialize;

pub const GROUND_WIND_SPEED: &str = "ground_wind_speed";
pub const GROUND_WIND_DIRECTION: &str = "ground_wind_direction";
pub const WIND_REFERENCE_ALTITUDE: &str = "wind_reference_altitude";
pub const WIND_POWER_FACTOR: &str = "wind_power_factor";

pub const DEFAULT_REFERENCE_ALTITUDE_M: f64 = 10.0;
pub const DEFAULT_POWER_FACTOR: f64 = 1.0 / 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindSample {
    pub altitude_m: f64,
    pub speed_mps: f64,
    pub direction_deg: f64,
}

/// Wind table following `V(h) = V_ref * (h / H_ref)^alpha`.
///
/// Altitudes are dense near the ground and sparse aloft: 0.1 m steps up to
/// 10 m, 300 log-spaced points up to 1 km, then 100 m steps up to 10 km.
/// The direction is constant with altitude and flipped by 180 degrees from
/// the ground direction.
pub fn wind_profile(
    ground_direction_deg: f64,
    ground_speed_mps: f64,
    reference_altitude_m: f64,
    power_factor: f64,
) -> Vec<WindSample> {
    let direction_deg = if ground_direction_deg > 180.0 {
        ground_direction_deg - 180.0
    } else {
        ground_direction_deg + 180.0
    };

    profile_altitudes()
        .into_iter()
        .map(|altitude_m| WindSample {
            altitude_m,
            speed_mps: ground_speed_mps * (altitude_m / reference_altitude_m).powf(power_factor),
            direction_deg,
        })
        .collect()
}

/// Build the profile for a parameter set, if it sweeps ground wind.
pub fn wind_profile_for(set: &ParameterSet) -> Option<Vec<WindSample>> {
    let speed = set.get_f64(GROUND_WIND_SPEED)?;
    let direction = set.get_f64(GROUND_WIND_DIRECTION)?;
    let reference = set
        .get_f64(WIND_REFERENCE_ALTITUDE)
        .unwrap_or(DEFAULT_REFERENCE_ALTITUDE_M);
    let power = set.get_f64(WIND_POWER_FACTOR).unwrap_or(DEFAULT_POWER_FACTOR);
    Some(wind_profile(direction, speed, reference, power))
}

pub fn write_wind_table<W: Write>(samples: &[WindSample], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for sample in samples {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}

fn profile_altitudes() -> Vec<f64> {
    let mut altitudes: Vec<f64> = (1..=100).map(|step| f64::from(step) / 10.0).collect();
    altitudes.extend((0..300).map(|i| 10f64.powf(1.0 + 2.0 * f64::from(i) / 299.0)));
    altitudes.extend((10..=100).map(|step| f64::from(step) * 100.0));

    altitudes.sort_by(f64::total_cmp);
    altitudes.dedup();
    altitudes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_bounds_and_order() {
        let profile = wind_profile(90.0, 4.0, 10.0, 1.0 / 7.0);
        assert_eq!(profile.first().unwrap().altitude_m, 0.1);
        assert_eq!(profile.last().unwrap().altitude_m, 10_000.0);
        assert!(profile.windows(2).all(|w| w[0].altitude_m < w[1].altitude_m));
    }

    #[test]
    fn test_reference_altitude_keeps_ground_speed() {
        let profile = wind_profile(0.0, 6.0, 10.0, 0.2);
        let at_reference = profile.iter().find(|s| s.altitude_m == 10.0).unwrap();
        assert!((at_reference.speed_mps - 6.0).abs() < 1e-12);
        assert!(profile.last().unwrap().speed_mps > 6.0);
    }

    #[test]
    fn test_direction_is_flipped() {
        assert_eq!(wind_profile(90.0, 1.0, 10.0, 0.1)[0].direction_deg, 270.0);
        assert_eq!(wind_profile(270.0, 1.0, 10.0, 0.1)[0].direction_deg, 90.0);
        assert_eq!(wind_profile(180.0, 1.0, 10.0, 0.1)[0].direction_deg, 360.0);
    }

    #[test]
    fn test_write_wind_table_has_header() {
        let mut buffer = Vec::new();
        write_wind_table(&wind_profile(0.0, 2.0, 10.0, 0.1)[..2], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("altitude_m,speed_mps,direction_deg\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
