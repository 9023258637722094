//! Ready-made scenario definitions for common dispersion studies.
//!
//! Each preset only declares the sweep; callers merge in their vehicle's
//! base parameters with [`ScenarioDescription::with_base`].

use crate::scenario::ScenarioDescription;

/// Compass directions the wind is swept over, in degrees.
pub const COMPASS_DIRECTIONS_DEG: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Full landing-dispersion sweep: ground wind 0-8 m/s in 1 m/s steps from
/// eight directions, one group (and one dispersion boundary) per wind speed.
pub fn wind_dispersion_scenario() -> ScenarioDescription {
    ScenarioDescription::new()
        .sweep(
            "ground_wind_speed",
            (0..=8).map(f64::from).collect::<Vec<_>>(),
        )
        .sweep("ground_wind_direction", COMPASS_DIRECTIONS_DEG.to_vec())
        .group_by(["ground_wind_speed"])
        .output_dir("output/wind_dispersion")
}

/// Quick smoke sweep: two wind speeds from two directions.
pub fn minimal_scenario() -> ScenarioDescription {
    ScenarioDescription::new()
        .sweep("ground_wind_speed", vec![0.0, 4.0])
        .sweep("ground_wind_direction", vec![0.0, 180.0])
        .group_by(["ground_wind_speed"])
        .output_dir("output/minimal")
}

/// Dry-mass and parachute-deploy-altitude sensitivity at a fixed moderate
/// wind, grouped by mass.
pub fn mass_sensitivity_scenario(nominal_mass_kg: f64) -> ScenarioDescription {
    let masses = [0.9, 0.95, 1.0, 1.05, 1.1]
        .iter()
        .map(|factor| nominal_mass_kg * factor)
        .collect::<Vec<_>>();

    ScenarioDescription::new()
        .with_base("ground_wind_speed", 4.0)
        .with_base("ground_wind_direction", 270.0)
        .sweep("mass", masses)
        .sweep("deploy_altitude", vec![150.0, 200.0, 250.0])
        .group_by(["mass"])
        .output_dir("output/mass_sensitivity")
}
