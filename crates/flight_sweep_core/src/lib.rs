//! Deterministic sweep primitives for parametric flight-simulation batches.
//!
//! This crate owns the scenario description, its validation and the
//! Cartesian expansion into parameter sets. It does no I/O beyond reading a
//! scenario file; execution and aggregation live in `flight_sweep`.
//!
//! ```
//! use flight_sweep_core::{expand, ScenarioDescription};
//!
//! let scenario = ScenarioDescription::new()
//!     .with_base("altitude_limit", 1000.0)
//!     .sweep("wind_speed", vec![0.0, 5.0])
//!     .sweep("wind_direction", vec![0.0, 180.0])
//!     .group_by(["wind_speed"]);
//!
//! let sets = expand(&scenario).unwrap();
//! assert_eq!(sets.len(), 4);
//! ```

pub mod error;
pub mod expand;
pub mod parameter_set;
pub mod presets;
pub mod scenario;
pub mod value;

pub use error::ConfigurationError;
pub use expand::{combination_for_index, expand};
pub use parameter_set::{AxisTag, ParameterSet};
pub use scenario::{ScenarioDescription, SweepAxis, MAX_TOTAL_PARAMETER_POINTS};
pub use value::ParameterValue;
