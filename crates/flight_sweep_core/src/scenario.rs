//! Scenario description: base parameters, sweep axes and grouping.
//!
//! A scenario is validated once, either when it is loaded from JSON or when
//! it is expanded. After that it is treated as immutable input.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::value::ParameterValue;

pub const MAX_AXIS_VALUES: usize = 10_000;
pub const MAX_TOTAL_PARAMETER_POINTS: usize = 200_000;

/// One swept parameter and its candidate values, in sweep order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub name: String,
    pub values: Vec<ParameterValue>,
}

impl SweepAxis {
    pub fn new<V: Into<ParameterValue>>(name: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A parametric batch of flight simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDescription {
    /// Parameters shared by every run.
    #[serde(default)]
    pub base: BTreeMap<String, ParameterValue>,
    /// Swept parameters in declaration order. The last axis varies fastest.
    #[serde(default)]
    pub axes: Vec<SweepAxis>,
    /// Axes whose values identify an aggregation group.
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl ScenarioDescription {
    pub fn new() -> Self {
        Self {
            base: BTreeMap::new(),
            axes: Vec::new(),
            group_by: Vec::new(),
            output_dir: default_output_dir(),
        }
    }

    /// Set a parameter that is the same for every run.
    pub fn with_base(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.base.insert(name.into(), value.into());
        self
    }

    /// Append a sweep axis. Axes are expanded in the order they are added.
    pub fn sweep<V: Into<ParameterValue>>(mut self, name: impl Into<String>, values: Vec<V>) -> Self {
        self.axes.push(SweepAxis::new(name, values));
        self
    }

    pub fn group_by<I, S>(mut self, axes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = axes.into_iter().map(Into::into).collect();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn axis(&self, name: &str) -> Option<&SweepAxis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|axis| axis.name.as_str()).collect()
    }

    /// Parse and validate a scenario from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|error| {
            ConfigurationError::new(format!(
                "Failed to read scenario {}: {error}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Check the structural invariants and return the number of runs the
    /// scenario expands to.
    pub fn validate(&self) -> Result<usize, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut total_points = 1usize;

        for axis in &self.axes {
            let name = axis.name.trim();
            if name.is_empty() {
                return Err(ConfigurationError::new(
                    "axis names must be non-empty strings",
                ));
            }
            if !seen.insert(axis.name.as_str()) {
                return Err(ConfigurationError::new(format!(
                    "Axis '{}' is declared more than once",
                    axis.name
                )));
            }
            if self.base.contains_key(&axis.name) {
                return Err(ConfigurationError::new(format!(
                    "Base parameter '{}' re-declares a sweep axis",
                    axis.name
                )));
            }
            if axis.values.is_empty() {
                return Err(ConfigurationError::new(format!(
                    "Axis '{}' must have at least one value",
                    axis.name
                )));
            }
            if axis.values.len() > MAX_AXIS_VALUES {
                return Err(ConfigurationError::new(format!(
                    "Axis '{}' exceeds MAX_AXIS_VALUES={MAX_AXIS_VALUES}",
                    axis.name
                )));
            }
            total_points = total_points.saturating_mul(axis.values.len());
            if total_points > MAX_TOTAL_PARAMETER_POINTS {
                return Err(ConfigurationError::new(format!(
                    "Parameter space is too large (>{MAX_TOTAL_PARAMETER_POINTS} points)"
                )));
            }
        }

        let mut grouped = HashSet::new();
        for name in &self.group_by {
            if !seen.contains(name.as_str()) {
                return Err(ConfigurationError::new(format!(
                    "group_by names '{name}', which is not a sweep axis"
                )));
            }
            if !grouped.insert(name.as_str()) {
                return Err(ConfigurationError::new(format!(
                    "group_by lists '{name}' more than once"
                )));
            }
        }

        Ok(total_points)
    }
}

impl Default for ScenarioDescription {
    fn default() -> Self {
        Self::new()
    }
}
