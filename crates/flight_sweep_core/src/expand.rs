//! Cartesian expansion of a scenario into parameter sets.
//!
//! Sweep index `i` maps to one axis combination in row-major order: the
//! last declared axis varies fastest. [`combination_for_index`] performs the
//! same decoding, so any consumer can rebuild the combination behind an index
//! without re-running the expansion.

use crate::error::ConfigurationError;
use crate::parameter_set::{AxisTag, ParameterSet};
use crate::scenario::ScenarioDescription;
use crate::value::ParameterValue;

/// Expand a scenario into every parameter combination, in sweep index order.
///
/// A scenario with no axes expands to a single set equal to the base
/// parameters.
pub fn expand(scenario: &ScenarioDescription) -> Result<Vec<ParameterSet>, ConfigurationError> {
    let total_points = scenario.validate()?;
    (0..total_points)
        .map(|index| parameter_set_for_index(scenario, index))
        .collect()
}

/// Axis values selected by sweep index `index`, in axis declaration order.
pub fn combination_for_index(
    scenario: &ScenarioDescription,
    index: usize,
) -> Result<Vec<(String, ParameterValue)>, ConfigurationError> {
    let mut selected = Vec::with_capacity(scenario.axes.len());
    let mut remainder = index;

    for axis in scenario.axes.iter().rev() {
        let radix = axis.values.len();
        if radix == 0 {
            return Err(ConfigurationError::new(format!(
                "Axis '{}' must have at least one value",
                axis.name
            )));
        }
        let value_idx = remainder % radix;
        remainder /= radix;
        selected.push((axis.name.clone(), axis.values[value_idx].clone()));
    }

    if remainder != 0 {
        return Err(ConfigurationError::new(format!(
            "Sweep index {index} exceeds the parameter space"
        )));
    }

    selected.reverse();
    Ok(selected)
}

fn parameter_set_for_index(
    scenario: &ScenarioDescription,
    index: usize,
) -> Result<ParameterSet, ConfigurationError> {
    let combination = combination_for_index(scenario, index)?;
    let mut values = scenario.base.clone();
    for (name, value) in &combination {
        values.insert(name.clone(), value.clone());
    }
    Ok(ParameterSet::new(index, values, AxisTag::new(combination)))
}
