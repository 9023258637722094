use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::value::ParameterValue;

/// The axis values that produced a parameter set, in axis declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTag(Vec<(String, ParameterValue)>);

impl AxisTag {
    pub(crate) fn new(entries: Vec<(String, ParameterValue)>) -> Self {
        Self(entries)
    }

    pub fn get(&self, axis: &str) -> Option<&ParameterValue> {
        self.0
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, ParameterValue)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One fully resolved simulation input.
///
/// Built only by the expander and never mutated afterwards; the fields are
/// read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    sweep_index: usize,
    values: BTreeMap<String, ParameterValue>,
    axis_tag: AxisTag,
}

impl ParameterSet {
    pub(crate) fn new(
        sweep_index: usize,
        values: BTreeMap<String, ParameterValue>,
        axis_tag: AxisTag,
    ) -> Self {
        Self {
            sweep_index,
            values,
            axis_tag,
        }
    }

    /// Position of this set in expansion order, starting at 0.
    pub fn sweep_index(&self) -> usize {
        self.sweep_index
    }

    /// Base parameters merged with the selected axis values.
    pub fn values(&self) -> &BTreeMap<String, ParameterValue> {
        &self.values
    }

    pub fn axis_tag(&self) -> &AxisTag {
        &self.axis_tag
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParameterValue::as_f64)
    }

    /// Resolved values as the JSON object handed to the simulator.
    pub fn values_json(&self) -> String {
        stable_json(&self.values)
    }

    /// SHA-256 over the canonical JSON of the resolved values.
    ///
    /// Identical inputs produce identical fingerprints across batches, which
    /// lets exported rows be traced back to the exact simulator input.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.values_json());
        format!("{:x}", hasher.finalize())
    }
}

fn stable_json(value: impl Serialize) -> String {
    // BTreeMap keys serialize in sorted order and scalars cannot fail.
    serde_json::to_string(&value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(index: usize, wind: f64) -> ParameterSet {
        let mut values = BTreeMap::new();
        values.insert("mass".to_string(), ParameterValue::Float(4.2));
        values.insert("wind_speed".to_string(), ParameterValue::Float(wind));
        ParameterSet::new(
            index,
            values,
            AxisTag::new(vec![("wind_speed".to_string(), ParameterValue::Float(wind))]),
        )
    }

    #[test]
    fn test_fingerprint_depends_on_values_only() {
        assert_eq!(set(0, 3.0).fingerprint(), set(7, 3.0).fingerprint());
        assert_ne!(set(0, 3.0).fingerprint(), set(0, 4.0).fingerprint());
        assert_eq!(set(0, 3.0).fingerprint().len(), 64);
    }

    #[test]
    fn test_values_json_is_sorted() {
        assert_eq!(set(0, 3.0).values_json(), r#"{"mass":4.2,"wind_speed":3.0}"#);
    }

    #[test]
    fn test_axis_tag_lookup() {
        let set = set(1, 5.0);
        assert_eq!(set.axis_tag().get("wind_speed"), Some(&ParameterValue::Float(5.0)));
        assert_eq!(set.axis_tag().get("mass"), None);
        assert_eq!(set.get_f64("mass"), Some(4.2));
    }
}
