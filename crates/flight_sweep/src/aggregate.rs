//! Reduction of run outcomes into grouped summaries.
//!
//! Outcomes are partitioned by the values of the `group_by` axes. Each group
//! carries flat summary rows, a failure ledger and the geometry needed for a
//! landing-dispersion map; a [`GlobalSummary`] spans the whole batch.

use std::collections::{BTreeMap, HashMap};

use flight_sweep_core::{AxisTag, ParameterValue, ScenarioDescription};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SweepError};
use crate::executor::{FailureKind, RunOutcome};
use crate::geo::LandingZone;
use crate::metrics::SummaryMetrics;

const GRADIENT_START: [u8; 3] = [248, 112, 128];
const GRADIENT_END: [u8; 3] = [247, 93, 139];

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub group_by: Vec<String>,
    /// Landing zone used for the per-run landing margin.
    pub landing_zone: Option<LandingZone>,
}

impl AggregateOptions {
    pub fn new<I, S>(group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            landing_zone: None,
        }
    }

    pub fn for_scenario(scenario: &ScenarioDescription) -> Self {
        Self::new(scenario.group_by.iter().cloned())
    }

    pub fn with_landing_zone(mut self, zone: LandingZone) -> Self {
        self.landing_zone = Some(zone);
        self
    }
}

/// Projection of an axis tag onto the `group_by` axes, in `group_by` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupKey(Vec<(String, ParameterValue)>);

impl GroupKey {
    pub fn entries(&self) -> &[(String, ParameterValue)] {
        &self.0
    }

    pub fn get(&self, axis: &str) -> Option<&ParameterValue> {
        self.0
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value)
    }

    /// Human-readable form such as `ground_wind_speed=4`, or `all` when
    /// nothing is grouped.
    pub fn label(&self) -> String {
        if self.0.is_empty() {
            return "all".to_string();
        }
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn identity(&self) -> Vec<String> {
        self.0.iter().map(|(_, value)| value.canonical_key()).collect()
    }
}

/// Flat per-run record shared by every export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummaryRecord {
    pub sweep_index: usize,
    pub fingerprint: String,
    pub axis_tag: AxisTag,
    pub success: bool,
    pub metrics: Option<SummaryMetrics>,
    pub error_kind: Option<FailureKind>,
    pub diagnostic: Option<String>,
    /// Signed distance from the landing point to the landing-zone boundary,
    /// positive inside.
    pub landing_margin_m: Option<f64>,
}

impl RunSummaryRecord {
    pub fn from_outcome(outcome: &RunOutcome, landing_zone: Option<&LandingZone>) -> Self {
        let parameter_set = outcome.parameter_set();
        let metrics = outcome.metrics().cloned();
        let landing_margin_m = match (&metrics, landing_zone) {
            (Some(metrics), Some(zone)) => {
                Some(zone.signed_distance_m(metrics.landing_latitude, metrics.landing_longitude))
            }
            _ => None,
        };

        Self {
            sweep_index: parameter_set.sweep_index(),
            fingerprint: parameter_set.fingerprint(),
            axis_tag: parameter_set.axis_tag().clone(),
            success: outcome.is_success(),
            metrics,
            error_kind: outcome.failure_kind(),
            diagnostic: outcome.diagnostic().map(str::to_string),
            landing_margin_m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub sweep_index: usize,
    pub kind: FailureKind,
    pub diagnostic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandingPoint {
    pub sweep_index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

/// Landing geometry of one group. `boundary` coordinates are `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupGeometry {
    pub label: String,
    pub color: [u8; 3],
    pub landing_points: Vec<LandingPoint>,
    /// Closed ring around the landing points; empty for three points or fewer.
    pub boundary: Vec<[f64; 2]>,
}

/// Map geometry for one group, with the flight tracks of its successful
/// runs as `[lon, lat, alt]`, the order map formats expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoGroup {
    #[serde(flatten)]
    pub geometry: GroupGeometry,
    pub tracks: Vec<Vec<[f64; 3]>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoExport {
    pub landing_zone: Option<LandingZone>,
    pub groups: Vec<GeoGroup>,
}

#[derive(Debug, Clone)]
pub struct AggregatedGroup {
    pub key: GroupKey,
    /// Outcomes in sweep-index order.
    pub outcomes: Vec<RunOutcome>,
    pub rows: Vec<RunSummaryRecord>,
    pub successes: usize,
    pub failures: usize,
    pub failure_ledger: Vec<FailureEntry>,
    pub geo: GroupGeometry,
}

impl AggregatedGroup {
    /// Flight tracks of the successful runs, built from their time series on
    /// demand.
    pub fn flight_tracks(&self) -> Vec<Vec<[f64; 3]>> {
        self.outcomes
            .iter()
            .filter_map(RunOutcome::time_series)
            .map(|series| {
                (0..series.len())
                    .map(|idx| [series.longitude[idx], series.latitude[idx], series.altitude[idx]])
                    .collect()
            })
            .collect()
    }
}

/// A batch-wide extreme and the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremum {
    pub sweep_index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    pub max_altitude: Option<Extremum>,
    pub max_speed: Option<Extremum>,
    pub longest_flight: Option<Extremum>,
    pub farthest_landing: Option<Extremum>,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub group_by: Vec<String>,
    pub groups: Vec<AggregatedGroup>,
    pub global: GlobalSummary,
    pub landing_zone: Option<LandingZone>,
}

impl Aggregation {
    /// Every run's record in sweep-index order.
    pub fn records(&self) -> Vec<&RunSummaryRecord> {
        let mut records: Vec<&RunSummaryRecord> =
            self.groups.iter().flat_map(|group| group.rows.iter()).collect();
        records.sort_by_key(|record| record.sweep_index);
        records
    }

    pub fn geo_export(&self) -> GeoExport {
        GeoExport {
            landing_zone: self.landing_zone.clone(),
            groups: self
                .groups
                .iter()
                .map(|group| GeoGroup {
                    geometry: group.geo.clone(),
                    tracks: group.flight_tracks(),
                })
                .collect(),
        }
    }
}

/// Group outcomes by the configured axes and summarize them.
///
/// Groups appear in order of their lowest sweep index. Fails only when a
/// `group_by` axis is missing from some run's axis tag.
pub fn aggregate(mut outcomes: Vec<RunOutcome>, options: &AggregateOptions) -> Result<Aggregation> {
    outcomes.sort_by_key(RunOutcome::sweep_index);

    let mut keys: Vec<GroupKey> = Vec::new();
    let mut members: Vec<Vec<RunOutcome>> = Vec::new();
    let mut lookup: HashMap<Vec<String>, usize> = HashMap::new();

    for outcome in outcomes {
        let key = group_key(&outcome, &options.group_by)?;
        let slot = *lookup.entry(key.identity()).or_insert_with(|| {
            keys.push(key.clone());
            members.push(Vec::new());
            keys.len() - 1
        });
        members[slot].push(outcome);
    }

    let colors = color_gradient(GRADIENT_START, GRADIENT_END, keys.len());
    let groups: Vec<AggregatedGroup> = keys
        .into_iter()
        .zip(members)
        .zip(colors)
        .map(|((key, outcomes), color)| build_group(key, outcomes, color, options))
        .collect();

    let global = global_summary(&groups);
    debug!(
        groups = groups.len(),
        runs = global.total,
        failures = global.failures,
        "aggregated batch"
    );

    Ok(Aggregation {
        group_by: options.group_by.clone(),
        groups,
        global,
        landing_zone: options.landing_zone.clone(),
    })
}

fn group_key(outcome: &RunOutcome, group_by: &[String]) -> Result<GroupKey> {
    let tag = outcome.parameter_set().axis_tag();
    group_by
        .iter()
        .map(|axis| {
            tag.get(axis).map(|value| (axis.clone(), value.clone())).ok_or_else(|| {
                SweepError::Aggregation(format!(
                    "run {} has no value for group_by axis '{axis}'",
                    outcome.sweep_index()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(GroupKey)
}

fn build_group(
    key: GroupKey,
    outcomes: Vec<RunOutcome>,
    color: [u8; 3],
    options: &AggregateOptions,
) -> AggregatedGroup {
    let rows: Vec<RunSummaryRecord> = outcomes
        .iter()
        .map(|outcome| RunSummaryRecord::from_outcome(outcome, options.landing_zone.as_ref()))
        .collect();

    let failure_ledger: Vec<FailureEntry> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            RunOutcome::Failure {
                parameter_set,
                kind,
                diagnostic,
            } => Some(FailureEntry {
                sweep_index: parameter_set.sweep_index(),
                kind: *kind,
                diagnostic: diagnostic.clone(),
            }),
            RunOutcome::Success { .. } => None,
        })
        .collect();

    let landing_points: Vec<LandingPoint> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            RunOutcome::Success {
                parameter_set,
                metrics,
                ..
            } => Some(LandingPoint {
                sweep_index: parameter_set.sweep_index(),
                latitude: metrics.landing_latitude,
                longitude: metrics.landing_longitude,
            }),
            RunOutcome::Failure { .. } => None,
        })
        .collect();

    let successes = landing_points.len();
    let geo = GroupGeometry {
        label: key.label(),
        color,
        boundary: dispersion_boundary(&landing_points),
        landing_points,
    };

    AggregatedGroup {
        key,
        failures: failure_ledger.len(),
        successes,
        outcomes,
        rows,
        failure_ledger,
        geo,
    }
}

fn global_summary(groups: &[AggregatedGroup]) -> GlobalSummary {
    let mut summary = GlobalSummary {
        total: 0,
        successes: 0,
        failures: 0,
        failures_by_kind: BTreeMap::new(),
        max_altitude: None,
        max_speed: None,
        longest_flight: None,
        farthest_landing: None,
    };

    let mut records: Vec<&RunSummaryRecord> = groups.iter().flat_map(|group| group.rows.iter()).collect();
    records.sort_by_key(|record| record.sweep_index);

    for record in records {
        summary.total += 1;
        if let Some(kind) = record.error_kind {
            summary.failures += 1;
            *summary.failures_by_kind.entry(kind).or_insert(0) += 1;
        }
        let Some(metrics) = &record.metrics else {
            continue;
        };
        summary.successes += 1;
        track_max(&mut summary.max_altitude, record.sweep_index, metrics.max_altitude);
        track_max(&mut summary.max_speed, record.sweep_index, metrics.max_speed);
        track_max(&mut summary.longest_flight, record.sweep_index, metrics.flight_duration);
        track_max(&mut summary.farthest_landing, record.sweep_index, metrics.landing_range_m);
    }
    summary
}

/// Keeps the first run on ties.
fn track_max(slot: &mut Option<Extremum>, sweep_index: usize, value: f64) {
    if value.is_nan() {
        return;
    }
    if slot.map_or(true, |current| value > current.value) {
        *slot = Some(Extremum { sweep_index, value });
    }
}

/// `n` colours interpolated linearly from `start` to `end`, truncating each
/// channel.
pub fn color_gradient(start: [u8; 3], end: [u8; 3], n: usize) -> Vec<[u8; 3]> {
    (0..n)
        .map(|idx| {
            let t = if n > 1 { idx as f64 / (n - 1) as f64 } else { 0.0 };
            let mut color = [0u8; 3];
            for channel in 0..3 {
                let value = (1.0 - t) * f64::from(start[channel]) + t * f64::from(end[channel]);
                color[channel] = value.clamp(0.0, 255.0) as u8;
            }
            color
        })
        .collect()
}

/// Landing points ordered by angle around their centroid and closed back on
/// the first point. Three points or fewer give no boundary.
fn dispersion_boundary(points: &[LandingPoint]) -> Vec<[f64; 2]> {
    if points.len() <= 3 {
        return Vec::new();
    }

    let count = points.len() as f64;
    let center_lon = points.iter().map(|p| p.longitude).sum::<f64>() / count;
    let center_lat = points.iter().map(|p| p.latitude).sum::<f64>() / count;

    let mut ring: Vec<[f64; 2]> = points.iter().map(|p| [p.longitude, p.latitude]).collect();
    ring.sort_by(|a, b| {
        let angle_a = (a[1] - center_lat).atan2(a[0] - center_lon);
        let angle_b = (b[1] - center_lat).atan2(b[0] - center_lon);
        angle_a.total_cmp(&angle_b)
    });
    ring.push(ring[0]);
    ring
}

/// Mean of one value over two axes, e.g. landing margin by wind speed and
/// direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_axis: String,
    pub column_axis: String,
    pub rows: Vec<ParameterValue>,
    pub columns: Vec<ParameterValue>,
    /// `cells[row][column]`; `None` where no run contributed a value.
    pub cells: Vec<Vec<Option<f64>>>,
}

/// Average `value` over records sharing the same pair of axis values.
///
/// Row and column headers keep the order in which values first appear.
/// Records without either axis, or for which `value` returns `None`, are
/// skipped.
pub fn pivot_mean<'a, I, F>(records: I, row_axis: &str, column_axis: &str, value: F) -> PivotTable
where
    I: IntoIterator<Item = &'a RunSummaryRecord>,
    F: Fn(&RunSummaryRecord) -> Option<f64>,
{
    let mut rows: Vec<ParameterValue> = Vec::new();
    let mut columns: Vec<ParameterValue> = Vec::new();
    let mut sums: HashMap<(usize, usize), (f64, usize)> = HashMap::new();

    for record in records {
        let (Some(row), Some(column)) = (record.axis_tag.get(row_axis), record.axis_tag.get(column_axis)) else {
            continue;
        };
        let row_idx = position_or_insert(&mut rows, row);
        let column_idx = position_or_insert(&mut columns, column);
        if let Some(sample) = value(record) {
            let cell = sums.entry((row_idx, column_idx)).or_insert((0.0, 0));
            cell.0 += sample;
            cell.1 += 1;
        }
    }

    let cells = (0..rows.len())
        .map(|row_idx| {
            (0..columns.len())
                .map(|column_idx| {
                    sums.get(&(row_idx, column_idx))
                        .map(|(sum, count)| sum / *count as f64)
                })
                .collect()
        })
        .collect();

    PivotTable {
        row_axis: row_axis.to_string(),
        column_axis: column_axis.to_string(),
        rows,
        columns,
        cells,
    }
}

fn position_or_insert(values: &mut Vec<ParameterValue>, value: &ParameterValue) -> usize {
    let key = value.canonical_key();
    match values.iter().position(|existing| existing.canonical_key() == key) {
        Some(idx) => idx,
        None => {
            values.push(value.clone());
            values.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SummaryOptions;
    use crate::time_series::{Sample, TimeSeries};
    use flight_sweep_core::{expand, ParameterSet};

    fn wind_sets() -> Vec<ParameterSet> {
        let scenario = ScenarioDescription::new()
            .sweep("ground_wind_speed", vec![2.0, 4.0])
            .sweep("ground_wind_direction", vec![0.0, 90.0])
            .group_by(["ground_wind_speed"]);
        expand(&scenario).unwrap()
    }

    fn landed(set: ParameterSet, apogee: f64, landing_lat: f64) -> RunOutcome {
        let series = TimeSeries::from_samples(&[
            Sample { time: 0.0, latitude: 40.24, longitude: 139.99, altitude: 0.0, velocity: [0.0; 3] },
            Sample { time: 5.0, latitude: 40.24, longitude: 139.99, altitude: apogee, velocity: [0.0, 0.0, -30.0] },
            Sample { time: 10.0, latitude: landing_lat, longitude: 139.98, altitude: -5.0, velocity: [0.0, 0.0, 10.0] },
        ]);
        RunOutcome::from_time_series(set, series, &SummaryOptions::default())
    }

    #[test]
    fn test_wind_example_groups_by_speed() {
        let outcomes: Vec<RunOutcome> = wind_sets()
            .into_iter()
            .map(|set| {
                let apogee = 100.0 + set.sweep_index() as f64;
                landed(set, apogee, 40.23)
            })
            .collect();

        let aggregation = aggregate(outcomes, &AggregateOptions::new(["ground_wind_speed"])).unwrap();
        assert_eq!(aggregation.groups.len(), 2);
        assert_eq!(aggregation.groups[0].key.label(), "ground_wind_speed=2");
        assert_eq!(aggregation.groups[1].key.get("ground_wind_speed"), Some(&ParameterValue::Float(4.0)));
        for group in &aggregation.groups {
            assert_eq!(group.successes, 2);
            assert_eq!(group.failures, 0);
            assert_eq!(group.rows.len(), 2);
        }
        assert_eq!(aggregation.global.total, 4);
        assert_eq!(aggregation.global.max_altitude.map(|e| e.sweep_index), Some(3));
    }

    #[test]
    fn test_groups_partition_the_outcomes() {
        let mut outcomes: Vec<RunOutcome> = wind_sets()
            .into_iter()
            .map(|set| match set.sweep_index() {
                1 => RunOutcome::failure(set, FailureKind::Timeout, "killed"),
                _ => landed(set, 50.0, 40.23),
            })
            .collect();
        outcomes.reverse();

        let aggregation = aggregate(outcomes, &AggregateOptions::new(["ground_wind_direction"])).unwrap();
        let mut seen: Vec<usize> = aggregation
            .groups
            .iter()
            .flat_map(|group| group.outcomes.iter().map(RunOutcome::sweep_index))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);

        let first = &aggregation.groups[0];
        assert_eq!(first.key.label(), "ground_wind_direction=0");
        assert_eq!(first.outcomes[0].sweep_index(), 0);
        assert_eq!(first.outcomes[1].sweep_index(), 2);

        let second = &aggregation.groups[1];
        assert_eq!(second.failures, 1);
        assert_eq!(second.failure_ledger[0].sweep_index, 1);
        assert_eq!(second.failure_ledger[0].kind, FailureKind::Timeout);
        assert_eq!(aggregation.global.failures_by_kind.get(&FailureKind::Timeout), Some(&1));
    }

    #[test]
    fn test_geo_export_builds_tracks_for_successes() {
        let outcomes: Vec<RunOutcome> = wind_sets()
            .into_iter()
            .map(|set| match set.sweep_index() {
                3 => RunOutcome::failure(set, FailureKind::Simulator, "exit status 1"),
                _ => landed(set, 60.0, 40.23),
            })
            .collect();
        let aggregation = aggregate(outcomes, &AggregateOptions::new(["ground_wind_speed"])).unwrap();

        let geo = aggregation.geo_export();
        assert_eq!(geo.groups.len(), 2);
        assert_eq!(geo.groups[0].tracks.len(), 2);
        assert_eq!(geo.groups[1].tracks.len(), 1);
        assert_eq!(geo.groups[1].geometry.landing_points.len(), 1);
        assert_eq!(geo.groups[0].tracks[0][1], [139.99, 40.24, 60.0]);
    }

    #[test]
    fn test_no_group_by_gives_single_group() {
        let outcomes: Vec<RunOutcome> = wind_sets().into_iter().map(|set| landed(set, 80.0, 40.23)).collect();
        let aggregation = aggregate(outcomes, &AggregateOptions::default()).unwrap();
        assert_eq!(aggregation.groups.len(), 1);
        assert_eq!(aggregation.groups[0].key.label(), "all");
        assert_eq!(aggregation.groups[0].geo.color, GRADIENT_START);
        assert_eq!(aggregation.groups[0].geo.boundary.len(), 5);
    }

    #[test]
    fn test_unknown_group_axis_is_an_error() {
        let outcomes: Vec<RunOutcome> = wind_sets().into_iter().map(|set| landed(set, 80.0, 40.23)).collect();
        let error = aggregate(outcomes, &AggregateOptions::new(["mass"])).unwrap_err();
        assert!(matches!(error, SweepError::Aggregation(message) if message.contains("'mass'")));
    }

    #[test]
    fn test_landing_margin_uses_zone() {
        let outcomes: Vec<RunOutcome> = wind_sets().into_iter().map(|set| landed(set, 80.0, 40.245)).collect();
        let options = AggregateOptions::new(["ground_wind_speed"]).with_landing_zone(LandingZone::noshiro_sea());
        let aggregation = aggregate(outcomes, &options).unwrap();

        let records = aggregation.records();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|record| record.landing_margin_m.unwrap() > 0.0));
        assert!(aggregation.geo_export().landing_zone.is_some());
    }

    #[test]
    fn test_color_gradient_endpoints() {
        let colors = color_gradient(GRADIENT_START, GRADIENT_END, 3);
        assert_eq!(colors[0], [248, 112, 128]);
        assert_eq!(colors[2], [247, 93, 139]);
        assert_eq!(colors[1], [247, 102, 133]);
        assert!(color_gradient(GRADIENT_START, GRADIENT_END, 0).is_empty());
    }

    #[test]
    fn test_pivot_mean() {
        let outcomes: Vec<RunOutcome> = wind_sets()
            .into_iter()
            .map(|set| {
                let apogee = 100.0 * (set.sweep_index() + 1) as f64;
                landed(set, apogee, 40.23)
            })
            .collect();
        let aggregation = aggregate(outcomes, &AggregateOptions::default()).unwrap();

        let pivot = pivot_mean(
            aggregation.records(),
            "ground_wind_speed",
            "ground_wind_direction",
            |record| record.metrics.as_ref().map(|m| m.max_altitude),
        );
        assert_eq!(pivot.rows, vec![ParameterValue::Float(2.0), ParameterValue::Float(4.0)]);
        assert_eq!(pivot.columns, vec![ParameterValue::Float(0.0), ParameterValue::Float(90.0)]);
        assert_eq!(pivot.cells[0], vec![Some(100.0), Some(200.0)]);
        assert_eq!(pivot.cells[1], vec![Some(300.0), Some(400.0)]);
    }
}
