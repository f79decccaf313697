//! Pareto frontier extraction over (quality, metric) measurement pairs:
//! the classic 2D skyline sweep, keeping only points not beaten by another
//! point on both axes at once.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::error::{FrontierError, FrontierResult};

/// Which end of the axis counts as good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Sentinel for the worst possible value on this axis.
    pub fn worst(self) -> f64 {
        match self {
            Direction::HigherIsBetter => f64::NEG_INFINITY,
            Direction::LowerIsBetter => f64::INFINITY,
        }
    }

    /// Sort-key multiplier that orders this axis best-value-first ascending.
    fn sign(self) -> f64 {
        if self.worst() < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Whether `value` strictly improves on `best_so_far`.
    fn improves(self, value: f64, best_so_far: f64) -> bool {
        if self.worst() < 0.0 {
            value > best_so_far
        } else {
            value < best_so_far
        }
    }
}

/// Immutable metric-direction table handed to `frontier` at call time.
///
/// One axis is designated the quality axis (recall for ANN benchmarks); the
/// remaining entries are the cost/benefit metrics a frontier can be computed
/// against.
#[derive(Debug, Clone)]
pub struct MetricTable {
    quality_name: String,
    quality_dir: Direction,
    directions: Vec<(String, Direction)>,
}

impl MetricTable {
    pub fn new(
        quality_name: &str,
        quality_dir: Direction,
        metrics: &[(&str, Direction)],
    ) -> Self {
        Self {
            quality_name: quality_name.to_string(),
            quality_dir,
            directions: metrics
                .iter()
                .map(|(name, dir)| (name.to_string(), *dir))
                .collect(),
        }
    }

    /// The stock table for ANN search results: recall and throughput want to
    /// be high, latency wants to be low.
    pub fn ann_default() -> Self {
        Self::new(
            "recall",
            Direction::HigherIsBetter,
            &[
                ("throughput", Direction::HigherIsBetter),
                ("latency", Direction::LowerIsBetter),
            ],
        )
    }

    pub fn quality_axis(&self) -> (&str, Direction) {
        (&self.quality_name, self.quality_dir)
    }

    pub fn direction(&self, name: &str) -> Option<Direction> {
        if name == self.quality_name {
            return Some(self.quality_dir);
        }
        self.directions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }
}

/// A record the frontier extractor can read named numeric fields from.
///
/// Descriptive fields (algorithm name, index name) are invisible here and
/// pass through untouched, since the extractor clones whole records.
pub trait FrontierPoint {
    fn metric(&self, name: &str) -> Option<f64>;
}

/// Dynamic row support for callers that parse ad-hoc result tables.
impl FrontierPoint for HashMap<String, f64> {
    fn metric(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Compute the Pareto frontier of `points` over (quality, `metric`).
///
/// Sorts by `metric` best-first (ties broken by quality best-first), then
/// sweeps once keeping each point whose quality strictly improves on the
/// best quality seen. A point that is skipped is dominated: some already
/// kept point has an equal-or-better metric value and equal-or-better
/// quality. The sort is stable, so records with fully equal keys keep their
/// input order and only the first survives.
///
/// Errors with `InvalidMetric` when `metric` is not in `table`, and with
/// `MissingField` when a record lacks the quality field or the metric field.
pub fn frontier<T>(points: &[T], metric: &str, table: &MetricTable) -> FrontierResult<Vec<T>>
where
    T: FrontierPoint + Clone,
{
    let (quality_name, quality_dir) = table.quality_axis();
    let metric_dir = table
        .direction(metric)
        .ok_or_else(|| FrontierError::InvalidMetric(metric.to_string()))?;

    let mut keyed: Vec<(OrderedFloat<f64>, OrderedFloat<f64>, f64, &T)> =
        Vec::with_capacity(points.len());
    for (row, point) in points.iter().enumerate() {
        let quality = point
            .metric(quality_name)
            .ok_or_else(|| FrontierError::MissingField {
                field: quality_name.to_string(),
                row,
            })?;
        let value = point
            .metric(metric)
            .ok_or_else(|| FrontierError::MissingField {
                field: metric.to_string(),
                row,
            })?;
        keyed.push((
            OrderedFloat(metric_dir.sign() * value),
            OrderedFloat(quality_dir.sign() * quality),
            quality,
            point,
        ));
    }

    keyed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut kept = Vec::new();
    let mut best_quality = quality_dir.worst();
    for (_, _, quality, point) in keyed {
        if quality_dir.improves(quality, best_quality) {
            best_quality = quality;
            kept.push(point.clone());
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(quality: f64, name: &str, value: f64) -> HashMap<String, f64> {
        let mut p = HashMap::new();
        p.insert("recall".to_string(), quality);
        p.insert(name.to_string(), value);
        p
    }

    fn qualities(points: &[HashMap<String, f64>]) -> Vec<f64> {
        points.iter().map(|p| p["recall"]).collect()
    }

    #[test]
    fn empty_input_gives_empty_frontier() {
        let table = MetricTable::ann_default();
        let out = frontier::<HashMap<String, f64>>(&[], "throughput", &table).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn singleton_is_always_kept() {
        let table = MetricTable::ann_default();
        let pts = vec![point(0.9, "latency", 12.0)];
        let out = frontier(&pts, "latency", &table).unwrap();
        assert_eq!(out, pts);
    }

    #[test]
    fn latency_frontier_keeps_monotone_quality() {
        // Lower-is-better axis: sorted by increasing latency the qualities
        // strictly increase, so every point survives.
        let table = MetricTable::ann_default();
        let pts = vec![
            point(0.9, "latency", 10.0),
            point(0.95, "latency", 20.0),
            point(0.8, "latency", 5.0),
        ];
        let out = frontier(&pts, "latency", &table).unwrap();
        assert_eq!(qualities(&out), vec![0.8, 0.9, 0.95]);
        let latencies: Vec<f64> = out.iter().map(|p| p["latency"]).collect();
        assert_eq!(latencies, vec![5.0, 10.0, 20.0]);
    }

    #[test]
    fn throughput_frontier_drops_dominated_point() {
        // Canonical worked example: {0.9, tp 80} vs {0.7, tp 150} are
        // mutually non-dominated (one wins on quality, the other on
        // throughput), so both survive. Adding {0.65, tp 120} introduces a
        // point beaten by {0.7, tp 150} on both axes; it must be dropped.
        let table = MetricTable::ann_default();
        let pts = vec![
            point(0.9, "throughput", 80.0),
            point(0.7, "throughput", 150.0),
            point(0.65, "throughput", 120.0),
        ];
        let out = frontier(&pts, "throughput", &table).unwrap();
        assert_eq!(qualities(&out), vec![0.7, 0.9]);
    }

    #[test]
    fn throughput_frontier_keeps_all_when_none_dominates() {
        let table = MetricTable::ann_default();
        let pts = vec![
            point(0.9, "throughput", 100.0),
            point(0.85, "throughput", 150.0),
            point(0.95, "throughput", 50.0),
        ];
        let out = frontier(&pts, "throughput", &table).unwrap();
        // Best throughput first, then strictly increasing quality.
        assert_eq!(qualities(&out), vec![0.85, 0.9, 0.95]);
    }

    #[test]
    fn identical_quality_keeps_best_metric_only() {
        let table = MetricTable::ann_default();
        let pts = vec![
            point(0.9, "throughput", 100.0),
            point(0.9, "throughput", 150.0),
            point(0.9, "throughput", 120.0),
        ];
        let out = frontier(&pts, "throughput", &table).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["throughput"], 150.0);
    }

    #[test]
    fn fully_tied_records_resolve_to_first_in_input_order() {
        let mut a = point(0.9, "latency", 10.0);
        a.insert("tag".to_string(), 1.0);
        let mut b = point(0.9, "latency", 10.0);
        b.insert("tag".to_string(), 2.0);

        let table = MetricTable::ann_default();
        let out = frontier(&[a, b], "latency", &table).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["tag"], 1.0);
    }

    #[test]
    fn extra_fields_pass_through_unchanged() {
        let mut p = point(0.9, "latency", 10.0);
        p.insert("build_time".to_string(), 42.0);

        let table = MetricTable::ann_default();
        let out = frontier(&[p.clone()], "latency", &table).unwrap();
        assert_eq!(out[0], p);
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let table = MetricTable::ann_default();
        let pts = vec![point(0.9, "latency", 10.0)];
        let err = frontier(&pts, "build_time", &table).unwrap_err();
        assert_eq!(err, FrontierError::InvalidMetric("build_time".to_string()));
    }

    #[test]
    fn missing_metric_field_is_reported_with_row() {
        let table = MetricTable::ann_default();
        let pts = vec![point(0.9, "latency", 10.0), point(0.8, "throughput", 99.0)];
        let err = frontier(&pts, "latency", &table).unwrap_err();
        assert_eq!(
            err,
            FrontierError::MissingField {
                field: "latency".to_string(),
                row: 1,
            }
        );
    }

    #[test]
    fn missing_quality_field_is_reported() {
        let table = MetricTable::ann_default();
        let mut p = HashMap::new();
        p.insert("latency".to_string(), 10.0);
        let err = frontier(&[p], "latency", &table).unwrap_err();
        assert_eq!(
            err,
            FrontierError::MissingField {
                field: "recall".to_string(),
                row: 0,
            }
        );
    }

    #[test]
    fn frontier_is_idempotent() {
        let table = MetricTable::ann_default();
        let pts = vec![
            point(0.9, "throughput", 80.0),
            point(0.7, "throughput", 150.0),
            point(0.65, "throughput", 120.0),
            point(0.95, "throughput", 40.0),
        ];
        let once = frontier(&pts, "throughput", &table).unwrap();
        let twice = frontier(&once, "throughput", &table).unwrap();
        assert_eq!(once, twice);
    }
}
