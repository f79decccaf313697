//! Record shapes shared by the converters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frontier::FrontierPoint;

/// Per-run result file as written by the benchmark runner: a configuration
/// block plus a flat metric-name → value map with keys like
/// `hnsw-recall-accuracy` or `cuvs-indexing-time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResults {
    #[serde(default)]
    pub configuration: RunConfiguration,
    #[serde(default)]
    pub metrics: HashMap<String, Value>,
}

impl RunResults {
    /// First metric whose key contains `needle` (case-insensitive), parsed
    /// as f64. Runner versions prefix metric names differently, so lookup is
    /// by substring rather than exact key.
    pub fn metric_f64(&self, needle: &str) -> Option<f64> {
        let needle = needle.to_lowercase();
        self.metrics
            .iter()
            .find(|(key, _)| key.to_lowercase().contains(&needle))
            .and_then(|(_, value)| value_as_f64(value))
    }

    /// Metric under exactly `key`, parsed as f64.
    pub fn metric_exact(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(value_as_f64)
    }
}

/// Lenient numeric read: the runner occasionally emits "NaN" or stringly
/// numbers in the metrics map.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    #[serde(rename = "algoToRun")]
    pub algo_to_run: String,
    #[serde(rename = "datasetFile")]
    pub dataset_file: String,
    #[serde(rename = "topK")]
    pub top_k: Option<u32>,
    #[serde(rename = "numQueriesToRun")]
    pub num_queries_to_run: Option<u32>,
    #[serde(rename = "efConstruction")]
    pub ef_construction: Option<u32>,
    #[serde(rename = "efSearch")]
    pub ef_search: Option<u32>,
    #[serde(rename = "hnswBeamWidth")]
    pub hnsw_beam_width: Option<u32>,
    #[serde(rename = "hnswMaxConn")]
    pub hnsw_max_conn: Option<u32>,
    #[serde(rename = "cagraGraphDegree")]
    pub cagra_graph_degree: Option<u32>,
    #[serde(rename = "cagraIntermediateGraphDegree")]
    pub cagra_intermediate_graph_degree: Option<u32>,
    pub m: Option<u32>,
    #[serde(rename = "maxCandidates")]
    pub max_candidates: Option<u32>,
    /// Newer runner versions nest tunables under `parameters`.
    pub parameters: HashMap<String, Value>,
    pub dataset_info: Option<DatasetInfo>,
    pub sweep_name: Option<String>,
}

impl RunConfiguration {
    pub fn param_u32(&self, key: &str) -> Option<u32> {
        self.parameters
            .get(key)
            .and_then(value_as_f64)
            .map(|v| v as u32)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetInfo {
    pub name: Option<String>,
    pub base_file: Option<String>,
    pub num_docs: Option<u64>,
}

/// One search measurement row: recall as a fraction in [0,1], latency in
/// seconds, throughput in queries/second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub algorithm: String,
    pub index_name: String,
    pub recall: f64,
    pub throughput: f64,
    pub latency: f64,
}

impl FrontierPoint for SearchRecord {
    fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "recall" => Some(self.recall),
            "throughput" => Some(self.throughput),
            "latency" => Some(self.latency),
            _ => None,
        }
    }
}

/// One index-build measurement row, build time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub algorithm: String,
    pub index_name: String,
    pub build_time: f64,
}

/// NVIDIA-style benchmark entry, one per run, as consumed by the standard
/// ANN plotting tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    pub name: String,
    pub real_time: f64,
    #[serde(rename = "Recall", skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(rename = "Latency", skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_second: Option<f64>,
    pub iterations: u32,
    pub time_unit: String,
    pub run_name: String,
    pub run_type: String,
    pub repetitions: u32,
    pub repetition_index: u32,
    pub family_index: u32,
    pub per_family_instance_index: u32,
}

impl Benchmark {
    /// Entry with the run bookkeeping fields every benchmark shares.
    pub fn single_iteration(name: String, real_time_ms: f64) -> Self {
        Self {
            name,
            real_time: real_time_ms,
            recall: None,
            latency: None,
            items_per_second: None,
            iterations: 1,
            time_unit: "ms".to_string(),
            run_name: "run_1".to_string(),
            run_type: "iteration".to_string(),
            repetitions: 1,
            repetition_index: 0,
            family_index: 0,
            per_family_instance_index: 0,
        }
    }
}

/// On-disk shape of the NVIDIA-style files: `{"benchmarks": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkFile {
    pub benchmarks: Vec<Benchmark>,
}
