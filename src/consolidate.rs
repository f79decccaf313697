//! Flatten a sweep directory into one wide CSV row per run.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::{RunConfiguration, RunResults};

/// One consolidated row. Field casing follows the runner's own JSON keys so
/// downstream spreadsheets line up with the raw result files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedRun {
    pub run_id: String,
    pub algorithm: String,
    pub dataset: String,
    pub sweep_id: String,
    pub sweep_name: String,
    #[serde(rename = "indexingTime")]
    pub indexing_time: f64,
    #[serde(rename = "queryTime")]
    pub query_time: f64,
    pub recall: f64,
    pub qps: f64,
    #[serde(rename = "meanLatency")]
    pub mean_latency: f64,
    #[serde(rename = "indexSize")]
    pub index_size: f64,
    #[serde(rename = "segmentCount")]
    pub segment_count: f64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "resultsDirectory")]
    pub results_directory: String,
    #[serde(rename = "cagraGraphDegree")]
    pub cagra_graph_degree: u32,
    #[serde(rename = "cagraIntermediateGraphDegree")]
    pub cagra_intermediate_graph_degree: u32,
    #[serde(rename = "cuvsWriterThreads")]
    pub cuvs_writer_threads: u32,
    #[serde(rename = "hnswMaxConn")]
    pub hnsw_max_conn: u32,
    #[serde(rename = "hnswBeamWidth")]
    pub hnsw_beam_width: u32,
    #[serde(rename = "numIndexThreads")]
    pub num_index_threads: u32,
    #[serde(rename = "queryThreads")]
    pub query_threads: u32,
    #[serde(rename = "efSearch")]
    pub ef_search: u32,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "flushFreq")]
    pub flush_freq: u32,
    #[serde(rename = "numDocs")]
    pub num_docs: u64,
    #[serde(rename = "numQueriesToRun")]
    pub num_queries_to_run: u32,
}

/// Consolidate one sweep under `results_root/<sweep_id>` into
/// `<sweep_id>.csv` in the same directory. Returns the CSV path, or None
/// when the sweep has no readable runs.
pub fn consolidate_sweep(results_root: &Path, sweep_id: &str) -> Result<Option<PathBuf>> {
    let sweep_dir = results_root.join(sweep_id);
    if !sweep_dir.is_dir() {
        log::warn!("sweep directory not found: {}", sweep_dir.display());
        return Ok(None);
    }

    let mut rows = Vec::new();
    let mut run_dirs: Vec<PathBuf> = std::fs::read_dir(&sweep_dir)
        .with_context(|| format!("listing {}", sweep_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join("results.json").exists())
        .collect();
    run_dirs.sort();

    if run_dirs.is_empty() {
        log::warn!("no runs found for sweep {sweep_id}");
        return Ok(None);
    }
    log::info!("found {} runs for sweep {sweep_id}", run_dirs.len());

    for run_dir in &run_dirs {
        match consolidate_run(run_dir, sweep_id) {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("skipping {}: {e:#}", run_dir.display()),
        }
    }

    if rows.is_empty() {
        log::warn!("no readable runs in sweep {sweep_id}, nothing to write");
        return Ok(None);
    }

    let csv_path = sweep_dir.join(format!("{sweep_id}.csv"));
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("generated consolidated CSV: {}", csv_path.display());
    Ok(Some(csv_path))
}

/// Consolidate every sweep directory under `results_root`. Sweep ids look
/// like `DD-MM-YYYY-hash`, so anything with three or more dashes counts.
pub fn consolidate_all(results_root: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut sweep_ids: Vec<String> = std::fs::read_dir(results_root)
        .with_context(|| format!("listing {}", results_root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.matches('-').count() >= 3)
        .collect();
    sweep_ids.sort();

    log::info!("found {} sweeps to consolidate", sweep_ids.len());
    for sweep_id in &sweep_ids {
        if let Some(path) = consolidate_sweep(results_root, sweep_id)? {
            written.push(path);
        }
    }
    Ok(written)
}

fn consolidate_run(run_dir: &Path, sweep_id: &str) -> Result<ConsolidatedRun> {
    let run_id = run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let results_path = run_dir.join("results.json");
    let file =
        File::open(&results_path).with_context(|| format!("opening {}", results_path.display()))?;
    let mut run: RunResults = serde_json::from_reader(file)
        .with_context(|| format!("parsing {}", results_path.display()))?;

    // Metrics prefer the detailed file when the runner produced one.
    let detailed_path = run_dir.join("detailed_results.json");
    if detailed_path.exists() {
        let file = File::open(&detailed_path)
            .with_context(|| format!("opening {}", detailed_path.display()))?;
        let detailed: RunResults = serde_json::from_reader(file)
            .with_context(|| format!("parsing {}", detailed_path.display()))?;
        run.metrics = detailed.metrics;
    }

    let config = &run.configuration;
    let algorithm = config.algo_to_run.clone();

    // CAGRA runs report cuVS-prefixed build metrics; older runner versions
    // used the hnsw prefix for everything.
    let (indexing_time, recall, index_size) = if algorithm == "CAGRA_HNSW" {
        (
            run.metric_exact("cuvs-indexing-time")
                .or_else(|| run.metric_exact("hnsw-indexing-time")),
            run.metric_exact("cuvs-recall-accuracy"),
            run.metric_exact("cuvs-index-size"),
        )
    } else {
        (
            run.metric_exact("hnsw-indexing-time"),
            run.metric_exact("hnsw-recall-accuracy"),
            run.metric_exact("hnsw-index-size"),
        )
    };

    let dataset = dataset_name(config);
    let dataset_info = config.dataset_info.as_ref();

    Ok(ConsolidatedRun {
        results_directory: format!("results/raw/{sweep_id}/{run_id}"),
        run_id,
        algorithm: algorithm.clone(),
        dataset,
        sweep_id: sweep_id.to_string(),
        sweep_name: config.sweep_name.clone().unwrap_or_else(|| sweep_id.to_string()),
        indexing_time: safe(indexing_time.map(|v| v / 1000.0)),
        query_time: safe(run.metric_exact("hnsw-query-time").map(|v| v / 1000.0)),
        recall: safe(recall),
        qps: safe(run.metric_exact("hnsw-query-throughput")),
        mean_latency: safe(run.metric_exact("hnsw-mean-latency")),
        index_size: safe(index_size),
        segment_count: safe(run.metric_exact("hnsw-segment-count")),
        created_at: Utc::now().to_rfc3339(),
        cagra_graph_degree: param_or_zero(config, "cagraGraphDegree", &algorithm, true),
        cagra_intermediate_graph_degree: param_or_zero(
            config,
            "cagraIntermediateGraphDegree",
            &algorithm,
            true,
        ),
        cuvs_writer_threads: param_or_zero(config, "cuvsWriterThreads", &algorithm, true),
        hnsw_max_conn: param_or_zero(config, "hnswMaxConn", &algorithm, false),
        hnsw_beam_width: param_or_zero(config, "hnswBeamWidth", &algorithm, false),
        num_index_threads: config.param_u32("numIndexThreads").unwrap_or(0),
        query_threads: config.param_u32("queryThreads").unwrap_or(0),
        ef_search: config.param_u32("efSearch").unwrap_or(0),
        top_k: config.param_u32("topK").unwrap_or(0),
        flush_freq: config.param_u32("flushFreq").unwrap_or(0),
        num_docs: dataset_info
            .and_then(|info| info.num_docs)
            .or_else(|| config.param_u32("numDocs").map(u64::from))
            .unwrap_or(0),
        num_queries_to_run: config.param_u32("numQueriesToRun").unwrap_or(0),
    })
}

fn safe(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// CAGRA parameters are zeroed for Lucene runs and vice versa, so every row
/// carries the full column set.
fn param_or_zero(
    config: &RunConfiguration,
    key: &str,
    algorithm: &str,
    cagra_only: bool,
) -> u32 {
    let is_cagra = algorithm == "CAGRA_HNSW";
    if is_cagra == cagra_only {
        config.param_u32(key).unwrap_or(0)
    } else {
        0
    }
}

/// Normalized dataset identity from the run configuration, falling back to
/// guessing from the base vector file path.
fn dataset_name(config: &RunConfiguration) -> String {
    let Some(info) = config.dataset_info.as_ref() else {
        return "unknown".to_string();
    };
    if let Some(name) = &info.name {
        return name.to_lowercase().replace([' ', '_'], "-");
    }
    let Some(base_file) = &info.base_file else {
        return "unknown".to_string();
    };
    let lower = base_file.to_lowercase();
    for family in ["sift", "wiki"] {
        if lower.contains(family) {
            if lower.contains("1m") {
                return format!("{family}-1m");
            }
            if lower.contains("10m") {
                return format!("{family}-10m");
            }
            return family.to_string();
        }
    }
    Path::new(base_file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}
