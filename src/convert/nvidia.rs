//! Convert per-run `results.json` files into NVIDIA-style benchmark JSON,
//! accumulating entries into one per-dataset file across runs.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::model::{Benchmark, BenchmarkFile, RunConfiguration, RunResults};

pub const RESULTS_FILENAME: &str = "results.json";

/// Convert every run under `sweep_dir`; returns the files written or
/// appended to. Unconvertible runs are logged and skipped.
pub fn convert_sweep(
    sweep_dir: &Path,
    output_dir: &Path,
    dataset: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut converted = Vec::new();
    for entry in WalkDir::new(sweep_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == RESULTS_FILENAME)
    {
        match convert_run(entry.path(), output_dir, dataset) {
            Ok((search, build)) => {
                log::info!("converted {}", entry.path().display());
                converted.push(search);
                if let Some(build) = build {
                    converted.push(build);
                }
            }
            Err(e) => log::warn!("error converting {}: {e:#}", entry.path().display()),
        }
    }
    Ok(converted)
}

/// Convert one run. Returns the search file and, when the run recorded an
/// indexing time, the build file.
pub fn convert_run(
    results_json: &Path,
    output_dir: &Path,
    dataset: Option<&str>,
) -> Result<(PathBuf, Option<PathBuf>)> {
    let file =
        File::open(results_json).with_context(|| format!("opening {}", results_json.display()))?;
    let run: RunResults = serde_json::from_reader(file)
        .with_context(|| format!("parsing {}", results_json.display()))?;
    let config = &run.configuration;

    let algorithm = canonical_algorithm(&config.algo_to_run);
    let index_name = index_name(config, &algorithm);

    let Some(recall_pct) = run.metric_f64("recall-accuracy") else {
        bail!("no recall-accuracy metric found");
    };
    let Some(latency_ms) = run.metric_f64("mean-latency") else {
        bail!("no mean-latency metric found");
    };
    let recall = recall_pct / 100.0;
    let throughput = if latency_ms > 0.0 {
        1000.0 / latency_ms
    } else {
        0.0
    };

    let mut benchmark = Benchmark::single_iteration(format!("{algorithm}/{index_name}"), latency_ms);
    benchmark.recall = Some(recall);
    benchmark.latency = Some(latency_ms);
    benchmark.items_per_second = Some(throughput);

    let dataset = match dataset {
        Some(name) => name.to_string(),
        None => dataset_from_path(results_json),
    };
    let k = config.top_k.unwrap_or(10);
    let n_queries = config.num_queries_to_run.unwrap_or(10_000);

    let dataset_dir = output_dir.join(&dataset);
    fs::create_dir_all(&dataset_dir)
        .with_context(|| format!("creating {}", dataset_dir.display()))?;

    let search_path =
        dataset_dir.join(format!("{algorithm},base,k{k},bs{n_queries},throughput.json"));
    append_benchmark(&search_path, benchmark)?;

    let build_path = match run.metric_f64("indexing-time") {
        Some(build_ms) => {
            let benchmark =
                Benchmark::single_iteration(format!("{algorithm}/{index_name}"), build_ms);
            let path = dataset_dir.join(format!("{algorithm},base.json"));
            append_benchmark(&path, benchmark)?;
            Some(path)
        }
        None => None,
    };

    Ok((search_path, build_path))
}

/// Runner versions disagree on algorithm spelling; normalize to the names
/// the plotting tools expect.
fn canonical_algorithm(algo: &str) -> String {
    match algo {
        "cagra_hnsw" | "CAGRA_HNSW" => "CAGRA_HNSW".to_string(),
        "hnsw" | "LUCENE_HNSW" => "LUCENE_HNSW".to_string(),
        other => other.to_string(),
    }
}

/// Search-time index identity: unlike the CSV converter this keys on
/// efSearch, since the same built index is queried at many efSearch values.
fn index_name(config: &RunConfiguration, algorithm: &str) -> String {
    let ef = config.ef_search.unwrap_or(0);
    match algorithm {
        "LUCENE_HNSW" => {
            let beam = config.hnsw_beam_width.unwrap_or(0);
            let conn = config.hnsw_max_conn.unwrap_or(0);
            format!("beam{beam}-conn{conn}-ef{ef}")
        }
        "CAGRA_HNSW" => {
            let deg = config.cagra_graph_degree.unwrap_or(0);
            let ideg = config.cagra_intermediate_graph_degree.unwrap_or(0);
            format!("ef{ef}-deg{deg}-ideg{ideg}")
        }
        _ => format!("ef{ef}"),
    }
}

/// Runs live at `<dataset>/<run>/results.json`; the dataset is two levels up.
fn dataset_from_path(results_json: &Path) -> String {
    results_json
        .ancestors()
        .nth(2)
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Append to an existing benchmark file, or start a new one.
fn append_benchmark(path: &Path, benchmark: Benchmark) -> Result<()> {
    let mut data = if path.exists() {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?
    } else {
        BenchmarkFile::default()
    };
    data.benchmarks.push(benchmark);
    let file = File::create(path).with_context(|| format!("writing {}", path.display()))?;
    serde_json::to_writer_pretty(file, &data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_are_canonicalized() {
        assert_eq!(canonical_algorithm("hnsw"), "LUCENE_HNSW");
        assert_eq!(canonical_algorithm("cagra_hnsw"), "CAGRA_HNSW");
        assert_eq!(canonical_algorithm("IVF_FLAT"), "IVF_FLAT");
    }

    #[test]
    fn lucene_index_name_uses_search_tunables() {
        let config = RunConfiguration {
            ef_search: Some(64),
            hnsw_beam_width: Some(100),
            hnsw_max_conn: Some(16),
            ..Default::default()
        };
        assert_eq!(index_name(&config, "LUCENE_HNSW"), "beam100-conn16-ef64");
    }

    #[test]
    fn dataset_is_taken_two_levels_above_the_results_file() {
        let path = Path::new("sweeps/sift-1m/run-03/results.json");
        assert_eq!(dataset_from_path(path), "sift-1m");
    }
}
