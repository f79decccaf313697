//! Convert a tree of per-run result JSON files into per-algorithm frontier
//! CSVs under `result/search/` and build-time CSVs under `result/build/`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::frontier::{frontier, MetricTable};
use crate::model::{BuildRecord, RunConfiguration, RunResults, SearchRecord};

pub const DEFAULT_RESULTS_FILENAME: &str = "detailed_results.json";

#[derive(Debug, Clone)]
pub struct ParetoOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Result filename to look for under `input_dir`.
    pub json_filename: String,
    /// Top-K; read from the first run when absent.
    pub k: Option<u32>,
    /// Query batch size; read from the first run when absent.
    pub n_queries: Option<u32>,
}

impl ParetoOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            json_filename: DEFAULT_RESULTS_FILENAME.to_string(),
            k: None,
            n_queries: None,
        }
    }
}

/// One computed frontier, kept around so callers can render a summary table
/// without re-reading the CSV they just wrote.
#[derive(Debug, Clone)]
pub struct FrontierReport {
    pub algorithm: String,
    pub metric: String,
    pub records: Vec<SearchRecord>,
}

#[derive(Debug, Default)]
pub struct ConvertSummary {
    pub search_files: Vec<PathBuf>,
    pub build_files: Vec<PathBuf>,
    pub frontiers: Vec<FrontierReport>,
}

/// Walk `input_dir`, extract one search/build measurement per run, group by
/// algorithm, and write frontier-filtered CSVs.
pub fn convert_results(opts: &ParetoOptions) -> Result<ConvertSummary> {
    let json_files = find_result_files(&opts.input_dir, &opts.json_filename);
    if json_files.is_empty() {
        log::warn!(
            "no {} files found under {}",
            opts.json_filename,
            opts.input_dir.display()
        );
        return Ok(ConvertSummary::default());
    }
    log::info!("found {} result files to process", json_files.len());

    let bar = ProgressBar::new(json_files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar.set_message("reading runs");

    let mut runs = Vec::new();
    for path in &json_files {
        match read_run(path) {
            Ok(run) => runs.push(run),
            Err(e) => log::warn!("skipping {}: {e:#}", path.display()),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if runs.is_empty() {
        return Ok(ConvertSummary::default());
    }

    // Batch parameters come from the first run; the sweep is expected to be
    // homogeneous in k and query count.
    let k = opts
        .k
        .or(runs[0].configuration.top_k)
        .unwrap_or(10);
    let n_queries = opts
        .n_queries
        .or(runs[0].configuration.num_queries_to_run)
        .unwrap_or(10_000);
    for run in &runs[1..] {
        let run_k = run.configuration.top_k.unwrap_or(10);
        let run_n = run.configuration.num_queries_to_run.unwrap_or(10_000);
        if run_k != k || run_n != n_queries {
            log::warn!(
                "parameter mismatch: expected k={k} n_queries={n_queries}, \
                 found k={run_k} n_queries={run_n}; keeping the first run's values"
            );
        }
    }
    log::info!("using k={k}, n_queries={n_queries}");

    let mut search_records = Vec::new();
    let mut build_records: Vec<BuildRecord> = Vec::new();
    for run in &runs {
        let (search, build) = extract_records(run);
        search_records.extend(search);
        if let Some(build) = build {
            let seen = build_records
                .iter()
                .any(|b| b.algorithm == build.algorithm && b.index_name == build.index_name);
            if !seen {
                build_records.push(build);
            }
        }
    }

    let search_dir = opts.output_dir.join("result").join("search");
    let build_dir = opts.output_dir.join("result").join("build");
    fs::create_dir_all(&search_dir)
        .with_context(|| format!("creating {}", search_dir.display()))?;
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("creating {}", build_dir.display()))?;

    let by_algorithm: Vec<(String, Vec<SearchRecord>)> = search_records
        .into_iter()
        .map(|r| (r.algorithm.clone(), r))
        .into_group_map()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect();

    let table = MetricTable::ann_default();

    // Frontiers are independent per (algorithm, metric); fan out.
    let per_algo: Vec<(Vec<PathBuf>, Vec<FrontierReport>)> = by_algorithm
        .par_iter()
        .map(|(algorithm, records)| -> Result<(Vec<PathBuf>, Vec<FrontierReport>)> {
            let mut files = Vec::new();
            let mut reports = Vec::new();
            for metric in ["throughput", "latency"] {
                let front = frontier(records, metric, &table)
                    .with_context(|| format!("frontier for {algorithm}/{metric}"))?;
                let filename = format!("{algorithm},base,k{k},bs{n_queries},{metric}.csv");
                let path = search_dir.join(&filename);
                write_search_csv(&path, &front)?;
                log::info!("wrote {metric} frontier: {}", path.display());
                files.push(path);
                reports.push(FrontierReport {
                    algorithm: algorithm.clone(),
                    metric: metric.to_string(),
                    records: front,
                });
            }
            Ok((files, reports))
        })
        .collect::<Result<_>>()?;

    let mut summary = ConvertSummary::default();
    for (files, reports) in per_algo {
        summary.search_files.extend(files);
        summary.frontiers.extend(reports);
    }

    for (algorithm, records) in build_records
        .into_iter()
        .map(|r| (r.algorithm.clone(), r))
        .into_group_map()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
    {
        let path = build_dir.join(format!("{algorithm},base.csv"));
        write_build_csv(&path, &records)?;
        log::info!("wrote build file: {}", path.display());
        summary.build_files.push(path);
    }

    log::info!(
        "conversion complete: {} search files, {} build files",
        summary.search_files.len(),
        summary.build_files.len()
    );
    Ok(summary)
}

/// All files named `filename` anywhere under `root`.
pub fn find_result_files(root: &Path, filename: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == filename)
        .map(|entry| entry.into_path())
        .sorted()
        .collect()
}

fn read_run(path: &Path) -> Result<RunResults> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let run: RunResults =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    Ok(run)
}

/// Pull one search row and at most one build row out of a run. Recall comes
/// in percent and latency in milliseconds; rows are normalized to fractions
/// and seconds, with throughput derived as queries/second.
fn extract_records(run: &RunResults) -> (Option<SearchRecord>, Option<BuildRecord>) {
    let config = &run.configuration;
    let algorithm = if config.algo_to_run.is_empty() {
        "UNKNOWN".to_string()
    } else {
        config.algo_to_run.clone()
    };
    let index_name = index_name(config);

    let recall = run.metric_f64("recall").map(|v| v / 100.0);
    let latency = run.metric_f64("mean-latency").map(|v| v / 1000.0);
    let build_time = run.metric_f64("indexing-time").map(|v| v / 1000.0);

    let search = match (recall, latency) {
        (Some(recall), Some(latency)) if latency > 0.0 => Some(SearchRecord {
            algorithm: algorithm.clone(),
            index_name: index_name.clone(),
            recall,
            throughput: 1.0 / latency,
            latency,
        }),
        _ => None,
    };
    let build = build_time.map(|build_time| BuildRecord {
        algorithm,
        index_name,
        build_time,
    });
    (search, build)
}

/// Human-readable index identity derived from the build-time tunables.
fn index_name(config: &RunConfiguration) -> String {
    let ef = config.ef_construction.unwrap_or(150);
    match config.algo_to_run.as_str() {
        "LUCENE_HNSW" => {
            let beam = config.hnsw_beam_width.unwrap_or(32);
            format!("ef{ef}-beam{beam}")
        }
        "CAGRA_HNSW" => {
            let deg = config.cagra_graph_degree.unwrap_or(32);
            let ideg = config.cagra_intermediate_graph_degree.unwrap_or(32);
            format!("ef{ef}-deg{deg}-ideg{ideg}")
        }
        _ => {
            let m = config.m.unwrap_or(32);
            let candidates = config.max_candidates.unwrap_or(128);
            format!("ef{ef}-deg{m}-ideg{candidates}")
        }
    }
}

fn write_search_csv(path: &Path, records: &[SearchRecord]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_build_csv(path: &Path, records: &[BuildRecord]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["algorithm", "index_name", "build_time"])?;
    for record in records {
        writer.write_record([
            record.algorithm.as_str(),
            record.index_name.as_str(),
            &format!("{:.6}", record.build_time),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(algo: &str, ef: u32, recall_pct: f64, latency_ms: f64) -> RunResults {
        serde_json::from_value(json!({
            "configuration": {
                "algoToRun": algo,
                "efConstruction": ef,
                "topK": 10,
                "numQueriesToRun": 1000,
            },
            "metrics": {
                "hnsw-recall-accuracy": recall_pct,
                "hnsw-mean-latency": latency_ms,
                "hnsw-indexing-time": 5000.0,
            }
        }))
        .unwrap()
    }

    #[test]
    fn extracts_normalized_search_record() {
        let (search, build) = extract_records(&run("LUCENE_HNSW", 200, 95.0, 2.0));
        let search = search.unwrap();
        assert_eq!(search.algorithm, "LUCENE_HNSW");
        assert_eq!(search.index_name, "ef200-beam32");
        assert!((search.recall - 0.95).abs() < 1e-12);
        assert!((search.latency - 0.002).abs() < 1e-12);
        assert!((search.throughput - 500.0).abs() < 1e-9);
        assert!((build.unwrap().build_time - 5.0).abs() < 1e-12);
    }

    #[test]
    fn run_without_latency_yields_no_search_record() {
        let mut run = run("LUCENE_HNSW", 200, 95.0, 2.0);
        run.metrics.remove("hnsw-mean-latency");
        let (search, build) = extract_records(&run);
        assert!(search.is_none());
        assert!(build.is_some());
    }

    #[test]
    fn cagra_index_name_includes_degrees() {
        let mut run = run("CAGRA_HNSW", 150, 90.0, 1.0);
        run.configuration.cagra_graph_degree = Some(64);
        run.configuration.cagra_intermediate_graph_degree = Some(128);
        let (search, _) = extract_records(&run);
        assert_eq!(search.unwrap().index_name, "ef150-deg64-ideg128");
    }
}
