//! Read per-dataset NVIDIA-style benchmark JSON back and write the raw,
//! frontier-filtered and build CSVs the dashboard loads.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::frontier::{frontier, FrontierPoint, MetricTable};
use crate::model::{Benchmark, BenchmarkFile};

/// One exported search row. Header casing (`algo_name`) follows the
/// dashboard's expectations, which differ from the sweep converter's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub algo_name: String,
    pub index_name: String,
    pub recall: f64,
    pub throughput: f64,
    pub latency: f64,
}

impl FrontierPoint for ExportRow {
    fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "recall" => Some(self.recall),
            "throughput" => Some(self.throughput),
            "latency" => Some(self.latency),
            _ => None,
        }
    }
}

/// Export every benchmark JSON under `<dataset_path>/<dataset>` to CSV.
/// Search files get a raw dump plus one frontier per metric; build files
/// get a plain time table. Unreadable files are logged and skipped.
pub fn export_dataset(dataset_path: &Path, dataset: &str) -> Result<Vec<PathBuf>> {
    let mut written = export_search_csvs(dataset_path, dataset)?;
    written.extend(export_build_csvs(dataset_path, dataset)?);
    Ok(written)
}

/// Search files are the `...,throughput.json` ones; each yields
/// `<algo>,base,raw.csv`, `<algo>,base,throughput.csv` and
/// `<algo>,base,latency.csv`.
pub fn export_search_csvs(dataset_path: &Path, dataset: &str) -> Result<Vec<PathBuf>> {
    let dir = dataset_path.join(dataset);
    let table = MetricTable::ann_default();
    let mut written = Vec::new();

    for (path, algo_name) in benchmark_files(&dir, true)? {
        match search_rows(&path, &algo_name) {
            Ok(rows) => {
                let raw_path = dir.join(format!("{algo_name},base,raw.csv"));
                write_rows(&raw_path, &rows)?;
                written.push(raw_path);

                for metric in ["throughput", "latency"] {
                    let front = frontier(&rows, metric, &table)
                        .with_context(|| format!("frontier for {algo_name}/{metric}"))?;
                    let path = dir.join(format!("{algo_name},base,{metric}.csv"));
                    write_rows(&path, &front)?;
                    written.push(path);
                }
            }
            Err(e) => log::warn!("error processing search file {}: {e:#}", path.display()),
        }
    }
    Ok(written)
}

/// Build files are the `<algo>,base.json` ones without a throughput marker;
/// each yields `<algo>,base.csv` with the raw build times.
pub fn export_build_csvs(dataset_path: &Path, dataset: &str) -> Result<Vec<PathBuf>> {
    let dir = dataset_path.join(dataset);
    let mut written = Vec::new();

    for (path, algo_name) in benchmark_files(&dir, false)? {
        match read_benchmarks(&path) {
            Ok(benchmarks) => {
                let csv_path = dir.join(format!("{algo_name},base.csv"));
                let mut writer = csv::Writer::from_path(&csv_path)
                    .with_context(|| format!("creating {}", csv_path.display()))?;
                writer.write_record(["algo_name", "index_name", "time"])?;
                for benchmark in &benchmarks {
                    writer.write_record([
                        algo_name.as_str(),
                        index_from_name(&benchmark.name),
                        &benchmark.real_time.to_string(),
                    ])?;
                }
                writer.flush()?;
                written.push(csv_path);
            }
            Err(e) => log::warn!("error processing build file {}: {e:#}", path.display()),
        }
    }
    Ok(written)
}

/// Benchmark JSON files in `dir`, paired with the algorithm name taken from
/// the filename prefix before the first comma. `search` selects the
/// throughput-marked files, otherwise the `<algo>,base.json` build files.
fn benchmark_files(dir: &Path, search: bool) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        let wanted = if search {
            name.contains("throughput")
        } else {
            !name.contains("throughput") && name.ends_with("base.json")
        };
        if wanted {
            let algo_name = name.split(',').next().unwrap_or(name).to_string();
            files.push((path, algo_name));
        }
    }
    files.sort();
    Ok(files)
}

fn read_benchmarks(path: &Path) -> Result<Vec<Benchmark>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let data: BenchmarkFile =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    Ok(data.benchmarks)
}

fn search_rows(path: &Path, algo_name: &str) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::new();
    for benchmark in read_benchmarks(path)? {
        let (Some(recall), Some(throughput), Some(latency)) = (
            benchmark.recall,
            benchmark.items_per_second,
            benchmark.latency,
        ) else {
            bail!("benchmark '{}' lacks search metrics", benchmark.name);
        };
        rows.push(ExportRow {
            algo_name: algo_name.to_string(),
            index_name: index_from_name(&benchmark.name).to_string(),
            recall,
            throughput,
            latency,
        });
    }
    Ok(rows)
}

/// Benchmark names come as `algo/index`; the part after the slash is the
/// index identity. Names without a slash are used whole.
fn index_from_name(name: &str) -> &str {
    match name.split_once('/') {
        Some((_, index)) => index,
        None => name,
    }
}

fn write_rows(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_the_part_after_the_slash() {
        assert_eq!(index_from_name("LUCENE_HNSW/beam100-conn16-ef64"), "beam100-conn16-ef64");
        assert_eq!(index_from_name("flat"), "flat");
    }

    #[test]
    fn search_files_are_split_from_build_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "LUCENE_HNSW,base,k10,bs1000,throughput.json",
            "LUCENE_HNSW,base.json",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }

        let search = benchmark_files(dir.path(), true).unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].1, "LUCENE_HNSW");

        let build = benchmark_files(dir.path(), false).unwrap();
        assert_eq!(build.len(), 1);
        assert!(build[0].0.ends_with("LUCENE_HNSW,base.json"));
    }
}
