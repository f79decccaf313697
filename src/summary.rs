//! Console rendering of computed frontiers.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use crate::convert::pareto::FrontierReport;

/// Render one frontier as a table, best metric value first (the order the
/// extractor emits).
pub fn frontier_table(report: &FrontierReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "algorithm",
        "index_name",
        "recall",
        "throughput (q/s)",
        "latency (s)",
    ]);
    for record in &report.records {
        table.add_row(vec![
            record.algorithm.clone(),
            record.index_name.clone(),
            format!("{:.4}", record.recall),
            format!("{:.1}", record.throughput),
            format!("{:.6}", record.latency),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SearchRecord;

    #[test]
    fn table_has_one_line_per_record_plus_header() {
        let report = FrontierReport {
            algorithm: "LUCENE_HNSW".to_string(),
            metric: "throughput".to_string(),
            records: vec![SearchRecord {
                algorithm: "LUCENE_HNSW".to_string(),
                index_name: "ef200-beam32".to_string(),
                recall: 0.95,
                throughput: 512.0,
                latency: 0.00195,
            }],
        };
        let rendered = frontier_table(&report).to_string();
        assert!(rendered.contains("ef200-beam32"));
        assert!(rendered.contains("0.9500"));
    }
}
