use std::env;
use std::path::Path;

use anyhow::{bail, Result};

use ann_report::consolidate;
use ann_report::convert::{export, nvidia, pareto};
use ann_report::summary;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        return Ok(());
    }

    match args[1].as_str() {
        "pareto" => {
            if args.len() < 4 {
                bail!("usage: ann_report pareto <input-dir> <output-dir> [json-filename]");
            }
            let mut opts = pareto::ParetoOptions::new(&args[2], &args[3]);
            if let Some(filename) = args.get(4) {
                opts.json_filename = filename.clone();
            }
            let converted = pareto::convert_results(&opts)?;
            for report in &converted.frontiers {
                println!("{} / {} frontier:", report.algorithm, report.metric);
                println!("{}", summary::frontier_table(report));
            }
        }
        "nvidia" => {
            if args.len() < 4 {
                bail!("usage: ann_report nvidia <sweep-dir> <output-dir> [dataset]");
            }
            let dataset = args.get(4).map(|s| s.as_str());
            let converted =
                nvidia::convert_sweep(Path::new(&args[2]), Path::new(&args[3]), dataset)?;
            println!("converted {} files", converted.len());
            for path in converted {
                println!("  {}", path.display());
            }
        }
        "export" => {
            if args.len() < 4 {
                bail!("usage: ann_report export <dataset-path> <dataset>");
            }
            let written = export::export_dataset(Path::new(&args[2]), &args[3])?;
            for path in written {
                println!("  {}", path.display());
            }
        }
        "consolidate" => {
            if args.len() < 3 {
                bail!("usage: ann_report consolidate <results-root> [sweep-id]");
            }
            let root = Path::new(&args[2]);
            let written = match args.get(3) {
                Some(sweep_id) => consolidate::consolidate_sweep(root, sweep_id)?
                    .into_iter()
                    .collect(),
                None => consolidate::consolidate_all(root)?,
            };
            for path in written {
                println!("  {}", path.display());
            }
        }
        _ => usage(),
    }

    Ok(())
}

fn usage() {
    println!("Usage: ann_report <pareto|nvidia|export|consolidate> ...");
    println!("  pareto <input-dir> <output-dir> [json-filename]");
    println!("  nvidia <sweep-dir> <output-dir> [dataset]");
    println!("  export <dataset-path> <dataset>");
    println!("  consolidate <results-root> [sweep-id]");
}
