//! Post-processing for ANN benchmark sweeps: Pareto frontier extraction and
//! converters from raw per-run result JSON to plottable CSV/JSON layouts.

pub mod consolidate;
pub mod error;
pub mod frontier;
pub mod model;
pub mod summary;

pub mod convert {
    pub mod export;
    pub mod nvidia;
    pub mod pareto;
}

pub use error::{FrontierError, FrontierResult};
pub use frontier::{frontier, Direction, FrontierPoint, MetricTable};
