//! Directory tree transformation.

mod report;
mod scan;
mod transformer;

pub use report::{
    Direction, FileOutcome, LogReporter, Reporter, SilentReporter, TransformEvent,
    TransformSummary,
};
pub use scan::{scan, ScanReport};
pub use transformer::TreeTransformer;
