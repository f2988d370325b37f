#![doc = include_str!("../README.md")]

pub mod disguise;
pub mod format;
pub mod merge;
pub mod retention;
pub mod rotation;
pub mod writer;

pub use merge::merge_interface_records;
pub use retention::{RetentionObserver, SweepReport, sweep};
pub use rotation::{bucket_name, output_path};
pub use writer::{TrafficWriter, WriteOutcome};
