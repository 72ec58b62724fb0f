//service/mod.rs
pub mod reset_service;
pub mod report;

pub use report::{JsonReport, OutputFormat, StorageMissingSummary};
pub use reset_service::MissingFileResetter;
