//! Catalog matching and the ingestion runner.

pub mod error;
pub mod factory;
pub mod images;
pub mod matcher;
pub mod runner;

pub use error::IngestError;
pub use factory::{
    adapter_for_payload, adapter_for_supplier, adapter_for_supplier_with, PayloadFormat,
};
pub use images::{
    start_image_queue, HttpImageFetcher, ImageDispatcher, ImageFetchWorker, ImageFetcher,
    ImageTask,
};
pub use matcher::{match_or_create_catalog, MatchKind, MatchOutcome};
pub use runner::{IngestReport, IngestRunner, MatchCounts, RunOptions};
