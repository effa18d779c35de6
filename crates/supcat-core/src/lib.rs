pub mod app_config;
pub mod config;
pub mod hash;
pub mod items;
pub mod normalize;
pub mod pack;
pub mod records;
pub mod suppliers;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ItemFailurePolicy};
pub use config::{load_app_config, load_app_config_from_env};
pub use hash::{canonical_json, content_hash};
pub use items::{DataProvenance, ItemFields, NormalizedItem, RawItem, RawPayload, SkipReason};
pub use normalize::{
    classify_availability, clean_availability_text, clean_gtin, collapse_whitespace,
    normalize_basics, AvailabilityStatus, BasicFields,
};
pub use pack::{parse_pack, PackQuantity};
pub use records::{
    CatalogProduct, IngestJob, JobStatus, JobSummary, JobTrigger, NewCatalogProduct,
    SupplierProduct, UpsertOutcome,
};
pub use suppliers::{load_suppliers, SourceConfig, SupplierConfig, SuppliersFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read suppliers file {path}: {source}")]
    SuppliersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse suppliers file: {0}")]
    SuppliersFileParse(#[from] serde_yaml::Error),

    #[error("invalid supplier configuration: {0}")]
    Validation(String),
}
