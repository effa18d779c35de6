use supcat_db::DbError;
use supcat_sources::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{adapter} pull failed: {source}")]
    Pull {
        adapter: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("{adapter} pull timed out after {secs}s")]
    PullTimeout { adapter: &'static str, secs: u64 },

    #[error("item {sku} failed: {source}")]
    Item {
        sku: String,
        #[source]
        source: DbError,
    },

    #[error("unknown payload format '{0}' (expected csv or har)")]
    UnknownFormat(String),

    #[error(transparent)]
    Db(#[from] DbError),
}
