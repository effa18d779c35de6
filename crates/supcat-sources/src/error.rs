use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("CSV error in {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed sitemap at {url}: {source}")]
    Sitemap {
        url: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("all {pages} product pages listed in {sitemap_url} failed")]
    AllPagesFailed { sitemap_url: String, pages: usize },

    #[error("environment variable {var} holding the API key is not set")]
    MissingApiKey { var: String },

    #[error("unexpected payload shape from {context}: {reason}")]
    UnexpectedShape { context: String, reason: String },
}
