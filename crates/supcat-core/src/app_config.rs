use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the runner treats a failure while matching or upserting one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemFailurePolicy {
    /// Record the failure as a job warning and keep processing the batch.
    #[default]
    Isolate,
    /// Fail the whole job on the first item error.
    Abort,
}

impl std::fmt::Display for ItemFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemFailurePolicy::Isolate => write!(f, "isolate"),
            ItemFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub suppliers_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_base_secs: u64,
    pub pull_timeout_secs: u64,
    pub sitemap_concurrency: usize,
    pub item_failure_policy: ItemFailurePolicy,
    pub image_fetch_url: Option<String>,
    pub image_queue_capacity: usize,
    pub image_fetch_max_retries: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("suppliers_path", &self.suppliers_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field(
                "http_retry_backoff_base_secs",
                &self.http_retry_backoff_base_secs,
            )
            .field("pull_timeout_secs", &self.pull_timeout_secs)
            .field("sitemap_concurrency", &self.sitemap_concurrency)
            .field("item_failure_policy", &self.item_failure_policy)
            .field("image_fetch_url", &self.image_fetch_url)
            .field("image_queue_capacity", &self.image_queue_capacity)
            .field("image_fetch_max_retries", &self.image_fetch_max_retries)
            .finish()
    }
}
