pub mod adapters;
pub mod client;
pub mod error;
pub mod fields;
pub(crate) mod rate_limit;
pub mod sitemap;

pub use adapters::{
    normalize_raw_items, ApiAdapter, CsvAdapter, HarAdapter, PullOutcome, SitemapAdapter,
    SourceAdapter,
};
pub use client::HttpFetcher;
pub use error::SourceError;
pub use sitemap::parse_sitemap_locs;
