//! Article extraction and normalization.
//!
//! Pure functions over a fetched document; nothing here touches the network
//! or shared state, so pages can be processed in parallel freely.
//!
//! - [`metadata`]: JSON-LD blocks to [`ArticleMetadata`](crate::models::ArticleMetadata)
//! - [`freshness`]: publication recency window
//! - [`cleaner`]: boilerplate stripping for the article body
//! - [`assembler`]: combines the above with selector fallbacks

pub mod assembler;
pub mod cleaner;
pub mod freshness;
pub mod metadata;

pub use assembler::{ArticleAssembler, Assembly};
pub use cleaner::ContentNormalizer;
pub use freshness::FreshnessFilter;
pub use metadata::{extract_metadata, extract_metadata_from_html};
