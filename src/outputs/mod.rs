//! Output writers for assembled articles.
//!
//! - [`jsonl`]: one JSON object per article, one article per line

pub mod jsonl;
