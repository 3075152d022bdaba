//! Fetch shell around the heatmap core
//!
//! Owns everything with time or I/O in it: which window a view covers,
//! which data source answers it, response caching, timeouts and
//! de-duplication of concurrent fetches.

pub mod cache;
pub mod fetcher;
pub mod source;
pub mod window;

pub use cache::*;
pub use fetcher::*;
pub use source::*;
pub use window::*;

use std::time::Duration;

/// Fetch error
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("a fetch for this view is already in progress")]
    InFlight,

    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type FetchResult<T> = Result<T, FetchError>;
