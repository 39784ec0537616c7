use thiserror::Error;

/// Failures inside the detail cache. These never reach `LookupService`
/// callers: the cache logs them and degrades to a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache storage quota exceeded: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("Malformed cache data: {0}")]
    Malformed(String),
}
