//! Reference rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Where the session's reference rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Remote,
    Cached,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateSource::Remote => "live",
                RateSource::Cached => "cached",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRate {
    pub value: f64,
    pub source: RateSource,
}

#[async_trait]
pub trait ReferenceRateProvider: Send + Sync {
    /// Currency code the provider quotes, used to key the cached value.
    fn currency(&self) -> &str;

    /// Fetches the latest published rate. One attempt, no retries.
    async fn fetch_rate(&self) -> Result<f64>;
}
