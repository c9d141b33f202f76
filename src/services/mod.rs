//! External services consulted during the expand phase.
//!
//! Both services are traits so the pipeline can run against HTTP backends,
//! test doubles, or [`Offline`], which fails every call.

#[cfg(feature = "http")]
pub mod mediawiki;
#[cfg(feature = "http")]
pub mod sparql;

use crate::utils::SiteConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of one external call.
///
/// These never abort a query: features turn them into diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no endpoint configured for site {0}")]
    NotConfigured(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Category graph traversal
pub trait CategoryGraph: Send + Sync {
    /// Categories under `root` (the root included), nearest first, up to
    /// `max_depth` levels deep. Returns at most `limit + 1` names so callers
    /// can tell an exact fit from an overflow.
    fn subcategories(
        &self,
        site: &SiteConfig,
        root: &str,
        max_depth: u32,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError>;
}

/// Page metadata lookup
pub trait PageLookup: Send + Sync {
    /// `(page id, title)` for every id that exists. Missing ids are omitted.
    fn titles_by_id(&self, site: &SiteConfig, ids: &[u64]) -> Result<Vec<(u64, String)>, ServiceError>;
}

/// Services that fail every call with [`ServiceError::NotConfigured`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl CategoryGraph for Offline {
    fn subcategories(&self, site: &SiteConfig, _: &str, _: u32, _: usize) -> Result<Vec<String>, ServiceError> {
        Err(ServiceError::NotConfigured(site.name.clone()))
    }
}

impl PageLookup for Offline {
    fn titles_by_id(&self, site: &SiteConfig, _: &[u64]) -> Result<Vec<(u64, String)>, ServiceError> {
        Err(ServiceError::NotConfigured(site.name.clone()))
    }
}

/// The service handles handed to features
#[derive(Clone)]
pub struct Services {
    pub graph: Arc<dyn CategoryGraph>,
    pub pages: Arc<dyn PageLookup>,
}

impl Services {
    pub fn new(graph: Arc<dyn CategoryGraph>, pages: Arc<dyn PageLookup>) -> Self {
        Self { graph, pages }
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(Offline), Arc::new(Offline))
    }

    /// HTTP-backed services, each call bounded by `timeout`
    #[cfg(feature = "http")]
    pub fn http(timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyql/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self::new(
            Arc::new(sparql::SparqlCategoryGraph::new(client.clone(), timeout)),
            Arc::new(mediawiki::MediaWikiPages::new(client, timeout)),
        ))
    }
}

#[cfg(feature = "http")]
pub(crate) fn classify(err: reqwest::Error, timeout: Duration) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout(timeout)
    } else if let Some(status) = err.status() {
        ServiceError::Status(status.as_u16())
    } else if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}
