//! CachingInvoker - serves repeated side-channel lookups from a TTL cache

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::TtlCache;
use crate::domain::{Fingerprint, ToolInput};

use super::{ToolCatalog, ToolError, ToolInvoker};

/// Wraps another invoker and caches successful outputs of tools the catalog
/// marks `cacheable`, keyed by fingerprint
pub struct CachingInvoker {
    inner: Arc<dyn ToolInvoker>,
    catalog: Arc<ToolCatalog>,
    cache: TtlCache<Fingerprint, String>,
}

impl CachingInvoker {
    pub fn new(inner: Arc<dyn ToolInvoker>, catalog: Arc<ToolCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            catalog,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl ToolInvoker for CachingInvoker {
    async fn invoke(&self, name: &str, input: &ToolInput) -> Result<String, ToolError> {
        if !self.catalog.is_cacheable(name) {
            return self.inner.invoke(name, input).await;
        }

        let key = Fingerprint::new(name, input);
        if let Some(hit) = self.cache.get(&key) {
            debug!(%key, "CachingInvoker::invoke: cache hit");
            return Ok(hit);
        }

        let output = self.inner.invoke(name, input).await?;
        self.cache.insert(key, output.clone());
        Ok(output)
    }
}
