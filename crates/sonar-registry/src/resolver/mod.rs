//! Version resolution seam between the workspace model and the registry

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::{CacheStats, ResolutionCache};
use crate::client::RegistryClient;

/// Answers "what is the newest version of this package"
///
/// `None` means the package is unknown or the lookup failed; callers treat
/// both the same way.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &str, canary: Option<&str>) -> impl Future<Output = Option<String>> + Send;
}

/// Registry-backed resolver with bounded concurrency and a per-run cache
#[derive(Debug)]
pub struct RegistryResolver {
    client: RegistryClient,
    cache: ResolutionCache,
    permits: Arc<Semaphore>,
}

impl RegistryResolver {
    /// `concurrency` caps in-flight registry requests; zero is treated as one
    pub fn new(client: RegistryClient, concurrency: usize) -> Self {
        Self {
            client,
            cache: ResolutionCache::new(),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Resolve for RegistryResolver {
    async fn resolve(&self, name: &str, canary: Option<&str>) -> Option<String> {
        self.cache
            .get_or_resolve(name, canary, || async {
                // A closed semaphore still lets the request through
                let _permit = self.permits.acquire().await.ok();
                match self.client.resolve_version(name, canary).await {
                    Ok(version) => {
                        debug!(package = name, ?canary, ?version, "Resolved from registry");
                        version
                    },
                    Err(error) => {
                        warn!(package = name, error = %error, "Registry lookup failed");
                        None
                    },
                }
            })
            .await
    }
}
