//! Process-wide DNS cache.
//!
//! High-QPS callers resolve the same service hosts over and over; this
//! resolver memoizes `getaddrinfo` results with a TTL and plugs into
//! reqwest for both transport flavors.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

struct CacheSlot {
    addrs: Vec<SocketAddr>,
    resolved_at: Instant,
}

/// TTL-bounded `host -> addrs` cache implementing [`Resolve`].
pub struct CachingResolver {
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheSlot>>,
}

impl CachingResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, host: &str) -> Option<Vec<SocketAddr>> {
        let cache = self.cache.read().expect("dns cache poisoned");
        cache.get(host).and_then(|slot| {
            (slot.resolved_at.elapsed() < self.ttl).then(|| slot.addrs.clone())
        })
    }

    fn store(&self, host: String, addrs: Vec<SocketAddr>) {
        let mut cache = self.cache.write().expect("dns cache poisoned");
        cache.insert(
            host,
            CacheSlot {
                addrs,
                resolved_at: Instant::now(),
            },
        );
    }

    /// Resolve through the cache, hitting the system resolver on miss.
    pub fn lookup(&self, host: &str) -> std::io::Result<Vec<SocketAddr>> {
        if let Some(addrs) = self.cached(host) {
            return Ok(addrs);
        }
        // Port is irrelevant for resolution; reqwest rewrites it.
        let addrs: Vec<SocketAddr> = (host, 0).to_socket_addrs()?.collect();
        self.store(host.to_string(), addrs.clone());
        Ok(addrs)
    }

    /// Drop every cached resolution.
    pub fn clear(&self) {
        self.cache.write().expect("dns cache poisoned").clear();
    }

    #[cfg(test)]
    fn insert_for_test(&self, host: &str, addrs: Vec<SocketAddr>) {
        self.store(host.to_string(), addrs);
    }
}

/// Handle handed to reqwest; clones of the inner cache share state.
pub struct SharedResolver(pub Arc<CachingResolver>);

impl Resolve for SharedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = Arc::clone(&self.0);
        let host = name.as_str().to_string();
        if let Some(addrs) = cache.cached(&host) {
            let iter: Addrs = Box::new(addrs.into_iter());
            return Box::pin(async move { Ok(iter) });
        }
        Box::pin(async move {
            let addrs = tokio::task::spawn_blocking(move || cache.lookup(&host))
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            let iter: Addrs = Box::new(addrs.into_iter());
            Ok(iter)
        })
    }
}

static SHARED: OnceLock<Arc<CachingResolver>> = OnceLock::new();

/// The process-wide resolver. The TTL is fixed on first use; later
/// callers share the existing cache regardless of their configured TTL.
pub fn shared_resolver_with_ttl(ttl: Duration) -> Arc<CachingResolver> {
    Arc::clone(SHARED.get_or_init(|| Arc::new(CachingResolver::new(ttl))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_within_ttl() {
        let resolver = CachingResolver::new(Duration::from_secs(60));
        let addr: SocketAddr = "127.0.0.1:443".parse().unwrap();
        resolver.insert_for_test("kg.example.internal", vec![addr]);
        assert_eq!(
            resolver.cached("kg.example.internal"),
            Some(vec![addr])
        );
    }

    #[test]
    fn cache_expires_after_ttl() {
        let resolver = CachingResolver::new(Duration::from_millis(0));
        let addr: SocketAddr = "127.0.0.1:443".parse().unwrap();
        resolver.insert_for_test("kg.example.internal", vec![addr]);
        assert_eq!(resolver.cached("kg.example.internal"), None);
    }

    #[test]
    fn localhost_resolves() {
        let resolver = CachingResolver::new(Duration::from_secs(60));
        let addrs = resolver.lookup("localhost").unwrap();
        assert!(!addrs.is_empty());
        // Second lookup is served from the cache.
        assert_eq!(resolver.cached("localhost"), Some(addrs));
    }
}
