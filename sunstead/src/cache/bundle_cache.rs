//! Redis-backed context bundle cache.
//!
//! The cache is strictly an accelerator: any transport error disables it for
//! the process until a periodic probe succeeds, and every operation degrades
//! to a miss. Correctness never depends on cache availability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::models::{ContextBundle, QueryType};

/// Collapse whitespace and case so trivially-different phrasings share a
/// cache entry.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable cache key over (user, normalized query, category).
pub fn cache_key(user_id: &str, query: &str, query_type: QueryType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(b"\n");
    hasher.update(query_type.as_str().as_bytes());
    let digest = hasher.finalize();
    format!("ctx:{digest:x}")
}

#[derive(Clone)]
pub struct BundleCache {
    client: Option<redis::Client>,
    manager: Arc<Mutex<Option<ConnectionManager>>>,
    disabled: Arc<AtomicBool>,
    ttl_secs: u64,
}

impl BundleCache {
    /// Build the cache from config. A missing URL yields a permanent
    /// passthrough; a bad URL is logged and treated the same.
    pub fn new(config: &CacheConfig) -> Self {
        let client = match &config.url {
            Some(url) => match redis::Client::open(url.as_str()) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid cache URL; bundle cache disabled");
                    None
                }
            },
            None => {
                tracing::info!("No cache URL configured; bundle cache runs in passthrough mode");
                None
            }
        };

        Self {
            disabled: Arc::new(AtomicBool::new(client.is_none())),
            client,
            manager: Arc::new(Mutex::new(None)),
            ttl_secs: config.bundle_ttl_secs,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::Relaxed)
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Fetch a bundle. Any failure is a miss.
    pub async fn get(&self, key: &str) -> Option<ContextBundle> {
        if !self.is_enabled() {
            return None;
        }

        let mut guard = self.manager.lock().await;
        let conn = match self.connection(&mut guard).await {
            Some(conn) => conn,
            None => return None,
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<ContextBundle>(&raw) {
                Ok(bundle) => Some(bundle),
                Err(e) => {
                    tracing::warn!(error = %e, key, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.disable(&e);
                *guard = None;
                None
            }
        }
    }

    /// Store a bundle with the configured TTL. Failures only disable the
    /// cache; the caller proceeds regardless.
    pub async fn put(&self, key: &str, bundle: &ContextBundle) {
        if !self.is_enabled() {
            return;
        }

        let raw = match serde_json::to_string(bundle) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize bundle for cache");
                return;
            }
        };

        let mut guard = self.manager.lock().await;
        let conn = match self.connection(&mut guard).await {
            Some(conn) => conn,
            None => return,
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, self.ttl_secs).await {
            self.disable(&e);
            *guard = None;
        }
    }

    /// Connectivity probe. Re-enables the cache after an outage; called by
    /// the health monitor on its interval.
    pub async fn probe(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        match client.get_connection_manager().await {
            Ok(mut conn) => match redis::cmd("PING").query_async::<String>(&mut conn).await {
                Ok(_) => {
                    if self.disabled.swap(false, Ordering::Relaxed) {
                        tracing::info!("Bundle cache re-enabled after successful probe");
                    }
                    *self.manager.lock().await = Some(conn);
                    true
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Cache probe ping failed");
                    false
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "Cache probe connection failed");
                false
            }
        }
    }

    async fn connection<'a>(
        &self,
        guard: &'a mut Option<ConnectionManager>,
    ) -> Option<&'a mut ConnectionManager> {
        if guard.is_none() {
            let client = self.client.as_ref()?;
            match client.get_connection_manager().await {
                Ok(conn) => *guard = Some(conn),
                Err(e) => {
                    self.disable(&e);
                    return None;
                }
            }
        }
        guard.as_mut()
    }

    fn disable(&self, error: &redis::RedisError) {
        if !self.disabled.swap(true, Ordering::Relaxed) {
            tracing::warn!(error = %error, "Bundle cache disabled after transport error");
        }
    }
}
