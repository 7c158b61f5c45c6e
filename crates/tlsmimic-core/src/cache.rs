//! Bounded cache for built ClientHello specs, keyed by fingerprint source.
//!
//! Lookups run under a read lock; recency is tracked with a per-entry atomic
//! stamp so a hit does not need the write lock. Inserts take the write lock
//! and evict the least-recently-used entry on capacity pressure. Expired
//! entries (when a TTL is set) are evicted lazily on lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::{Duration, Instant, SystemTime};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::spec::ClientHelloSpec;

/// Spec cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached specs
    pub max_size: usize,
    /// Time-to-live for entries; zero means no expiration
    pub ttl: Duration,
    pub metrics_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            max_size: 1000,
            ttl: Duration::ZERO,
            metrics_enabled: true,
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    /// hits / (hits + misses), 0.0 when nothing was counted yet
    pub hit_rate: f64,
    pub last_reset: SystemTime,
}

/// A namespaced cache key.
///
/// The namespace prefix keeps sources apart: two different source kinds can
/// never collide, and sessions are never resumed across fingerprint
/// configurations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a descriptor file: hash of path + mtime, so editing the file
    /// invalidates the old entry.
    pub fn for_file(path: &Path) -> std::io::Result<CacheKey> {
        let meta = std::fs::metadata(path)?;
        let mtime = meta
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let data = format!("file:{}:{}", path.display(), mtime);
        Ok(CacheKey(format!("file:{}", sha256_hex(&data))))
    }

    /// Key for a raw JA3 string.
    pub fn for_ja3(ja3: &str) -> CacheKey {
        CacheKey(format!("ja3:{}", sha256_hex(ja3)))
    }

    /// Key for a raw JA4 string.
    pub fn for_ja4(ja4: &str) -> CacheKey {
        CacheKey(format!("ja4:{}", sha256_hex(ja4)))
    }

    /// Key for a named profile; the server name participates because the SNI
    /// extension is baked into the built spec.
    pub fn for_profile(profile_name: &str, server_name: &str) -> CacheKey {
        let data = format!("profile:{}:{}", profile_name, server_name);
        CacheKey(format!("profile:{}", sha256_hex(&data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

struct Entry {
    spec: Arc<ClientHelloSpec>,
    created_at: Instant,
    /// Monotonic recency stamp; atomics let a read-locked lookup refresh it
    last_used: AtomicU64,
}

/// Bounded, optionally time-limited spec cache.
pub struct SpecCache {
    map: RwLock<HashMap<CacheKey, Entry>>,
    config: CacheConfig,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    last_reset: Mutex<SystemTime>,
}

impl SpecCache {
    pub fn new(config: CacheConfig) -> SpecCache {
        let mut config = config;
        if config.max_size == 0 {
            config.max_size = CacheConfig::default().max_size;
        }
        SpecCache {
            map: RwLock::new(HashMap::new()),
            config,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            last_reset: Mutex::new(SystemTime::now()),
        }
    }

    /// Look up a spec. Counts a hit or a miss; an entry past its TTL is
    /// removed and counted as one miss plus one eviction.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ClientHelloSpec>> {
        if !self.config.enabled {
            return None;
        }

        let expired = {
            let map = self.map.read().unwrap_or_else(|e| e.into_inner());
            match map.get(key) {
                None => {
                    self.count(&self.misses);
                    return None;
                }
                Some(entry) => {
                    if self.is_expired(entry) {
                        true
                    } else {
                        entry
                            .last_used
                            .store(self.next_tick(), Ordering::Relaxed);
                        self.count(&self.hits);
                        return Some(Arc::clone(&entry.spec));
                    }
                }
            }
        };

        if expired {
            let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
            // re-check under the write lock; another task may have replaced it
            if map.get(key).is_some_and(|e| self.is_expired(e)) {
                map.remove(key);
                debug!(key = key.as_str(), "evicted expired spec");
            }
            self.count(&self.misses);
            self.count(&self.evictions);
        }
        None
    }

    /// Insert a spec. Evicts the least-recently-used entry when full.
    pub fn set(&self, key: CacheKey, spec: Arc<ClientHelloSpec>) {
        if !self.config.enabled {
            return;
        }
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());

        if !map.contains_key(&key) && map.len() >= self.config.max_size {
            if let Some(victim) = map
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone())
            {
                map.remove(&victim);
                self.count(&self.evictions);
                debug!(key = victim.as_str(), "evicted least-recently-used spec");
            }
        }

        map.insert(
            key,
            Entry {
                spec,
                created_at: Instant::now(),
                last_used: AtomicU64::new(self.next_tick()),
            },
        );
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.map
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheMetrics {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            last_reset: *self.last_reset.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Zero the counters and stamp the reset time.
    pub fn reset_metrics(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        *self.last_reset.lock().unwrap_or_else(|e| e.into_inner()) = SystemTime::now();
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.config.ttl > Duration::ZERO && entry.created_at.elapsed() > self.config.ttl
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn count(&self, counter: &AtomicU64) {
        if self.config.metrics_enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

static GLOBAL_CACHE: OnceLock<SpecCache> = OnceLock::new();

/// The process-wide spec cache, lazily built with the default config.
///
/// An ergonomic convenience: every call path also accepts a private cache.
pub fn global_cache() -> &'static SpecCache {
    GLOBAL_CACHE.get_or_init(|| SpecCache::new(CacheConfig::default()))
}

/// Install the global cache with a specific config.
///
/// Idempotent: the first initialization wins; later calls (including the lazy
/// default) leave it untouched. Returns whether this call installed it.
pub fn init_global_cache(config: CacheConfig) -> bool {
    let mut installed = false;
    GLOBAL_CACHE.get_or_init(|| {
        installed = true;
        SpecCache::new(config)
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spec() -> Arc<ClientHelloSpec> {
        Arc::new(ClientHelloSpec::default())
    }

    fn cache(max_size: usize, ttl: Duration) -> SpecCache {
        SpecCache::new(CacheConfig {
            max_size,
            ttl,
            ..Default::default()
        })
    }

    #[test]
    fn hit_and_miss_counting() {
        let c = cache(10, Duration::ZERO);
        let key = CacheKey::for_ja3("771,,,,");

        assert!(c.get(&key).is_none());
        c.set(key.clone(), spec());
        assert!(c.get(&key).is_some());

        let m = c.metrics();
        assert_eq!(m.hits, 1);
        assert_eq!(m.misses, 1);
        assert_eq!(m.evictions, 0);
        assert_eq!(m.size, 1);
        assert!((m.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn capacity_eviction_counts_once_per_victim() {
        let c = cache(3, Duration::ZERO);
        for i in 0..6 {
            c.set(CacheKey::for_ja3(&format!("771,{},,,", i)), spec());
        }
        assert_eq!(c.len(), 3);
        assert_eq!(c.metrics().evictions, 3);
    }

    #[test]
    fn least_recently_used_is_the_victim() {
        let c = cache(2, Duration::ZERO);
        let a = CacheKey::for_ja3("a");
        let b = CacheKey::for_ja3("b");
        c.set(a.clone(), spec());
        c.set(b.clone(), spec());

        // touch `a` so `b` becomes the LRU victim
        assert!(c.get(&a).is_some());
        c.set(CacheKey::for_ja3("c"), spec());

        assert!(c.get(&a).is_some());
        assert!(c.get(&b).is_none());
    }

    #[test]
    fn ttl_expiry_is_lazy_and_counted() {
        let c = cache(10, Duration::from_millis(10));
        let key = CacheKey::for_ja3("771,,,,");
        c.set(key.clone(), spec());
        assert!(c.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(25));
        assert!(c.get(&key).is_none());

        let m = c.metrics();
        assert_eq!(m.hits, 1);
        assert_eq!(m.misses, 1);
        assert_eq!(m.evictions, 1);
        assert_eq!(m.size, 0);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let c = SpecCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let key = CacheKey::for_ja3("771,,,,");
        c.set(key.clone(), spec());
        assert!(c.get(&key).is_none());
        assert_eq!(c.metrics().misses, 0);
    }

    #[test]
    fn reset_metrics_zeroes_counters() {
        let c = cache(10, Duration::ZERO);
        let key = CacheKey::for_ja3("x");
        c.get(&key);
        c.reset_metrics();
        let m = c.metrics();
        assert_eq!(m.hits + m.misses + m.evictions, 0);
    }

    #[test]
    fn keys_are_namespaced_by_source() {
        let same = "771,4865,0,29,0";
        assert_ne!(CacheKey::for_ja3(same), CacheKey::for_ja4(same));
        assert!(CacheKey::for_ja3(same).as_str().starts_with("ja3:"));
        assert!(CacheKey::for_ja4(same).as_str().starts_with("ja4:"));
        assert!(
            CacheKey::for_profile("chrome_120", "example.com")
                .as_str()
                .starts_with("profile:")
        );
    }

    #[test]
    fn profile_key_depends_on_server_name() {
        assert_ne!(
            CacheKey::for_profile("chrome_120", "a.example"),
            CacheKey::for_profile("chrome_120", "b.example")
        );
    }

    #[test]
    fn file_key_changes_with_mtime() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        file.flush().unwrap();
        let before = CacheKey::for_file(file.path()).unwrap();

        // push mtime forward explicitly; fs timestamp granularity can be 1s
        let later = SystemTime::now() + Duration::from_secs(5);
        file.as_file().set_modified(later).unwrap();
        let after = CacheKey::for_file(file.path()).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn global_cache_is_idempotent() {
        let first = global_cache() as *const SpecCache;
        init_global_cache(CacheConfig::default());
        let second = global_cache() as *const SpecCache;
        assert_eq!(first, second);
    }
}
