//! Keyed cache of server data.
//!
//! The cache is the single source of truth for fetched data. Entries are
//! replaced when a fetch completes and marked stale by invalidation; nothing
//! is ever patched in place from a mutation result.
//!
//! Fetches follow a ticket protocol: [`QueryCache::begin_fetch`] records the
//! key's current generation and [`QueryCache::complete_fetch`] only stores the
//! result if no cancel or invalidate happened in between. This keeps a
//! response that was already in flight when a mutation started from
//! overwriting the post-mutation state. Generations come from one counter
//! per cache that never goes back, so a ticket cannot match an entry that was
//! evicted and created again while its fetch was in flight.
//!
//! Writes register the keys they will invalidate with
//! [`QueryCache::begin_write`] and stay pending until their guard is dropped.
//! Readers whose response was discarded wait for pending writes on their key
//! before fetching again.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use nodetable_core::{GraphError, GraphResult};
use nodetable_monitoring::ClientMetrics;

mod key;
mod value;

pub use key::{KeyScope, QueryKey, QueryKind};
pub use value::{CachedValue, Cacheable};

/// Default maximum number of cached queries
const DEFAULT_CAPACITY: usize = 256;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached queries
    pub capacity: usize,
    /// Age after which entries of time-expiring keys are refetched on read.
    /// Zero means always refetch while serving the cached value meanwhile.
    pub stale_after: Duration,
    /// Serve the last rows result as a placeholder while new rows load
    pub keep_previous_rows: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            stale_after: Duration::ZERO,
            keep_previous_rows: true,
        }
    }
}

/// Cache metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Number of entries in the cache
    pub entries: usize,
    /// Lookups answered with fresh data
    pub hits: u64,
    /// Lookups that need a fetch
    pub misses: u64,
    /// Keys marked stale by invalidation
    pub invalidations: u64,
    /// Keys whose in-flight fetches were cancelled
    pub cancellations: u64,
    /// Fetch results dropped because their key was cancelled or invalidated
    pub discarded: u64,
    /// Entries evicted due to the capacity limit
    pub evictions: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<CachedValue>,
    error: Option<GraphError>,
    generation: u64,
    invalidated: bool,
    fetched_at: Option<Instant>,
}

impl CacheEntry {
    fn empty(generation: u64) -> Self {
        Self {
            value: None,
            error: None,
            generation,
            invalidated: false,
            fetched_at: None,
        }
    }

    fn is_fresh(&self, key: &QueryKey, stale_after: Duration) -> bool {
        if self.value.is_none() || self.invalidated {
            return false;
        }
        if !key.expires_by_time() {
            return true;
        }
        self.fetched_at
            .map(|at| at.elapsed() < stale_after)
            .unwrap_or(false)
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Last successfully fetched value, possibly stale
    pub value: Option<CachedValue>,
    /// Error of the most recent fetch, if it failed
    pub error: Option<GraphError>,
    /// Whether `value` can be served without refetching
    pub fresh: bool,
    /// Whether a write that will invalidate this key is still in progress
    pub pending_write: bool,
}

/// Proof that a fetch was started, to be handed back on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a fetch ticket must be completed"]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// What happened to a completed fetch
#[derive(Debug)]
pub enum FetchOutcome {
    Stored,
    /// The key was cancelled or invalidated while the fetch was in flight.
    /// The result is handed back untouched.
    Discarded(GraphResult<CachedValue>),
}

/// Keys a write in progress will invalidate once it succeeds
struct PendingWrite {
    id: u64,
    invalidate: Vec<KeyScope>,
}

struct CacheState {
    entries: LruCache<QueryKey, CacheEntry>,
    last_rows: Option<CachedValue>,
    metrics: CacheMetrics,
    /// Last generation handed out, across all keys
    generation: u64,
    pending_writes: Vec<PendingWrite>,
    next_write: u64,
}

impl CacheState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn write_pending(&self, key: &QueryKey) -> bool {
        self.pending_writes
            .iter()
            .any(|write| write.invalidate.iter().any(|scope| scope.matches(key)))
    }

    fn lookup_entry(
        &self,
        key: &QueryKey,
        entry: Option<&CacheEntry>,
        stale_after: Duration,
    ) -> Lookup {
        let pending_write = self.write_pending(key);
        match entry {
            Some(entry) => Lookup {
                value: entry.value.clone(),
                error: entry.error.clone(),
                fresh: entry.is_fresh(key, stale_after),
                pending_write,
            },
            None => Lookup {
                value: None,
                error: None,
                fresh: false,
                pending_write,
            },
        }
    }
}

/// A write registered with [`QueryCache::begin_write`]. The write counts as
/// pending until the guard is dropped.
#[must_use = "dropping the guard ends the write"]
pub struct WriteGuard<'a> {
    cache: &'a QueryCache,
    id: u64,
}

impl WriteGuard<'_> {
    /// Invalidates the keys of the successful write and returns how many
    /// were affected.
    pub fn complete(self) -> usize {
        let scopes = self
            .cache
            .state
            .lock()
            .pending_writes
            .iter()
            .find(|write| write.id == self.id)
            .map(|write| write.invalidate.clone())
            .unwrap_or_default();
        self.cache.invalidate(&scopes)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.cache
            .state
            .lock()
            .pending_writes
            .retain(|write| write.id != self.id);
        self.cache.writes_done.notify_waiters();
    }
}

/// Query cache shared by every view of a session
pub struct QueryCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
    writes_done: Notify,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        info!(
            capacity = capacity.get(),
            stale_after_ms = config.stale_after.as_millis() as u64,
            "Creating query cache"
        );

        Self {
            config,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                last_rows: None,
                metrics: CacheMetrics::default(),
                generation: 0,
                pending_writes: Vec::new(),
                next_write: 0,
            }),
            writes_done: Notify::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up a key and records a hit or a miss.
    pub fn lookup(&self, key: &QueryKey) -> Lookup {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Touch the entry for recency before reading it
        state.entries.get(key);
        let lookup = state.lookup_entry(key, state.entries.peek(key), self.config.stale_after);

        if lookup.fresh {
            state.metrics.hits += 1;
        } else {
            state.metrics.misses += 1;
        }
        ClientMetrics::record_cache_lookup(key.kind().as_str(), lookup.fresh);
        lookup
    }

    /// Like [`Self::lookup`], without recording metrics or recency.
    pub fn inspect(&self, key: &QueryKey) -> Lookup {
        let state = self.state.lock();
        state.lookup_entry(key, state.entries.peek(key), self.config.stale_after)
    }

    /// Current value of a key without touching metrics or recency.
    pub fn peek(&self, key: &QueryKey) -> Option<CachedValue> {
        self.state
            .lock()
            .entries
            .peek(key)
            .and_then(|entry| entry.value.clone())
    }

    /// The most recently stored rows value, if placeholders are enabled.
    pub fn placeholder_rows(&self) -> Option<CachedValue> {
        if !self.config.keep_previous_rows {
            return None;
        }
        self.state.lock().last_rows.clone()
    }

    /// Starts a fetch for `key`.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let existing = state.entries.get(key).map(|entry| entry.generation);
        let generation = match existing {
            Some(generation) => generation,
            None => {
                let generation = state.next_generation();
                Self::insert(state, key.clone(), CacheEntry::empty(generation));
                generation
            }
        };

        debug!(kind = key.kind().as_str(), generation, "Fetch started");
        FetchTicket {
            key: key.clone(),
            generation,
        }
    }

    /// Completes a fetch. The result is stored only if the key was neither
    /// cancelled nor invalidated since [`Self::begin_fetch`]. A failed fetch
    /// keeps the previous value and records the error.
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: GraphResult<CachedValue>,
    ) -> FetchOutcome {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let kind = ticket.key.kind();

        let entry = match state.entries.get_mut(&ticket.key) {
            Some(entry) if entry.generation == ticket.generation => entry,
            _ => {
                state.metrics.discarded += 1;
                warn!(kind = kind.as_str(), "Discarding response of a superseded fetch");
                return FetchOutcome::Discarded(result);
            }
        };

        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.error = None;
                entry.invalidated = false;
                entry.fetched_at = Some(Instant::now());
                if kind == QueryKind::Rows {
                    state.last_rows = Some(value);
                }
                debug!(kind = kind.as_str(), "Fetch stored");
            }
            Err(error) => {
                debug!(kind = kind.as_str(), %error, "Fetch failed, keeping previous data");
                entry.error = Some(error);
            }
        }
        FetchOutcome::Stored
    }

    /// Cancels in-flight fetches of every key matched by `scopes`: their
    /// results will be discarded. Returns the number of keys affected.
    pub fn cancel(&self, scopes: &[KeyScope]) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut count = 0;
        for (key, entry) in state.entries.iter_mut() {
            if scopes.iter().any(|scope| scope.matches(key)) {
                state.generation += 1;
                entry.generation = state.generation;
                count += 1;
            }
        }
        state.metrics.cancellations += count as u64;
        count
    }

    /// Marks every key matched by `scopes` stale, so the next read refetches,
    /// and discards fetches already in flight for them. A key matched by
    /// several scopes is invalidated once. Returns the number of keys.
    pub fn invalidate(&self, scopes: &[KeyScope]) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut count = 0;
        for (key, entry) in state.entries.iter_mut() {
            if scopes.iter().any(|scope| scope.matches(key)) {
                entry.invalidated = true;
                state.generation += 1;
                entry.generation = state.generation;
                count += 1;
            }
        }
        state.metrics.invalidations += count as u64;
        debug!(keys = count, "Invalidated cache entries");
        count
    }

    /// Registers a write: cancels in-flight fetches matched by `cancel` and
    /// records `invalidate` as pending until the returned guard is dropped.
    /// Call [`WriteGuard::complete`] once the write succeeded.
    pub fn begin_write(&self, cancel: &[KeyScope], invalidate: &[KeyScope]) -> WriteGuard<'_> {
        let id = {
            let mut state = self.state.lock();
            state.next_write += 1;
            let id = state.next_write;
            state.pending_writes.push(PendingWrite {
                id,
                invalidate: invalidate.to_vec(),
            });
            id
        };
        self.cancel(cancel);
        WriteGuard { cache: self, id }
    }

    /// Whether a write that will invalidate `key` is in progress.
    pub fn write_pending(&self, key: &QueryKey) -> bool {
        self.state.lock().write_pending(key)
    }

    /// Waits until no write that will invalidate `key` is in progress.
    pub async fn wait_for_writes(&self, key: &QueryKey) {
        loop {
            // Created before the check so a write ending in between still wakes us
            let done = self.writes_done.notified();
            if !self.write_pending(key) {
                return;
            }
            debug!(kind = key.kind().as_str(), "Waiting for pending write");
            done.await;
        }
    }

    /// Whether `key` holds a value that must be refetched before it is served
    /// as fresh.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.state
            .lock()
            .entries
            .peek(key)
            .map(|entry| !entry.is_fresh(key, self.config.stale_after))
            .unwrap_or(true)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.last_rows = None;
    }

    pub fn metrics(&self) -> CacheMetrics {
        let state = self.state.lock();
        CacheMetrics {
            entries: state.entries.len(),
            ..state.metrics.clone()
        }
    }

    fn insert(state: &mut CacheState, key: QueryKey, entry: CacheEntry) {
        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if evicted != key {
                state.metrics.evictions += 1;
                debug!(kind = evicted.kind().as_str(), "Evicted cache entry");
            }
        }
    }
}
