//! Cache store: one entry per (endpoint, args) pair, a tag index for
//! invalidation fan-out, and generation tracking for stale-response
//! rejection. All methods are synchronous state transitions; the
//! runtime loop is the only writer.

use hashbrown::{HashMap, HashSet};
use serde_json::Value;

use crate::{
    endpoint::CacheKey,
    transport::ApiError,
    types::{FetchGen, Tag},
};

/// Cache store failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    /// No entry exists for the key.
    MissingEntry(CacheKey),
}

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryStatus {
    /// Created but never fetched.
    #[default]
    Uninitialized,
    /// First fetch in flight, no data yet.
    Loading,
    /// Holds data from the latest applied response.
    Success,
    /// Latest applied response was an error.
    Error,
}

/// Snapshot of one entry as published to subscription handles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryView {
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Latest applied data. Survives revalidation and later errors
    /// (stale-while-revalidate).
    pub data: Option<Value>,
    /// Latest applied error, cleared on success.
    pub error: Option<ApiError>,
    /// True while any request for this entry is in flight.
    pub is_fetching: bool,
    /// Milliseconds since epoch of the latest successful response.
    pub last_fetched_at: Option<u64>,
}

/// What a new subscription found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Entry freshly created; caller must start the first fetch.
    FirstSubscriber,
    /// Entry was lazily invalidated while unobserved; caller must
    /// refetch.
    NeedsRefetch,
    /// A request is already in flight; joiner shares its result.
    InFlight,
    /// Entry holds current data; nothing to do.
    Fresh,
}

/// What happened to a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response applied to the entry.
    Applied,
    /// Response was for a superseded generation and was discarded.
    StaleDropped,
    /// Entry was garbage-collected before the response landed.
    EntryGone,
}

/// Invalidation fan-out computed by [`CacheStore::invalidate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvalidationPlan {
    /// Subscribed entries the caller must refetch now.
    pub refetch: Vec<CacheKey>,
    /// Unobserved entries only marked stale, refetched on resubscribe.
    pub marked_stale: usize,
}

#[derive(Debug, Default)]
struct CacheEntry {
    status: EntryStatus,
    data: Option<Value>,
    error: Option<ApiError>,
    last_fetched_at: Option<u64>,
    subscriber_count: usize,
    tags: Vec<Tag>,
    generation: FetchGen,
    in_flight: bool,
    stale: bool,
    released_at: Option<u64>,
}

impl CacheEntry {
    fn view(&self) -> EntryView {
        EntryView {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight,
            last_fetched_at: self.last_fetched_at,
        }
    }
}

/// All cache state, keyed by (endpoint, serialized args).
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
    by_tag: HashMap<Tag, HashSet<CacheKey>>,
    // Store-wide so a collected-and-recreated entry never reuses a
    // generation still carried by an in-flight request.
    next_generation: FetchGen,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, GC'd ones excluded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers one subscriber on `key`, creating the entry with its
    /// provided-tag snapshot on first subscription.
    pub fn subscribe(&mut self, key: &CacheKey, tags: &[Tag]) -> SubscribeOutcome {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.subscriber_count += 1;
            entry.released_at = None;
            if entry.in_flight {
                return SubscribeOutcome::InFlight;
            }
            if entry.stale || entry.status == EntryStatus::Uninitialized {
                return SubscribeOutcome::NeedsRefetch;
            }
            return SubscribeOutcome::Fresh;
        }

        let entry = CacheEntry {
            subscriber_count: 1,
            tags: tags.to_vec(),
            ..CacheEntry::default()
        };
        for tag in tags {
            self.by_tag.entry(*tag).or_default().insert(key.clone());
        }
        self.entries.insert(key.clone(), entry);
        SubscribeOutcome::FirstSubscriber
    }

    /// Drops one subscriber. At zero the entry stays resident but is
    /// stamped for grace-period collection.
    pub fn unsubscribe(&mut self, key: &CacheKey, now_ms: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
            if entry.subscriber_count == 0 {
                entry.released_at = Some(now_ms);
            }
        }
    }

    /// Starts a request for `key` and returns its generation, drawn from
    /// a store-wide monotonic counter. The first fetch transitions to
    /// Loading; revalidations keep prior data visible and only raise
    /// `is_fetching`.
    pub fn begin_fetch(&mut self, key: &CacheKey) -> Result<FetchGen, CacheError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::MissingEntry(key.clone()))?;

        self.next_generation += 1;
        entry.generation = self.next_generation;
        entry.in_flight = true;
        if entry.data.is_none() {
            entry.status = EntryStatus::Loading;
        }
        Ok(entry.generation)
    }

    /// Applies a completed response for `generation`. Responses from a
    /// superseded generation are discarded so an out-of-order network
    /// never overwrites newer data.
    pub fn complete_fetch(
        &mut self,
        key: &CacheKey,
        generation: FetchGen,
        result: Result<Value, ApiError>,
        now_ms: u64,
    ) -> FetchOutcome {
        let Some(entry) = self.entries.get_mut(key) else {
            return FetchOutcome::EntryGone;
        };

        if generation != entry.generation {
            return FetchOutcome::StaleDropped;
        }

        entry.in_flight = false;
        match result {
            Ok(data) => {
                entry.status = EntryStatus::Success;
                entry.data = Some(data);
                entry.error = None;
                entry.last_fetched_at = Some(now_ms);
                entry.stale = false;
            }
            Err(err) => {
                entry.status = EntryStatus::Error;
                entry.error = Some(err);
            }
        }
        FetchOutcome::Applied
    }

    /// Plans the fan-out for a successful mutation: subscribed entries
    /// whose tag snapshot intersects `tags` must refetch; unobserved
    /// ones are marked stale and refetched only if resubscribed.
    pub fn invalidate(&mut self, tags: &[Tag]) -> InvalidationPlan {
        let mut touched: HashSet<CacheKey> = HashSet::new();
        for tag in tags {
            if let Some(keys) = self.by_tag.get(tag) {
                touched.extend(keys.iter().cloned());
            }
        }

        let mut plan = InvalidationPlan::default();
        for key in touched {
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            if entry.subscriber_count > 0 {
                plan.refetch.push(key);
            } else {
                entry.stale = true;
                plan.marked_stale += 1;
            }
        }
        plan
    }

    /// Keys to refetch on a window-refocus or reconnect signal: every
    /// subscribed, already-initialized entry without an in-flight
    /// request.
    pub fn keys_to_refetch_on_signal(&self) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(_, e)| {
                e.subscriber_count > 0 && !e.in_flight && e.status != EntryStatus::Uninitialized
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Removes zero-subscriber entries whose grace period has elapsed
    /// and returns their keys. Responses arriving for removed entries
    /// read as [`FetchOutcome::EntryGone`].
    pub fn collect_garbage(&mut self, now_ms: u64, grace_ms: u64) -> Vec<CacheKey> {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.subscriber_count == 0
                    && e.released_at
                        .is_some_and(|at| now_ms >= at.saturating_add(grace_ms))
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in &doomed {
            if let Some(entry) = self.entries.remove(key) {
                for tag in &entry.tags {
                    if let Some(keys) = self.by_tag.get_mut(tag) {
                        keys.remove(key);
                        if keys.is_empty() {
                            self.by_tag.remove(tag);
                        }
                    }
                }
            }
        }
        doomed
    }

    /// Snapshot of one entry for publication to subscribers.
    pub fn view(&self, key: &CacheKey) -> Option<EntryView> {
        self.entries.get(key).map(CacheEntry::view)
    }

    /// Current subscriber count for `key`; zero when absent.
    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.entries.get(key).map_or(0, |e| e.subscriber_count)
    }

    /// Current generation for `key`; zero when absent or never fetched.
    pub fn generation(&self, key: &CacheKey) -> FetchGen {
        self.entries.get(key).map_or(0, |e| e.generation)
    }

    /// True when the entry is lazily marked stale.
    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.stale)
    }
}
