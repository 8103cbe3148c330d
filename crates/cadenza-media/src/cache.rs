//! Decoded-audio buffer cache.
//!
//! One entry per clip id, holding the decoded buffer plus waveform peaks.
//! Concurrent loads for the same id share a single in-flight task; the
//! result (or failure) fans out to every waiter over a broadcast channel.
//! In-flight loads are cooperatively cancellable, and the cache evicts
//! least-recently-used entries once capacity is exceeded.
//!
//! Fetch and decode run on the blocking pool, never on the control path
//! that called `load`.

use crate::error::{Error, Result};
use crate::peaks::WaveformPeaks;
use crate::source::{DecodedAudio, MediaSource};
use cadenza_core::AtomicFlag;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Cache key. Clip identity, not source URL: two clips referencing the
/// same file still get one entry each only if they share an id.
pub type ClipId = String;

type LoadResult = Result<(Arc<DecodedAudio>, Arc<WaveformPeaks>)>;

struct CacheEntry {
    audio: Arc<DecodedAudio>,
    peaks: Arc<WaveformPeaks>,
    /// Monotonic access stamp, newer is larger. Drives LRU eviction.
    last_access: AtomicU64,
}

struct InFlight {
    cancel: Arc<AtomicFlag>,
    tx: broadcast::Sender<LoadResult>,
}

struct Inner {
    source: Arc<dyn MediaSource>,
    capacity: usize,
    entries: DashMap<ClipId, CacheEntry>,
    pending: DashMap<ClipId, InFlight>,
    stamp: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Clone)]
pub struct BufferCache {
    inner: Arc<Inner>,
}

impl BufferCache {
    pub fn new(source: Arc<dyn MediaSource>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                capacity: capacity.max(1),
                entries: DashMap::new(),
                pending: DashMap::new(),
                stamp: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Load and decode the clip's audio, or return the cached buffer.
    ///
    /// Concurrency-safe and idempotent: while a load for `clip_id` is in
    /// flight, further callers wait on the same task and receive its
    /// result, including its failure. Cancellation surfaces to every
    /// waiter as [`Error::Cancelled`].
    pub async fn load(&self, clip_id: &str, url: &str) -> Result<Arc<DecodedAudio>> {
        loop {
            if let Some(entry) = self.inner.entries.get(clip_id) {
                self.touch(&entry);
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.audio.clone());
            }

            // Claim the load or join the one in flight. Subscribing while
            // the pending slot is held guarantees we cannot miss the send.
            let mut rx = match self.inner.pending.entry(clip_id.to_string()) {
                Entry::Occupied(occupied) => occupied.get().tx.subscribe(),
                Entry::Vacant(vacant) => {
                    let (tx, _) = broadcast::channel(1);
                    let cancel = Arc::new(AtomicFlag::new(false));
                    vacant.insert(InFlight {
                        cancel: cancel.clone(),
                        tx: tx.clone(),
                    });
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);

                    let result = self.fetch_and_decode(clip_id, url, cancel).await;
                    if let Ok((audio, peaks)) = &result {
                        self.insert(clip_id, audio.clone(), peaks.clone());
                    }
                    // Publish order matters: cache first, then free the
                    // pending slot, then wake waiters.
                    self.inner.pending.remove(clip_id);
                    let _ = tx.send(result.clone());
                    return result.map(|(audio, _)| audio);
                }
            };

            match rx.recv().await {
                Ok(result) => return result.map(|(audio, _)| audio),
                // Loader finished before we subscribed was ruled out above,
                // but the channel can close if the loader future is dropped
                // mid-flight. Re-check the cache and retry.
                Err(_) => continue,
            }
        }
    }

    async fn fetch_and_decode(
        &self,
        clip_id: &str,
        url: &str,
        cancel: Arc<AtomicFlag>,
    ) -> LoadResult {
        debug!(clip_id, url, "loading clip audio");
        let source = self.inner.source.clone();
        let url_owned = url.to_string();
        let task = tokio::task::spawn_blocking(move || -> LoadResult {
            if cancel.get() {
                return Err(Error::Cancelled);
            }
            let bytes = source.fetch(&url_owned)?;
            if cancel.get() {
                return Err(Error::Cancelled);
            }
            let audio = DecodedAudio::from_wav_bytes(&url_owned, &bytes)?;
            if cancel.get() {
                return Err(Error::Cancelled);
            }
            let peaks = WaveformPeaks::from_audio(&audio);
            Ok((Arc::new(audio), Arc::new(peaks)))
        });

        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(Error::fetch(url, join_err)),
        };
        if let Err(err) = &result {
            warn!(clip_id, %err, "clip load failed");
        }
        result
    }

    fn insert(&self, clip_id: &str, audio: Arc<DecodedAudio>, peaks: Arc<WaveformPeaks>) {
        let stamp = self.next_stamp();
        self.inner.entries.insert(
            clip_id.to_string(),
            CacheEntry {
                audio,
                peaks,
                last_access: AtomicU64::new(stamp),
            },
        );
        self.evict_over_capacity();
    }

    fn evict_over_capacity(&self) {
        while self.inner.entries.len() > self.inner.capacity {
            let oldest = self
                .inner
                .entries
                .iter()
                .min_by_key(|e| e.last_access.load(Ordering::Relaxed))
                .map(|e| e.key().clone());
            let Some(key) = oldest else { break };
            if self.inner.entries.remove(&key).is_some() {
                self.inner.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(clip_id = %key, "evicted LRU cache entry");
            }
        }
    }

    /// Request cancellation of an in-flight load. Returns whether a load
    /// was pending. Cooperative: the task observes the flag at its next
    /// stage boundary and never caches a partial result.
    pub fn cancel(&self, clip_id: &str) -> bool {
        match self.inner.pending.get(clip_id) {
            Some(in_flight) => {
                in_flight.cancel.set(true);
                true
            }
            None => false,
        }
    }

    /// Waveform peaks for a cached clip, or `None` if it has not finished
    /// loading. Counts as an access for LRU purposes.
    pub fn get(&self, clip_id: &str) -> Option<Arc<WaveformPeaks>> {
        let entry = self.inner.entries.get(clip_id)?;
        self.touch(&entry);
        Some(entry.peaks.clone())
    }

    /// Cached decoded audio, if present. Counts as an access.
    pub fn get_audio(&self, clip_id: &str) -> Option<Arc<DecodedAudio>> {
        let entry = self.inner.entries.get(clip_id)?;
        self.touch(&entry);
        Some(entry.audio.clone())
    }

    pub fn contains(&self, clip_id: &str) -> bool {
        self.inner.entries.contains_key(clip_id)
    }

    pub fn remove(&self, clip_id: &str) -> bool {
        self.inner.entries.remove(clip_id).is_some()
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entries.len(),
            capacity: self.inner.capacity,
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
        }
    }

    fn next_stamp(&self) -> u64 {
        self.inner.stamp.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn touch(&self, entry: &CacheEntry) {
        entry
            .last_access
            .store(self.next_stamp(), Ordering::Relaxed);
    }
}
