//! Reverb impulse response library.
//!
//! Named impulses are fetched and decoded through the same [`MediaSource`]
//! seam as clip audio, with the same in-flight dedup. Loading never fails:
//! when the named resource is missing or undecodable the library falls
//! back to a synthetic stereo impulse of exponentially decaying white
//! noise, cached under a synthetic key so repeated fallbacks are free.

use crate::source::{DecodedAudio, MediaSource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Stereo impulse response at the engine sample rate.
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    pub sample_rate: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    pub fn frames(&self) -> usize {
        self.left.len()
    }
}

struct Inner {
    source: Arc<dyn MediaSource>,
    sample_rate: f64,
    entries: DashMap<String, Arc<ImpulseResponse>>,
    pending: DashMap<String, broadcast::Sender<Arc<ImpulseResponse>>>,
}

#[derive(Clone)]
pub struct ImpulseResponseLibrary {
    inner: Arc<Inner>,
}

/// Fallback impulse dimensions when a named resource cannot be loaded.
const FALLBACK_DURATION_SECS: f64 = 2.0;
const FALLBACK_DECAY_SECS: f64 = 1.2;

impl ImpulseResponseLibrary {
    pub fn new(source: Arc<dyn MediaSource>, sample_rate: f64) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                sample_rate,
                entries: DashMap::new(),
                pending: DashMap::new(),
            }),
        }
    }

    /// Fetch and decode the named impulse, or return the cached copy.
    /// Infallible: failures fall back to [`generate`](Self::generate) with
    /// default dimensions. The fallback is cached under its synthetic key,
    /// never under the requested id, so a later retry can still find the
    /// real resource.
    pub async fn load(&self, id: &str) -> Arc<ImpulseResponse> {
        loop {
            if let Some(entry) = self.inner.entries.get(id) {
                return entry.clone();
            }

            let mut rx = match self.inner.pending.entry(id.to_string()) {
                Entry::Occupied(occupied) => occupied.get().subscribe(),
                Entry::Vacant(vacant) => {
                    let (tx, _) = broadcast::channel(1);
                    vacant.insert(tx.clone());

                    let impulse = match self.fetch_and_decode(id).await {
                        Some(impulse) => {
                            self.inner.entries.insert(id.to_string(), impulse.clone());
                            impulse
                        }
                        None => self.generate(FALLBACK_DURATION_SECS, FALLBACK_DECAY_SECS),
                    };
                    self.inner.pending.remove(id);
                    let _ = tx.send(impulse.clone());
                    return impulse;
                }
            };

            match rx.recv().await {
                Ok(impulse) => return impulse,
                Err(_) => continue,
            }
        }
    }

    async fn fetch_and_decode(&self, id: &str) -> Option<Arc<ImpulseResponse>> {
        let source = self.inner.source.clone();
        let url = id.to_string();
        let task = tokio::task::spawn_blocking(move || {
            let bytes = source.fetch(&url)?;
            DecodedAudio::from_wav_bytes(&url, &bytes)
        });
        match task.await {
            Ok(Ok(audio)) => {
                debug!(id, frames = audio.frames(), "loaded impulse response");
                Some(Arc::new(ImpulseResponse {
                    sample_rate: audio.sample_rate,
                    left: audio.left,
                    right: audio.right,
                }))
            }
            Ok(Err(err)) => {
                warn!(id, %err, "impulse load failed, using generated fallback");
                None
            }
            Err(err) => {
                warn!(id, %err, "impulse load task failed, using generated fallback");
                None
            }
        }
    }

    /// Synthesize a stereo impulse: white noise under an exponential decay
    /// envelope, channels drawn independently for stereo width. Cached by
    /// its dimensions.
    pub fn generate(&self, duration_secs: f64, decay_secs: f64) -> Arc<ImpulseResponse> {
        let key = format!("generated:{duration_secs:.3}:{decay_secs:.3}");
        if let Some(entry) = self.inner.entries.get(&key) {
            return entry.clone();
        }

        let sample_rate = self.inner.sample_rate;
        let frames = ((duration_secs.max(0.01)) * sample_rate) as usize;
        let decay = decay_secs.max(0.01) * sample_rate;
        let mut rng = rand::thread_rng();
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for n in 0..frames {
            let envelope = (-(n as f64) / decay).exp() as f32;
            left.push(rng.gen_range(-1.0..1.0) * envelope);
            right.push(rng.gen_range(-1.0..1.0) * envelope);
        }

        let impulse = Arc::new(ImpulseResponse {
            sample_rate,
            left,
            right,
        });
        self.inner.entries.insert(key, impulse.clone());
        impulse
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.entries.contains_key(id)
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }
}
