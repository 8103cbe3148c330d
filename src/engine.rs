//! The top-level engine coordinator.
//!
//! Owns the processing clock, buffer cache, impulse library, latency
//! accounting, and the per-track/bus/master processing graph. Explicitly
//! constructed and explicitly owned: nothing here is process-global, so
//! tests run as many isolated engines as they like.
//!
//! The engine may be constructed before its processing context is allowed
//! to run (gesture-gated platforms). Configuration arriving before
//! readiness lands in the graph immediately and is never dropped; only
//! rendering and playback wait for [`ensure_ready`] to unlock.
//!
//! [`ensure_ready`]: AudioGraphEngine::ensure_ready

use crate::bus::BusRouter;
use crate::chain::{
    CompressorParams, EffectType, EqParams, GateParams, LimiterParams, ReverbParams,
    TrackEffectsChain,
};
use crate::master::MasterChain;
use crate::model::{AudioClip, BusConfig, TrackConfig};
use crate::transport::{TransportScheduler, TransportState};
use crate::{Error, Result};
use cadenza_core::{
    DeviceLatency, EngineConfig, LatencyCompensationUnit, LatencyReport, LevelSnapshot,
    ReadinessGate, RenderClock,
};
use cadenza_media::{
    BufferCache, DecodedAudio, ImpulseResponseLibrary, MediaSource, WaveformPeaks,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct TrackState {
    config: TrackConfig,
    clips: Vec<AudioClip>,
    chain: TrackEffectsChain,
}

struct EngineState {
    ready: bool,
    tracks: HashMap<String, TrackState>,
    /// Insertion order, for deterministic mixing.
    track_order: Vec<String>,
    router: BusRouter,
    master: MasterChain,
    transport: TransportScheduler,

    // Render scratch, sized to one block.
    track_l: Vec<f32>,
    track_r: Vec<f32>,
    master_l: Vec<f32>,
    master_r: Vec<f32>,
}

pub struct AudioGraphEngine {
    config: EngineConfig,
    clock: Arc<RenderClock>,
    cache: BufferCache,
    impulses: ImpulseResponseLibrary,
    latency: LatencyCompensationUnit,
    gate: Arc<dyn ReadinessGate>,
    state: Mutex<EngineState>,
}

impl AudioGraphEngine {
    pub fn builder() -> crate::AudioGraphEngineBuilder {
        crate::AudioGraphEngineBuilder::default()
    }

    pub(crate) fn new(
        config: EngineConfig,
        source: Arc<dyn MediaSource>,
        gate: Arc<dyn ReadinessGate>,
    ) -> Result<Self> {
        config.validate()?;

        let latency = LatencyCompensationUnit::new();
        latency.recompute(&DeviceLatency {
            input_seconds: None,
            output_seconds: None,
            buffer_frames: config.block_size,
            sample_rate: config.sample_rate,
        });

        let engine = Self {
            clock: Arc::new(RenderClock::new(config.sample_rate)),
            cache: BufferCache::new(source.clone(), config.cache_capacity),
            impulses: ImpulseResponseLibrary::new(source, config.sample_rate),
            latency,
            gate,
            state: Mutex::new(EngineState {
                ready: false,
                tracks: HashMap::new(),
                track_order: Vec::new(),
                router: BusRouter::new(
                    config.sample_rate,
                    config.block_size,
                    config.smoothing_secs,
                ),
                master: MasterChain::new(config.sample_rate, config.smoothing_secs),
                transport: TransportScheduler::new(config.sample_rate),
                track_l: vec![0.0; config.block_size],
                track_r: vec![0.0; config.block_size],
                master_l: vec![0.0; config.block_size],
                master_r: vec![0.0; config.block_size],
            }),
            config,
        };
        // Ungated platforms come up ready immediately.
        engine.ensure_ready();
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn clock(&self) -> &Arc<RenderClock> {
        &self.clock
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Re-attempt to bring the processing context to a running state. Safe
    /// to call repeatedly; returns current readiness. Graph configuration
    /// made while gated is already in place, so unlocking only opens the
    /// render and playback paths.
    pub fn ensure_ready(&self) -> bool {
        let mut state = self.state.lock();
        self.ensure_ready_locked(&mut state)
    }

    fn ensure_ready_locked(&self, state: &mut EngineState) -> bool {
        if state.ready {
            return true;
        }
        if !self.gate.try_unlock() {
            return false;
        }
        state.ready = true;
        info!(
            tracks = state.track_order.len(),
            buses = state.router.len(),
            "processing context ready"
        );
        true
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Tear down every track, bus, and master node, clear all caches, and
    /// reset the clock. The engine can come back up empty through
    /// [`ensure_ready`](Self::ensure_ready).
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        state.transport.stop();
        state.tracks.clear();
        state.track_order.clear();
        state.router = BusRouter::new(
            self.config.sample_rate,
            self.config.block_size,
            self.config.smoothing_secs,
        );
        state.master = MasterChain::new(self.config.sample_rate, self.config.smoothing_secs);
        state.ready = false;
        drop(state);

        self.cache.clear();
        self.impulses.clear();
        self.clock.reset();
        info!("engine disposed");
    }

    // -------------------------------------------------------------------
    // Track and bus CRUD
    // -------------------------------------------------------------------

    /// Create a track with its processing chain. Usable before readiness;
    /// the chain simply sits idle until rendering starts.
    pub fn create_track(&self, config: TrackConfig) {
        let mut state = self.state.lock();
        if state.tracks.len() >= self.config.max_tracks {
            warn!(
                track_id = %config.id,
                max = self.config.max_tracks,
                "track limit exceeded"
            );
        }

        // Resolve the routing target up front so a bad bus id warns once
        // here rather than on the render path.
        state.router.resolve(config.bus_id.as_deref());

        let chain = TrackEffectsChain::new(
            self.config.sample_rate,
            self.config.block_size,
            self.config.smoothing_secs,
            &config,
        );
        let id = config.id.clone();
        if !state.tracks.contains_key(&id) {
            state.track_order.push(id.clone());
        }
        state.tracks.insert(
            id,
            TrackState {
                config,
                clips: Vec::new(),
                chain,
            },
        );
        Self::resolve_mute_solo(&mut state);
    }

    /// Remove a track: stops its scheduled sources, drops its chain, and
    /// purges its clips from the buffer cache.
    pub fn remove_track(&self, track_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let track = state
            .tracks
            .remove(track_id)
            .ok_or_else(|| Error::UnknownTrack(track_id.to_string()))?;
        state.track_order.retain(|id| id != track_id);
        state.transport.remove_track(track_id);
        self.latency
            .set_effect_latency(&limiter_latency_key(track_id), 0.0);
        drop(state);

        for clip in &track.clips {
            self.cache.remove(&clip.id);
        }
        debug!(track_id, "track removed");
        Ok(())
    }

    pub fn create_bus(&self, config: BusConfig) {
        let mut state = self.state.lock();
        state.router.create_bus(&config);
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.state.lock().track_order.clone()
    }

    pub fn track_config(&self, track_id: &str) -> Result<TrackConfig> {
        let state = self.state.lock();
        state
            .tracks
            .get(track_id)
            .map(|t| t.config.clone())
            .ok_or_else(|| Error::UnknownTrack(track_id.to_string()))
    }

    pub fn set_track_gain(&self, track_id: &str, gain: f32) -> Result<()> {
        self.with_track(track_id, |track| {
            track.config.gain = gain.max(0.0);
            track.chain.set_gain(gain);
        })
    }

    pub fn set_track_pan(&self, track_id: &str, pan: f32) -> Result<()> {
        self.with_track(track_id, |track| {
            track.config.pan = pan.clamp(-1.0, 1.0);
            track.chain.set_pan(pan);
        })
    }

    /// Mute or unmute a track. Applies retroactively to the running pass
    /// as a ramped gain; no rescheduling happens.
    pub fn set_track_muted(&self, track_id: &str, muted: bool) -> Result<()> {
        let mut state = self.state.lock();
        state
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| Error::UnknownTrack(track_id.to_string()))?
            .config
            .muted = muted;
        Self::resolve_mute_solo(&mut state);
        Ok(())
    }

    /// Solo or unsolo a track; resolution is engine-wide.
    pub fn set_track_solo(&self, track_id: &str, solo: bool) -> Result<()> {
        let mut state = self.state.lock();
        state
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| Error::UnknownTrack(track_id.to_string()))?
            .config
            .solo = solo;
        Self::resolve_mute_solo(&mut state);
        Ok(())
    }

    pub fn set_bus_muted(&self, bus_id: &str, muted: bool) -> Result<()> {
        let mut state = self.state.lock();
        state
            .router
            .bus_mut(bus_id)
            .ok_or_else(|| Error::UnknownBus(bus_id.to_string()))?
            .set_muted(muted);
        state.router.apply_mute_solo();
        Ok(())
    }

    pub fn set_bus_solo(&self, bus_id: &str, solo: bool) -> Result<()> {
        let mut state = self.state.lock();
        state
            .router
            .bus_mut(bus_id)
            .ok_or_else(|| Error::UnknownBus(bus_id.to_string()))?
            .set_solo(solo);
        state.router.apply_mute_solo();
        Ok(())
    }

    /// Engine-wide mute/solo policy: with any solo active, every non-solo
    /// track is silent. Applied through each chain's ramped input gain.
    fn resolve_mute_solo(state: &mut EngineState) {
        let has_solo = state.tracks.values().any(|t| t.config.solo);
        for track in state.tracks.values_mut() {
            let muted = track.config.muted || (has_solo && !track.config.solo);
            track.chain.set_playback_muted(muted);
        }
    }

    fn with_track<R>(&self, track_id: &str, f: impl FnOnce(&mut TrackState) -> R) -> Result<R> {
        let mut state = self.state.lock();
        let track = state
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| Error::UnknownTrack(track_id.to_string()))?;
        Ok(f(track))
    }

    fn with_chain<R>(
        &self,
        track_id: &str,
        f: impl FnOnce(&mut TrackEffectsChain) -> R,
    ) -> Result<R> {
        self.with_track(track_id, |track| f(&mut track.chain))
    }

    // -------------------------------------------------------------------
    // Clips
    // -------------------------------------------------------------------

    /// Replace a track's clip list. Pure data; decoding happens at play
    /// time or through [`load_track`](Self::load_track).
    pub fn add_clips_to_track(&self, track_id: &str, clips: Vec<AudioClip>) -> Result<()> {
        self.with_track(track_id, |track| track.clips = clips)
    }

    pub fn get_track_clips(&self, track_id: &str) -> Result<Vec<AudioClip>> {
        self.with_track(track_id, |track| track.clips.clone())
    }

    /// Record clips and preload every referenced buffer. Every load is
    /// attempted; the first failure is returned after all loads settle.
    pub async fn load_track(&self, track_id: &str, clips: Vec<AudioClip>) -> Result<()> {
        self.add_clips_to_track(track_id, clips.clone())?;
        let mut first_err = None;
        for clip in clips {
            match self.cache.load(&clip.id, &clip.source_url).await {
                Ok(audio) => self.populate_clip_duration(track_id, &clip.id, &audio),
                Err(err) => {
                    warn!(clip_id = %clip.id, %err, "preload failed");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Fill in a lazily-populated clip duration once its buffer decoded.
    fn populate_clip_duration(&self, track_id: &str, clip_id: &str, audio: &DecodedAudio) {
        let mut state = self.state.lock();
        if let Some(track) = state.tracks.get_mut(track_id) {
            for clip in track.clips.iter_mut() {
                if clip.id == clip_id && clip.duration.is_none() {
                    clip.duration = Some((audio.duration_seconds() - clip.offset).max(0.0));
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------

    /// Start playback at `start_position` seconds, or resume from the
    /// paused position. Stops any currently scheduled sources, resolves
    /// mute/solo, loads every playable clip's buffer, and schedules the
    /// pass. Per-clip load failures are logged and skipped; sibling clips
    /// still play.
    pub async fn play(&self, start_position: Option<f64>) -> Result<()> {
        let (start, jobs) = {
            let mut state = self.state.lock();
            if !self.ensure_ready_locked(&mut state) {
                return Err(Error::NotReady);
            }
            let start = start_position
                .unwrap_or_else(|| state.transport.resume_position())
                .max(0.0);

            Self::resolve_mute_solo(&mut state);
            state.router.apply_mute_solo();

            let has_solo = state.tracks.values().any(|t| t.config.solo);
            let mut jobs: Vec<(String, AudioClip)> = Vec::new();
            for id in &state.track_order {
                let Some(track) = state.tracks.get(id) else { continue };
                let should_play = !track.config.muted && (!has_solo || track.config.solo);
                if !should_play {
                    continue;
                }
                for clip in &track.clips {
                    jobs.push((id.clone(), clip.clone()));
                }
            }
            (start, jobs)
        };

        // Loads and impulse resolution happen outside the state lock.
        let mut loaded: Vec<(String, AudioClip, Arc<DecodedAudio>)> = Vec::new();
        for (track_id, clip) in jobs {
            match self.cache.load(&clip.id, &clip.source_url).await {
                Ok(audio) => {
                    self.populate_clip_duration(&track_id, &clip.id, &audio);
                    loaded.push((track_id, clip, audio));
                }
                Err(err) => {
                    warn!(clip_id = %clip.id, track_id, %err, "clip load failed, skipping");
                }
            }
        }
        self.prepare_reverbs().await;

        let mut state = self.state.lock();
        let now = self.clock.now_samples();
        state.transport.begin_pass(now, start);
        for (track_id, mut clip, audio) in loaded {
            if clip.duration.is_none() {
                clip.duration = Some((audio.duration_seconds() - clip.offset).max(0.0));
            }
            if let Some(scheduled) = state
                .transport
                .place_clip(now, start, &track_id, audio, &clip)
            {
                state.transport.schedule(scheduled);
            }
        }
        debug!(
            start,
            scheduled = state.transport.scheduled_len(),
            "playback scheduled"
        );
        Ok(())
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        state.transport.pause(self.clock.now_samples());
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.transport.stop();
    }

    /// Current timeline position in seconds.
    pub fn current_time(&self) -> f64 {
        let state = self.state.lock();
        state.transport.position(self.clock.now_samples())
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().transport.is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.state.lock().transport.state()
    }

    /// Load impulse responses for every chain that flagged a reverb
    /// change since the last pass.
    async fn prepare_reverbs(&self) {
        let wanted: Vec<(String, Option<String>, f64)> = {
            let mut state = self.state.lock();
            let mut wanted = Vec::new();
            for (id, track) in state.tracks.iter_mut() {
                if track.chain.take_ir_dirty() {
                    let params = track.chain.reverb_params();
                    wanted.push((
                        id.clone(),
                        params.impulse_response_id.clone(),
                        params.decay_seconds,
                    ));
                }
            }
            wanted
        };

        for (track_id, ir_id, decay) in wanted {
            let impulse = match ir_id {
                Some(id) => self.impulses.load(&id).await,
                None => {
                    let decay = decay.max(0.1);
                    self.impulses.generate(decay * 2.0, decay)
                }
            };
            let mut state = self.state.lock();
            if let Some(track) = state.tracks.get_mut(&track_id) {
                if let Err(err) = track.chain.set_reverb_impulse(&impulse) {
                    warn!(track_id = %track_id, %err, "impulse install failed");
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Effect parameters
    // -------------------------------------------------------------------

    pub fn update_track_eq(&self, track_id: &str, f: impl FnOnce(&mut EqParams)) -> Result<()> {
        self.with_chain(track_id, |chain| chain.update_eq(f))?;
        Ok(())
    }

    pub fn update_track_compressor(
        &self,
        track_id: &str,
        f: impl FnOnce(&mut CompressorParams),
    ) -> Result<()> {
        self.with_chain(track_id, |chain| chain.update_compressor(f))?;
        Ok(())
    }

    pub fn update_track_gate(
        &self,
        track_id: &str,
        f: impl FnOnce(&mut GateParams),
    ) -> Result<()> {
        self.with_chain(track_id, |chain| chain.update_gate(f))?;
        Ok(())
    }

    /// Update the limiter; its lookahead feeds latency compensation.
    pub fn update_track_limiter(
        &self,
        track_id: &str,
        f: impl FnOnce(&mut LimiterParams),
    ) -> Result<()> {
        let lookahead = self.with_chain(track_id, |chain| {
            chain.update_limiter(f);
            chain.limiter_lookahead_secs()
        })?;
        self.latency
            .set_effect_latency(&limiter_latency_key(track_id), lookahead);
        Ok(())
    }

    /// Update the reverb send. A changed impulse selection is resolved on
    /// the next `play()` pass.
    pub fn update_track_reverb(
        &self,
        track_id: &str,
        f: impl FnOnce(&mut ReverbParams),
    ) -> Result<()> {
        self.with_chain(track_id, |chain| chain.update_reverb(f))?;
        Ok(())
    }

    pub fn enable_effect(
        &self,
        track_id: &str,
        effect: EffectType,
        enabled: bool,
    ) -> Result<()> {
        self.with_chain(track_id, |chain| chain.enable_effect(effect, enabled))?;
        Ok(())
    }

    /// Smooth-ramped master volume.
    pub fn set_master_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        state.master.set_volume(volume);
    }

    // -------------------------------------------------------------------
    // Metering and analysis
    // -------------------------------------------------------------------

    /// Post-dynamics track level in dBFS.
    pub fn track_level(&self, track_id: &str) -> Result<LevelSnapshot> {
        self.with_chain(track_id, |chain| chain.level())
    }

    pub fn bus_level(&self, bus_id: &str) -> Result<LevelSnapshot> {
        let state = self.state.lock();
        state
            .router
            .bus(bus_id)
            .map(|b| b.level())
            .ok_or_else(|| Error::UnknownBus(bus_id.to_string()))
    }

    pub fn master_level(&self) -> LevelSnapshot {
        self.state.lock().master.level()
    }

    /// Multi-resolution waveform peaks for a decoded clip, if cached.
    pub fn waveform_data(&self, clip_id: &str) -> Option<Arc<WaveformPeaks>> {
        self.cache.get(clip_id)
    }

    pub fn cache_stats(&self) -> cadenza_media::CacheStats {
        self.cache.stats()
    }

    // -------------------------------------------------------------------
    // Latency and limits
    // -------------------------------------------------------------------

    pub fn latency_ms(&self) -> f64 {
        self.latency.total_ms()
    }

    pub fn latency_report(&self) -> LatencyReport {
        self.latency.report()
    }

    /// Shift a punch-in position back by the round-trip latency.
    pub fn compensate(&self, start_position: f64) -> f64 {
        self.latency.compensate(start_position)
    }

    /// Update device latency figures (device change, buffer resize).
    pub fn recompute_latency(&self, device: &DeviceLatency) {
        self.latency.recompute(device);
    }

    pub fn max_tracks(&self) -> usize {
        self.config.max_tracks
    }

    pub fn is_within_track_limits(&self) -> bool {
        self.state.lock().tracks.len() <= self.config.max_tracks
    }

    // -------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------

    /// Render one stereo buffer, driving the whole graph: scheduled clips
    /// -> track chains -> buses -> master. Chunks the request by the
    /// configured block size and advances the clock. Called by the device
    /// callback, or directly when the host owns the output.
    pub fn render(&self, left: &mut [f32], right: &mut [f32]) {
        let total = left.len().min(right.len());
        let mut offset = 0;
        while offset < total {
            let frames = (total - offset).min(self.config.block_size);
            self.render_block(
                &mut left[offset..offset + frames],
                &mut right[offset..offset + frames],
            );
            offset += frames;
        }
    }

    fn render_block(&self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len();
        left.fill(0.0);
        right.fill(0.0);

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.ready {
            self.clock.advance(frames);
            return;
        }
        let now = self.clock.now_samples();

        for bus in state.router.buses_mut() {
            bus.clear_input();
        }

        for id in &state.track_order {
            let Some(track) = state.tracks.get_mut(id) else { continue };

            let track_l = &mut state.track_l[..frames];
            let track_r = &mut state.track_r[..frames];
            track_l.fill(0.0);
            track_r.fill(0.0);
            state.transport.mix_into(id, now, track_l, track_r);
            track.chain.process_block(track_l, track_r);
            state
                .router
                .accumulate(track.config.bus_id.as_deref(), track_l, track_r);
        }

        let master_l = &mut state.master_l[..frames];
        let master_r = &mut state.master_r[..frames];
        master_l.fill(0.0);
        master_r.fill(0.0);
        for bus in state.router.buses_mut() {
            bus.process_block(frames);
            for i in 0..frames {
                master_l[i] += bus.input_left[i];
                master_r[i] += bus.input_right[i];
            }
        }

        state.master.process_block(master_l, master_r);
        left.copy_from_slice(master_l);
        right.copy_from_slice(master_r);

        self.clock.advance(frames);
    }
}

fn limiter_latency_key(track_id: &str) -> String {
    format!("track:{track_id}:limiter")
}
