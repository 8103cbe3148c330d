//! Transport state machine and sample-accurate clip scheduling.
//!
//! The scheduler owns play/pause/stop state and the set of clips scheduled
//! for the current playback pass, expressed in samples against the render
//! clock. Starting a pass always clears the previous one first, so there is
//! never more than one active set of sources.
//!
//! Positions are seconds at the API boundary and samples internally; the
//! conversion rounds, so a pause/play round trip is the identity on
//! position to within half a sample.

use crate::model::AudioClip;
use cadenza_media::DecodedAudio;
use std::sync::Arc;
use tracing::debug;

/// One clip scheduled against the render clock.
pub struct ScheduledClip {
    pub track_id: String,
    pub audio: Arc<DecodedAudio>,
    /// Clock sample at which this clip starts sounding.
    pub start_sample: i64,
    /// Frame index into the source at `start_sample`.
    pub source_offset: usize,
    /// Frames to play.
    pub length: usize,
}

/// Snapshot of the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub is_playing: bool,
    /// Clock sample corresponding to timeline position zero.
    pub play_start_clock: i64,
    /// Timeline position captured at the last pause, in seconds.
    pub paused_position: f64,
}

pub struct TransportScheduler {
    sample_rate: f64,
    is_playing: bool,
    play_start_clock: i64,
    paused_position: f64,
    clips: Vec<ScheduledClip>,
}

impl TransportScheduler {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            is_playing: false,
            play_start_clock: 0,
            paused_position: 0.0,
            clips: Vec::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn state(&self) -> TransportState {
        TransportState {
            is_playing: self.is_playing,
            play_start_clock: self.play_start_clock,
            paused_position: self.paused_position,
        }
    }

    /// Timeline position in seconds at clock sample `now`.
    pub fn position(&self, now: u64) -> f64 {
        if self.is_playing {
            (now as i64 - self.play_start_clock) as f64 / self.sample_rate
        } else {
            self.paused_position
        }
    }

    /// Position a resumed `play()` should start from.
    pub fn resume_position(&self) -> f64 {
        self.paused_position
    }

    /// Start a playback pass at `start_position` seconds. Clears every clip
    /// scheduled by the previous pass first; idempotent when stopped.
    pub fn begin_pass(&mut self, now: u64, start_position: f64) {
        self.clips.clear();
        self.play_start_clock = now as i64 - (start_position * self.sample_rate).round() as i64;
        self.is_playing = true;
        debug!(start_position, "transport pass started");
    }

    pub fn schedule(&mut self, clip: ScheduledClip) {
        self.clips.push(clip);
    }

    /// Compute the scheduling of one clip for a pass at `start_position`.
    ///
    /// A clip starting in the future is scheduled at its computed clock
    /// time. A clip whose span already overlaps `now` enters mid-clip, with
    /// the trim offset advanced by the elapsed portion. A clip fully in the
    /// past is skipped.
    pub fn place_clip(
        &self,
        now: u64,
        start_position: f64,
        track_id: &str,
        audio: Arc<DecodedAudio>,
        clip: &AudioClip,
    ) -> Option<ScheduledClip> {
        let sr = self.sample_rate;
        let offset_frames = (clip.offset * sr).round() as usize;
        let available = audio.frames().saturating_sub(offset_frames);
        if available == 0 {
            return None;
        }
        let length = clip
            .duration
            .map(|d| ((d * sr).round() as usize).min(available))
            .unwrap_or(available);

        let clip_start_clock =
            now as i64 + ((clip.start_time - start_position) * sr).round() as i64;

        if clip_start_clock >= now as i64 {
            return Some(ScheduledClip {
                track_id: track_id.to_string(),
                audio,
                start_sample: clip_start_clock,
                source_offset: offset_frames,
                length,
            });
        }

        // Mid-clip entry: skip the elapsed portion, start immediately.
        let elapsed = (now as i64 - clip_start_clock) as usize;
        if elapsed >= length {
            return None;
        }
        Some(ScheduledClip {
            track_id: track_id.to_string(),
            audio,
            start_sample: now as i64,
            source_offset: offset_frames + elapsed,
            length: length - elapsed,
        })
    }

    /// Pause, capturing the current position for resume.
    pub fn pause(&mut self, now: u64) {
        if !self.is_playing {
            return;
        }
        self.paused_position = (now as i64 - self.play_start_clock) as f64 / self.sample_rate;
        self.is_playing = false;
        self.clips.clear();
        debug!(position = self.paused_position, "transport paused");
    }

    /// Stop and reset position to zero.
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.paused_position = 0.0;
        self.clips.clear();
    }

    /// Drop scheduled clips belonging to a removed track.
    pub fn remove_track(&mut self, track_id: &str) {
        self.clips.retain(|c| c.track_id != track_id);
    }

    pub fn scheduled_len(&self) -> usize {
        self.clips.len()
    }

    /// Sum this track's scheduled clips into a render block starting at
    /// clock sample `now`. Additive, so overlapping clips mix.
    pub fn mix_into(&self, track_id: &str, now: u64, left: &mut [f32], right: &mut [f32]) {
        if !self.is_playing {
            return;
        }
        let frames = left.len().min(right.len()) as i64;
        let block_start = now as i64;

        for clip in self.clips.iter().filter(|c| c.track_id == track_id) {
            let clip_end = clip.start_sample + clip.length as i64;
            let begin = clip.start_sample.max(block_start);
            let end = clip_end.min(block_start + frames);
            for g in begin..end {
                let src = clip.source_offset + (g - clip.start_sample) as usize;
                let dst = (g - block_start) as usize;
                left[dst] += clip.audio.left[src];
                right[dst] += clip.audio.right[src];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f64 = 44100.0;

    fn audio(frames: usize, value: f32) -> Arc<DecodedAudio> {
        Arc::new(DecodedAudio {
            sample_rate: SR,
            left: vec![value; frames],
            right: vec![value; frames],
        })
    }

    fn ramp_audio(frames: usize) -> Arc<DecodedAudio> {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        Arc::new(DecodedAudio {
            sample_rate: SR,
            left: samples.clone(),
            right: samples,
        })
    }

    #[test]
    fn test_future_clip_scheduled_at_computed_time() {
        let t = TransportScheduler::new(SR);
        let clip = AudioClip::new("c", "a.wav", 2.0);
        let placed = t
            .place_clip(1000, 0.0, "track", audio(44100, 0.5), &clip)
            .unwrap();
        assert_eq!(placed.start_sample, 1000 + (2.0 * SR) as i64);
        assert_eq!(placed.source_offset, 0);
        assert_eq!(placed.length, 44100);
    }

    #[test]
    fn test_mid_clip_entry_advances_offset() {
        // startTime 2 s, duration 5 s, pass starts at position 4 s:
        // the clip begins immediately, 2 s in.
        let t = TransportScheduler::new(SR);
        let clip = AudioClip::new("c", "a.wav", 2.0).duration(5.0).offset(0.5);
        let source = audio((6.0 * SR) as usize, 0.5);
        let now = 500u64;
        let placed = t.place_clip(now, 4.0, "track", source, &clip).unwrap();
        assert_eq!(placed.start_sample, now as i64);
        let expected_offset = (0.5 * SR) as usize + (2.0 * SR) as usize;
        assert_eq!(placed.source_offset, expected_offset);
        assert_eq!(placed.length, (3.0 * SR) as usize);
    }

    #[test]
    fn test_fully_past_clip_is_skipped() {
        let t = TransportScheduler::new(SR);
        let clip = AudioClip::new("c", "a.wav", 0.0).duration(1.0);
        assert!(t
            .place_clip(0, 5.0, "track", audio(44100, 0.5), &clip)
            .is_none());
    }

    #[test]
    fn test_duration_clamped_to_available_source() {
        let t = TransportScheduler::new(SR);
        let clip = AudioClip::new("c", "a.wav", 0.0).duration(10.0).offset(0.5);
        let placed = t
            .place_clip(0, 0.0, "track", audio(44100, 0.5), &clip)
            .unwrap();
        // 1 s source minus 0.5 s trim leaves 0.5 s.
        assert_eq!(placed.length, 22050);
    }

    #[test]
    fn test_pause_play_round_trip_is_identity() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 0.0);
        let now = 123_456u64;
        t.pause(now);
        let paused = t.resume_position();
        assert_abs_diff_eq!(paused, now as f64 / SR, epsilon = 1e-9);

        t.begin_pass(now + 1000, paused);
        assert_abs_diff_eq!(t.position(now + 1000), paused, epsilon = 1e-5);
    }

    #[test]
    fn test_stop_resets_position() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 3.0);
        t.stop();
        assert!(!t.is_playing());
        assert_eq!(t.position(99999), 0.0);
    }

    #[test]
    fn test_begin_pass_clears_previous_sources() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 0.0);
        let clip = AudioClip::new("c", "a.wav", 0.0);
        let placed = t.place_clip(0, 0.0, "track", audio(100, 0.5), &clip).unwrap();
        t.schedule(placed);
        assert_eq!(t.scheduled_len(), 1);
        t.begin_pass(0, 0.0);
        assert_eq!(t.scheduled_len(), 0);
    }

    #[test]
    fn test_mix_into_respects_clip_boundaries() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 0.0);
        t.schedule(ScheduledClip {
            track_id: "track".into(),
            audio: ramp_audio(1000),
            start_sample: 10,
            source_offset: 100,
            length: 20,
        });

        let mut l = vec![0.0f32; 64];
        let mut r = vec![0.0f32; 64];
        t.mix_into("track", 0, &mut l, &mut r);

        assert_eq!(l[9], 0.0);
        assert_eq!(l[10], 100.0); // first source frame at the trim offset
        assert_eq!(l[29], 119.0); // last frame of the clip
        assert_eq!(l[30], 0.0);
    }

    #[test]
    fn test_mix_into_sums_overlapping_clips() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 0.0);
        for _ in 0..2 {
            t.schedule(ScheduledClip {
                track_id: "track".into(),
                audio: audio(100, 0.25),
                start_sample: 0,
                source_offset: 0,
                length: 64,
            });
        }
        let mut l = vec![0.0f32; 64];
        let mut r = vec![0.0f32; 64];
        t.mix_into("track", 0, &mut l, &mut r);
        assert_abs_diff_eq!(l[0], 0.5);
    }

    #[test]
    fn test_mix_into_silent_when_not_playing() {
        let mut t = TransportScheduler::new(SR);
        t.begin_pass(0, 0.0);
        t.schedule(ScheduledClip {
            track_id: "track".into(),
            audio: audio(100, 0.5),
            start_sample: 0,
            source_offset: 0,
            length: 64,
        });
        t.pause(32);
        let mut l = vec![0.0f32; 64];
        let mut r = vec![0.0f32; 64];
        t.mix_into("track", 32, &mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));
    }
}
