//! Multi-resolution waveform summaries for clip visualization.

use crate::source::DecodedAudio;

/// Bucket counts for the three zoom levels.
const LOW_BUCKETS: usize = 100;
const MEDIUM_BUCKETS: usize = 500;
const HIGH_BUCKETS: usize = 2000;

/// Three peak-resolution summaries of a decoded buffer, generated once at
/// decode time. Each bucket holds the mean absolute sample value of the
/// mono mix over its span, so values sit in [0, 1] for normalized audio.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformPeaks {
    pub low: Vec<f32>,
    pub medium: Vec<f32>,
    pub high: Vec<f32>,
}

impl WaveformPeaks {
    pub fn from_audio(audio: &DecodedAudio) -> Self {
        Self {
            low: bucket_means(audio, LOW_BUCKETS),
            medium: bucket_means(audio, MEDIUM_BUCKETS),
            high: bucket_means(audio, HIGH_BUCKETS),
        }
    }
}

fn bucket_means(audio: &DecodedAudio, buckets: usize) -> Vec<f32> {
    let frames = audio.frames();
    if frames == 0 {
        return vec![0.0; buckets];
    }
    let mut out = Vec::with_capacity(buckets);
    for b in 0..buckets {
        let start = b * frames / buckets;
        let end = ((b + 1) * frames / buckets).max(start + 1).min(frames);
        let mut sum = 0.0f64;
        for i in start..end {
            sum += (0.5 * (audio.left[i] + audio.right[i])).abs() as f64;
        }
        out.push((sum / (end - start) as f64) as f32);
    }
    out
}
