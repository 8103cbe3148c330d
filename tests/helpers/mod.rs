//! Test helpers and fixtures for Cadenza integration tests.
//!
//! Everything renders through `AudioGraphEngine::render` against an
//! in-memory media source, so no audio hardware or filesystem is touched.

use cadenza::prelude::*;
use std::io::Cursor;
use std::sync::Arc;

/// Default test sample rate.
pub const TEST_SAMPLE_RATE: f64 = 44100.0;

/// Route engine logs to the test harness; call at the top of a test when
/// debugging a failure.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Standard block size for deterministic rendering.
pub const TEST_BLOCK_SIZE: usize = 512;

/// Encode mono f32 samples as WAV bytes.
pub fn wav_bytes(samples: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Constant-amplitude WAV of the given length.
pub fn constant_wav(amplitude: f32, seconds: f64) -> Vec<u8> {
    let frames = (seconds * TEST_SAMPLE_RATE) as usize;
    wav_bytes(&vec![amplitude; frames])
}

/// Create a test engine over an in-memory source.
pub fn test_engine(source: Arc<MemorySource>) -> AudioGraphEngine {
    AudioGraphEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(TEST_BLOCK_SIZE)
        .media_source(source)
        .build()
        .expect("failed to create test engine")
}

/// Render `seconds` of audio, returning both channels.
pub fn render_seconds(engine: &AudioGraphEngine, seconds: f64) -> (Vec<f32>, Vec<f32>) {
    let frames = (seconds * TEST_SAMPLE_RATE) as usize;
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    engine.render(&mut left, &mut right);
    (left, right)
}

/// Peak absolute sample over a slice.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}
