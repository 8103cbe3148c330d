//! Transport integration tests.
//!
//! Positions are driven by actually rendering audio: the render clock is
//! the only time source, so every assertion exercises the full pipeline.

use cadenza::prelude::*;
use std::sync::Arc;

use crate::helpers::*;

async fn engine_with_clip(samples: Vec<u8>) -> AudioGraphEngine {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", samples);
    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track("vox", vec![AudioClip::new("c1", "take.wav", 0.0)])
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_position_advances_with_rendering() {
    let engine = engine_with_clip(constant_wav(0.02, 2.0)).await;
    engine.play(Some(0.0)).await.unwrap();

    render_seconds(&engine, 0.5);
    assert!((engine.current_time() - 0.5).abs() < 1e-3);
    render_seconds(&engine, 0.25);
    assert!((engine.current_time() - 0.75).abs() < 1e-3);
}

#[tokio::test]
async fn test_pause_freezes_position_and_resume_continues() {
    let engine = engine_with_clip(constant_wav(0.02, 2.0)).await;
    engine.play(Some(0.0)).await.unwrap();
    render_seconds(&engine, 0.5);

    engine.pause();
    assert!(!engine.is_playing());
    let paused = engine.current_time();
    assert!((paused - 0.5).abs() < 1e-3);

    // Rendering while paused produces silence and does not move the
    // position.
    let (l, _) = render_seconds(&engine, 0.25);
    assert!(l.iter().all(|&s| s == 0.0));
    assert!((engine.current_time() - paused).abs() < 1e-6);

    // Resume without an explicit position picks up where pause left off.
    engine.play(None).await.unwrap();
    assert!((engine.current_time() - paused).abs() < 1e-3);
    render_seconds(&engine, 0.25);
    assert!((engine.current_time() - paused - 0.25).abs() < 1e-3);
}

#[tokio::test]
async fn test_stop_resets_position_to_zero() {
    let engine = engine_with_clip(constant_wav(0.02, 2.0)).await;
    engine.play(Some(1.0)).await.unwrap();
    render_seconds(&engine, 0.2);

    engine.stop();
    assert!(!engine.is_playing());
    assert_eq!(engine.current_time(), 0.0);
}

/// Starting playback inside a clip's span enters it mid-clip: the source
/// offset advances by the elapsed portion instead of restarting the clip.
#[tokio::test]
async fn test_play_enters_clip_mid_source() {
    // First half silent, second half audible. Starting at 0.5 s must land
    // in the audible half immediately.
    let frames = TEST_SAMPLE_RATE as usize;
    let mut samples = vec![0.0f32; frames];
    for s in samples.iter_mut().skip(frames / 2) {
        *s = 0.02;
    }
    let engine = engine_with_clip(wav_bytes(&samples)).await;

    engine.play(Some(0.5)).await.unwrap();
    let (l, _) = render_seconds(&engine, 0.05);
    assert!(
        (peak(&l) - 0.02).abs() < 2e-3,
        "expected the audible half right away, peak {}",
        peak(&l)
    );
}

/// A clip scheduled in the future stays silent until its start time.
#[tokio::test]
async fn test_future_clip_waits_for_its_start_time() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 1.0));
    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track("vox", vec![AudioClip::new("c1", "take.wav", 0.5)])
        .await
        .unwrap();

    engine.play(Some(0.0)).await.unwrap();
    let (before, _) = render_seconds(&engine, 0.4);
    assert!(before.iter().all(|&s| s == 0.0));

    let (after, _) = render_seconds(&engine, 0.2);
    assert!(peak(&after) > 0.01);
}

/// The clip trim offset skips into the source.
#[tokio::test]
async fn test_clip_offset_trims_source_head() {
    // Audible head, silent tail; a 0.5 s trim should play only silence.
    let frames = TEST_SAMPLE_RATE as usize;
    let mut samples = vec![0.0f32; frames];
    for s in samples.iter_mut().take(frames / 2) {
        *s = 0.02;
    }
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", wav_bytes(&samples));
    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track(
            "vox",
            vec![AudioClip::new("c1", "take.wav", 0.0).offset(0.5)],
        )
        .await
        .unwrap();

    engine.play(Some(0.0)).await.unwrap();
    let (l, _) = render_seconds(&engine, 0.3);
    assert!(l.iter().all(|&s| s.abs() < 1e-6));
}
