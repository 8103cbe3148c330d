//! Engine lifecycle integration tests.

use cadenza::prelude::*;
use std::sync::Arc;

use crate::helpers::*;

/// A gated engine accepts configuration before unlock; once the gate
/// opens, playback uses it end to end.
#[tokio::test]
async fn test_gated_engine_configures_before_unlock() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 1.0));

    let gate = Arc::new(ManualGate::new());
    let engine = AudioGraphEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(TEST_BLOCK_SIZE)
        .media_source(source)
        .readiness_gate(gate.clone())
        .build()
        .unwrap();
    assert!(!engine.is_ready());

    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .add_clips_to_track("vox", vec![AudioClip::new("c1", "take.wav", 0.0)])
        .unwrap();

    // Still gated: playback refuses, rendering is silence.
    assert!(engine.play(Some(0.0)).await.is_err());
    let (l, _) = render_seconds(&engine, 0.05);
    assert!(l.iter().all(|&s| s == 0.0));

    gate.open();
    engine.play(Some(0.0)).await.unwrap();
    assert!(engine.is_ready());

    let (l, r) = render_seconds(&engine, 0.1);
    assert!((peak(&l) - 0.02).abs() < 2e-3);
    assert!((peak(&r) - 0.02).abs() < 2e-3);
}

#[tokio::test]
async fn test_dispose_tears_down_and_silences() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 1.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track("vox", vec![AudioClip::new("c1", "take.wav", 0.0)])
        .await
        .unwrap();
    engine.play(Some(0.0)).await.unwrap();
    render_seconds(&engine, 0.05);

    engine.dispose();
    assert!(!engine.is_ready());
    assert!(engine.track_ids().is_empty());
    assert_eq!(engine.cache_stats().entries, 0);
    assert_eq!(engine.clock().now_samples(), 0);

    let (l, _) = render_seconds(&engine, 0.05);
    assert!(l.iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_remove_track_stops_its_audio() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 2.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track("vox", vec![AudioClip::new("c1", "take.wav", 0.0)])
        .await
        .unwrap();
    engine.play(Some(0.0)).await.unwrap();
    let (l, _) = render_seconds(&engine, 0.05);
    assert!(peak(&l) > 0.01);

    engine.remove_track("vox").unwrap();
    let (l, _) = render_seconds(&engine, 0.05);
    assert!(l.iter().all(|&s| s == 0.0));
}
