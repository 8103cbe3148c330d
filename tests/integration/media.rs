//! Media pipeline behavior observed through the engine.

use cadenza::prelude::*;
use std::sync::Arc;

use crate::helpers::*;

#[tokio::test]
async fn test_repeat_loads_hit_the_cache() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 1.0));

    let engine = test_engine(source.clone());
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    let clips = vec![AudioClip::new("c1", "take.wav", 0.0)];

    engine.load_track("vox", clips.clone()).await.unwrap();
    engine.load_track("vox", clips).await.unwrap();
    engine.play(Some(0.0)).await.unwrap();

    // One decode serves the preloads and the playback pass.
    assert_eq!(source.fetch_count(), 1);
    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.misses, 1);
    assert!(stats.hits >= 2);
}

#[tokio::test]
async fn test_cache_evicts_least_recently_used() {
    let source = Arc::new(MemorySource::new());
    for name in ["a.wav", "b.wav", "c.wav"] {
        source.insert(name, constant_wav(0.02, 0.5));
    }

    let engine = AudioGraphEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(TEST_BLOCK_SIZE)
        .cache_capacity(2)
        .media_source(source)
        .build()
        .unwrap();
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track(
            "vox",
            vec![
                AudioClip::new("ca", "a.wav", 0.0),
                AudioClip::new("cb", "b.wav", 1.0),
                AudioClip::new("cc", "c.wav", 2.0),
            ],
        )
        .await
        .unwrap();

    let stats = engine.cache_stats();
    assert_eq!(stats.capacity, 2);
    assert!(stats.entries <= 2);
    assert!(stats.evictions >= 1);
    // The oldest entry went first.
    assert!(engine.waveform_data("ca").is_none());
    assert!(engine.waveform_data("cc").is_some());
}

#[tokio::test]
async fn test_waveform_peaks_follow_decoded_audio() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.25, 1.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track("vox", vec![AudioClip::new("c1", "take.wav", 0.0)])
        .await
        .unwrap();

    let peaks = engine.waveform_data("c1").expect("peaks for cached clip");
    assert_eq!(peaks.low.len(), 100);
    assert_eq!(peaks.medium.len(), 500);
    assert_eq!(peaks.high.len(), 2000);
    assert!(peaks.low.iter().all(|&p| (p - 0.25).abs() < 1e-4));
}

/// A missing duration is filled in from the decoded buffer, minus the trim
/// offset.
#[tokio::test]
async fn test_clip_duration_populated_after_decode() {
    let source = Arc::new(MemorySource::new());
    source.insert("take.wav", constant_wav(0.02, 1.5));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("vox", "Vocals"));
    engine
        .load_track(
            "vox",
            vec![AudioClip::new("c1", "take.wav", 0.0).offset(0.5)],
        )
        .await
        .unwrap();

    let clips = engine.get_track_clips("vox").unwrap();
    let duration = clips[0].duration.expect("populated duration");
    assert!((duration - 1.0).abs() < 1e-3);
}
