//! Mixing integration tests: track chains, buses, mute/solo, master.
//!
//! Test signals stay around -34 dBFS so the default dynamics (compressor
//! threshold -24 dB, knee 6 dB) are transparent and levels assert cleanly.

use cadenza::model::MASTER_BUS_ID;
use cadenza::prelude::*;
use cadenza::SILENCE_DBFS;
use std::sync::Arc;

use crate::helpers::*;

async fn two_track_engine() -> AudioGraphEngine {
    let source = Arc::new(MemorySource::new());
    source.insert("a.wav", constant_wav(0.02, 2.0));
    source.insert("b.wav", constant_wav(0.02, 2.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("a", "A"));
    engine.create_track(TrackConfig::new("b", "B"));
    engine
        .load_track("a", vec![AudioClip::new("ca", "a.wav", 0.0)])
        .await
        .unwrap();
    engine
        .load_track("b", vec![AudioClip::new("cb", "b.wav", 0.0)])
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_tracks_mix_additively_into_master() {
    let engine = two_track_engine().await;
    engine.play(Some(0.0)).await.unwrap();
    let (l, r) = render_seconds(&engine, 0.1);
    assert!((peak(&l) - 0.04).abs() < 3e-3, "peak {}", peak(&l));
    assert!((peak(&r) - 0.04).abs() < 3e-3);
}

#[tokio::test]
async fn test_muted_track_is_excluded() {
    let engine = two_track_engine().await;
    engine.set_track_muted("b", true).unwrap();
    engine.play(Some(0.0)).await.unwrap();
    let (l, _) = render_seconds(&engine, 0.1);
    assert!((peak(&l) - 0.02).abs() < 2e-3, "peak {}", peak(&l));
}

/// With any solo active, every non-solo track is silent.
#[tokio::test]
async fn test_solo_silences_non_solo_tracks() {
    let engine = two_track_engine().await;
    engine.set_track_solo("a", true).unwrap();
    engine.play(Some(0.0)).await.unwrap();
    render_seconds(&engine, 0.2);

    assert!(engine.track_level("a").unwrap().peak > -36.0);
    assert!(engine.track_level("b").unwrap().peak <= SILENCE_DBFS);

    // Un-soloing restores the other track mid-pass, without rescheduling.
    engine.set_track_solo("a", false).unwrap();
    engine.play(None).await.unwrap();
    render_seconds(&engine, 0.2);
    assert!(engine.track_level("b").unwrap().peak > -36.0);
}

#[tokio::test]
async fn test_track_gain_scales_contribution() {
    let engine = two_track_engine().await;
    engine.set_track_gain("a", 0.5).unwrap();
    engine.set_track_muted("b", true).unwrap();
    engine.play(Some(0.0)).await.unwrap();
    let (l, _) = render_seconds(&engine, 0.2);
    let tail = &l[l.len() - TEST_BLOCK_SIZE..];
    assert!((peak(tail) - 0.01).abs() < 2e-3, "peak {}", peak(tail));
}

#[tokio::test]
async fn test_bus_routing_and_gain() {
    let source = Arc::new(MemorySource::new());
    source.insert("a.wav", constant_wav(0.02, 2.0));

    let engine = test_engine(source);
    engine.create_bus(BusConfig::new("drums", "Drums").gain(0.5));
    engine.create_track(TrackConfig::new("a", "A").bus("drums"));
    engine
        .load_track("a", vec![AudioClip::new("ca", "a.wav", 0.0)])
        .await
        .unwrap();
    engine.play(Some(0.0)).await.unwrap();

    let (l, _) = render_seconds(&engine, 0.1);
    assert!((peak(&l) - 0.01).abs() < 2e-3, "peak {}", peak(&l));
    // Both meters saw signal.
    assert!(engine.bus_level("drums").unwrap().peak > -46.0);
    assert!(engine.master_level().peak > -46.0);
}

/// A track aimed at a bus that does not exist still plays, through master.
#[tokio::test]
async fn test_unknown_bus_falls_back_to_master() {
    let source = Arc::new(MemorySource::new());
    source.insert("a.wav", constant_wav(0.02, 2.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("a", "A").bus("missing"));
    engine
        .load_track("a", vec![AudioClip::new("ca", "a.wav", 0.0)])
        .await
        .unwrap();
    engine.play(Some(0.0)).await.unwrap();

    let (l, _) = render_seconds(&engine, 0.1);
    assert!((peak(&l) - 0.02).abs() < 2e-3, "peak {}", peak(&l));
    assert!(engine.bus_level(MASTER_BUS_ID).unwrap().peak > -36.0);
}

#[tokio::test]
async fn test_master_volume_scales_output() {
    let engine = two_track_engine().await;
    engine.set_track_muted("b", true).unwrap();
    engine.set_master_volume(0.5);
    engine.play(Some(0.0)).await.unwrap();

    let (l, _) = render_seconds(&engine, 0.2);
    let tail = &l[l.len() - TEST_BLOCK_SIZE..];
    assert!((peak(tail) - 0.01).abs() < 2e-3, "peak {}", peak(tail));
}

/// Bypassing a stage restores a transparent path through it.
#[tokio::test]
async fn test_compressor_bypass_is_transparent() {
    let source = Arc::new(MemorySource::new());
    // -6 dBFS: well into the default compressor's range.
    source.insert("hot.wav", constant_wav(0.5, 2.0));

    let engine = test_engine(source);
    engine.create_track(TrackConfig::new("a", "A"));
    engine
        .load_track("a", vec![AudioClip::new("ca", "hot.wav", 0.0)])
        .await
        .unwrap();
    // Keep the soft-clip limiter out of the comparison too.
    engine
        .enable_effect("a", EffectType::Limiter, false)
        .unwrap();

    engine.play(Some(0.0)).await.unwrap();
    render_seconds(&engine, 0.5);
    let compressed = engine.track_level("a").unwrap().rms;
    assert!(compressed < -7.0, "expected gain reduction, rms {compressed}");

    engine
        .enable_effect("a", EffectType::Compressor, false)
        .unwrap();
    render_seconds(&engine, 0.5);
    let bypassed = engine.track_level("a").unwrap().rms;
    // 0.5 constant is about -6.02 dBFS.
    assert!((bypassed + 6.02).abs() < 0.3, "rms {bypassed}");
}
