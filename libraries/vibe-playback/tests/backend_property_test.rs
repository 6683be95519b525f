//! Property tests for the backend contract, run against the buffer
//! backend since it is cheap to construct from raw PCM.

use std::time::Duration;

use proptest::prelude::*;

use vibe_playback::backend::{BufferBackend, PlaybackBackend, MAX_TEMPO, MIN_TEMPO};

const SAMPLE_RATE: u32 = 44_100;

fn silence_backend(seconds: f32) -> BufferBackend {
    let frames = (seconds * SAMPLE_RATE as f32) as usize;
    BufferBackend::from_pcm(vec![0.0; frames * 2], SAMPLE_RATE)
}

proptest! {
    #[test]
    fn seek_lands_inside_the_track(target_ms in 0u64..120_000) {
        let mut backend = silence_backend(3.0);
        let landed = backend.seek(Duration::from_millis(target_ms)).unwrap();
        prop_assert!(landed <= backend.duration());
        prop_assert_eq!(backend.position(), landed);
    }

    #[test]
    fn tempo_is_always_clamped(ratio in -10.0f32..10.0) {
        let mut backend = silence_backend(1.0);
        backend.set_tempo(ratio);
        let tempo = backend.tempo();
        prop_assert!((MIN_TEMPO..=MAX_TEMPO).contains(&tempo));
    }

    #[test]
    fn render_never_overruns_the_source(block_frames in 1usize..4096) {
        let mut backend = silence_backend(0.25);
        let mut out = vec![0.0; block_frames * 2];
        let mut total = 0usize;
        for _ in 0..20_000 {
            let written = backend.render(&mut out).unwrap();
            total += written;
            if backend.is_finished() {
                break;
            }
        }
        let source_frames = (0.25 * SAMPLE_RATE as f32) as usize;
        prop_assert!(backend.is_finished());
        prop_assert!(total <= source_frames);
    }
}
