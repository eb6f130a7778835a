//! End-to-end engine behavior against a recording backend

use vibe_core::{
    AudioBackend, Engine, EngineConfig, EngineError, Event, GainTarget, Ramp, ScaleResolver,
    DiatonicScales, Subdivision, Voice,
};

#[derive(Default)]
struct Recorder {
    triggers: Vec<(Voice, Event, f64)>,
    ramps: Vec<(GainTarget, Ramp)>,
}

impl AudioBackend for Recorder {
    fn trigger(&mut self, voice: Voice, event: &Event, _duration: f64, time: f64) {
        self.triggers.push((voice, event.clone(), time));
    }

    fn ramp_gain(&mut self, target: GainTarget, ramp: &Ramp) {
        self.ramps.push((target, *ramp));
    }
}

fn engine(seed: u64) -> Engine<Recorder> {
    let config = EngineConfig {
        seed: Some(seed),
        ..EngineConfig::default()
    };
    Engine::new(config, Recorder::default()).unwrap()
}

#[test]
fn test_techno_in_a_minor() {
    for seed in 0..20 {
        let mut engine = engine(seed);
        engine.set_scale("A minor").unwrap();
        let selection = engine.set_style("techno").unwrap();
        engine.start().unwrap();

        assert_eq!(selection.style_name, "techno");
        assert!((125.0..=135.0).contains(&selection.bpm));
        assert!(["4-on-Floor", "1, 2, 3&, 4"].contains(&selection.drum_pattern_name.as_str()));

        let scale = DiatonicScales.resolve("A minor").unwrap();
        for voice in [Voice::Bass, Voice::Pad, Voice::Arp] {
            let pattern = engine.pattern(voice).unwrap();
            for pitch in pattern.events.iter().flat_map(|e| e.pitches()) {
                assert!(scale.notes().contains(&pitch.class), "{} out of scale in {}", pitch, voice);
            }
        }
    }
}

#[test]
fn test_euclidean_drums_four_in_sixteen() {
    let mut engine = engine(1);
    engine.toggle_euclidean_rhythm(true).unwrap();
    engine.set_euclidean_params(4, 16).unwrap();
    engine.start().unwrap();

    let drums = engine.pattern(Voice::Drums).unwrap();
    assert_eq!(drums.len(), 16);
    let hits: Vec<usize> = drums
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_rest())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(hits, vec![0, 4, 8, 12]);
}

#[test]
fn test_voices_share_the_bar_grid() {
    let mut engine = engine(3);
    engine.start().unwrap();
    engine.advance(12.0);

    let bar = 4.0 * 60.0 / engine.state().bpm;
    let triggers = &engine.backend().triggers;
    let pads: Vec<f64> = triggers
        .iter()
        .filter(|(v, _, _)| *v == Voice::Pad)
        .map(|(_, _, t)| *t)
        .collect();
    assert!(pads.len() >= 3);
    for time in pads {
        let bars = time / bar;
        assert!((bars - bars.round()).abs() < 1e-6, "pad chord off the bar at {}", time);
        // Boom Bap opens every bar with a kick
        assert!(
            triggers
                .iter()
                .any(|(v, _, t)| *v == Voice::Drums && (t - time).abs() < 1e-6),
            "no drum hit with pad chord at {}",
            time
        );
    }
}

#[test]
fn test_fades_start_from_current_level() {
    let mut engine = engine(4);
    engine.start().unwrap();
    engine.advance(1.0);
    engine.stop();

    let (_, ramp) = engine
        .backend()
        .ramps
        .iter()
        .rev()
        .find(|(t, _)| *t == GainTarget::Voice(Voice::Pad))
        .unwrap();
    assert_eq!(ramp.target, 0.0);
    assert!((ramp.start_level - 0.4).abs() < 1e-4);
    assert_eq!(ramp.start_time, 1.0);
    assert_eq!(ramp.duration, 2.0);
}

#[test]
fn test_regenerating_keeps_playback_coherent() {
    let mut engine = engine(5);
    engine.start().unwrap();
    engine.advance(2.0);
    let elapsed = engine.transport().elapsed_ticks();

    let scale = DiatonicScales.resolve("C major").unwrap();
    for _ in 0..2 {
        engine.regenerate().unwrap();

        assert!(engine.is_playing());
        assert_eq!(engine.transport().elapsed_ticks(), elapsed);
        for voice in Voice::ALL {
            let pattern = engine.pattern(voice).unwrap();
            assert!(!pattern.is_empty());
            assert_eq!(pattern.voice, voice);
        }
        for voice in [Voice::Bass, Voice::Pad, Voice::Arp] {
            let pattern = engine.pattern(voice).unwrap();
            for pitch in pattern.events.iter().flat_map(|e| e.pitches()) {
                assert!(scale.notes().contains(&pitch.class), "{} out of scale in {}", pitch, voice);
            }
        }

        let bass = engine.pattern(Voice::Bass).unwrap();
        let bass_grid = match bass.label.as_str() {
            "half" => Subdivision::Half,
            "quarter" => Subdivision::Quarter,
            "syncopated" => Subdivision::Eighth,
            other => panic!("lofi never picks the {} bass template", other),
        };
        assert_eq!(bass.subdivision, bass_grid);
        assert_eq!(engine.pattern(Voice::Pad).unwrap().subdivision, Subdivision::Measure);
        assert_eq!(engine.pattern(Voice::Arp).unwrap().subdivision, Subdivision::Sixteenth);
        let drums = engine.pattern(Voice::Drums).unwrap();
        assert_eq!(drums.subdivision, Subdivision::Eighth);
        assert_eq!(drums.len(), 8);
    }

    let before = engine.backend().triggers.len();
    engine.advance(4.0);
    assert!(engine.backend().triggers.len() > before);
}

#[test]
fn test_rejected_style_leaves_everything_alone() {
    let mut engine = engine(6);
    engine.start().unwrap();
    let before = engine.snapshot();

    assert_eq!(
        engine.set_style("polka").unwrap_err(),
        EngineError::UnknownStyle("polka".to_string())
    );
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn test_stop_silences_after_fade() {
    let mut engine = engine(7);
    engine.start().unwrap();
    engine.advance(1.0);
    engine.stop();

    // Steps keep sounding under the fade
    let before = engine.backend().triggers.len();
    engine.advance(1.0);
    assert!(engine.backend().triggers.len() > before);

    engine.advance(1.5);
    let after = engine.backend().triggers.len();
    engine.advance(5.0);
    assert_eq!(engine.backend().triggers.len(), after);
    assert!(engine.backend().triggers.iter().all(|(_, _, t)| *t <= 3.0 + 1e-9));
}

#[test]
fn test_restart_during_fade_keeps_playing() {
    let mut engine = engine(8);
    engine.start().unwrap();
    engine.stop();
    engine.advance(1.0);
    engine.start().unwrap();
    engine.advance(5.0);

    assert!(engine.is_playing());
    assert!(engine.backend().triggers.iter().any(|(_, _, t)| *t > 3.0));
}

#[test]
fn test_muted_voice_is_silent() {
    let mut engine = engine(9);
    engine.start().unwrap();
    engine.set_stem_enabled(Voice::Drums, false);
    engine.advance(4.0);
    assert!(engine.backend().triggers.iter().all(|(v, _, _)| *v != Voice::Drums));

    engine.set_stem_enabled(Voice::Drums, true);
    engine.advance(4.0);
    assert!(engine.backend().triggers.iter().any(|(v, _, _)| *v == Voice::Drums));
}

#[test]
fn test_drum_offset_takes_effect_live() {
    let mut engine = engine(10);
    engine.start().unwrap();
    engine.advance(2.0);
    let split = engine.backend().triggers.len();
    engine.set_drum_pitch_offset(-12);
    engine.advance(2.0);

    let triggers = &engine.backend().triggers;
    let base: Vec<i16> = triggers[..split]
        .iter()
        .filter(|(v, _, _)| *v == Voice::Drums)
        .map(|(_, e, _)| e.pitches()[0].midi())
        .collect();
    let shifted: Vec<i16> = triggers[split..]
        .iter()
        .filter(|(v, _, _)| *v == Voice::Drums)
        .map(|(_, e, _)| e.pitches()[0].midi())
        .collect();
    assert!(!base.is_empty() && !shifted.is_empty());
    assert!(shifted.iter().all(|&m| m == base[0] - 12));
}

#[test]
fn test_same_seed_same_music() {
    let mut a = engine(42);
    let mut b = engine(42);
    for engine in [&mut a, &mut b] {
        engine.set_style("house").unwrap();
        engine.start().unwrap();
        engine.advance(6.0);
    }
    assert_eq!(a.backend().triggers, b.backend().triggers);
}
