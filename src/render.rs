//! The per-block render path of the audio callback
//!
//! Joins the three real-time pieces: mix the parameter's modulation sources,
//! feed the result into the control input of the voice, and write one block
//! of output samples.

use crate::mixer::ModMixer;
use crate::osc::ControlSynth;
use crate::param::Parameter;

/// Render one block of `out.len()` samples
///
/// With no modulation the control value is set once for the whole block;
/// with modulation it is recomputed per frame as `value + mod[i]`. The mixed
/// buffer is reclaimed before returning, so the mixer's pool stays primed
/// for the next block.
pub fn render_block(
    param: &Parameter,
    mixer: &ModMixer,
    synth: &mut dyn ControlSynth,
    out: &mut [f32],
) {
    match mixer.mix(out.len(), param.sources()) {
        Some(modulation) => {
            for (frame, sample) in out.iter_mut().enumerate() {
                synth.set_control(param.value() + modulation[frame]);
                *sample = synth.tick();
            }
            mixer.reclaim(modulation);
        }
        None => {
            synth.set_control(param.value());
            for sample in out.iter_mut() {
                *sample = synth.tick();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osc::Sawtooth;

    /// Records the control values it was driven with
    struct Probe {
        controls: Vec<f32>,
    }

    impl ControlSynth for Probe {
        fn set_sample_rate(&mut self, _sample_rate: f32) {}

        fn set_control(&mut self, value: f32) {
            self.controls.push(value);
        }

        fn tick(&mut self) -> f32 {
            0.0
        }
    }

    #[test]
    fn test_unmodulated_block_sets_control_once() {
        let mixer = ModMixer::new(44100.0, 128, 4);
        let param = Parameter::new(200.0);
        let mut probe = Probe { controls: Vec::new() };
        let mut out = [0.0f32; 64];

        render_block(&param, &mixer, &mut probe, &mut out);

        assert_eq!(probe.controls, vec![200.0]);
    }

    #[test]
    fn test_unbound_sources_take_the_cheap_path() {
        let mixer = ModMixer::new(44100.0, 128, 4);
        let mut param = Parameter::new(200.0);
        param.parse_spec("ghost:output:2.0").unwrap();
        let mut probe = Probe { controls: Vec::new() };
        let mut out = [0.0f32; 32];

        render_block(&param, &mixer, &mut probe, &mut out);

        // Sources exist but none are bound, so the control is still set
        // exactly once.
        assert_eq!(probe.controls, vec![200.0]);
    }

    #[test]
    fn test_render_fills_every_frame() {
        let mixer = ModMixer::new(44100.0, 128, 4);
        let param = Parameter::new(441.0);
        let mut saw = Sawtooth::new(44100.0);
        let mut out = [7.0f32; 128];

        render_block(&param, &mixer, &mut saw, &mut out);

        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
