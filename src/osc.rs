//! Control-driven waveform generators
//!
//! The synthesis engine is consumed through [`ControlSynth`]: a stateful
//! generator that takes a control value (frequency, for the voices shipped
//! here) and produces one sample per tick. Both calls are real-time safe.

/// A generator driven by a single control value
pub trait ControlSynth: Send {
    /// Update the generator for a new output sample rate
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Set the control input; takes effect from the next tick
    fn set_control(&mut self, value: f32);

    /// Produce the next sample
    fn tick(&mut self) -> f32;
}

/// Naive sawtooth voice, -1..1
pub struct Sawtooth {
    phase: f32,
    freq: f32,
    sample_rate: f32,
}

impl Sawtooth {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            freq: 0.0,
            sample_rate,
        }
    }
}

impl ControlSynth for Sawtooth {
    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn set_control(&mut self, value: f32) {
        // Negative frequencies fold to silence rather than running the
        // phase backwards.
        self.freq = value.max(0.0);
    }

    fn tick(&mut self) -> f32 {
        let sample = 2.0 * self.phase - 1.0;
        self.phase += self.freq / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }
}

/// Sine generator; the demo binary uses one as its built-in LFO port
pub struct Sine {
    phase: f32,
    freq: f32,
    sample_rate: f32,
}

impl Sine {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            freq: 0.0,
            sample_rate,
        }
    }
}

impl ControlSynth for Sine {
    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn set_control(&mut self, value: f32) {
        self.freq = value.max(0.0);
    }

    fn tick(&mut self) -> f32 {
        let sample = (self.phase * std::f32::consts::TAU).sin();
        self.phase += self.freq / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }
}
