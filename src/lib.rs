//! # Vibrato - a synthesizer client with externally modulatable parameters
//!
//! Vibrato is a small real-time synthesizer client. Each of its numeric
//! synthesis parameters (the shipped voice exposes oscillator frequency)
//! carries a static base value plus any number of named modulation sources:
//! references to ports in a shared audio-routing graph whose signals perturb
//! the parameter, scaled by a per-source weight.
//!
//! Ports are discovered dynamically. A source configured for a port that
//! does not exist yet simply stays unbound until the port appears; a port
//! that vanishes detaches its sources again. Binding state is updated by
//! atomic pointer swaps, so the audio callback reads it lock-free.
//!
//! ## Configuring a parameter
//!
//! One spec token either sets the static value or appends a source:
//!
//! ```
//! use vibrato::{ModMixer, Parameter};
//!
//! let mut freq = Parameter::new(200.0);
//! freq.parse_spec("synthA:freq:3.5").unwrap(); // port, weight 3.5
//! freq.parse_spec("lfo").unwrap();             // lfo:output, weight 1.0
//! assert_eq!(freq.sources().len(), 2);
//!
//! // Nothing is bound yet, so there is no modulation - callers use this to
//! // take the set-control-once-per-block path.
//! let mixer = ModMixer::new(44100.0, 256, 8);
//! assert!(mixer.mix(64, freq.sources()).is_none());
//! ```
//!
//! ## Pieces
//!
//! - [`param`] - parameters, modulation sources, the spec grammar
//! - [`binder`] - name resolution: startup scan + topology-event updates
//! - [`mixer`] - the per-block mixing routine and its buffer pool
//! - [`graph`] - consumed host interfaces and an in-process graph
//! - [`osc`] / [`render`] - the voice interface and the callback body

pub mod binder;
pub mod error;
pub mod graph;
pub mod mixer;
pub mod osc;
pub mod param;
pub mod render;

#[cfg(test)]
mod integration_tests;

pub use binder::Binder;
pub use error::{Result, VibratoError};
pub use graph::{AudioGraph, BlockSource, LocalGraph, Port, PortEvent, PortHandle};
pub use mixer::ModMixer;
pub use osc::{ControlSynth, Sawtooth, Sine};
pub use param::{ModSource, ParamSet, Parameter, DEFAULT_PORT};
pub use render::render_block;
