//! Modulatable synthesis parameters and the parameter spec grammar
//!
//! A [`Parameter`] is a static control value plus an ordered list of
//! [`ModSource`] entries, each naming a port in the routing graph whose
//! signal should perturb the parameter. Sources are appended by
//! [`Parameter::parse_spec`] during configuration and never removed; after
//! parsing, the only thing that changes in a source is its binding, and that
//! changes through a single atomic swap so the audio thread never observes a
//! half-written handle.

use crate::error::{Result, VibratoError};
use crate::graph::{same_port, PortHandle};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Port name used when a spec token names an owner without a port segment
pub const DEFAULT_PORT: &str = "output";

/// Owner and port segments are capped at 31 characters, matching the name
/// limits of common routing hosts.
const MAX_SEGMENT_LEN: usize = 31;

/// One named modulation source of a parameter
pub struct ModSource {
    name: String,
    weight: f32,
    // The extra Arc keeps the trait object behind a thin pointer, so a bind
    // or unbind is one atomic store and the audio thread's load is lock-free.
    port: ArcSwapOption<PortHandle>,
}

impl ModSource {
    fn new(name: String, weight: f32) -> Self {
        Self {
            name,
            weight,
            port: ArcSwapOption::from(None),
        }
    }

    /// Fully-qualified `"owner:port"` name this source resolves against
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scale applied to the source's samples when mixing
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Current binding, if the named port is live
    pub fn bound(&self) -> Option<PortHandle> {
        self.port.load_full().map(|handle| (*handle).clone())
    }

    pub fn is_bound(&self) -> bool {
        self.port.load().is_some()
    }

    pub(crate) fn bind(&self, handle: PortHandle) {
        self.port.store(Some(Arc::new(handle)));
    }

    /// Drop the binding if it refers to exactly `handle`
    ///
    /// Identity comparison, not name comparison: a source bound to a live
    /// port must not be detached by the removal of an unrelated namesake.
    pub(crate) fn unbind_if(&self, handle: &PortHandle) -> bool {
        let current = self.port.load();
        match current.as_ref() {
            Some(bound) if same_port(bound, handle) => {
                self.port.store(None);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for ModSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModSource")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// A synthesis parameter: base value plus ordered modulation sources
#[derive(Debug)]
pub struct Parameter {
    value: f32,
    sources: Vec<ModSource>,
}

impl Parameter {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            sources: Vec::new(),
        }
    }

    /// Static control value, used directly when no source is bound and as
    /// the center value when modulation is mixed in
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Sources in spec-encounter order
    pub fn sources(&self) -> &[ModSource] {
        &self.sources
    }

    /// Parse one parameter spec token and apply it to this parameter
    ///
    /// The grammar, tried in order with the first structural match winning:
    ///
    /// 1. `owner:port:magnitude` - add a source for `owner:port`, scaled by
    ///    `magnitude`
    /// 2. `owner:magnitude` - add a source for the owner's default port
    /// 3. `magnitude` - set the parameter's static value, no source added
    /// 4. `owner:port` - add a source with weight 1.0
    /// 5. `owner` - add a source for the owner's default port, weight 1.0
    ///
    /// The order matters for ambiguous tokens: `"5"` sets the value, it is
    /// never an owner name, and `"5:6"` is owner `"5"` with weight 6. A
    /// magnitude must parse as a whole segment; owner and port segments are
    /// truncated to 31 characters. Anything else is a
    /// [`VibratoError::ParseSpec`] and the parameter is left untouched.
    pub fn parse_spec(&mut self, token: &str) -> Result<()> {
        let err = || VibratoError::ParseSpec(token.to_string());
        let segments: Vec<&str> = token.split(':').collect();

        match segments.as_slice() {
            [owner, port, magnitude] if !owner.is_empty() && !port.is_empty() => {
                let weight: f32 = magnitude.parse().map_err(|_| err())?;
                self.push_source(owner, port, weight);
            }
            [owner, second] if !owner.is_empty() && !second.is_empty() => {
                if let Ok(weight) = second.parse::<f32>() {
                    self.push_source(owner, DEFAULT_PORT, weight);
                } else {
                    self.push_source(owner, second, 1.0);
                }
            }
            [token] if !token.is_empty() => {
                if let Ok(value) = token.parse::<f32>() {
                    self.value = value;
                } else {
                    self.push_source(token, DEFAULT_PORT, 1.0);
                }
            }
            _ => return Err(err()),
        }
        Ok(())
    }

    fn push_source(&mut self, owner: &str, port: &str, weight: f32) {
        let name = format!("{}:{}", clamp_segment(owner), clamp_segment(port));
        self.sources.push(ModSource::new(name, weight));
    }
}

fn clamp_segment(segment: &str) -> &str {
    match segment.char_indices().nth(MAX_SEGMENT_LEN) {
        Some((idx, _)) => &segment[..idx],
        None => segment,
    }
}

/// The client's parameter registry, built once at configuration time
///
/// Handed by reference to the binder and the audio callback; the set itself
/// is never restructured after startup.
#[derive(Default)]
pub struct ParamSet {
    params: Vec<(String, Arc<Parameter>)>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully-configured parameter under a diagnostic label
    pub fn add(&mut self, label: &str, param: Parameter) -> Arc<Parameter> {
        let param = Arc::new(param);
        self.params.push((label.to_string(), param.clone()));
        param
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Parameter>)> {
        self.params
            .iter()
            .map(|(label, param)| (label.as_str(), param))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
