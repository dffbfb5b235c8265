//! Resolution of symbolic source names to live port handles
//!
//! Two paths write the bindings: a one-time scan over the whole registry,
//! run right after the graph client is activated, and an event-driven path
//! fed by the host's topology notifications. Both are pure side-effecting
//! lookups - a miss leaves the source unbound and is the expected case, not
//! an error. A source already bound to a live port is never rebound; it can
//! only be detached by the removal of that exact port.

use crate::graph::{AudioGraph, PortEvent};
use crate::param::ParamSet;
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Binds modulation sources across every parameter of a [`ParamSet`]
#[derive(Clone)]
pub struct Binder {
    params: Arc<ParamSet>,
}

impl Binder {
    pub fn new(params: Arc<ParamSet>) -> Self {
        Self { params }
    }

    /// One-time scan: look up every source by exact name and bind the hits
    ///
    /// Call this once, after the graph client is activated - and only then;
    /// lookups against an inactive client are undefined in common hosts.
    /// Misses are left unbound; the port may appear later. Running the scan
    /// after create events have already been handled is harmless, since the
    /// scan performs fresh lookups of its own.
    pub fn bind_all(&self, graph: &dyn AudioGraph) {
        for (label, param) in self.params.iter() {
            for source in param.sources() {
                if source.is_bound() {
                    continue;
                }
                if let Some(handle) = graph.port_by_name(source.name()) {
                    info!(param = label, port = source.name(), "bound mod source");
                    source.bind(handle);
                } else {
                    debug!(param = label, port = source.name(), "mod source not present yet");
                }
            }
        }
    }

    /// Apply one topology event to the registry
    ///
    /// A registration binds every still-unbound source whose name matches
    /// the new port. A removal unbinds every source currently holding that
    /// exact port; the source keeps its name and weight and goes back to
    /// contributing nothing until the name reappears.
    pub fn handle(&self, event: &PortEvent) {
        match event {
            PortEvent::Registered(handle) => {
                for (label, param) in self.params.iter() {
                    for source in param.sources() {
                        if source.name() == handle.name() && !source.is_bound() {
                            info!(param = label, port = source.name(), "bound mod source");
                            source.bind(handle.clone());
                        }
                    }
                }
            }
            PortEvent::Unregistered(handle) => {
                for (label, param) in self.params.iter() {
                    for source in param.sources() {
                        if source.unbind_if(handle) {
                            info!(param = label, port = source.name(), "mod source went away");
                        }
                    }
                }
            }
        }
    }

    /// Drain topology events on a dedicated thread until the host hangs up
    pub fn listen(self, events: Receiver<PortEvent>) -> JoinHandle<()> {
        thread::spawn(move || {
            for event in events {
                self.handle(&event);
            }
            debug!("topology event channel closed");
        })
    }
}
