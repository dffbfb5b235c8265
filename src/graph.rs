//! Consumed interfaces of the audio-routing host
//!
//! The host owns the inter-process graph of named ports: it can look a port
//! up by its fully-qualified name, deliver a port's samples once per block,
//! and notify listeners when ports appear or disappear anywhere in the graph.
//! This module models exactly that surface - the two query calls and the two
//! event kinds - plus `LocalGraph`, an in-process implementation used by the
//! demo binary and the tests.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// One live port in the routing graph
///
/// Handles are non-owning from the client's point of view: the host keeps
/// the port alive, the client only holds a reference it may be told to drop.
pub trait Port: Send + Sync {
    /// Fully-qualified `"owner:port"` name
    fn name(&self) -> &str;

    /// Fill `out` with the port's samples for the current block
    ///
    /// Must fill the whole slice; delivering fewer samples than requested is
    /// a contract violation of the host, not a recoverable condition.
    fn fill_block(&self, out: &mut [f32]);
}

/// Shared handle to a live port
pub type PortHandle = Arc<dyn Port>;

/// Compare two handles for identity (same live port, not same name)
pub fn same_port(a: &PortHandle, b: &PortHandle) -> bool {
    // Cast away the vtable so dyn handles from different call sites compare
    // by the data pointer alone.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Topology-change notification delivered by the host
///
/// Events arrive asynchronously, on any thread, any number of times for the
/// lifetime of the process.
#[derive(Clone)]
pub enum PortEvent {
    /// A port appeared somewhere in the graph
    Registered(PortHandle),
    /// A port is going away; handles to it must be dropped
    Unregistered(PortHandle),
}

impl PortEvent {
    /// Name of the port the event refers to
    pub fn port_name(&self) -> &str {
        match self {
            PortEvent::Registered(port) | PortEvent::Unregistered(port) => port.name(),
        }
    }
}

/// Lookup surface of the host graph
pub trait AudioGraph {
    /// Exact-name lookup; `None` simply means the port does not exist (yet)
    fn port_by_name(&self, name: &str) -> Option<PortHandle>;
}

/// Producer of one port's per-block samples
///
/// `fill_block` takes `&mut self` so stateful generators (oscillator phase)
/// can advance; `LocalGraph` serializes access per port.
pub trait BlockSource: Send {
    fn fill_block(&mut self, out: &mut [f32]);
}

impl<F> BlockSource for F
where
    F: FnMut(&mut [f32]) + Send,
{
    fn fill_block(&mut self, out: &mut [f32]) {
        self(out)
    }
}

struct LocalPort {
    name: String,
    // Only the audio thread reads port blocks, so this lock is uncontended;
    // it exists to give the stateful generator &mut access behind &self.
    source: Mutex<Box<dyn BlockSource>>,
}

impl Port for LocalPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill_block(&self, out: &mut [f32]) {
        let mut source = self.source.lock().unwrap();
        source.fill_block(out);
    }
}

/// In-process port graph
///
/// Stands in for an external routing host: ports registered here become
/// visible to `port_by_name` and are announced to every subscriber through
/// an ordered channel.
pub struct LocalGraph {
    sample_rate: f32,
    ports: RwLock<HashMap<String, PortHandle>>,
    listeners: Mutex<Vec<Sender<PortEvent>>>,
}

impl LocalGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ports: RwLock::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Subscribe to topology events
    ///
    /// Every registration and removal after this call is delivered, in
    /// order, to the returned receiver.
    pub fn subscribe(&self) -> Receiver<PortEvent> {
        let (tx, rx) = unbounded();
        self.listeners.lock().unwrap().push(tx);
        rx
    }

    /// Register a new port under `"owner:port"` and announce it
    pub fn register(
        &self,
        owner: &str,
        port: &str,
        source: impl BlockSource + 'static,
    ) -> PortHandle {
        let name = format!("{}:{}", owner, port);
        let handle: PortHandle = Arc::new(LocalPort {
            name: name.clone(),
            source: Mutex::new(Box::new(source)),
        });
        self.ports
            .write()
            .unwrap()
            .insert(name.clone(), handle.clone());
        debug!(port = %name, "registered port");
        self.announce(PortEvent::Registered(handle.clone()));
        handle
    }

    /// Remove a port by name and announce the removal
    pub fn unregister(&self, name: &str) -> Option<PortHandle> {
        let removed = self.ports.write().unwrap().remove(name);
        if let Some(handle) = &removed {
            debug!(port = %name, "unregistered port");
            self.announce(PortEvent::Unregistered(handle.clone()));
        }
        removed
    }

    fn announce(&self, event: PortEvent) {
        let mut listeners = self.listeners.lock().unwrap();
        // Drop listeners whose receiving end has hung up.
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl AudioGraph for LocalGraph {
    fn port_by_name(&self, name: &str) -> Option<PortHandle> {
        self.ports.read().unwrap().get(name).cloned()
    }
}
