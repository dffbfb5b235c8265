//! End-to-end tests: parse a parameter spec, resolve it against a live
//! graph, mix blocks through topology changes.

use crate::binder::Binder;
use crate::graph::{LocalGraph, PortEvent};
use crate::mixer::ModMixer;
use crate::osc::{ControlSynth, Sine};
use crate::param::{ParamSet, Parameter};
use crate::render::render_block;
use std::sync::Arc;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK: usize = 64;

fn constant(value: f32) -> impl FnMut(&mut [f32]) + Send {
    move |out: &mut [f32]| out.fill(value)
}

fn setup(specs: &[&str]) -> (Arc<ParamSet>, Arc<Parameter>, Binder) {
    let mut freq = Parameter::new(200.0);
    for spec in specs {
        freq.parse_spec(spec).unwrap();
    }
    let mut params = ParamSet::new();
    let freq = params.add("freq", freq);
    let params = Arc::new(params);
    let binder = Binder::new(params.clone());
    (params, freq, binder)
}

#[test]
fn test_modulation_follows_topology_changes() {
    let graph = LocalGraph::new(SAMPLE_RATE);
    let (_params, freq, binder) = setup(&["mod:output:0.5"]);
    let mixer = ModMixer::new(SAMPLE_RATE, BLOCK, 4);

    // Port not registered yet: no modulation.
    assert!(mixer.mix(BLOCK, freq.sources()).is_none());

    // Port appears; the event binds it and the mix picks it up.
    let handle = graph.register("mod", "output", constant(0.01));
    binder.handle(&PortEvent::Registered(handle));

    let buffer = mixer.mix(BLOCK, freq.sources()).expect("bound source");
    let expected = 0.01 * 0.5 * SAMPLE_RATE;
    assert!(buffer.iter().all(|&s| (s - expected).abs() < 1e-3));
    mixer.reclaim(buffer);

    // Port goes away; back to no modulation, source intact.
    let handle = graph.unregister("mod:output").unwrap();
    binder.handle(&PortEvent::Unregistered(handle));

    assert!(mixer.mix(BLOCK, freq.sources()).is_none());
    assert_eq!(freq.sources()[0].name(), "mod:output");
    assert_eq!(freq.sources()[0].weight(), 0.5);
}

#[test]
fn test_scan_after_early_registration_still_binds() {
    let graph = LocalGraph::new(SAMPLE_RATE);
    let (_params, freq, binder) = setup(&["early:output"]);

    // The port was registered before the scan ran; the scan's fresh lookup
    // must find it even though the event was never delivered.
    graph.register("early", "output", constant(0.0));
    binder.bind_all(&graph);

    assert!(freq.sources()[0].is_bound());
}

#[test]
fn test_full_render_path_with_live_lfo() {
    let graph = LocalGraph::new(SAMPLE_RATE);
    let (_params, freq, binder) = setup(&["lfo:0.001"]);
    let mixer = ModMixer::new(SAMPLE_RATE, BLOCK, 4);

    let mut lfo = Sine::new(SAMPLE_RATE);
    lfo.set_control(2.0);
    graph.register("lfo", "output", move |out: &mut [f32]| {
        for sample in out.iter_mut() {
            *sample = lfo.tick();
        }
    });
    binder.bind_all(&graph);

    let mut voice = Sine::new(SAMPLE_RATE);
    let mut out = [0.0f32; BLOCK];
    for _ in 0..16 {
        render_block(&freq, &mixer, &mut voice, &mut out);
    }
    assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn test_mixed_spec_static_value_and_sources() {
    let (_params, freq, _binder) = setup(&["440", "synthA:freq:3.5", "synthA"]);

    assert_eq!(freq.value(), 440.0);
    assert_eq!(freq.sources().len(), 2);
    assert_eq!(freq.sources()[0].name(), "synthA:freq");
    assert_eq!(freq.sources()[1].name(), "synthA:output");
}

#[test]
fn test_events_via_channel_reach_the_mixer() {
    let graph = LocalGraph::new(SAMPLE_RATE);
    let (_params, freq, binder) = setup(&["mod:output"]);
    let rx = graph.subscribe();
    let worker = binder.listen(rx);

    graph.register("mod", "output", constant(1.0));
    drop(graph);
    worker.join().unwrap();

    let mixer = ModMixer::new(SAMPLE_RATE, BLOCK, 4);
    let buffer = mixer.mix(BLOCK, freq.sources()).expect("bound via channel");
    assert!((buffer[0] - SAMPLE_RATE).abs() < 1e-2);
    mixer.reclaim(buffer);
}
