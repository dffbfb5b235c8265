//! Vibrato CLI - a sawtooth voice whose frequency is modulated by ports in
//! the signal graph
//!
//! The binary wires the whole client together: parse `-f` parameter specs,
//! stand up the in-process port graph (with one built-in LFO port,
//! `lfo:output`, so modulation is audible without an external host), start
//! the binder's listener thread, run the startup scan, and open the output
//! stream whose callback renders blocks.

use clap::Parser as ClapParser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use vibrato::{
    render_block, Binder, ControlSynth, LocalGraph, ModMixer, ParamSet, Parameter, Sawtooth, Sine,
    VibratoError, DEFAULT_PORT,
};

/// Buffers kept in the mixer pool; one block in flight plus headroom.
const MIXER_POOL: usize = 8;

#[derive(ClapParser)]
#[command(name = "vibrato")]
#[command(about = "Sawtooth client with graph-modulated frequency", long_about = None)]
struct Cli {
    /// Frequency parameter spec, repeatable. One of: value, owner,
    /// owner:magnitude, owner:port, owner:port:magnitude
    #[arg(short = 'f', long = "freq")]
    freq: Vec<String>,

    /// Initial base frequency in Hz (a plain `-f <value>` spec overrides it)
    #[arg(long, default_value = "200.0")]
    value: f32,

    /// Block size in frames
    #[arg(short, long, default_value = "256")]
    block_size: usize,

    /// Frequency of the built-in lfo:output port in Hz
    #[arg(long, default_value = "2.0")]
    lfo: f32,

    /// Seconds to run; 0 runs until killed
    #[arg(short, long, default_value = "0.0")]
    duration: f32,

    /// Output gain 0.0-1.0
    #[arg(short, long, default_value = "0.5")]
    gain: f32,
}

/// Everything the output callback owns
struct RenderState {
    freq: Arc<Parameter>,
    mixer: ModMixer,
    voice: Sawtooth,
    mono: Vec<f32>,
    gain: f32,
    channels: usize,
}

impl RenderState {
    fn fill<T>(&mut self, data: &mut [T])
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let frames = (data.len() / self.channels).min(self.mono.len());
        render_block(
            &self.freq,
            &self.mixer,
            &mut self.voice,
            &mut self.mono[..frames],
        );

        for (chunk, &sample) in data
            .chunks_mut(self.channels)
            .zip(&self.mono[..frames])
        {
            let value = T::from_sample(sample * self.gain);
            for channel in chunk.iter_mut() {
                *channel = value;
            }
        }
        // If the device hands us more frames than one block, the tail is
        // silence rather than stale samples.
        for chunk in data.chunks_mut(self.channels).skip(frames) {
            for channel in chunk.iter_mut() {
                *channel = T::from_sample(0.0);
            }
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut state: RenderState,
) -> Result<cpal::Stream, VibratoError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| state.fill(data),
            |err| error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| VibratoError::Stream(e.to_string()))
}

fn main() -> Result<(), VibratoError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Output device first: the graph and the mixer need its sample rate.
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(VibratoError::NoOutputDevice)?;
    let default_config = device
        .default_output_config()
        .map_err(|e| VibratoError::Stream(e.to_string()))?;
    let sample_format = default_config.sample_format();
    let channels = default_config.channels() as usize;
    let sample_rate = default_config.sample_rate().0 as f32;

    let mut config: cpal::StreamConfig = default_config.into();
    config.buffer_size = cpal::BufferSize::Fixed(cli.block_size as u32);

    // The frequency parameter: static base value unless a spec overrides it.
    let mut freq = Parameter::new(cli.value);
    for spec in &cli.freq {
        freq.parse_spec(spec)?;
    }
    let mut params = ParamSet::new();
    let freq = params.add("freq", freq);
    let params = Arc::new(params);

    let graph = LocalGraph::new(sample_rate);
    let binder = Binder::new(params);
    let _listener = binder.clone().listen(graph.subscribe());

    // Built-in LFO port; reference it with e.g. `-f lfo:0.0005`.
    let mut lfo = Sine::new(sample_rate);
    lfo.set_control(cli.lfo);
    graph.register("lfo", DEFAULT_PORT, move |out: &mut [f32]| {
        for sample in out.iter_mut() {
            *sample = lfo.tick();
        }
    });

    // Scan only now that the graph side is live; anything registered later
    // reaches the registry through the listener thread.
    binder.bind_all(&graph);

    let state = RenderState {
        freq,
        mixer: ModMixer::new(sample_rate, cli.block_size, MIXER_POOL),
        voice: Sawtooth::new(sample_rate),
        mono: vec![0.0; cli.block_size],
        gain: cli.gain,
        channels,
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, state),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, state),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, state),
        other => Err(VibratoError::UnsupportedSampleFormat(format!("{:?}", other))),
    }?;

    stream
        .play()
        .map_err(|e| VibratoError::Stream(e.to_string()))?;
    info!(
        sample_rate = sample_rate as u32,
        channels,
        block_size = cli.block_size,
        "vibrato running"
    );

    if cli.duration > 0.0 {
        thread::sleep(Duration::from_secs_f32(cli.duration));
    } else {
        loop {
            thread::sleep(Duration::from_secs(1));
        }
    }
    Ok(())
}
