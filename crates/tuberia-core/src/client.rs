//! The audio-client adapter: bridging a block-oriented device callback
//! into a pipe graph.
//!
//! An external audio host (see `tuberia-io`) owns the device and calls
//! [`AudioClient::process`] with one external buffer per callback. The
//! [`GraphClient`] implementation splits that buffer into internal
//! sub-blocks, advances the graph clock once per sub-block, and pulls the
//! graph's output sinks — so dependents, scheduled tasks, and animators
//! all see sub-block-granularity time even under large device buffers.
//!
//! Per sub-block, in order: device input is copied into the input-source
//! pipes, client listeners fire, the graph updates (dependents, then the
//! user hook), each connected output sink pulls through the graph, and
//! the sink buffers are copied to the device.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::buffer::AudioBuffer;
use crate::graph::{Graph, PipeError, PipeId};
use crate::units::{InputSource, OutputSink};

/// Audio device configuration handed to [`AudioClient::configure`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// External buffer size in samples per channel.
    pub buffer_size: usize,
    /// Device input channel count.
    pub input_channels: usize,
    /// Device output channel count.
    pub output_channels: usize,
    /// Whether the device guarantees a fixed buffer size per callback.
    pub fixed_buffer_size: bool,
}

/// Errors refusing an audio configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The device does not guarantee fixed-size buffers.
    #[error("variable buffer sizes are not supported")]
    VariableBufferSize,

    /// The external buffer is not a whole multiple of the internal block.
    #[error("external buffer size {external} is not a multiple of internal block size {internal}")]
    BlockSizeMismatch {
        /// External (device) buffer size.
        external: usize,
        /// Internal block size.
        internal: usize,
    },

    /// The sample rate is not positive.
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f64),

    /// The external buffer size is zero.
    #[error("invalid buffer size {0}")]
    InvalidBufferSize(usize),

    /// The client produces no output channels.
    #[error("a client requires at least one output channel")]
    NoOutputs,

    /// A listener (or the op it configures) rejected the configuration.
    #[error("configuration rejected: {0}")]
    Rejected(String),
}

/// The external audio-callback contract.
///
/// The host calls [`configure`](Self::configure) once before streaming,
/// [`process`](Self::process) for every device buffer on the audio
/// thread, and [`shutdown`](Self::shutdown) when the stream stops.
pub trait AudioClient: Send {
    /// Accepts or refuses the device configuration.
    fn configure(&mut self, config: &AudioConfig) -> Result<(), ConfigError>;

    /// Renders one external buffer.
    ///
    /// `time_ns` is the callback's nominal timestamp in nanoseconds and
    /// must be monotonic; `inputs`/`outputs` carry one block per device
    /// channel, each holding exactly `nframes` samples. Returns `false`
    /// when the buffer was refused (configuration mismatch) — the block
    /// is dropped.
    fn process(
        &mut self,
        time_ns: i64,
        inputs: &[AudioBuffer],
        outputs: &mut [AudioBuffer],
        nframes: usize,
    ) -> bool;

    /// Tears the client down. Must be callable exactly once after the
    /// final `process`.
    fn shutdown(&mut self);
}

/// Extension hooks fired around the client lifecycle.
///
/// Listeners can be registered from any thread; they fire on the audio
/// thread in insertion order, before the graph updates. A `configure`
/// failure propagates and aborts device initialization; `process` and
/// `shutdown` cannot fail.
pub trait ClientListener: Send + Sync {
    /// Called during client configuration.
    fn configure(&self, config: &AudioConfig) -> Result<(), ConfigError> {
        let _ = config;
        Ok(())
    }

    /// Called once per sub-block, before the graph updates.
    fn process(&self, time_ns: i64) {
        let _ = time_ns;
    }

    /// Called when the client shuts down.
    fn shutdown(&self) {}
}

/// Thread-safe client-listener registry (copy-on-write snapshots, like
/// the dependent list).
#[derive(Clone)]
pub struct Listeners {
    list: Arc<ArcSwap<Vec<Arc<dyn ClientListener>>>>,
}

impl Default for Listeners {
    fn default() -> Self {
        Self::new()
    }
}

impl Listeners {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            list: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Appends a listener.
    pub fn add(&self, listener: Arc<dyn ClientListener>) {
        self.list.rcu(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.extend(list.iter().cloned());
            next.push(listener.clone());
            next
        });
    }

    /// Removes a listener by identity; unregistered listeners are
    /// ignored.
    pub fn remove(&self, listener: &Arc<dyn ClientListener>) {
        let target = Arc::as_ptr(listener).cast::<()>();
        self.list.rcu(|list| {
            list.iter()
                .filter(|l| Arc::as_ptr(l).cast::<()>() != target)
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    fn configure_all(&self, config: &AudioConfig) -> Result<(), ConfigError> {
        let snapshot = self.list.load();
        for listener in snapshot.iter() {
            listener.configure(config)?;
        }
        Ok(())
    }

    fn process_all(&self, time_ns: i64) {
        let snapshot = self.list.load();
        for listener in snapshot.iter() {
            listener.process(time_ns);
        }
    }

    fn shutdown_all(&self) {
        let snapshot = self.list.load();
        for listener in snapshot.iter() {
            listener.shutdown();
        }
    }
}

/// [`AudioClient`] implementation that renders a [`Graph`].
///
/// Owns the graph plus one [`InputSource`] per graph input and one
/// [`OutputSink`] per graph output, wired to the graph's boundary Tees
/// and Adds at construction time.
pub struct GraphClient {
    graph: Graph,
    /// Requested internal block size; `None` follows the device buffer.
    internal_block: Option<usize>,
    input_pipes: Vec<PipeId>,
    output_pipes: Vec<PipeId>,
    output_buffers: Vec<AudioBuffer>,
    listeners: Listeners,
    block_size: usize,
    external_size: usize,
    nanos_per_block: i64,
    previous_time: i64,
    configured: bool,
}

impl GraphClient {
    /// Wraps `graph` with boundary pipes on every input and output
    /// channel. `internal_block` selects the sub-block size; `None`
    /// follows the external buffer size.
    ///
    /// Fails when a graph boundary pipe has no free slot — e.g. the
    /// output Add's single sink is already taken by an interior
    /// connection.
    pub fn new(mut graph: Graph, internal_block: Option<usize>) -> Result<Self, PipeError> {
        let mut input_pipes = Vec::with_capacity(graph.inputs().len());
        for i in 0..graph.inputs().len() {
            let tee = graph.inputs()[i];
            let source = graph.add_pipe(InputSource::new());
            graph.connect(source, tee)?;
            input_pipes.push(source);
        }
        let mut output_pipes = Vec::with_capacity(graph.outputs().len());
        for j in 0..graph.outputs().len() {
            let add = graph.outputs()[j];
            let sink = graph.add_pipe(OutputSink::new());
            graph.connect(add, sink)?;
            output_pipes.push(sink);
        }
        Ok(Self {
            graph,
            internal_block,
            input_pipes,
            output_pipes,
            output_buffers: Vec::new(),
            listeners: Listeners::new(),
            block_size: 0,
            external_size: 0,
            nanos_per_block: 0,
            previous_time: i64::MIN,
            configured: false,
        })
    }

    /// The wrapped graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the wrapped graph, for patch edits between
    /// callbacks.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The listener registry; clone it to register from other threads.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Internal block size resolved at configuration, zero before.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Nanoseconds per internal block, zero before configuration.
    pub fn nanos_per_block(&self) -> i64 {
        self.nanos_per_block
    }
}

impl AudioClient for GraphClient {
    fn configure(&mut self, config: &AudioConfig) -> Result<(), ConfigError> {
        self.configured = false;
        if !config.fixed_buffer_size {
            return Err(ConfigError::VariableBufferSize);
        }
        if config.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(config.sample_rate));
        }
        if config.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize(config.buffer_size));
        }
        if self.output_pipes.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        let internal = self.internal_block.unwrap_or(config.buffer_size);
        if internal == 0 || config.buffer_size % internal != 0 {
            return Err(ConfigError::BlockSizeMismatch {
                external: config.buffer_size,
                internal,
            });
        }

        self.block_size = internal;
        self.external_size = config.buffer_size;
        self.nanos_per_block =
            (internal as f64 / config.sample_rate * 1_000_000_000.0).round() as i64;
        self.previous_time = i64::MIN;

        for &pipe in &self.input_pipes {
            if let Some(unit) = self.graph.unit_mut::<InputSource>(pipe) {
                unit.set_block_size(internal);
            }
        }
        self.output_buffers = (0..self.output_pipes.len())
            .map(|_| AudioBuffer::new(config.sample_rate, internal))
            .collect();
        let active = config.output_channels.min(self.output_pipes.len());
        for (ch, &pipe) in self.output_pipes.iter().enumerate() {
            if let Some(unit) = self.graph.unit_mut::<OutputSink>(pipe) {
                unit.set_active(ch < active);
            }
        }

        self.graph.handle_init(config.sample_rate, internal);
        self.listeners.configure_all(config)?;

        debug!(
            sample_rate = config.sample_rate,
            external = config.buffer_size,
            internal,
            "client configured"
        );
        self.configured = true;
        Ok(())
    }

    fn process(
        &mut self,
        time_ns: i64,
        inputs: &[AudioBuffer],
        outputs: &mut [AudioBuffer],
        nframes: usize,
    ) -> bool {
        if !self.configured {
            warn!("process before successful configure; block dropped");
            return false;
        }
        if nframes != self.external_size {
            warn!(
                expected = self.external_size,
                got = nframes,
                "frame count mismatch; block dropped"
            );
            return false;
        }
        if time_ns < self.previous_time {
            warn!(
                previous = self.previous_time,
                current = time_ns,
                "device clock went backwards"
            );
        }
        self.previous_time = time_ns;

        // Device channels with no graph counterpart still must be
        // written; silence them once per callback.
        for extra in outputs.iter_mut().skip(self.output_pipes.len()) {
            extra.clear();
        }

        let sub_blocks = self.external_size / self.block_size;
        // Bias so the final sub-block lands on the callback's nominal
        // time, with each sub-block exactly one block apart.
        let mut time = time_ns - (sub_blocks as i64 - 1) * self.nanos_per_block;

        for sub in 0..sub_blocks {
            let offset = sub * self.block_size;

            for (ch, &pipe) in self.input_pipes.iter().enumerate() {
                let Some(device) = inputs.get(ch) else { break };
                let samples = device.samples();
                if samples.len() < offset + self.block_size {
                    continue;
                }
                if let Some(unit) = self.graph.unit_mut::<InputSource>(pipe) {
                    unit.fill_from(&samples[offset..offset + self.block_size]);
                }
            }

            self.listeners.process_all(time);
            self.graph.handle_update(time);

            for (ch, &sink) in self.output_pipes.iter().enumerate() {
                if let Ok(source) = self.graph.source_at(sink, 0) {
                    self.graph
                        .pull(source, sink, &mut self.output_buffers[ch], time);
                }
            }

            for (ch, buffer) in self.output_buffers.iter().enumerate() {
                let Some(device) = outputs.get_mut(ch) else { break };
                let out = device.samples_mut();
                if out.len() < offset + self.block_size {
                    continue;
                }
                out[offset..offset + self.block_size].copy_from_slice(buffer.samples());
            }

            time += self.nanos_per_block;
        }
        true
    }

    fn shutdown(&mut self) {
        for &pipe in &self.output_pipes {
            if let Some(unit) = self.graph.unit_mut::<OutputSink>(pipe) {
                unit.set_active(false);
            }
        }
        debug!("client shutting down");
        self.listeners.shutdown_all();
        self.configured = false;
    }
}
