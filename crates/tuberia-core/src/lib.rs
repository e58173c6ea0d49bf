//! Tuberia Core — a pull-based realtime audio pipe graph.
//!
//! A graph of unit generators ("pipes") exchanges fixed-size blocks of
//! `f32` samples, driven by an external audio callback. Downstream sinks
//! pull from upstream sources on each block boundary; evaluation is lazy
//! with per-block memoization and an in-place fast path for linear
//! chains.
//!
//! # Core Abstractions
//!
//! ## The graph
//!
//! - [`Graph`] - arena of pipes, connection discipline, pull engine
//! - [`Pipe`] - behavior contract for unit generators
//! - [`AudioBuffer`] - one fixed-size block of samples
//! - [`units`] - canonical pipes: [`Add`](units::Add),
//!   [`Tee`](units::Tee), [`Mod`](units::Mod),
//!   [`OpPipe`](units::OpPipe), and the client boundary pipes
//!
//! ## The device edge
//!
//! - [`AudioOp`] - external contract for in-place DSP operators
//! - [`AudioClient`] / [`GraphClient`] - the block callback adapter,
//!   including internal sub-blocking
//!
//! ## Sample-locked time
//!
//! - [`SampleClock`] - nanosecond time derived from the sample position
//! - [`BlockScheduler`] - per-block task executor and delay queue
//! - [`Property`] - animatable scalar values
//! - [`Clock`] - tempo-aligned trigger
//!
//! # Example
//!
//! ```rust
//! use tuberia_core::{AudioBuffer, AudioClient, AudioConfig, Graph, GraphClient};
//!
//! // A one-in/one-out passthrough patch.
//! let mut graph = Graph::new(1, 1);
//! let (input, output) = (graph.inputs()[0], graph.outputs()[0]);
//! graph.connect(input, output).unwrap();
//!
//! let mut client = GraphClient::new(graph, Some(64)).unwrap();
//! client
//!     .configure(&AudioConfig {
//!         sample_rate: 48000.0,
//!         buffer_size: 256,
//!         input_channels: 1,
//!         output_channels: 1,
//!         fixed_buffer_size: true,
//!     })
//!     .unwrap();
//!
//! let inputs = [AudioBuffer::new(48000.0, 256)];
//! let mut outputs = [AudioBuffer::new(48000.0, 256)];
//! assert!(client.process(0, &inputs, &mut outputs, 256));
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: steady-state processing never allocates; the
//!   cached branch allocates only when a configuration change left a
//!   pipe with incompatible buffers
//! - **Single-threaded evaluation**: all pipe state mutation happens on
//!   the audio thread, with no locks on the hot path
//! - **Lock-free control plane**: listener and dependent registries use
//!   copy-on-write snapshots; the scheduler intake is a lock-free queue
//! - **Sample-locked time**: scheduling, animation, and tempo all derive
//!   from the sample position, never wall time

pub mod buffer;
pub mod client;
pub mod graph;
pub mod op;
pub mod pipe;
pub mod property;
pub mod sched;
pub mod tempo;
pub mod units;

// Re-export main types at crate root
pub use buffer::AudioBuffer;
pub use client::{AudioClient, AudioConfig, ClientListener, ConfigError, GraphClient, Listeners};
pub use graph::{Dependent, Dependents, Graph, GraphHook, PipeError, PipeId, SampleClock};
pub use op::AudioOp;
pub use pipe::Pipe;
pub use property::{Animator, Easing, Property};
pub use sched::{BlockScheduler, SchedulerError, TaskHandle};
pub use tempo::Clock;
