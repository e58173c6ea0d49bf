//! Canonical pipe units.
//!
//! These are the building blocks every patch uses: the summing [`Add`],
//! the splitting [`Tee`], the combining [`Mod`], the [`OpPipe`] adapter
//! that brings an [`AudioOp`](crate::op::AudioOp) into the graph, and the
//! boundary pipes the client adapter owns at the device edge.

mod add;
mod boundary;
mod combine;
mod op_pipe;
mod tee;

pub use add::{Add, MAX_ADD_SOURCES};
pub use boundary::{InputSource, OutputSink};
pub use combine::{CombineFn, MAX_MOD_SOURCES, Mod};
pub use op_pipe::OpPipe;
pub use tee::{MAX_TEE_SINKS, Tee};
