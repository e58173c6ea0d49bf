//! The unit-generator behavior contract.
//!
//! Every node in a [`Graph`](crate::graph::Graph) pairs bookkeeping (its
//! source and sink connections, buffer cache, memoization stamps) with a
//! boxed [`Pipe`] behavior. The graph's pull engine decides *when* a pipe
//! runs; the behavior decides *what* it does to the buffers. Canonical
//! behaviors live in [`units`](crate::units); custom units implement this
//! trait directly.
//!
//! All methods are invoked on the audio thread and must not allocate,
//! block, or perform I/O.

use std::any::Any;

use crate::buffer::AudioBuffer;

/// Behavior of one unit generator in the graph.
///
/// The provided defaults give a transparent 1-in/1-out unit: output is
/// delivered by copying the matching cache slot, skipping is a no-op, and
/// output requirement passes straight through. Override the hooks whose
/// defaults don't fit — a splitter overrides
/// [`write_output`](Self::write_output), an op wrapper overrides
/// [`skip`](Self::skip) and [`is_output_required`](Self::is_output_required).
///
/// The `Any` supertrait allows typed access to a unit stored in a graph
/// via [`Graph::unit_mut`](crate::graph::Graph::unit_mut).
pub trait Pipe: Any + Send {
    /// Maximum number of source connections.
    fn source_capacity(&self) -> usize;

    /// Maximum number of sink connections.
    fn sink_capacity(&self) -> usize;

    /// Transforms the populated input buffers in place.
    ///
    /// On the in-place fast path `buffers` is a single block that doubles
    /// as the downstream output; on the cached path it is this pipe's
    /// cache, one slot per source (plus zeroed slots when the pipe has
    /// more sinks than sources). Runs at most once per block time.
    fn process(&mut self, buffers: &mut [AudioBuffer]);

    /// Called instead of [`process`](Self::process) when no sink needs
    /// output this block, so stateful units can account for the samples
    /// that were never rendered.
    fn skip(&mut self, samples: usize) {
        let _ = samples;
    }

    /// Delivers this pipe's cached result to the sink at `sink_index`.
    ///
    /// Default: copy `inputs[sink_index]`, or zero the output when the
    /// index has no matching cache slot.
    fn write_output(&mut self, inputs: &[AudioBuffer], output: &mut AudioBuffer, sink_index: usize) {
        match inputs.get(sink_index) {
            Some(buf) if buf.is_compatible(output) => output.copy_from(buf),
            _ => output.clear(),
        }
    }

    /// Maps "does anything downstream need my output" onto "do I require
    /// output from my sources".
    ///
    /// `output_required` is the answer the graph computed by polling this
    /// pipe's sinks. The default passes it through; overrides encode
    /// behavior-level pruning (see
    /// [`AudioOp::is_input_required`](crate::op::AudioOp::is_input_required))
    /// or terminate the query at a graph boundary.
    fn is_output_required(&mut self, output_required: bool) -> bool {
        output_required
    }
}
