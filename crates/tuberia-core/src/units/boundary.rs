//! Boundary pipes owned by the client adapter.
//!
//! An [`InputSource`] sits at the device edge and emits the block of
//! input samples the adapter copied in for the current sub-block. An
//! [`OutputSink`] terminates an output channel: it accepts exactly one
//! source, exposes no further sinks, and carries the channel's active
//! flag, which is the answer the requirement protocol bottoms out on.

use crate::buffer::AudioBuffer;
use crate::pipe::Pipe;

/// Device-input boundary pipe: no sources, one sink.
///
/// The client adapter copies one sub-block of device input into
/// [`fill_from`](Self::fill_from) before firing the block; when the graph
/// pulls this pipe, the stored samples become the block's content.
#[derive(Default)]
pub struct InputSource {
    data: Vec<f32>,
}

impl InputSource {
    /// Creates an input source with no storage; the adapter sizes it at
    /// configuration time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the stored block. Called at configuration time only.
    pub fn set_block_size(&mut self, size: usize) {
        self.data.clear();
        self.data.resize(size, 0.0);
    }

    /// Copies device samples into the stored block. Extra samples on
    /// either side are ignored or left zeroed.
    pub fn fill_from(&mut self, samples: &[f32]) {
        let n = self.data.len().min(samples.len());
        self.data[..n].copy_from_slice(&samples[..n]);
    }

    /// The stored block.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl Pipe for InputSource {
    fn source_capacity(&self) -> usize {
        0
    }

    fn sink_capacity(&self) -> usize {
        1
    }

    fn process(&mut self, buffers: &mut [AudioBuffer]) {
        let Some(buf) = buffers.first_mut() else {
            return;
        };
        let out = buf.samples_mut();
        let n = out.len().min(self.data.len());
        out[..n].copy_from_slice(&self.data[..n]);
    }
}

/// Device-output boundary pipe: one source, no sinks.
///
/// The adapter pulls this pipe's source directly, so the sink itself
/// never evaluates; its job is answering the requirement query for its
/// channel. An inactive channel prunes the whole upstream chain (ops
/// with tails keep themselves alive via
/// [`AudioOp::is_input_required`](crate::op::AudioOp::is_input_required)).
#[derive(Default)]
pub struct OutputSink {
    active: bool,
}

impl OutputSink {
    /// Creates an inactive output sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this channel is being delivered to the device.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Sets the channel's active flag.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl Pipe for OutputSink {
    fn source_capacity(&self) -> usize {
        1
    }

    fn sink_capacity(&self) -> usize {
        0
    }

    fn process(&mut self, _buffers: &mut [AudioBuffer]) {}

    fn is_output_required(&mut self, _output_required: bool) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_source_emits_stored_block() {
        let mut source = InputSource::new();
        source.set_block_size(4);
        source.fill_from(&[0.1, 0.2, 0.3, 0.4]);

        let mut cache = vec![AudioBuffer::new(48000.0, 4)];
        source.process(&mut cache);
        assert_eq!(cache[0].samples(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn short_fill_leaves_tail_zeroed() {
        let mut source = InputSource::new();
        source.set_block_size(4);
        source.fill_from(&[1.0, 2.0]);
        assert_eq!(source.data(), &[1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn output_sink_requirement_tracks_active_flag() {
        let mut sink = OutputSink::new();
        assert!(!sink.is_output_required(true));
        sink.set_active(true);
        assert!(sink.is_output_required(false));
    }
}
