//! Adapter bringing an [`AudioOp`] into the pipe protocol.

use crate::buffer::AudioBuffer;
use crate::op::AudioOp;
use crate::pipe::Pipe;

/// Wraps an [`AudioOp`] as a pipe with `inputs` sources and `outputs`
/// sinks.
///
/// The adapter owns all of the lifecycle bookkeeping the op contract
/// requires: it initializes the op lazily (first block, sample-rate
/// change, or a grown block size), counts the samples skipped while no
/// sink wanted output, and hands the op a single `reset(skipped)` before
/// the first processed block after a gap so time-dependent state stays
/// sample-locked.
pub struct OpPipe {
    op: Box<dyn AudioOp + Send>,
    inputs: usize,
    outputs: usize,
    initialized: bool,
    sample_rate: f64,
    block_size: usize,
    /// Samples skipped since the last processed block. `None` means the
    /// adapter went inactive and stops accounting until the op is
    /// initialized again.
    skipped: Option<u64>,
}

impl OpPipe {
    /// Creates an adapter with `channels` inputs and `channels` outputs.
    pub fn new(op: Box<dyn AudioOp + Send>, channels: usize) -> Self {
        Self::with_channels(op, channels, channels)
    }

    /// Creates an adapter with distinct input and output counts.
    pub fn with_channels(op: Box<dyn AudioOp + Send>, inputs: usize, outputs: usize) -> Self {
        Self {
            op,
            inputs,
            outputs,
            initialized: false,
            sample_rate: 0.0,
            block_size: 0,
            skipped: Some(0),
        }
    }

    /// Read access to the wrapped op.
    pub fn op(&self) -> &dyn AudioOp {
        self.op.as_ref()
    }

    /// Mutable access to the wrapped op, for parameter changes at patch
    /// edit time.
    pub fn op_mut(&mut self) -> &mut (dyn AudioOp + Send) {
        self.op.as_mut()
    }
}

impl Pipe for OpPipe {
    fn source_capacity(&self) -> usize {
        self.inputs
    }

    fn sink_capacity(&self) -> usize {
        self.outputs
    }

    fn process(&mut self, buffers: &mut [AudioBuffer]) {
        let Some(first) = buffers.first() else {
            self.skipped = None;
            return;
        };
        let sample_rate = first.sample_rate();
        let block_size = first.len();

        if !self.initialized || sample_rate != self.sample_rate || block_size > self.block_size {
            self.op.initialize(sample_rate, block_size);
            self.sample_rate = sample_rate;
            self.block_size = block_size;
            self.initialized = true;
            self.skipped = Some(0);
        } else if let Some(skipped) = self.skipped
            && skipped > 0
        {
            self.op.reset(skipped);
            self.skipped = Some(0);
        }

        self.op.process_replace(buffers);
    }

    fn skip(&mut self, samples: usize) {
        if let Some(skipped) = self.skipped.as_mut() {
            *skipped += samples as u64;
        }
    }

    fn is_output_required(&mut self, output_required: bool) -> bool {
        self.op.is_input_required(output_required)
    }
}
