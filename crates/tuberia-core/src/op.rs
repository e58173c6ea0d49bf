//! The external sample-transformer contract.
//!
//! An [`AudioOp`] is a pure buffer transformer with an
//! initialize/reset/process lifecycle. Concrete DSP (filters, reverbs,
//! oscillators, samplers) lives behind this trait and is wrapped into the
//! graph by [`OpPipe`](crate::units::OpPipe), which handles all of the
//! scheduling bookkeeping — an op only ever sees fully populated blocks.
//!
//! Ops are driven on the audio thread. The process methods must not
//! allocate, block, or perform I/O.

use crate::buffer::AudioBuffer;

/// A block transformer with an initialize/reset/process lifecycle.
///
/// The trait is object-safe; the graph stores ops as
/// `Box<dyn AudioOp + Send>`.
pub trait AudioOp: Send {
    /// Called before the first process call and again whenever the sample
    /// rate changes or the block size grows beyond `max_block_size`.
    fn initialize(&mut self, sample_rate: f64, max_block_size: usize);

    /// Called when processing resumes after `skipped` samples were never
    /// rendered. Ops with time-dependent state (LFO phase, envelopes,
    /// delay read heads) advance by `skipped` samples here so resumed
    /// output stays sample-locked.
    fn reset(&mut self, skipped: u64) {
        let _ = skipped;
    }

    /// Answers whether the op needs live input to produce correct output.
    ///
    /// `output_required` is whether anything downstream wants this op's
    /// output for the current block. An effect with a decaying tail
    /// returns `true` for the tail duration even when `output_required`
    /// is false; a pure generator may return `false` so its unused
    /// source chain stops being pulled. The default passes the flag
    /// through.
    fn is_input_required(&self, output_required: bool) -> bool {
        output_required
    }

    /// Transforms the channel blocks in place.
    ///
    /// `buffers[c]` is channel `c`, already holding this block's input
    /// samples; the op overwrites them with its output. This is the
    /// replace form of processing — input and output are the same
    /// storage by construction.
    fn process_replace(&mut self, buffers: &mut [AudioBuffer]);

    /// Accumulates the op's output into `outputs`, leaving `inputs`
    /// untouched.
    fn process_add(&mut self, outputs: &mut [AudioBuffer], inputs: &[AudioBuffer]);
}
