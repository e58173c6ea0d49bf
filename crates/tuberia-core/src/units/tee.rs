//! Fan-out splitting unit.

use crate::buffer::AudioBuffer;
use crate::pipe::Pipe;

/// Maximum number of sinks a [`Tee`] accepts.
pub const MAX_TEE_SINKS: usize = 64;

/// Splitter: one source, up to [`MAX_TEE_SINKS`] sinks.
///
/// Processing is a no-op; every sink receives a copy of the single
/// input block regardless of which sink index asked.
#[derive(Default)]
pub struct Tee;

impl Tee {
    /// Creates a splitter.
    pub fn new() -> Self {
        Self
    }
}

impl Pipe for Tee {
    fn source_capacity(&self) -> usize {
        1
    }

    fn sink_capacity(&self) -> usize {
        MAX_TEE_SINKS
    }

    fn process(&mut self, _buffers: &mut [AudioBuffer]) {}

    fn write_output(
        &mut self,
        inputs: &[AudioBuffer],
        output: &mut AudioBuffer,
        _sink_index: usize,
    ) {
        match inputs.first() {
            Some(buf) if buf.is_compatible(output) => output.copy_from(buf),
            _ => output.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_sink_index_gets_slot_zero() {
        let mut tee = Tee::new();
        let mut input = AudioBuffer::new(48000.0, 4);
        input.samples_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let cache = vec![input, AudioBuffer::new(48000.0, 4)];

        for sink_index in 0..3 {
            let mut out = AudioBuffer::new(48000.0, 4);
            tee.write_output(&cache, &mut out, sink_index);
            assert_eq!(out.samples(), &[1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn empty_cache_yields_silence() {
        let mut tee = Tee::new();
        let mut out = AudioBuffer::new(48000.0, 4);
        out.samples_mut().fill(1.0);
        tee.write_output(&[], &mut out, 0);
        assert!(out.samples().iter().all(|&s| s == 0.0));
    }
}
