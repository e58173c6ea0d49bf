//! Multi-input combining unit.

use crate::buffer::AudioBuffer;
use crate::pipe::Pipe;

/// Maximum number of sources a [`Mod`] accepts.
pub const MAX_MOD_SOURCES: usize = 32;

/// Sample combiner applied between the accumulator and each extra input.
pub type CombineFn = Box<dyn Fn(f32, f32) -> f32 + Send>;

/// Accumulator: up to [`MAX_MOD_SOURCES`] sources, one sink.
///
/// Folds every source beyond the first into the first block
/// sample-by-sample with a binary combine function. The default is
/// multiplication — ring modulation and envelope shaping fall out of
/// connecting a modulator next to a carrier.
pub struct Mod {
    combine: CombineFn,
}

impl Default for Mod {
    fn default() -> Self {
        Self::new()
    }
}

impl Mod {
    /// Creates a multiplying combiner.
    pub fn new() -> Self {
        Self::with(Box::new(|a, b| a * b))
    }

    /// Creates a combiner with a custom binary function.
    pub fn with(combine: CombineFn) -> Self {
        Self { combine }
    }
}

impl Pipe for Mod {
    fn source_capacity(&self) -> usize {
        MAX_MOD_SOURCES
    }

    fn sink_capacity(&self) -> usize {
        1
    }

    fn process(&mut self, buffers: &mut [AudioBuffer]) {
        let Some((first, rest)) = buffers.split_first_mut() else {
            return;
        };
        for buf in rest.iter() {
            for (dst, src) in first.samples_mut().iter_mut().zip(buf.samples()) {
                *dst = (self.combine)(*dst, *src);
            }
        }
    }

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

    fn buf(samples: &[f32]) -> AudioBuffer {
        let mut b = AudioBuffer::new(48000.0, samples.len());
        b.samples_mut().copy_from_slice(samples);
        b
    }

    #[test]
    fn default_combiner_multiplies() {
        let mut unit = Mod::new();
        let mut cache = vec![buf(&[2.0, 3.0]), buf(&[0.5, 2.0]), buf(&[1.0, 0.5])];
        unit.process(&mut cache);
        assert_eq!(cache[0].samples(), &[1.0, 3.0]);
    }

    #[test]
    fn custom_combiner_applies_in_order() {
        let mut unit = Mod::with(Box::new(|a, b| a - b));
        let mut cache = vec![buf(&[10.0]), buf(&[3.0]), buf(&[2.0])];
        unit.process(&mut cache);
        assert_eq!(cache[0].samples(), &[5.0]);
    }

    #[test]
    fn single_input_is_identity() {
        let mut unit = Mod::new();
        let mut cache = vec![buf(&[0.25, 0.75])];
        unit.process(&mut cache);
        assert_eq!(cache[0].samples(), &[0.25, 0.75]);
    }
}
