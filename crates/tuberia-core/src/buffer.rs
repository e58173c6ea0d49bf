//! Fixed-size audio sample blocks.
//!
//! An [`AudioBuffer`] is one block of single-precision samples tagged with
//! the sample rate and size it was created for. Buffers never reallocate
//! after construction; the pull engine replaces an incompatible buffer
//! wholesale rather than resizing it, so steady-state processing stays
//! allocation-free.

/// A fixed-size block of `f32` samples.
///
/// Two buffers are *compatible* when both their sample rate and their size
/// match. The bulk operations ([`copy_from`](Self::copy_from),
/// [`add_from`](Self::add_from), [`mix_from`](Self::mix_from)) require a
/// compatible source; this is caller-enforced and debug-asserted.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    sample_rate: f64,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Creates a zeroed buffer for the given sample rate and size.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate` is not positive or `size` is zero. Both are
    /// fixed for the buffer's lifetime.
    pub fn new(sample_rate: f64, size: usize) -> Self {
        assert!(sample_rate > 0.0, "sample rate must be positive");
        assert!(size > 0, "buffer size must be non-zero");
        Self {
            sample_rate,
            samples: vec![0.0; size],
        }
    }

    /// Returns the sample rate this buffer was created for.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns the number of samples in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false — zero-size buffers cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns true when `other` has the same sample rate and size.
    #[inline]
    pub fn is_compatible(&self, other: &AudioBuffer) -> bool {
        self.matches(other.sample_rate, other.samples.len())
    }

    /// Returns true when this buffer was created for the given rate and size.
    #[inline]
    pub(crate) fn matches(&self, sample_rate: f64, size: usize) -> bool {
        self.sample_rate == sample_rate && self.samples.len() == size
    }

    /// Read access to the sample data.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable access to the sample data.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Fills the block with zeroes.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Copies contents from a compatible buffer.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        debug_assert!(self.is_compatible(other));
        self.samples.copy_from_slice(&other.samples);
    }

    /// Adds a compatible buffer's contents sample-by-sample.
    pub fn add_from(&mut self, other: &AudioBuffer) {
        debug_assert!(self.is_compatible(other));
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src;
        }
    }

    /// Adds a compatible buffer's contents scaled by `gain`.
    pub fn mix_from(&mut self, other: &AudioBuffer, gain: f32) {
        debug_assert!(self.is_compatible(other));
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src * gain;
        }
    }
}
