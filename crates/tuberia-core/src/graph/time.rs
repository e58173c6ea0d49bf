//! The graph's sample-derived clock.
//!
//! All timed behavior in the graph — the scheduler, animators, tempo
//! clocks — is driven by the integer sample position, not wall time. If
//! the audio thread falls behind and several blocks are processed in one
//! wall-clock burst, sample time stays self-consistent.

/// Nanoseconds per second, as f64 for position conversions.
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A copyable view of the graph clock at one block boundary.
///
/// Handed to [`Dependent::update`](super::Dependent::update) and the
/// graph's user hooks at the start of every block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleClock {
    position: i64,
    sample_rate: f64,
    block_size: usize,
}

impl SampleClock {
    pub(crate) fn new(position: i64, sample_rate: f64, block_size: usize) -> Self {
        Self {
            position,
            sample_rate,
            block_size,
        }
    }

    /// Current position in samples. Increments by exactly
    /// [`block_size`](Self::block_size) per block.
    #[inline]
    pub fn samples(&self) -> i64 {
        self.position
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Samples per block.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Position in milliseconds.
    #[inline]
    pub fn millis(&self) -> f64 {
        self.position as f64 / self.sample_rate * 1_000.0
    }

    /// Position in nanoseconds. This is the scheduler's notion of "now".
    #[inline]
    pub fn nanos(&self) -> i64 {
        (self.position as f64 / self.sample_rate * NANOS_PER_SEC).round() as i64
    }

    /// Duration of one block in nanoseconds.
    #[inline]
    pub fn nanos_per_block(&self) -> i64 {
        (self.block_size as f64 / self.sample_rate * NANOS_PER_SEC).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_views_agree() {
        // 64 samples at 64 kHz is exactly one millisecond.
        let clock = SampleClock::new(128, 64000.0, 64);
        assert_eq!(clock.samples(), 128);
        assert!((clock.millis() - 2.0).abs() < 1e-9);
        assert_eq!(clock.nanos(), 2_000_000);
        assert_eq!(clock.nanos_per_block(), 1_000_000);
    }

    #[test]
    fn negative_position_before_first_block() {
        let clock = SampleClock::new(-64, 48000.0, 64);
        assert!(clock.nanos() < 0);
    }
}
