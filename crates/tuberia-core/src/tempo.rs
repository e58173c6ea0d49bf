//! Tempo-aligned trigger clock.
//!
//! A [`Clock`] fires listeners on a musical grid derived from the graph
//! clock: beats-per-minute with a subdivision (default 4 pulses per
//! beat), quantized to whole blocks. At 120 BPM with subdivision 4 and
//! 64-sample blocks at 48 kHz, a pulse lands every
//! `round(0.125 s / 1.333 ms) = 94` blocks.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::{Dependent, SampleClock};

/// Default pulses per beat.
pub const DEFAULT_SUBDIVISION: u32 = 4;

type PulseFn = Box<dyn FnMut(u64) + Send>;

struct ClockState {
    bpm: f64,
    subdivision: u32,
    max_index: u64,
    /// Blocks between pulses; recomputed lazily against the graph clock.
    buffer_count: u32,
    counter: u32,
    index: u64,
    dirty: bool,
}

impl ClockState {
    fn recompute(&mut self, clock: &SampleClock) {
        let block_seconds = clock.block_size() as f64 / clock.sample_rate();
        let pulse_seconds = 60.0 / (self.bpm * f64::from(self.subdivision));
        self.buffer_count = ((pulse_seconds / block_seconds).round() as u32).max(1);
        self.dirty = false;
    }
}

struct ClockInner {
    state: Mutex<ClockState>,
    listeners: Mutex<Vec<PulseFn>>,
}

impl Dependent for ClockInner {
    fn update(&self, clock: &SampleClock) {
        let fire = {
            let mut state = self.state.lock();
            if state.dirty || state.buffer_count == 0 {
                if clock.sample_rate() <= 0.0 || clock.block_size() == 0 {
                    return;
                }
                state.recompute(clock);
            }
            let fire = if state.counter == 0 {
                let index = state.index;
                state.index = (state.index + 1) % state.max_index.max(1);
                Some(index)
            } else {
                None
            };
            state.counter = (state.counter + 1) % state.buffer_count;
            fire
        };
        if let Some(index) = fire {
            let mut listeners = self.listeners.lock();
            for listener in listeners.iter_mut() {
                listener(index);
            }
        }
    }
}

/// Tempo trigger dependent.
///
/// Cloning the handle shares the clock. Register it with a graph
/// (`graph.add_dependent(clock.dependent())`); listeners fire on the
/// audio thread with a monotonically increasing pulse index that wraps
/// at [`set_max_index`](Self::set_max_index).
#[derive(Clone)]
pub struct Clock {
    inner: Arc<ClockInner>,
}

impl Clock {
    /// Creates a clock at `bpm` with the default subdivision.
    pub fn new(bpm: f64) -> Self {
        Self::with_subdivision(bpm, DEFAULT_SUBDIVISION)
    }

    /// Creates a clock at `bpm` firing `subdivision` pulses per beat.
    pub fn with_subdivision(bpm: f64, subdivision: u32) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                state: Mutex::new(ClockState {
                    bpm: bpm.max(1.0),
                    subdivision: subdivision.max(1),
                    max_index: u64::MAX,
                    buffer_count: 0,
                    counter: 0,
                    index: 0,
                    dirty: true,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current tempo in beats per minute.
    pub fn bpm(&self) -> f64 {
        self.inner.state.lock().bpm
    }

    /// Sets the tempo. Takes effect at the next block boundary.
    pub fn set_bpm(&self, bpm: f64) {
        let mut state = self.inner.state.lock();
        state.bpm = bpm.max(1.0);
        state.dirty = true;
    }

    /// Sets the pulses-per-beat subdivision. Takes effect at the next
    /// block boundary.
    pub fn set_subdivision(&self, subdivision: u32) {
        let mut state = self.inner.state.lock();
        state.subdivision = subdivision.max(1);
        state.dirty = true;
    }

    /// Sets the wrap point for the pulse index.
    pub fn set_max_index(&self, max_index: u64) {
        self.inner.state.lock().max_index = max_index.max(1);
    }

    /// Blocks between pulses, as last computed. Zero until the clock has
    /// seen a configured graph.
    pub fn buffer_count(&self) -> u32 {
        self.inner.state.lock().buffer_count
    }

    /// Registers a pulse listener.
    pub fn link(&self, listener: impl FnMut(u64) + Send + 'static) {
        self.inner.listeners.lock().push(Box::new(listener));
    }

    /// This clock's graph-dependent view, for
    /// [`Graph::add_dependent`](crate::graph::Graph::add_dependent).
    pub fn dependent(&self) -> Arc<dyn Dependent> {
        self.inner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_blocks(clock: &Clock, blocks: usize) -> Vec<(usize, u64)> {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let block = Arc::new(Mutex::new(0usize));
        let current = block.clone();
        clock.link(move |index| sink.lock().push((*current.lock(), index)));

        let dep = clock.dependent();
        for n in 0..blocks {
            *block.lock() = n;
            let sample_clock = SampleClock::new((n * 64) as i64, 48000.0, 64);
            dep.update(&sample_clock);
        }
        let result = fired.lock().clone();
        result
    }

    #[test]
    fn pulse_interval_matches_tempo_derivation() {
        // 120 BPM, subdivision 4 → 0.125 s per pulse; 64/48000 s per
        // block → 94 blocks per pulse (rounded).
        let clock = Clock::new(120.0);
        let fired = run_blocks(&clock, 200);
        assert_eq!(clock.buffer_count(), 94);
        assert_eq!(fired, vec![(0, 0), (94, 1), (188, 2)]);
    }

    #[test]
    fn index_wraps_at_max_index() {
        let clock = Clock::with_subdivision(6000.0, 4);
        clock.set_max_index(3);
        // 6000 BPM * 4 → pulse every 2.5 ms → every block at ~1.33 ms
        // rounds to 2 blocks.
        let fired = run_blocks(&clock, 12);
        let indices: Vec<u64> = fired.iter().map(|&(_, i)| i).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn bpm_change_takes_effect_next_block() {
        let clock = Clock::new(120.0);
        let dep = clock.dependent();
        dep.update(&SampleClock::new(0, 48000.0, 64));
        assert_eq!(clock.buffer_count(), 94);

        clock.set_bpm(240.0);
        dep.update(&SampleClock::new(64, 48000.0, 64));
        assert_eq!(clock.buffer_count(), 47);
    }
}
