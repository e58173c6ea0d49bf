//! Node storage for the pipe graph.
//!
//! Each pipe in a [`Graph`](super::Graph) occupies one arena slot holding
//! its boxed [`Pipe`] behavior plus the bookkeeping the pull engine needs:
//! adjacency lists, the per-block buffer cache, and the memoization stamps
//! that keep `process` to one invocation per block time.

use crate::buffer::AudioBuffer;
use crate::pipe::Pipe;

/// Unique identifier for a pipe in a graph.
///
/// Ids are assigned sequentially and never reused within a graph
/// instance; a stale id simply fails to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipeId(pub(crate) u32);

impl PipeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PipeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PipeId({})", self.0)
    }
}

/// Internal bookkeeping for one pipe.
pub(crate) struct PipeNode {
    pub behavior: Box<dyn Pipe + Send>,
    pub source_capacity: usize,
    pub sink_capacity: usize,
    /// Connected upstream pipes, in connection order.
    pub sources: Vec<PipeId>,
    /// Connected downstream pipes, in connection order.
    pub sinks: Vec<PipeId>,
    /// Per-block buffer cache used by the cached evaluation branch.
    pub cache: Vec<AudioBuffer>,
    /// Block time of the most recent evaluation.
    pub last_time: Option<i64>,
    /// Block time the requirement cache and scan index are valid for.
    pub required_time: Option<i64>,
    /// Cached "some sink needs my output" answer for `required_time`.
    pub required_value: bool,
    /// Resume point for the multi-sink requirement scan. Mutual recursion
    /// through a fan-out can re-enter the scan for the same time; the
    /// index ensures the remaining sinks are still polled.
    pub scan_index: usize,
}

impl PipeNode {
    pub fn new(behavior: Box<dyn Pipe + Send>) -> Self {
        let source_capacity = behavior.source_capacity();
        let sink_capacity = behavior.sink_capacity();
        Self {
            behavior,
            source_capacity,
            sink_capacity,
            sources: Vec::new(),
            sinks: Vec::new(),
            cache: Vec::new(),
            last_time: None,
            required_time: None,
            required_value: false,
            scan_index: 0,
        }
    }
}
