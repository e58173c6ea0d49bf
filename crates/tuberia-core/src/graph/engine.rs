//! The pull engine: lazy per-block evaluation with memoization.
//!
//! Sinks drive evaluation. A pipe asked to [`pull`](Graph::pull) decides
//! between two branches:
//!
//! - **in-place** (single sink, at most one source): the downstream
//!   output buffer is lent upstream for the duration of the call — a
//!   linear 1-to-1 chain renders through one buffer with no copies and
//!   no allocation. The loan always unwinds before `pull` returns.
//! - **cached** (fan-in or fan-out): the pipe maintains
//!   `max(|sources|, |sinks|)` cache slots, pulls each source into its
//!   slot (zeroing the excess), processes the cache in place, and
//!   delivers per-sink output via the behavior's `write_output`.
//!
//! The `last_time` stamp memoizes evaluation per block: however many
//! sinks pull, `process` runs at most once per time value. Requirement
//! queries (`is output needed this block?`) are amortized the same way,
//! with a resumable scan index for multi-sink pipes polled across
//! mutual recursion.

use tracing::trace;

use super::node::{PipeId, PipeNode};
use super::Graph;
use crate::buffer::AudioBuffer;

impl Graph {
    /// Pulls one block from `source` on behalf of `sink`.
    ///
    /// `sink` must be a registered sink of `source`; a pull from an
    /// unregistered consumer is a silent no-op (logged at trace level).
    /// `output` supplies the block geometry — the pipe's cache is
    /// (re)allocated to match it when a configuration change made the
    /// old cache incompatible; in steady state no allocation occurs.
    ///
    /// Re-pulling at the same `time` delivers the memoized result
    /// without re-running `process`.
    pub fn pull(&mut self, source: PipeId, sink: PipeId, output: &mut AudioBuffer, time: i64) {
        let (sink_index, in_place, stale) = {
            let Ok(node) = self.node(source) else {
                trace!(%source, "pull on unknown pipe ignored");
                return;
            };
            let Some(index) = node.sinks.iter().position(|&s| s == sink) else {
                trace!(%source, %sink, "pull from unregistered sink ignored");
                return;
            };
            (
                index,
                node.sinks.len() == 1 && node.sources.len() < 2,
                node.last_time != Some(time),
            )
        };

        if stale {
            let required = self.process_required(source, time);
            if let Ok(node) = self.node_mut(source) {
                node.last_time = Some(time);
            }
            if in_place {
                self.process_in_place(source, output, time, required);
            } else {
                self.process_cached(source, output, time, required);
            }
        }

        if !in_place && self.output_required(sink, time) {
            if let Ok(node) = self.node_mut(source) {
                let PipeNode {
                    behavior, cache, ..
                } = node;
                behavior.write_output(cache, output, sink_index);
            }
        }
    }

    /// In-place branch: render straight through the downstream buffer.
    fn process_in_place(&mut self, id: PipeId, output: &mut AudioBuffer, time: i64, required: bool) {
        let first_source = {
            let Ok(node) = self.node_mut(id) else { return };
            node.cache.clear();
            node.sources.first().copied()
        };
        match first_source {
            None => output.clear(),
            Some(src) => self.pull(src, id, output, time),
        }
        if let Ok(node) = self.node_mut(id) {
            if required {
                // The borrowed output buffer stands in as a one-slot cache.
                node.behavior.process(core::slice::from_mut(output));
            } else {
                node.behavior.skip(output.len());
            }
        }
    }

    /// Cached branch: render sources into owned cache slots.
    fn process_cached(&mut self, id: PipeId, output: &mut AudioBuffer, time: i64, required: bool) {
        let output_rate = output.sample_rate();
        let output_len = output.len();
        let (source_count, slots) = {
            let Ok(node) = self.node(id) else { return };
            let sources = node.sources.len();
            (sources, sources.max(node.sinks.len()))
        };

        // The cache leaves the node while sources are pulled, so the
        // recursion can re-borrow the arena. A mid-recursion re-entry
        // sees an empty cache and delivers silence for this block.
        let mut cache = {
            let Ok(node) = self.node_mut(id) else { return };
            std::mem::take(&mut node.cache)
        };
        cache.truncate(slots);
        for i in 0..slots {
            if cache.get(i).is_none_or(|b| !b.matches(output_rate, output_len)) {
                let fresh = AudioBuffer::new(output_rate, output_len);
                if i < cache.len() {
                    cache[i] = fresh;
                } else {
                    cache.push(fresh);
                }
            }
            let source = if i < source_count {
                self.node(id).ok().and_then(|n| n.sources.get(i).copied())
            } else {
                None
            };
            match source {
                Some(src) => self.pull(src, id, &mut cache[i], time),
                None => cache[i].clear(),
            }
        }

        if let Ok(node) = self.node_mut(id) {
            node.cache = cache;
            if required {
                let PipeNode {
                    behavior, cache, ..
                } = node;
                behavior.process(cache);
            } else {
                node.behavior.skip(output_len);
            }
        }
    }

    /// Whether `sink` wants output from its sources this block: the
    /// downstream requirement answer filtered through the sink's own
    /// behavior hook.
    fn output_required(&mut self, sink: PipeId, time: i64) -> bool {
        let base = self.process_required(sink, time);
        match self.node_mut(sink) {
            Ok(node) => node.behavior.is_output_required(base),
            Err(_) => false,
        }
    }

    /// Whether any sink of `id` needs its output this block.
    ///
    /// Single-sink pipes cache the answer per time. Multi-sink pipes
    /// scan their sinks in order with short-circuit on the first `true`,
    /// resuming from the saved index if the scan is re-entered for the
    /// same time.
    fn process_required(&mut self, id: PipeId, time: i64) -> bool {
        let single = {
            let Ok(node) = self.node(id) else { return false };
            if node.sinks.len() == 1 {
                if node.required_time == Some(time) {
                    return node.required_value;
                }
                Some(node.sinks[0])
            } else {
                None
            }
        };

        if let Some(sink) = single {
            let value = self.output_required(sink, time);
            if let Ok(node) = self.node_mut(id) {
                node.required_time = Some(time);
                node.required_value = value;
            }
            return value;
        }

        {
            let Ok(node) = self.node_mut(id) else { return false };
            if node.required_time != Some(time) {
                node.required_time = Some(time);
                node.required_value = false;
                node.scan_index = 0;
            }
            if node.required_value {
                return true;
            }
        }
        loop {
            let next = {
                let Ok(node) = self.node(id) else { return false };
                node.sinks.get(node.scan_index).copied()
            };
            let Some(sink) = next else {
                return false;
            };
            if let Ok(node) = self.node_mut(id) {
                node.scan_index += 1;
            }
            if self.output_required(sink, time) {
                if let Ok(node) = self.node_mut(id) {
                    node.required_value = true;
                    node.scan_index = 0;
                }
                return true;
            }
        }
    }
}
