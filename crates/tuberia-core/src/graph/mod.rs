//! The pipe graph: arena, connection discipline, and per-block lifecycle.
//!
//! A [`Graph`] owns every pipe as an arena slot keyed by [`PipeId`] and
//! evaluates the graph lazily: sinks pull blocks from sources, each pipe
//! processes at most once per block time, and linear 1-to-1 chains run
//! through a single borrowed buffer (the in-place fast path). The pull
//! engine itself lives in [`engine`].
//!
//! # Architecture
//!
//! Mutations (add, remove, connect) happen at patch-edit time on whatever
//! thread owns the graph; evaluation happens on the audio thread via the
//! owning [`GraphClient`](crate::client::GraphClient). The only state
//! shared across threads is deliberately lock-free for the reader: the
//! dependent registry ([`Dependents`]), the client listener list, and the
//! scheduler intake queue.
//!
//! # Boundary topology
//!
//! Construction allocates one [`Tee`](crate::units::Tee) per input channel
//! and one [`Add`](crate::units::Add) per output channel, so any number of
//! interior pipes can tap an input and any number can sum into an output.
//! Feedback from inside the graph back to an input Tee is therefore
//! possible only through the client boundary and arrives one block late;
//! direct cycles are rejected at [`connect`](Graph::connect) time.
//!
//! # Per-block lifecycle
//!
//! Driven by the client adapter for every (sub-)block:
//!
//! 1. sample position advances by exactly one block,
//! 2. dependents update in registration order (the scheduler first),
//! 3. the user update hook runs,
//! 4. output sinks pull through the graph.

mod dependents;
mod engine;
mod error;
mod node;
mod time;

pub use dependents::{Dependent, Dependents};
pub use error::PipeError;
pub use node::PipeId;
pub use time::SampleClock;

pub(crate) use node::PipeNode;

use std::any::Any;
use std::sync::Arc;

use crate::op::AudioOp;
use crate::pipe::Pipe;
use crate::sched::BlockScheduler;
use crate::units::{Add, Mod, OpPipe, Tee};

/// Hook closure fired from the graph's block lifecycle.
pub type GraphHook = Box<dyn FnMut(&SampleClock) + Send>;

/// A pull-evaluated pipe graph with a sample-locked clock.
pub struct Graph {
    nodes: Vec<Option<PipeNode>>,
    next_slot: u32,
    inputs: Vec<PipeId>,
    outputs: Vec<PipeId>,
    dependents: Dependents,
    scheduler: Arc<BlockScheduler>,
    /// Sample position of the block currently being rendered. Starts one
    /// block negative so the first update lands on zero.
    position: i64,
    block_size: usize,
    sample_rate: f64,
    /// Raw device timestamp of the current sub-block, as handed to `pull`.
    block_time: i64,
    init_hook: Option<GraphHook>,
    update_hook: Option<GraphHook>,
}

impl Graph {
    /// Creates a graph with `input_count` input Tees and `output_count`
    /// output Adds, and registers the sample-locked scheduler as the
    /// first dependent.
    pub fn new(input_count: usize, output_count: usize) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            next_slot: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            dependents: Dependents::new(),
            scheduler: Arc::new(BlockScheduler::new()),
            position: 0,
            block_size: 0,
            sample_rate: 0.0,
            block_time: 0,
            init_hook: None,
            update_hook: None,
        };
        for _ in 0..input_count {
            let id = graph.add_pipe(Tee::new());
            graph.inputs.push(id);
        }
        for _ in 0..output_count {
            let id = graph.add_pipe(Add::new());
            graph.outputs.push(id);
        }
        let scheduler: Arc<dyn Dependent> = graph.scheduler.clone();
        graph.dependents.add(scheduler);
        graph
    }

    // --- Pipe mutations ---

    /// Adds a unit to the graph, returning its id.
    pub fn add_pipe<P: Pipe + Send>(&mut self, pipe: P) -> PipeId {
        self.add_boxed_pipe(Box::new(pipe))
    }

    /// Adds an already-boxed unit to the graph.
    pub fn add_boxed_pipe(&mut self, pipe: Box<dyn Pipe + Send>) -> PipeId {
        let id = PipeId(self.next_slot);
        self.next_slot += 1;
        let idx = id.0 as usize;
        if idx >= self.nodes.len() {
            self.nodes.resize_with(idx + 1, || None);
        }
        self.nodes[idx] = Some(PipeNode::new(pipe));
        id
    }

    /// Adds an [`OpPipe`] wrapping the given op with `channels` inputs
    /// and `channels` outputs.
    pub fn add_op(&mut self, op: Box<dyn AudioOp + Send>, channels: usize) -> PipeId {
        self.add_pipe(OpPipe::new(op, channels))
    }

    /// Adds a fan-out [`Tee`].
    pub fn add_tee(&mut self) -> PipeId {
        self.add_pipe(Tee::new())
    }

    /// Adds a summing [`Add`].
    pub fn add_add(&mut self) -> PipeId {
        self.add_pipe(Add::new())
    }

    /// Adds a multiplying [`Mod`] accumulator.
    pub fn add_mod(&mut self) -> PipeId {
        self.add_pipe(Mod::new())
    }

    /// Removes a pipe, detaching every connection it participates in
    /// (both directions stay symmetric).
    pub fn remove_pipe(&mut self, id: PipeId) -> Result<(), PipeError> {
        let node = self.node(id)?;
        let sources = node.sources.clone();
        let sinks = node.sinks.clone();
        for src in sources {
            self.disconnect(src, id);
        }
        for sink in sinks {
            self.disconnect(id, sink);
        }
        self.nodes[id.0 as usize] = None;
        self.inputs.retain(|&p| p != id);
        self.outputs.retain(|&p| p != id);
        Ok(())
    }

    /// Connects `src` as a source of `sink`.
    ///
    /// The cross-registration is atomic from the caller's perspective:
    /// either both sides record the link or neither does. Errors follow
    /// the receiving side — [`PipeError::SinkFull`] when `src` has no
    /// sink slot left, [`PipeError::SourceFull`] when `sink` has no
    /// source slot left, [`PipeError::Duplicate`] when the link already
    /// exists, [`PipeError::CycleDetected`] when the link would close a
    /// loop.
    pub fn connect(&mut self, src: PipeId, sink: PipeId) -> Result<(), PipeError> {
        self.node(src)?;
        self.node(sink)?;

        // A new src→sink edge closes a loop iff src is already reachable
        // by walking downstream from sink.
        if self.can_reach(sink, src) {
            return Err(PipeError::CycleDetected { src, sink });
        }

        // First register the sink on the source side...
        {
            let node = self.node_mut_infallible(src);
            if node.sinks.contains(&sink) {
                return Err(PipeError::Duplicate { src, sink });
            }
            if node.sinks.len() >= node.sink_capacity {
                return Err(PipeError::SinkFull(src));
            }
            node.sinks.push(sink);
        }

        // ...then the source on the sink side, unwinding on failure so
        // the graph is never left half-connected.
        let result = {
            let node = self.node_mut_infallible(sink);
            if node.sources.contains(&src) {
                Err(PipeError::Duplicate { src, sink })
            } else if node.sources.len() >= node.source_capacity {
                Err(PipeError::SourceFull(sink))
            } else {
                node.sources.push(src);
                Ok(())
            }
        };
        if result.is_err() {
            self.node_mut_infallible(src).sinks.retain(|&p| p != sink);
        }
        result
    }

    /// Disconnects `src` from `sink` in both directions.
    ///
    /// Idempotent-safe: a side with no record of the link is silently
    /// left alone, and unknown ids are ignored.
    pub fn disconnect(&mut self, src: PipeId, sink: PipeId) {
        if let Ok(node) = self.node_mut(src) {
            node.sinks.retain(|&p| p != sink);
        }
        if let Ok(node) = self.node_mut(sink) {
            node.sources.retain(|&p| p != src);
        }
    }

    // --- Accessors ---

    /// Input-boundary Tees, one per input channel.
    pub fn inputs(&self) -> &[PipeId] {
        &self.inputs
    }

    /// Output-boundary Adds, one per output channel.
    pub fn outputs(&self) -> &[PipeId] {
        &self.outputs
    }

    /// Number of connected sources of `id`.
    pub fn source_count(&self, id: PipeId) -> Result<usize, PipeError> {
        Ok(self.node(id)?.sources.len())
    }

    /// Number of connected sinks of `id`.
    pub fn sink_count(&self, id: PipeId) -> Result<usize, PipeError> {
        Ok(self.node(id)?.sinks.len())
    }

    /// Source capacity of `id`, fixed at construction.
    pub fn source_capacity(&self, id: PipeId) -> Result<usize, PipeError> {
        Ok(self.node(id)?.source_capacity)
    }

    /// Sink capacity of `id`, fixed at construction.
    pub fn sink_capacity(&self, id: PipeId) -> Result<usize, PipeError> {
        Ok(self.node(id)?.sink_capacity)
    }

    /// The source connected at `index`, in connection order.
    pub fn source_at(&self, id: PipeId, index: usize) -> Result<PipeId, PipeError> {
        let node = self.node(id)?;
        node.sources
            .get(index)
            .copied()
            .ok_or(PipeError::IndexOutOfRange {
                pipe: id,
                index,
                len: node.sources.len(),
            })
    }

    /// The sink connected at `index`, in connection order.
    pub fn sink_at(&self, id: PipeId, index: usize) -> Result<PipeId, PipeError> {
        let node = self.node(id)?;
        node.sinks
            .get(index)
            .copied()
            .ok_or(PipeError::IndexOutOfRange {
                pipe: id,
                index,
                len: node.sinks.len(),
            })
    }

    /// Number of live pipes in the arena.
    pub fn pipe_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Typed access to the unit behind `id`.
    ///
    /// Returns `None` when the id doesn't resolve or the unit is not a
    /// `T`.
    pub fn unit<T: Pipe>(&self, id: PipeId) -> Option<&T> {
        let node = self.nodes.get(id.0 as usize)?.as_ref()?;
        let any: &dyn Any = node.behavior.as_ref();
        any.downcast_ref::<T>()
    }

    /// Typed mutable access to the unit behind `id`.
    pub fn unit_mut<T: Pipe>(&mut self, id: PipeId) -> Option<&mut T> {
        let node = self.nodes.get_mut(id.0 as usize)?.as_mut()?;
        let any: &mut dyn Any = node.behavior.as_mut();
        any.downcast_mut::<T>()
    }

    // --- Dependents, scheduler, hooks ---

    /// The dependent registry. Clone the handle to register dependents
    /// from other threads.
    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    /// Registers a dependent for per-block updates.
    pub fn add_dependent(&self, dependent: Arc<dyn Dependent>) {
        self.dependents.add(dependent);
    }

    /// Deregisters a dependent.
    pub fn remove_dependent(&self, dependent: &Arc<dyn Dependent>) {
        self.dependents.remove(dependent);
    }

    /// The sample-locked scheduler, registered as the graph's first
    /// dependent. Clone the `Arc` to submit tasks from any thread.
    pub fn scheduler(&self) -> &Arc<BlockScheduler> {
        &self.scheduler
    }

    /// Sets the hook fired once when the graph is configured.
    pub fn on_init(&mut self, hook: GraphHook) {
        self.init_hook = Some(hook);
    }

    /// Sets the hook fired every block, after dependents update.
    pub fn on_update(&mut self, hook: GraphHook) {
        self.update_hook = Some(hook);
    }

    // --- Clock ---

    /// The graph clock at the current block.
    pub fn clock(&self) -> SampleClock {
        SampleClock::new(self.position, self.sample_rate, self.block_size)
    }

    /// Raw device timestamp of the sub-block being rendered.
    pub fn block_time(&self) -> i64 {
        self.block_time
    }

    /// Block size in samples, zero before configuration.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Sample rate in Hz, zero before configuration.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    // --- Per-block lifecycle (driven by the client adapter) ---

    /// Configures the clock and fires the init hook. Called once by the
    /// client adapter when the audio device is configured.
    pub fn handle_init(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.position = -(block_size as i64);
        let clock = self.clock();
        if let Some(hook) = self.init_hook.as_mut() {
            hook(&clock);
        }
    }

    /// Advances the sample clock by one block and fires dependents then
    /// the user update hook. Called by the client adapter at every
    /// sub-block boundary, before outputs are pulled.
    pub fn handle_update(&mut self, block_time: i64) {
        self.block_time = block_time;
        // The first transition is clamped so the position lands exactly
        // on zero regardless of the pre-roll value.
        if self.position < 0 {
            self.position = 0;
        } else {
            self.position += self.block_size as i64;
        }
        let clock = self.clock();
        self.dependents.update_all(&clock);
        if let Some(hook) = self.update_hook.as_mut() {
            hook(&clock);
        }
    }

    // --- Internals shared with the engine ---

    pub(crate) fn node(&self, id: PipeId) -> Result<&PipeNode, PipeError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(|n| n.as_ref())
            .ok_or(PipeError::UnknownPipe(id))
    }

    pub(crate) fn node_mut(&mut self, id: PipeId) -> Result<&mut PipeNode, PipeError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|n| n.as_mut())
            .ok_or(PipeError::UnknownPipe(id))
    }

    /// Mutable node access for ids already validated this call.
    fn node_mut_infallible(&mut self, id: PipeId) -> &mut PipeNode {
        match self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut()) {
            Some(node) => node,
            None => unreachable!("pipe id validated earlier in the same operation"),
        }
    }

    /// Depth-first downstream reachability, used by the connect-time
    /// cycle check. `from == to` counts as reachable.
    fn can_reach(&self, from: PipeId, to: PipeId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let idx = current.0 as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            if let Some(node) = self.nodes.get(idx).and_then(|n| n.as_ref()) {
                for &sink in &node.sinks {
                    if sink == to {
                        return true;
                    }
                    stack.push(sink);
                }
            }
        }
        false
    }
}
