//! Errors raised by graph mutation and accessor operations.

use super::node::PipeId;

/// Errors from connection management and indexed access.
///
/// Connection errors are raised at the call site and leave the graph in
/// its prior state — a failed [`connect`](super::Graph::connect) never
/// leaves a half-registered link behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipeError {
    /// The id does not resolve to a pipe in this graph.
    #[error("pipe {0} not found in this graph")]
    UnknownPipe(PipeId),

    /// The pipes are already connected.
    #[error("{src} is already a source of {sink}")]
    Duplicate {
        /// Upstream side of the attempted connection.
        src: PipeId,
        /// Downstream side of the attempted connection.
        sink: PipeId,
    },

    /// The source pipe has no free sink slot.
    #[error("{0} has no free sink slot")]
    SinkFull(PipeId),

    /// The sink pipe has no free source slot.
    #[error("{0} has no free source slot")]
    SourceFull(PipeId),

    /// Indexed access past the end of a source or sink list.
    #[error("index {index} out of range for {pipe} (len {len})")]
    IndexOutOfRange {
        /// Pipe whose connection list was accessed.
        pipe: PipeId,
        /// Requested index.
        index: usize,
        /// Current list length.
        len: usize,
    },

    /// Adding this connection would create a cycle. The pull protocol is
    /// recursive with no cycle-break; feedback patches must route through
    /// a graph input, which buffers one block.
    #[error("connecting {src} to {sink} would create a cycle")]
    CycleDetected {
        /// Upstream side of the attempted connection.
        src: PipeId,
        /// Downstream side of the attempted connection.
        sink: PipeId,
    },
}
