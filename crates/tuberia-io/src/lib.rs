//! Audio device hosting for tuberia pipe graphs.
//!
//! This crate plays the "audio server" role: it owns the device, and it
//! drives any [`AudioClient`](tuberia_core::AudioClient) through the
//! configure/process/shutdown lifecycle. Two hosts are provided:
//!
//! - **Live output**: [`OutputHost`] builds a cpal output stream and
//!   calls the client from the device's audio thread.
//! - **Offline**: [`OfflineDriver`] runs a client deterministically with
//!   caller-provided buffers — for tests, CI, and render-to-buffer use.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tuberia_core::{Graph, GraphClient};
//! use tuberia_io::{OutputHost, StreamConfig};
//!
//! let mut graph = Graph::new(0, 2);
//! // ... patch the graph ...
//! let client = GraphClient::new(graph, Some(64))?;
//!
//! let host = OutputHost::new();
//! let stream = host.start(client, &StreamConfig::default())?;
//! // Audio runs until `stream` is dropped.
//! ```

mod offline;
mod stream;

pub use offline::OfflineDriver;
pub use stream::{
    AudioDevice, OutputHost, StreamConfig, StreamHandle, default_output_device, list_devices,
};

/// Error types for audio hosting operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The client refused the configuration.
    #[error("configuration refused: {0}")]
    Config(#[from] tuberia_core::ConfigError),
}

/// Convenience result type for audio hosting operations.
pub type Result<T> = std::result::Result<T, Error>;
