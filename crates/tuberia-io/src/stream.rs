//! Real-time audio hosting via cpal.
//!
//! [`OutputHost`] bridges the platform audio API to the
//! [`AudioClient`] contract: it negotiates a fixed-size f32 output
//! stream, configures the client, and calls
//! [`process`](AudioClient::process) from the device's audio thread
//! with a monotonic nanosecond timestamp. The client's own sub-blocking
//! takes it from there.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Host;
use tracing::{error, info};

use tuberia_core::{AudioBuffer, AudioClient, AudioConfig};

use crate::{Error, Result};

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Device name as reported by the platform.
    pub name: String,
    /// Whether the device offers capture channels.
    pub is_input: bool,
    /// Whether the device offers playback channels.
    pub is_output: bool,
    /// The device's default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Stream configuration for [`OutputHost::start`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Requested fixed buffer size in frames.
    pub buffer_size: u32,
    /// Number of output channels.
    pub channels: u16,
    /// Optional device name filter (substring match, case-insensitive);
    /// the system default is used if `None`.
    pub device_name: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// List all available audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                let is_input = device.default_input_config().is_ok();
                devices.push(AudioDevice {
                    name,
                    is_input,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }
    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device.name() {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output: false,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }
    Ok(devices)
}

/// Get the default output device, if any.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().and_then(|d| {
        d.name().ok().map(|name| AudioDevice {
            name,
            is_input: false,
            is_output: true,
            default_sample_rate: d
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(48000),
        })
    }))
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops
/// playback and shuts the client down. The inner value is
/// `Box<dyn Send>`, keeping platform types out of application code.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wraps a backend-specific stream object, keeping it alive until
    /// the handle is dropped.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Calls the client's shutdown when the stream handle is dropped.
///
/// Dropped after the stream itself (field order in the tuple the handle
/// wraps), so no callback is in flight by then.
struct ShutdownGuard<C: AudioClient> {
    client: Arc<Mutex<C>>,
}

impl<C: AudioClient> Drop for ShutdownGuard<C> {
    fn drop(&mut self) {
        if let Ok(mut client) = self.client.lock() {
            client.shutdown();
        }
    }
}

/// cpal-backed output host driving an [`AudioClient`].
pub struct OutputHost {
    host: Host,
}

impl Default for OutputHost {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputHost {
    /// Creates a host on the platform's default audio system.
    pub fn new() -> Self {
        info!(host = cpal::default_host().id().name(), "output host ready");
        Self {
            host: cpal::default_host(),
        }
    }

    fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            Some(search) => {
                let search_lower = search.to_lowercase();
                let devices = self
                    .host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?;
                for device in devices {
                    if let Ok(dev_name) = device.name()
                        && dev_name.to_lowercase().contains(search_lower.as_str())
                    {
                        return Ok(device);
                    }
                }
                Err(Error::DeviceNotFound(format!(
                    "no output device matching '{}'",
                    search
                )))
            }
            None => self.host.default_output_device().ok_or(Error::NoDevice),
        }
    }

    /// Configures `client` and starts an output stream feeding it.
    ///
    /// The returned [`StreamHandle`] keeps the stream alive; dropping it
    /// stops playback and calls the client's
    /// [`shutdown`](AudioClient::shutdown).
    pub fn start<C: AudioClient + 'static>(
        &self,
        mut client: C,
        config: &StreamConfig,
    ) -> Result<StreamHandle> {
        let device = self.find_output_device(config.device_name.as_deref())?;
        let channels = config.channels.max(1);
        let frames = config.buffer_size as usize;

        client.configure(&AudioConfig {
            sample_rate: f64::from(config.sample_rate),
            buffer_size: frames,
            input_channels: 0,
            output_channels: usize::from(channels),
            fixed_buffer_size: true,
        })?;

        let client = Arc::new(Mutex::new(client));
        let guard = ShutdownGuard {
            client: client.clone(),
        };

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let mut channel_buffers: Vec<AudioBuffer> = (0..usize::from(channels))
            .map(|_| AudioBuffer::new(f64::from(config.sample_rate), frames))
            .collect();
        let started = Instant::now();
        let callback_client = client.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let got_frames = data.len() / usize::from(channels);
                    let time_ns = started.elapsed().as_nanos() as i64;

                    let ok = match callback_client.lock() {
                        Ok(mut client) => {
                            client.process(time_ns, &[], &mut channel_buffers, got_frames)
                        }
                        Err(_) => false,
                    };
                    if !ok {
                        data.fill(0.0);
                        return;
                    }
                    for frame in 0..got_frames {
                        for (ch, buffer) in channel_buffers.iter().enumerate() {
                            data[frame * usize::from(channels) + ch] = buffer.samples()[frame];
                        }
                    }
                },
                move |err| {
                    error!(%err, "output stream error");
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        info!(
            sample_rate = config.sample_rate,
            buffer = config.buffer_size,
            channels,
            "output stream started"
        );
        // The stream drops before the guard, so the last callback has
        // finished when shutdown runs.
        Ok(StreamHandle::new((stream, guard)))
    }
}
