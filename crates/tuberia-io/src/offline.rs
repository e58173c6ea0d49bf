//! Deterministic offline client driver.
//!
//! [`OfflineDriver`] stands in for the audio device: it configures a
//! client once and then delivers buffers on a perfect nanosecond grid,
//! block after block, with no threads and no hardware. Tests and
//! render-to-buffer jobs use it to run a whole patch faster than real
//! time with reproducible timing.

use tuberia_core::{AudioBuffer, AudioClient, AudioConfig};

use crate::Result;

/// Drives an [`AudioClient`] without a device.
pub struct OfflineDriver<C: AudioClient> {
    client: C,
    config: AudioConfig,
    time_ns: i64,
    nanos_per_buffer: i64,
}

impl<C: AudioClient> OfflineDriver<C> {
    /// Configures `client` for `config` and positions the clock at zero.
    pub fn new(mut client: C, config: AudioConfig) -> Result<Self> {
        client.configure(&config)?;
        let nanos_per_buffer =
            (config.buffer_size as f64 / config.sample_rate * 1_000_000_000.0).round() as i64;
        Ok(Self {
            client,
            config,
            time_ns: 0,
            nanos_per_buffer,
        })
    }

    /// The configuration the client was configured with.
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Current driver time in nanoseconds (the timestamp of the next
    /// block).
    pub fn time_ns(&self) -> i64 {
        self.time_ns
    }

    /// Access to the driven client between blocks.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Delivers one external buffer and advances the clock.
    ///
    /// Returns the client's verdict; a refused block still advances
    /// time, like a real device would.
    pub fn run_block(&mut self, inputs: &[AudioBuffer], outputs: &mut [AudioBuffer]) -> bool {
        let ok = self
            .client
            .process(self.time_ns, inputs, outputs, self.config.buffer_size);
        self.time_ns += self.nanos_per_buffer;
        ok
    }

    /// Runs `blocks` buffers of silence, returning the concatenated
    /// output of the first channel.
    pub fn run_silent(&mut self, blocks: usize) -> Vec<f32> {
        let inputs: Vec<AudioBuffer> = (0..self.config.input_channels)
            .map(|_| AudioBuffer::new(self.config.sample_rate, self.config.buffer_size))
            .collect();
        let mut outputs: Vec<AudioBuffer> = (0..self.config.output_channels.max(1))
            .map(|_| AudioBuffer::new(self.config.sample_rate, self.config.buffer_size))
            .collect();

        let mut rendered = Vec::with_capacity(blocks * self.config.buffer_size);
        for _ in 0..blocks {
            self.run_block(&inputs, &mut outputs);
            rendered.extend_from_slice(outputs[0].samples());
        }
        rendered
    }

    /// Shuts the client down and returns it.
    pub fn finish(mut self) -> C {
        self.client.shutdown();
        self.client
    }
}
