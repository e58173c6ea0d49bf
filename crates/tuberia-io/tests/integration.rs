//! Integration tests driving full clients through the offline host.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tuberia_core::{
    AudioBuffer, AudioConfig, AudioOp, Clock, Graph, GraphClient, Property,
};
use tuberia_io::OfflineDriver;

/// Route library tracing through the test harness; `RUST_LOG` selects
/// verbosity as usual.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Generator op emitting a constant level, scaled by a linked property.
struct LevelOp {
    level: f32,
}

impl AudioOp for LevelOp {
    fn initialize(&mut self, _sample_rate: f64, _max_block_size: usize) {}
    fn process_replace(&mut self, buffers: &mut [AudioBuffer]) {
        for buffer in buffers.iter_mut() {
            buffer.samples_mut().fill(self.level);
        }
    }
    fn process_add(&mut self, outputs: &mut [AudioBuffer], _inputs: &[AudioBuffer]) {
        for out in outputs.iter_mut() {
            for sample in out.samples_mut() {
                *sample += self.level;
            }
        }
    }
}

fn output_only_config(sample_rate: f64, buffer_size: usize) -> AudioConfig {
    AudioConfig {
        sample_rate,
        buffer_size,
        input_channels: 0,
        output_channels: 1,
        fixed_buffer_size: true,
    }
}

#[test]
fn offline_driver_renders_a_generator_patch() {
    init_tracing();
    let mut graph = Graph::new(0, 1);
    let output = graph.outputs()[0];
    let generator = graph.add_op(Box::new(LevelOp { level: 0.5 }), 1);
    graph.connect(generator, output).unwrap();

    let client = GraphClient::new(graph, Some(64)).unwrap();
    let mut driver =
        OfflineDriver::new(client, output_only_config(48000.0, 256)).unwrap();

    let rendered = driver.run_silent(4);
    assert_eq!(rendered.len(), 1024);
    assert!(rendered.iter().all(|&s| s == 0.5));

    driver.finish();
}

#[test]
fn offline_time_advances_on_the_buffer_grid() {
    let mut graph = Graph::new(0, 1);
    let output = graph.outputs()[0];
    let generator = graph.add_op(Box::new(LevelOp { level: 0.0 }), 1);
    graph.connect(generator, output).unwrap();

    let client = GraphClient::new(graph, Some(64)).unwrap();
    // 256 frames at 64 kHz: 4 ms per external buffer.
    let mut driver =
        OfflineDriver::new(client, output_only_config(64000.0, 256)).unwrap();

    assert_eq!(driver.time_ns(), 0);
    driver.run_silent(3);
    assert_eq!(driver.time_ns(), 12_000_000);
    // Graph position tracks: 3 buffers of 4 sub-blocks, minus the
    // zero-based first block.
    assert_eq!(driver.client_mut().graph().clock().samples(), 11 * 64);
}

#[test]
fn scheduled_task_fires_while_rendering_offline() {
    let mut graph = Graph::new(0, 1);
    let output = graph.outputs()[0];
    let generator = graph.add_op(Box::new(LevelOp { level: 0.1 }), 1);
    graph.connect(generator, output).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let count = fired.clone();
    graph.scheduler().schedule(
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        },
        Duration::from_millis(2),
    );

    let client = GraphClient::new(graph, Some(64)).unwrap();
    let mut driver =
        OfflineDriver::new(client, output_only_config(64000.0, 256)).unwrap();

    driver.run_silent(1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    driver.run_silent(8);
    assert_eq!(fired.load(Ordering::SeqCst), 1, "one-shot stays one-shot");
}

#[test]
fn property_animation_tracks_offline_time() {
    let mut graph = Graph::new(0, 1);
    let output = graph.outputs()[0];
    let generator = graph.add_op(Box::new(LevelOp { level: 0.0 }), 1);
    graph.connect(generator, output).unwrap();

    let level = Property::new(0.0);
    graph.add_dependent(level.dependent());
    level.animator().to(&[1.0]).over(&[0.01]).linear();

    let client = GraphClient::new(graph, Some(64)).unwrap();
    let mut driver =
        OfflineDriver::new(client, output_only_config(64000.0, 64)).unwrap();

    // 1 ms per block; the 10 ms ramp completes after 11 updates (the
    // first block arms the segment at t = 0).
    driver.run_silent(6);
    let halfway = level.get();
    assert!(
        (halfway - 0.5).abs() < 0.11,
        "expected ~0.5 mid-ramp, got {halfway}"
    );
    driver.run_silent(6);
    assert_eq!(level.get(), 1.0);
    assert!(!level.is_animating());
}

#[test]
fn tempo_clock_pulses_while_rendering() {
    let mut graph = Graph::new(0, 1);
    let output = graph.outputs()[0];
    let generator = graph.add_op(Box::new(LevelOp { level: 0.0 }), 1);
    graph.connect(generator, output).unwrap();

    let clock = Clock::with_subdivision(120.0, 4);
    graph.add_dependent(clock.dependent());
    let pulses = Arc::new(AtomicUsize::new(0));
    let count = pulses.clone();
    clock.link(move |_index| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let client = GraphClient::new(graph, Some(64)).unwrap();
    let mut driver =
        OfflineDriver::new(client, output_only_config(48000.0, 64)).unwrap();

    // 94 blocks per pulse at 120 BPM / subdivision 4; 190 blocks give
    // pulses at block 0, 94 and 188.
    for _ in 0..190 {
        driver.run_silent(1);
    }
    assert_eq!(pulses.load(Ordering::SeqCst), 3);
    assert_eq!(clock.buffer_count(), 94);
}
