//! Criterion benchmarks for the pull engine.
//!
//! Measures scheduling overhead independently of DSP cost using a
//! trivial gain op. Two axes:
//!
//! - **chain** — in-place fast path throughput along a linear chain
//! - **fan** — cached-branch cost with fan-out and fan-in topologies
//!
//! Run with: `cargo bench -p tuberia-core -- pull/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tuberia_core::units::OutputSink;
use tuberia_core::{AudioBuffer, AudioOp, Graph, PipeId};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

/// Trivial gain op — isolates pull-engine overhead from DSP cost.
struct Gain(f32);

impl AudioOp for Gain {
    fn initialize(&mut self, _sample_rate: f64, _max_block_size: usize) {}

    fn process_replace(&mut self, buffers: &mut [AudioBuffer]) {
        for buffer in buffers.iter_mut() {
            for sample in buffer.samples_mut() {
                *sample *= self.0;
            }
        }
    }

    fn process_add(&mut self, outputs: &mut [AudioBuffer], inputs: &[AudioBuffer]) {
        for (out, inp) in outputs.iter_mut().zip(inputs.iter()) {
            for (o, i) in out.samples_mut().iter_mut().zip(inp.samples()) {
                *o += *i * self.0;
            }
        }
    }
}

fn active_sink(graph: &mut Graph) -> PipeId {
    let sink = graph.add_pipe(OutputSink::new());
    graph
        .unit_mut::<OutputSink>(sink)
        .unwrap()
        .set_active(true);
    sink
}

/// Linear chain of `stages` gain ops ending in an active sink.
fn build_chain(stages: usize) -> (Graph, PipeId, PipeId) {
    let mut graph = Graph::new(0, 0);
    let mut previous = graph.add_op(Box::new(Gain(1.0)), 1);
    for _ in 1..stages {
        let stage = graph.add_op(Box::new(Gain(0.999)), 1);
        graph.connect(previous, stage).unwrap();
        previous = stage;
    }
    let sink = active_sink(&mut graph);
    graph.connect(previous, sink).unwrap();
    (graph, previous, sink)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull/chain-20");
    for &block_size in BLOCK_SIZES {
        let (mut graph, tail, sink) = build_chain(20);
        let mut out = AudioBuffer::new(SAMPLE_RATE, block_size);
        let mut time = 0i64;

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    time += 1;
                    graph.pull(tail, sink, black_box(&mut out), time);
                });
            },
        );
    }
    group.finish();
}

fn bench_fan(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull/fan-8x8");
    for &block_size in BLOCK_SIZES {
        // 8 generators fanned through a Tee-per-generator into an Add.
        let mut graph = Graph::new(0, 0);
        let add = graph.add_add();
        for _ in 0..8 {
            let source = graph.add_op(Box::new(Gain(0.5)), 1);
            graph.connect(source, add).unwrap();
        }
        let sink = active_sink(&mut graph);
        graph.connect(add, sink).unwrap();

        let mut out = AudioBuffer::new(SAMPLE_RATE, block_size);
        let mut time = 0i64;

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    time += 1;
                    graph.pull(add, sink, black_box(&mut out), time);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_fan);
criterion_main!(benches);
