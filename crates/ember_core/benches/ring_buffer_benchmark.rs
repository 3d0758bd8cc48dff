//! # Ring Buffer Benchmark
//!
//! Measures the per-frame cost of the payload path:
//! 1. Typed value writes/reads (the opcode payload shape)
//! 2. Bulk byte writes with wrap-around
//! 3. A full double-buffer swap with an empty consumer

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ember_core::{DoubleBuffer, RingBuffer};

/// Write and read back a mix of u64 ids and i32 args, like a frame of commands.
fn bench_typed_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_typed");

    for command_count in [100_usize, 1_000, 10_000] {
        let mut ring = RingBuffer::new(command_count * 16);
        group.throughput(Throughput::Bytes((command_count * 12) as u64));

        group.bench_with_input(
            BenchmarkId::new("write_read", command_count),
            &command_count,
            |b, &count| {
                b.iter(|| {
                    for i in 0..count {
                        ring.write_value(&(i as u64));
                        ring.write_value(&(i as i32));
                    }
                    for _ in 0..count {
                        black_box(ring.read_value::<u64>());
                        black_box(ring.read_value::<i32>());
                    }
                });
            },
        );
    }

    group.finish();
}

/// Bulk byte copies that wrap past the end of the storage.
fn bench_wrapping_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_bytes");
    let chunk = vec![0xA5_u8; 4096];
    let mut out = vec![0_u8; 4096];
    let mut ring = RingBuffer::new(10_000);

    group.throughput(Throughput::Bytes(chunk.len() as u64));
    group.bench_function("write_read_4k", |b| {
        b.iter(|| {
            ring.write(black_box(&chunk));
            ring.read(black_box(&mut out));
        });
    });

    group.finish();
}

/// Swap + drain of one frame, single threaded.
fn bench_swap(c: &mut Criterion) {
    let frames = DoubleBuffer::new(RingBuffer::new(1024), RingBuffer::new(1024));

    c.bench_function("double_buffer_swap_drain", |b| {
        b.iter(|| {
            frames.with_producer(|ring| ring.write_value(&7_u64));
            frames.swap_back_buffers(|_, _| {});
            frames.try_drain(|ring| {
                black_box(ring.read_value::<u64>());
                ring.clear();
            });
        });
    });
}

criterion_group!(benches, bench_typed_values, bench_wrapping_bytes, bench_swap);
criterion_main!(benches);
