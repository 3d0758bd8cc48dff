//! # Pipeline Benchmark
//!
//! Measures the per-frame cost of:
//! 1. Recording draw records and commands into a state buffer
//! 2. Encoding and decoding command payloads through the ring
//! 3. A full single-threaded frame: record, swap, execute against the
//!    headless backend

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ember_core::RingBuffer;
use ember_rendering::backend::{HeadlessAudio, HeadlessBackend, HeadlessDecoder, HeadlessFonts};
use ember_rendering::command::TextPayload;
use ember_rendering::manifest::resource_id;
use ember_rendering::{
    Containers, ContainersConfig, DrawParams, RenderCommand, RenderPipeline, RenderState,
    RendererConfig, RendererFlags, TomlManifest, Widget,
};
use ember_shared::{Color, Point, Rectangle};

fn record(i: usize) -> DrawParams {
    DrawParams::new(
        Widget::Image(resource_id("bg.png")),
        Point::new(i as i32, 0),
        Rectangle::new(0, 0, 16, 16),
    )
}

/// Appending records and a text command per widget, then resetting.
fn bench_record_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_record");

    for widgets in [100_usize, 1_000] {
        let config = RendererConfig {
            max_runtime_widgets: widgets,
            max_runtime_renderer_commands: widgets,
            max_renderer_back_buffer_data_size: widgets * 64,
            ..RendererConfig::headless()
        };
        let mut state = RenderState::new(&config);
        group.throughput(Throughput::Elements(widgets as u64));

        group.bench_with_input(BenchmarkId::new("draw_and_text", widgets), &widgets, |b, &n| {
            b.iter(|| {
                for i in 0..n {
                    let _ = state.add_draw(black_box(&record(i)));
                    let _ = state.add_command(&RenderCommand::ReloadTtfText(TextPayload {
                        id: 1,
                        font_id: 2,
                        color: Color::WHITE,
                        text: "score".into(),
                    }));
                }
                state.reset();
            });
        });
    }

    group.finish();
}

/// Payload encode then decode of a command mix.
fn bench_command_codec(c: &mut Criterion) {
    let mut ring = RingBuffer::new(64 * 1024);
    let commands = [
        RenderCommand::LoadTextureSingle(7),
        RenderCommand::ChangeClearColor(Color::BLACK),
        RenderCommand::CreateFbo {
            width: 64,
            height: 64,
            id: 3,
        },
        RenderCommand::FinishFrame {
            override_lock_check: false,
        },
    ];

    c.bench_function("command_encode_decode", |b| {
        b.iter(|| {
            for command in &commands {
                command.encode_payload(&mut ring);
            }
            for command in &commands {
                black_box(RenderCommand::decode(command.opcode(), &mut ring).ok());
            }
        });
    });
}

/// Record, swap and execute one frame on the calling thread.
fn bench_local_frame(c: &mut Criterion) {
    let containers = Arc::new(
        Containers::new(
            ContainersConfig {
                max_resource_loading_threads: 1,
                ..ContainersConfig::default()
            },
            Arc::new(HeadlessDecoder::new(16, 16)),
            Arc::new(HeadlessFonts::new()),
            Box::new(HeadlessAudio::new()),
        )
        .expect("containers"),
    );
    let mut manifest = TomlManifest::from_toml_str(
        "[[resources]]\npath = \"bg.png\"\nfile_size = 1\nimage_rect = { x = 0, y = 0, w = 16, h = 16 }\n",
    )
    .expect("manifest");
    let mut local = RenderPipeline::create_local(
        RendererConfig::headless(),
        containers,
        HeadlessBackend::new(RendererFlags::DEFAULT),
    )
    .expect("pipeline");
    local
        .executor_mut()
        .load_stored_assets(&mut manifest)
        .expect("assets");
    let log = local.executor().backend().call_log();

    let mut group = c.benchmark_group("local_frame");
    group.throughput(Throughput::Elements(200));
    group.bench_function("200_draws", |b| {
        b.iter(|| {
            local.clear_screen();
            for i in 0..200 {
                local.add_draw(&record(i));
            }
            local.finish_frame(false);
            log.clear();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_record_frame,
    bench_command_codec,
    bench_local_frame
);
criterion_main!(benches);
