//! Benchmarks for field generation and the per-frame update.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;

use petalfield::prelude::*;
use petalfield::{FieldGenerator, SpawnRng};

struct ReadyAssets;

impl AssetProvider for ReadyAssets {
    fn request_model(&self) -> AssetSignal<ModelHandle> {
        AssetSignal::ready("model", ModelHandle::new("model", vec![0]))
    }

    fn request_font(&self) -> AssetSignal<FontHandle> {
        AssetSignal::ready("font", FontHandle::from_bytes("font", b"{}"))
    }
}

/// Discards every upload.
struct NullRenderer;

impl RenderBoundary for NullRenderer {
    fn upload_batch(&mut self, _kind: BatchKind, batch: &InstanceBatch) {
        black_box(batch.visible_transforms());
    }

    fn upload_points(&mut self, _kind: PointsKind, points: &PointBuffer) {
        black_box(points.positions());
    }

    fn set_camera(&mut self, camera: &Camera) {
        black_box(camera.view_projection());
    }

    fn set_reveal(&mut self, view: &RevealView<'_>) {
        black_box(view.field_opacity);
    }
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_generate");

    for count in [5_000usize, 25_000] {
        let config = SceneConfig::default().with_seed(1).with_instance_count(count);
        let generator = FieldGenerator::new(&config.field);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut rng = SpawnRng::new(Some(1));
                black_box(generator.generate(&mut rng))
            })
        });
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_step");

    for (name, cursor) in [("idle", None), ("hover", Some(Vec2::ZERO))] {
        let config = SceneConfig::default().with_seed(2);
        let mut sim = FrameSimulator::new(config, Box::new(ReadyAssets)).expect("default config is valid");
        sim.set_cursor(cursor);
        group.bench_function(name, |b| {
            b.iter(|| black_box(sim.step_fixed(1.0 / 60.0)))
        });
    }

    group.bench_function("step_and_present", |b| {
        let mut sim = FrameSimulator::new(SceneConfig::default().with_seed(3), Box::new(ReadyAssets))
            .expect("default config is valid");
        let mut renderer = NullRenderer;
        b.iter(|| {
            sim.step_fixed(1.0 / 60.0);
            black_box(sim.present(&mut renderer))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_generate, bench_frame);
criterion_main!(benches);
