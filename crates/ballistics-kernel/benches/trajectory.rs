#![allow(missing_docs)]
use std::hint::black_box;

use ballistics_common::{ActorId, Vec3};
use ballistics_kernel::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn rifle() -> ProjectileProfile {
    ProjectileProfile::new("rifle")
        .with_muzzle_velocity(820.0, 860.0)
        .with_rule(DragModel::default())
}

fn cluttered_scene(count: usize) -> CollisionScene {
    let mut scene = CollisionScene::new();
    for i in 0..count {
        let offset = i as f32 * 7.0;
        scene.add(
            Collider::new(Shape::sphere(Vec3::new(offset, 40.0, offset * 0.1), 2.0))
                .with_actor(ActorId::from_raw(i as u64 + 1)),
        );
    }
    scene.add(Collider::new(Shape::plane(Vec3::new(0.0, 0.0, -50.0), Vec3::Z)));
    scene
}

fn bench_predict(c: &mut Criterion) {
    let profile = rifle();
    let env = Atmosphere::default();
    let launch = LaunchState::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.02), 840.0);

    let mut group = c.benchmark_group("predict");
    for &colliders in &[0usize, 16, 256] {
        let scene = cluttered_scene(colliders);
        group.throughput(Throughput::Elements(colliders as u64));
        group.bench_with_input(BenchmarkId::from_parameter(colliders), &scene, |b, scene| {
            b.iter(|| {
                predict(
                    scene,
                    &env,
                    &profile,
                    black_box(&launch),
                    &[],
                    PredictParams::new(3.0, 0.01),
                )
                .expect("valid profile")
            });
        });
    }
    group.finish();
}

fn bench_solve_aim(c: &mut Criterion) {
    let profile = rifle();
    let env = Atmosphere::default();
    let scene = cluttered_scene(16);
    let request = AimRequest::new(
        Vec3::ZERO,
        Vec3::new(600.0, -80.0, 5.0),
        Vec3::new(0.0, 12.0, 0.0),
        840.0,
    )
    .with_drop_compensation(true);

    c.bench_function("solve_aim", |b| {
        b.iter(|| {
            solve_aim(
                &scene,
                &env,
                &profile,
                black_box(&request),
                &[],
                PredictParams::new(3.0, 0.01),
            )
            .expect("valid profile")
        });
    });
}

criterion_group!(benches, bench_predict, bench_solve_aim);
criterion_main!(benches);
