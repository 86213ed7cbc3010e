//! Benchmarks for impel2d
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use impel2d::broadphase::Broadphase;
use impel2d::{Aabb, BodyDef, DynamicAabbTree, PhysicsWorld, Vec2};

// ============================================================================
// Physics step benchmarks
// ============================================================================

fn bench_physics_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_step");

    group.bench_function("falling_circle_60_steps", |b| {
        b.iter(|| {
            let mut world = PhysicsWorld::with_capacity(8);
            world
                .create_body(&BodyDef::dynamic_circle(Vec2::new(0.0, 500.0), 5.0))
                .expect("capacity");
            for _ in 0..60 {
                world.step(black_box(1.0 / 60.0));
            }
            world.position(0)
        });
    });

    group.bench_function("box_pyramid_60_steps", |b| {
        b.iter(|| {
            let mut world = PhysicsWorld::with_capacity(64);
            world
                .create_body(&BodyDef::static_box(
                    Vec2::new(0.0, -10.0),
                    Vec2::new(500.0, 10.0),
                ))
                .expect("capacity");

            // 5-row pyramid of 15 boxes
            for row in 0..5 {
                for col in 0..(5 - row) {
                    let x = (col as f32 - (5 - row) as f32 / 2.0) * 22.0;
                    let y = 11.0 + row as f32 * 21.0;
                    world
                        .create_body(&BodyDef::dynamic_box(
                            Vec2::new(x, y),
                            Vec2::new(10.0, 10.0),
                        ))
                        .expect("capacity");
                }
            }

            for _ in 0..60 {
                world.step(black_box(1.0 / 60.0));
            }
            world.counters()
        });
    });

    group.finish();
}

// ============================================================================
// Broadphase benchmarks
// ============================================================================

fn bench_broadphase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadphase");

    group.bench_function("tree_insert_200", |b| {
        b.iter(|| {
            let mut tree = DynamicAabbTree::new();
            for i in 0..200_u32 {
                let x = (i % 20) as f32 * 15.0;
                let y = (i / 20) as f32 * 15.0;
                tree.insert(
                    Aabb::new(Vec2::new(x, y), Vec2::new(x + 10.0, y + 10.0)),
                    i,
                );
            }
            tree.height()
        });
    });

    group.bench_function("tree_query_pairs_200", |b| {
        let mut tree = DynamicAabbTree::new();
        for i in 0..200_u32 {
            let x = (i % 20) as f32 * 8.0;
            let y = (i / 20) as f32 * 8.0;
            tree.insert(
                Aabb::new(Vec2::new(x, y), Vec2::new(x + 10.0, y + 10.0)),
                i,
            );
        }

        let mut pairs = Vec::new();
        b.iter(|| {
            tree.query_pairs(black_box(&mut pairs), 4096);
            pairs.len()
        });
    });

    group.finish();
}

// ============================================================================
// Soft body benchmarks
// ============================================================================

fn bench_soft_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("soft_body");

    group.bench_function("ring32_on_ground_60_steps", |b| {
        b.iter(|| {
            let mut world = PhysicsWorld::with_capacity(8);
            world
                .create_body(&BodyDef::static_box(
                    Vec2::new(0.0, -20.0),
                    Vec2::new(200.0, 10.0),
                ))
                .expect("capacity");

            let ring: Vec<Vec2> = (0..32)
                .map(|i| {
                    let angle = i as f32 / 32.0 * core::f32::consts::TAU;
                    Vec2::new(0.0, 30.0) + Vec2::new(angle.cos(), angle.sin()) * 15.0
                })
                .collect();
            world
                .create_soft_body(&ring, 300.0, 0.5)
                .expect("capacity");

            for _ in 0..60 {
                world.step(black_box(1.0 / 60.0));
            }
            world.soft_body(0).map(|sb| sb.area())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_physics_step, bench_broadphase, bench_soft_body);
criterion_main!(benches);
