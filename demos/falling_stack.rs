//! Drop a stack of boxes onto the ground and print how it settles.
//!
//! Run with: `cargo run --example falling_stack`

use impel2d::{BodyDef, PhysicsWorld, Vec2};

fn main() {
    let mut world = PhysicsWorld::with_capacity(32);

    world
        .create_body(&BodyDef::static_box(
            Vec2::new(0.0, -10.0),
            Vec2::new(400.0, 10.0),
        ))
        .expect("world has capacity");

    let mut boxes = Vec::new();
    for i in 0..5 {
        let id = world
            .create_body(&BodyDef::dynamic_box(
                Vec2::new(0.0, 30.0 + 25.0 * i as f32),
                Vec2::new(10.0, 10.0),
            ))
            .expect("world has capacity");
        boxes.push(id);
    }

    let dt = 1.0 / 60.0;
    for frame in 0..360 {
        world.step(dt);

        if frame % 60 == 0 {
            println!("--- t = {:.1}s ---", frame as f32 * dt);
            for &id in &boxes {
                let pos = world.position(id).expect("body exists");
                println!("  box {id}: ({:7.2}, {:7.2})", pos.x, pos.y);
            }
            let counters = world.counters();
            println!(
                "  pairs={} contacts={} sleeping={}",
                counters.broadphase_pairs, counters.contacts, counters.sleeping_bodies
            );
        }
    }

    println!("--- settled ---");
    for &id in &boxes {
        let pos = world.position(id).expect("body exists");
        println!("  box {id}: ({:7.2}, {:7.2})", pos.x, pos.y);
    }
}
