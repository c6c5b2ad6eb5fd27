use std::time::Duration;

use bevy::{prelude::*, time::TimeUpdateStrategy};

use super::*;
use crate::{systems::rng::GlobalRng, MenuFxPlugin};

fn make_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(20)));
    app.add_plugins(MenuFxPlugin);
    app.insert_resource(GlobalRng::seeded(7));
    app
}

fn spawn_particle(app: &mut App, delay: Duration) -> Entity {
    let particle = Particle::new(Vec2::new(10.0, 8.0), 2500.0, delay, 0.8, 1.25);
    app.world_mut()
        .spawn(particle.bundle(Vec2::ZERO, Color::WHITE))
        .id()
}

fn run_until<F: Fn(&mut App) -> bool>(app: &mut App, max_ticks: usize, done: F) -> bool {
    for _ in 0..max_ticks {
        if done(app) {
            return true;
        }
        app.update();
    }
    done(app)
}

fn phase_of(app: &mut App, entity: Entity) -> Option<ParticlePhase> {
    app.world()
        .get_entity(entity)
        .ok()
        .and_then(|e| e.get::<Particle>())
        .map(|p| p.phase())
}

#[test]
fn particle_settles_to_idle_after_spawn_in() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::ZERO);

    let settled = run_until(&mut app, 200, |app| {
        phase_of(app, entity) == Some(ParticlePhase::Idle)
    });
    assert!(settled, "particle never reached Idle");

    let world = app.world();
    let transform = world.entity(entity).get::<Transform>().unwrap();
    let sprite = world.entity(entity).get::<Sprite>().unwrap();
    assert_eq!(transform.scale.x, 1.0);
    assert_eq!(transform.scale.y, 1.0);
    assert!((sprite.color.alpha() - 0.8).abs() < 1e-6);
    assert_eq!(transform.rotation, Quat::IDENTITY);
}

#[test]
fn particle_waits_out_its_delay_before_animating() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::from_millis(200));

    // Two ticks of 20ms cannot cover a 200ms delay.
    app.update();
    app.update();
    assert_eq!(phase_of(&mut app, entity), Some(ParticlePhase::Pending));

    let started = run_until(&mut app, 50, |app| {
        phase_of(app, entity) == Some(ParticlePhase::SpawningIn)
    });
    assert!(started, "delay never elapsed");
}

#[test]
fn blown_up_particle_is_removed_and_stays_removed() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::ZERO);
    run_until(&mut app, 200, |app| {
        phase_of(app, entity) == Some(ParticlePhase::Idle)
    });

    app.world_mut()
        .resource_scope(|world, mut rng: Mut<GlobalRng>| {
            let mut particle = world.get_mut::<Particle>(entity).unwrap();
            assert!(particle.blow_up(&mut rng));
        });

    let removed = run_until(&mut app, 200, |app| {
        app.world().get_entity(entity).is_err()
    });
    assert!(removed, "blown-up particle never despawned");

    // Monotonic: it never comes back.
    for _ in 0..20 {
        app.update();
        assert!(app.world().get_entity(entity).is_err());
    }
}

#[test]
fn blow_up_cancels_a_pending_delay() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::from_secs(3600));
    app.update();
    assert_eq!(phase_of(&mut app, entity), Some(ParticlePhase::Pending));

    app.world_mut()
        .resource_scope(|world, mut rng: Mut<GlobalRng>| {
            let mut particle = world.get_mut::<Particle>(entity).unwrap();
            assert!(particle.blow_up(&mut rng));
        });

    // An hour-long delay is irrelevant once the particle is blowing up.
    let removed = run_until(&mut app, 200, |app| {
        app.world().get_entity(entity).is_err()
    });
    assert!(removed);
}

#[test]
fn blow_up_is_idempotent_and_keeps_the_trajectory() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::ZERO);
    app.update();

    app.world_mut()
        .resource_scope(|world, mut rng: Mut<GlobalRng>| {
            let mut particle = world.get_mut::<Particle>(entity).unwrap();
            assert!(particle.blow_up(&mut rng));
            let first = particle.burst.unwrap();
            assert!(!particle.blow_up(&mut rng));
            let second = particle.burst.unwrap();
            assert_eq!(first.direction, second.direction);
            assert_eq!(first.speed, second.speed);
        });
}

#[test]
fn speed_up_pins_the_settled_state_without_animation() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::ZERO);
    app.update();
    app.update();

    {
        let world = app.world_mut();
        let mut entity_mut = world.entity_mut(entity);
        let mut transform = entity_mut.get_mut::<Transform>().unwrap().clone();
        let mut sprite = entity_mut.get_mut::<Sprite>().unwrap().clone();
        let mut particle = entity_mut.get_mut::<Particle>().unwrap();
        particle.speed_up(&mut transform, &mut sprite);
        assert_eq!(particle.phase(), ParticlePhase::Idle);
        drop(particle);
        *entity_mut.get_mut::<Transform>().unwrap() = transform;
        *entity_mut.get_mut::<Sprite>().unwrap() = sprite;
    }

    let world = app.world();
    let transform = world.entity(entity).get::<Transform>().unwrap();
    let sprite = world.entity(entity).get::<Sprite>().unwrap();
    assert_eq!(transform.scale, Vec3::ONE);
    assert!((sprite.color.alpha() - 0.8).abs() < 1e-6);
}

#[test]
fn speed_up_does_not_interrupt_a_blow_up() {
    let mut app = make_app();
    let entity = spawn_particle(&mut app, Duration::ZERO);
    app.update();

    app.world_mut()
        .resource_scope(|world, mut rng: Mut<GlobalRng>| {
            let mut particle = world.get_mut::<Particle>(entity).unwrap();
            particle.blow_up(&mut rng);
        });

    {
        let world = app.world_mut();
        let mut entity_mut = world.entity_mut(entity);
        let mut transform = entity_mut.get_mut::<Transform>().unwrap().clone();
        let mut sprite = entity_mut.get_mut::<Sprite>().unwrap().clone();
        let mut particle = entity_mut.get_mut::<Particle>().unwrap();
        particle.speed_up(&mut transform, &mut sprite);
        assert_eq!(particle.phase(), ParticlePhase::BlowingUp);
    }
}

#[test]
fn dissolve_removes_the_node_after_fading() {
    let mut app = make_app();
    let entity = app
        .world_mut()
        .spawn((
            Dissolve::default(),
            Sprite {
                color: Color::WHITE,
                custom_size: Some(Vec2::splat(20.0)),
                ..default()
            },
        ))
        .id();

    let removed = run_until(&mut app, 100, |app| {
        app.world().get_entity(entity).is_err()
    });
    assert!(removed, "dissolving node never despawned");
}
