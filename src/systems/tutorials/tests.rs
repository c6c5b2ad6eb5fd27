use std::time::Duration;

use bevy::{ecs::system::SystemState, prelude::*, time::TimeUpdateStrategy};

use super::*;
use crate::{
    systems::particles::{Particle, ParticlePhase},
    systems::rng::GlobalRng,
    MenuFxPlugin,
};

fn make_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(20)));
    app.add_plugins(MenuFxPlugin);
    app.insert_resource(GlobalRng::seeded(42));
    app
}

fn register(app: &mut App, id: &str, message: &str) -> Entity {
    let mut state: SystemState<(Commands, ResMut<TutorialQueue>)> =
        SystemState::new(app.world_mut());
    let (mut commands, mut queue) = state.get_mut(app.world_mut());
    let entity = queue.register(&mut commands, id, message, TutorialOptions::default());
    state.apply(app.world_mut());
    entity
}

fn prepare(app: &mut App, id: &str) -> bool {
    let mut state: SystemState<(ResMut<TutorialQueue>, Query<&mut Tutorial>)> =
        SystemState::new(app.world_mut());
    let (mut queue, mut tutorials) = state.get_mut(app.world_mut());
    queue.prepare(id, &mut tutorials)
}

fn load_next(app: &mut App) -> bool {
    let mut state: SystemState<(ResMut<TutorialQueue>, Query<&mut Tutorial>)> =
        SystemState::new(app.world_mut());
    let (mut queue, mut tutorials) = state.get_mut(app.world_mut());
    queue.load_next(&mut tutorials)
}

fn reset(app: &mut App) {
    let mut state: SystemState<(ResMut<TutorialQueue>, Query<&mut Tutorial>)> =
        SystemState::new(app.world_mut());
    let (mut queue, mut tutorials) = state.get_mut(app.world_mut());
    queue.reset(&mut tutorials);
}

fn anim_of(app: &App, entity: Entity) -> TutorialAnim {
    app.world().get::<Tutorial>(entity).unwrap().anim()
}

fn list_rows(app: &App, list: Entity) -> Vec<Entity> {
    app.world()
        .get::<TutorialList>(list)
        .unwrap()
        .rows()
        .to_vec()
}

fn row_parts(app: &App, row: Entity) -> (f32, String) {
    let mut alpha = None;
    let mut label = None;
    for child in app.world().get::<Children>(row).unwrap().iter() {
        if app.world().get::<TutorialListMarker>(child).is_some() {
            alpha = Some(app.world().get::<Sprite>(child).unwrap().color.alpha());
        }
        if let Some(text) = app.world().get::<Text2d>(child) {
            label = Some(text.0.clone());
        }
    }
    (alpha.unwrap(), label.unwrap())
}

#[test]
fn load_next_with_nothing_prepared_reports_false() {
    let mut app = make_app();
    assert!(!load_next(&mut app));
    assert_eq!(app.world().resource::<TutorialQueue>().covered(), 0);
    assert!(app.world().resource::<TutorialQueue>().current().is_none());
}

#[test]
fn prepare_filters_unknown_used_and_disabled_ids() {
    let mut app = make_app();
    register(&mut app, "movement", "Use the arrow keys to move.");

    // Tutorial mode starts off; nothing can be prepared.
    assert!(!prepare(&mut app, "movement"));

    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    assert!(!prepare(&mut app, "no-such-id"));
    assert!(prepare(&mut app, "movement"));
    // Once per session.
    assert!(!prepare(&mut app, "movement"));
    assert_eq!(
        app.world().resource::<TutorialQueue>().prepared_amount(),
        1
    );
}

#[test]
fn prepare_marks_the_catalog_entry_finished() {
    let mut app = make_app();
    let entity = register(&mut app, "movement", "Use the arrow keys to move.");
    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);

    assert!(!app.world().get::<Tutorial>(entity).unwrap().finished());
    prepare(&mut app, "movement");
    assert!(app.world().get::<Tutorial>(entity).unwrap().finished());
}

#[test]
fn queue_runs_through_fast_forward_and_exhaustion() {
    let mut app = make_app();
    let first = register(&mut app, "movement", "Use the arrow keys to move.");
    let second = register(&mut app, "shooting", "Press space to shoot.");
    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    prepare(&mut app, "movement");
    prepare(&mut app, "shooting");

    // First advance opens the first window.
    assert!(load_next(&mut app));
    {
        let queue = app.world().resource::<TutorialQueue>();
        assert_eq!(queue.covered(), 1);
        assert_eq!(queue.current(), Some(first));
    }
    assert!(app.world().get::<Tutorial>(first).unwrap().is_animating());

    // Advancing while it is still animating fast-forwards it in place: same
    // window, covered count untouched.
    assert!(load_next(&mut app));
    {
        let queue = app.world().resource::<TutorialQueue>();
        assert_eq!(queue.covered(), 1);
        assert_eq!(queue.current(), Some(first));
    }
    assert_eq!(anim_of(&app, first), TutorialAnim::Open);

    // The fast-forward also settles the backing panel's particles once the
    // panel has populated.
    for _ in 0..5 {
        app.update();
    }
    let panel = app.world().get::<Tutorial>(first).unwrap().panel().unwrap();
    let settled: Vec<ParticlePhase> = app
        .world()
        .get::<crate::systems::panels::Panel>(panel)
        .unwrap()
        .members()
        .iter()
        .filter_map(|m| app.world().get::<Particle>(m.entity))
        .map(|p| p.phase())
        .collect();
    assert_eq!(settled.len(), 25);
    assert!(settled.iter().all(|&p| p == ParticlePhase::Idle));

    // Next advance closes the first and opens the second.
    assert!(load_next(&mut app));
    {
        let queue = app.world().resource::<TutorialQueue>();
        assert_eq!(queue.covered(), 2);
        assert_eq!(queue.current(), Some(second));
    }
    assert_eq!(anim_of(&app, first), TutorialAnim::Closing);

    // Let the second window finish opening and the first finish closing.
    for _ in 0..400 {
        app.update();
        if anim_of(&app, second) == TutorialAnim::Open
            && anim_of(&app, first) == TutorialAnim::Closed
        {
            break;
        }
    }
    assert_eq!(anim_of(&app, second), TutorialAnim::Open);
    assert_eq!(anim_of(&app, first), TutorialAnim::Closed);
    assert_eq!(
        *app.world().get::<Visibility>(first).unwrap(),
        Visibility::Hidden
    );
    // The closed window's panel was despawned with it.
    assert!(app.world().get::<Tutorial>(first).unwrap().panel().is_none());

    // Queue exhausted: the last window closes and the session ends.
    assert!(!load_next(&mut app));
    {
        let queue = app.world().resource::<TutorialQueue>();
        assert_eq!(queue.covered(), 2);
        assert_eq!(queue.prepared_amount(), 0);
        assert!(queue.current().is_none());
        assert_eq!(queue.coverage_line(), "Tutorials covered: 2 out of 2");
    }
    assert_eq!(anim_of(&app, second), TutorialAnim::Closing);
}

#[test]
fn reset_restores_preparability() {
    let mut app = make_app();
    let entity = register(&mut app, "movement", "Use the arrow keys to move.");
    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    prepare(&mut app, "movement");
    load_next(&mut app);

    reset(&mut app);
    {
        let queue = app.world().resource::<TutorialQueue>();
        assert_eq!(queue.prepared_amount(), 0);
        assert_eq!(queue.covered(), 0);
        assert!(queue.current().is_none());
    }
    assert!(!app.world().get::<Tutorial>(entity).unwrap().finished());
    // The catalog survives a reset, so the same id can run again.
    assert!(prepare(&mut app, "movement"));
    assert!(load_next(&mut app));
}

#[test]
fn re_registering_an_id_replaces_the_old_window() {
    let mut app = make_app();
    let old = register(&mut app, "movement", "Old wording.");
    let new = register(&mut app, "movement", "New wording.");

    assert!(app.world().get_entity(old).is_err());
    assert_eq!(app.world().resource::<TutorialQueue>().catalog_len(), 1);
    assert_eq!(
        app.world().get::<Tutorial>(new).unwrap().message(),
        "New wording."
    );
}

#[test]
fn register_from_json_fills_the_catalog() {
    let mut app = make_app();
    let json = r#"[
        {"id": "movement", "message": "Use the arrow keys to move."},
        {
            "id": "shooting",
            "message": "Press space to shoot.",
            "options": {"frame_width": 320.0, "opening_delay": 500}
        }
    ]"#;

    let mut state: SystemState<(Commands, ResMut<TutorialQueue>)> =
        SystemState::new(app.world_mut());
    let (mut commands, mut queue) = state.get_mut(app.world_mut());
    let registered = queue.register_from_json(&mut commands, json).unwrap();
    state.apply(app.world_mut());

    assert_eq!(registered, 2);
    assert_eq!(app.world().resource::<TutorialQueue>().catalog_len(), 2);
}

#[test]
fn an_opening_delay_holds_the_window_before_the_lines_move() {
    let mut app = make_app();
    let mut state: SystemState<(Commands, ResMut<TutorialQueue>)> =
        SystemState::new(app.world_mut());
    let (mut commands, mut queue) = state.get_mut(app.world_mut());
    let entity = queue.register(
        &mut commands,
        "movement",
        "Use the arrow keys to move.",
        TutorialOptions {
            opening_delay: Some(200),
            ..default()
        },
    );
    state.apply(app.world_mut());
    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    prepare(&mut app, "movement");
    load_next(&mut app);

    assert_eq!(anim_of(&app, entity), TutorialAnim::WaitingToOpen);
    for _ in 0..5 {
        app.update();
    }
    assert_eq!(anim_of(&app, entity), TutorialAnim::WaitingToOpen);
    for _ in 0..20 {
        app.update();
    }
    assert_eq!(anim_of(&app, entity), TutorialAnim::SlidingLines);
}

#[test]
fn the_status_list_tracks_prepared_entries() {
    let mut app = make_app();
    let list = {
        let mut state: SystemState<Commands> = SystemState::new(app.world_mut());
        let mut commands = state.get_mut(app.world_mut());
        let list = TutorialList::spawn(&mut commands, Vec2::ZERO);
        state.apply(app.world_mut());
        list
    };
    register(&mut app, "shooting", "Press space to shoot.");
    register(&mut app, "movement", "Use the arrow keys to move.");
    app.update();

    // One row per catalog entry, ordered by id, all markers dim.
    let rows = list_rows(&app, list);
    assert_eq!(rows.len(), 2);
    let (alpha, label) = row_parts(&app, rows[0]);
    assert_eq!(label, "movement: Use the arrow keys to move.");
    assert!(alpha < 1.0);
    let (alpha, label) = row_parts(&app, rows[1]);
    assert_eq!(label, "shooting: Press space to shoot.");
    assert!(alpha < 1.0);

    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    prepare(&mut app, "shooting");
    app.update();

    // The prepared entry's marker filled in; the other stayed dim.
    let rows = list_rows(&app, list);
    assert!(row_parts(&app, rows[0]).0 < 1.0);
    assert_eq!(row_parts(&app, rows[1]).0, 1.0);

    // A session reset dims everything again.
    reset(&mut app);
    app.update();
    let rows = list_rows(&app, list);
    assert!(row_parts(&app, rows[0]).0 < 1.0);
    assert!(row_parts(&app, rows[1]).0 < 1.0);
}

#[test]
fn coverage_text_mirrors_the_queue() {
    let mut app = make_app();
    let label = app
        .world_mut()
        .spawn((Text2d::new(String::new()), TutorialsCoveredText))
        .id();
    app.update();
    assert_eq!(
        app.world().get::<Text2d>(label).unwrap().0,
        "Tutorials covered: 0 out of 0"
    );

    register(&mut app, "movement", "Use the arrow keys to move.");
    register(&mut app, "shooting", "Press space to shoot.");
    app.world_mut()
        .resource_mut::<TutorialQueue>()
        .set_tutorial_mode(true);
    prepare(&mut app, "movement");
    load_next(&mut app);
    app.update();
    assert_eq!(
        app.world().get::<Text2d>(label).unwrap().0,
        "Tutorials covered: 1 out of 2"
    );
}
