//! Animated menu widgets for a 2D game's menu layer.
//!
//! The heart of the crate is the particle panel engine: panels reveal
//! themselves as a staggered grid of spinning, fading-in cells and close by
//! "blowing up" every cell in a random direction, with the panel's own
//! removal gated on all of its cells finishing their exit animation. On top
//! of that sit the tutorial overlay sequencer and a handful of presentation
//! widgets (typed text, checkboxes, tabbed frames, image displays).
//!
//! Everything animates on the shared `Update` tick; one schedule run is one
//! animation step. Wall-clock delays (spawn staggering, tutorial opening
//! delays) run on `Timer`s scaled by [`systems::time::Dilation`].

use bevy::prelude::*;

pub mod systems;

use systems::{
    panels::PanelPlugin, particles::ParticlePlugin, rng::RngPlugin, time::DilationPlugin,
    tutorials::TutorialPlugin, ui::WidgetPlugin,
};

/// Ordering of the per-tick animation work. Particles always advance before
/// any panel runs its "are all my cells gone" check, and tutorials observe
/// panel state only after panels have settled for the tick.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum MenuFxSystem {
    Particles,
    Panels,
    Tutorials,
    Widgets,
}

pub struct MenuFxPlugin;

impl Plugin for MenuFxPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                MenuFxSystem::Particles,
                MenuFxSystem::Panels,
                MenuFxSystem::Tutorials,
                MenuFxSystem::Widgets,
            )
                .chain(),
        )
        .add_plugins((
            DilationPlugin,
            RngPlugin,
            ParticlePlugin,
            PanelPlugin,
            TutorialPlugin,
            WidgetPlugin,
        ));
    }
}
