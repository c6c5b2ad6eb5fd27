use std::time::Duration;

use bevy::{
    ecs::{component::HookContext, world::DeferredWorld},
    prelude::*,
};
use smallvec::SmallVec;

use crate::{
    systems::{
        colors::PRIMARY_COLOR,
        particles::{Dissolve, Particle, ParticleBorder, ParticlePlugin},
        rng::GlobalRng,
    },
    MenuFxSystem,
};


pub struct PanelPlugin;
impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                Panel::populate,
                Panel::dissolve,
                Panel::speed_up,
                Panel::reap,
            )
                .chain()
                .in_set(MenuFxSystem::Panels),
        );

        if !app.is_plugin_added::<ParticlePlugin>() {
            app.add_plugins(ParticlePlugin);
        }
    }
}

/// How a node owned by a panel participates in the closing animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMemberKind {
    /// A grid particle created by `open_panel`; blown up in place.
    GridCell,
    /// An externally-created decoration folded into the closing animation
    /// via a drift-up dissolve.
    Absorbed,
    /// Tracked but skipped by both blow-up and the all-gone check.
    Excluded,
}

#[derive(Debug, Clone, Copy)]
pub struct PanelMember {
    pub entity: Entity,
    pub kind: PanelMemberKind,
}

/// Shared construction parameters for a panel and every particle it owns.
#[derive(Clone)]
pub struct PanelConfig {
    pub size: Vec2,
    pub columns: u32,
    pub rows: u32,
    /// Cyclic per-cell palette; a single entry paints every cell.
    pub palette: Vec<Color>,
    /// Initial rotation of each particle, degrees.
    pub rotation_amount: f32,
    /// Stagger between consecutive cells' spawn delays.
    pub appear_delay: Duration,
    pub max_opacity: f32,
    pub border: Option<ParticleBorder>,
    pub rotation_decay: f32,
    /// Populate the grid as soon as the panel is inserted.
    pub auto_open: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            size: Vec2::new(400.0, 300.0),
            columns: 5,
            rows: 5,
            palette: vec![PRIMARY_COLOR],
            rotation_amount: 2500.0,
            appear_delay: Duration::from_millis(100),
            max_opacity: 0.8,
            border: None,
            rotation_decay: 1.25,
            auto_open: true,
        }
    }
}

/// A grid of particles with open/close orchestration.
///
/// A panel opens by generating one particle per cell with staggered delays
/// and closes by blowing every owned node up; its own removal is gated on
/// all of those nodes finishing their exit animation and despawning.
#[derive(Component)]
#[component(on_insert = Panel::on_insert)]
#[require(Transform, Visibility)]
pub struct Panel {
    size: Vec2,
    columns: u32,
    rows: u32,
    palette: Vec<Color>,
    rotation_amount: f32,
    appear_delay: Duration,
    max_opacity: f32,
    border: Option<ParticleBorder>,
    rotation_decay: f32,
    auto_open: bool,
    opened: bool,
    blown_up: bool,
    detach_on_blow_up: bool,
    open_requested: bool,
    blow_up_queued: bool,
    speed_up_queued: bool,
    monitoring: bool,
    members: SmallVec<[PanelMember; 16]>,
}

impl Panel {
    pub fn new(config: PanelConfig) -> Self {
        Panel {
            size: config.size,
            columns: config.columns.max(1),
            rows: config.rows.max(1),
            palette: config.palette,
            rotation_amount: config.rotation_amount,
            appear_delay: config.appear_delay,
            max_opacity: config.max_opacity,
            border: config.border,
            rotation_decay: config.rotation_decay,
            auto_open: config.auto_open,
            opened: false,
            blown_up: false,
            detach_on_blow_up: true,
            open_requested: false,
            blow_up_queued: false,
            speed_up_queued: false,
            monitoring: false,
            members: SmallVec::new(),
        }
    }

    /// Requests the grid be generated. Returns false if the panel already
    /// opened or has been blown up; reopening needs a fresh panel entity.
    pub fn open_panel(&mut self) -> bool {
        if self.opened || self.blown_up {
            log::debug!("open_panel ignored: panel already opened or blown up");
            return false;
        }
        self.open_requested = true;
        true
    }

    /// Starts the closing animation on every owned node. Returns false (and
    /// changes nothing) when the panel was already blown up; the flag flips
    /// false→true exactly once.
    pub fn blow_up(&mut self, detach: bool) -> bool {
        if self.blown_up {
            log::debug!("blow_up ignored: panel already blown up");
            return false;
        }
        self.blown_up = true;
        self.detach_on_blow_up = detach;
        self.blow_up_queued = true;
        true
    }

    /// Folds an externally-owned node into the panel's closing animation.
    pub fn add_particle(&mut self, entity: Entity, kind: PanelMemberKind) {
        self.members.push(PanelMember { entity, kind });
    }

    /// Requests every grid particle skip straight to its settled state.
    pub fn speed_up_particles(&mut self) {
        self.speed_up_queued = true;
    }

    pub fn blown_up(&self) -> bool {
        self.blown_up
    }

    pub fn opened(&self) -> bool {
        self.opened
    }

    pub fn members(&self) -> &[PanelMember] {
        &self.members
    }

    /// Derived per-cell dimensions.
    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(
            self.size.x / self.columns as f32,
            self.size.y / self.rows as f32,
        )
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Recomputes the derived cell width. Particles that already exist keep
    /// their dimensions; the new width only affects the next population.
    pub fn set_width(&mut self, width: f32) {
        self.size.x = width;
    }

    /// See [`Panel::set_width`]; same deal for the height.
    pub fn set_height(&mut self, height: f32) {
        self.size.y = height;
    }

    fn on_insert(mut world: DeferredWorld, HookContext { entity, .. }: HookContext) {
        if let Some(mut panel) = world.entity_mut(entity).get_mut::<Panel>() {
            if panel.auto_open {
                panel.open_requested = true;
            }
        }
    }

    /// Generates the particle grid row-major: delay grows by `appear_delay`
    /// per cell and colors cycle through the palette.
    fn populate(mut commands: Commands, mut panels: Query<(Entity, &mut Panel)>) {
        for (entity, mut panel) in panels.iter_mut() {
            if !panel.open_requested {
                continue;
            }
            panel.open_requested = false;
            if panel.opened || panel.blown_up {
                continue;
            }
            panel.opened = true;

            let cell = panel.cell_size();
            let size = panel.size;
            let mut index = 0u32;
            for row in 0..panel.rows {
                for col in 0..panel.columns {
                    let color = if panel.palette.is_empty() {
                        PRIMARY_COLOR
                    } else {
                        panel.palette[index as usize % panel.palette.len()]
                    };
                    let position = Vec2::new(
                        (col as f32 + 0.5) * cell.x - size.x / 2.0,
                        size.y / 2.0 - (row as f32 + 0.5) * cell.y,
                    );
                    let particle = Particle::new(
                        cell,
                        panel.rotation_amount,
                        panel.appear_delay * index,
                        panel.max_opacity,
                        panel.rotation_decay,
                    )
                    .with_border(panel.border);

                    let child = commands
                        .spawn((particle.bundle(position, color), ChildOf(entity)))
                        .id();
                    panel.members.push(PanelMember {
                        entity: child,
                        kind: PanelMemberKind::GridCell,
                    });
                    index += 1;
                }
            }
        }
    }

    /// Propagates a queued blow-up to every owned node and arms the
    /// completion monitor.
    fn dissolve(
        mut commands: Commands,
        mut rng: ResMut<GlobalRng>,
        mut panels: Query<&mut Panel>,
        mut particles: Query<&mut Particle>,
    ) {
        for mut panel in panels.iter_mut() {
            if !panel.blow_up_queued {
                continue;
            }
            panel.blow_up_queued = false;
            panel.monitoring = true;

            for member in panel.members.clone() {
                match member.kind {
                    PanelMemberKind::GridCell | PanelMemberKind::Absorbed => {
                        if let Ok(mut particle) = particles.get_mut(member.entity) {
                            particle.blow_up(&mut rng);
                        } else if member.kind == PanelMemberKind::Absorbed {
                            if let Ok(mut node) = commands.get_entity(member.entity) {
                                node.insert(Dissolve::default());
                            }
                        }
                    }
                    PanelMemberKind::Excluded => {}
                }
            }
        }
    }

    /// Applies a queued speed-up to every owned node that carries a
    /// particle. Excluded members and non-particle nodes are silently
    /// skipped.
    fn speed_up(
        mut panels: Query<&mut Panel>,
        mut particles: Query<(&mut Particle, &mut Transform, &mut Sprite)>,
    ) {
        for mut panel in panels.iter_mut() {
            if !panel.speed_up_queued {
                continue;
            }
            panel.speed_up_queued = false;

            for member in panel.members.clone() {
                if member.kind == PanelMemberKind::Excluded {
                    continue;
                }
                if let Ok((mut particle, mut transform, mut sprite)) =
                    particles.get_mut(member.entity)
                {
                    particle.speed_up(&mut transform, &mut sprite);
                }
            }
        }
    }

    /// Per-tick completion check, ordered after all particle advancement:
    /// once every non-excluded owned node has despawned, the panel detaches
    /// itself (when asked to) and the monitor disarms.
    fn reap(
        mut commands: Commands,
        mut panels: Query<(Entity, &mut Panel)>,
        alive: Query<(), Or<(With<Particle>, With<Dissolve>)>>,
    ) {
        for (entity, mut panel) in panels.iter_mut() {
            if !panel.monitoring {
                continue;
            }
            let any_left = panel.members.iter().any(|member| {
                member.kind != PanelMemberKind::Excluded && alive.get(member.entity).is_ok()
            });
            if !any_left {
                panel.monitoring = false;
                if panel.detach_on_blow_up {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}
