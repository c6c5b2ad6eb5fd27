use std::time::Duration;

use bevy::{
    ecs::{component::HookContext, world::DeferredWorld},
    prelude::*,
};
use rand::Rng;

use crate::{
    systems::{rng::GlobalRng, rng::RngPlugin, time::Dilation, time::DilationPlugin},
    MenuFxSystem,
};

#[cfg(test)]
mod tests;

/// Opacity gained per tick while a particle fades in.
pub const SPAWN_OPACITY_STEP: f32 = 0.015;
/// Opacity lost per tick while a particle blows out.
pub const BLOW_OPACITY_STEP: f32 = 0.025;
/// Blow-up speed range, in units per tick.
pub const BLOW_SPEED_MIN: i32 = 3;
pub const BLOW_SPEED_MAX: i32 = 6;

pub struct ParticlePlugin;
impl Plugin for ParticlePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                Particle::spawn_in,
                Particle::blow_out,
                Particle::sync_border_alpha,
                Dissolve::enact,
            )
                .in_set(MenuFxSystem::Particles),
        );

        if !app.is_plugin_added::<DilationPlugin>() {
            app.add_plugins(DilationPlugin);
        }
        if !app.is_plugin_added::<RngPlugin>() {
            app.add_plugins(RngPlugin);
        }
    }
}

/// Where a particle is in its life. Removal is not a phase: a removed
/// particle is a despawned entity, which makes the transition terminal by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticlePhase {
    /// Waiting out the spawn delay, invisible.
    Pending,
    /// Entrance animation: rotation decay, scale-up, fade-in.
    SpawningIn,
    /// At rest: rotation 0, scale 1, opacity at its maximum.
    Idle,
    /// Exit animation: drifting along a fixed direction while fading out.
    BlowingUp,
}

/// Fixed trajectory chosen once at blow-up time.
#[derive(Debug, Clone, Copy)]
pub struct Burst {
    pub direction: Vec2,
    pub speed: f32,
}

#[derive(Clone, Copy)]
pub struct ParticleBorder {
    pub color: Color,
    pub thickness: f32,
}

/// One animated rectangular cell of a panel.
///
/// The fill rectangle lives in the entity's own `Sprite`; rotation is kept in
/// degrees here (the decay loop divides degrees, as the panel reveal was
/// tuned against) and written to the `Transform` every tick.
#[derive(Component)]
#[component(on_insert = Particle::on_insert)]
#[require(Transform, Visibility)]
pub struct Particle {
    size: Vec2,
    max_opacity: f32,
    rotation: f32,
    rotation_decay: f32,
    delay: Timer,
    border: Option<ParticleBorder>,
    phase: ParticlePhase,
    burst: Option<Burst>,
}

/// Backing sprite that skins a particle's border.
#[derive(Component, Default)]
pub struct ParticleBorderSprite;

impl Particle {
    pub fn new(
        size: Vec2,
        rotation_amount: f32,
        delay: Duration,
        max_opacity: f32,
        rotation_decay: f32,
    ) -> Self {
        Particle {
            size,
            max_opacity,
            rotation: rotation_amount,
            rotation_decay,
            delay: Timer::new(delay, TimerMode::Once),
            border: None,
            phase: ParticlePhase::Pending,
            burst: None,
        }
    }

    pub fn with_border(mut self, border: Option<ParticleBorder>) -> Self {
        self.border = border;
        self
    }

    /// Everything needed to drop a particle into a scene: fill sprite at
    /// opacity 0, scale 0, initial rotation applied.
    pub fn bundle(self, position: Vec2, color: Color) -> impl Bundle {
        let rotation = Quat::from_rotation_z(self.rotation.to_radians());
        let size = self.size;
        (
            Sprite {
                color: color.with_alpha(0.0),
                custom_size: Some(size),
                ..default()
            },
            Transform {
                translation: position.extend(0.0),
                rotation,
                scale: Vec3::new(0.0, 0.0, 1.0),
            },
            self,
        )
    }

    pub fn phase(&self) -> ParticlePhase {
        self.phase
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn spawn_delay(&self) -> Duration {
        self.delay.duration()
    }

    /// Begins the exit animation: the pending delay is abandoned, rotation is
    /// reset, and a random direction/speed pair is locked in. Idempotent;
    /// a particle already blowing up keeps its trajectory.
    pub fn blow_up(&mut self, rng: &mut GlobalRng) -> bool {
        if self.phase == ParticlePhase::BlowingUp {
            return false;
        }
        let angle = rng.uniform.random_range(0.0f32..360.0).to_radians();
        let speed = rng.uniform.random_range(BLOW_SPEED_MIN..=BLOW_SPEED_MAX) as f32;
        self.rotation = 0.0;
        self.burst = Some(Burst {
            direction: Vec2::new(angle.cos(), angle.sin()),
            speed,
        });
        self.phase = ParticlePhase::BlowingUp;
        true
    }

    /// Skips the rest of the entrance animation and pins the particle at its
    /// settled state. Has no effect on a particle that is blowing up.
    pub fn speed_up(&mut self, transform: &mut Transform, sprite: &mut Sprite) {
        if self.phase == ParticlePhase::BlowingUp {
            return;
        }
        self.rotation = 0.0;
        self.phase = ParticlePhase::Idle;
        transform.rotation = Quat::IDENTITY;
        transform.scale = Vec3::ONE;
        sprite.color.set_alpha(self.max_opacity);
    }

    fn on_insert(mut world: DeferredWorld, HookContext { entity, .. }: HookContext) {
        let border = {
            match world.entity(entity).get::<Particle>() {
                Some(particle) => match particle.border {
                    Some(border) => (border, particle.size),
                    None => return,
                },
                None => return,
            }
        };
        let (border, size) = border;

        world.commands().entity(entity).with_children(|parent| {
            parent.spawn((
                ParticleBorderSprite,
                Sprite {
                    color: border.color.with_alpha(0.0),
                    custom_size: Some(size + Vec2::splat(border.thickness * 2.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, -0.1)),
            ));
        });
    }

    /// Entrance stepper. Three convergence processes run concurrently and
    /// finish independently; once all three are done the particle is Idle.
    pub fn spawn_in(
        time: Res<Time>,
        dilation: Res<Dilation>,
        mut query: Query<(&mut Particle, &mut Transform, &mut Sprite)>,
    ) {
        for (mut particle, mut transform, mut sprite) in query.iter_mut() {
            match particle.phase {
                ParticlePhase::Pending => {
                    particle.delay.tick(time.delta().mul_f32(dilation.0));
                    if particle.delay.finished() {
                        particle.phase = ParticlePhase::SpawningIn;
                    }
                }
                ParticlePhase::SpawningIn => {
                    if particle.rotation != 0.0 {
                        particle.rotation /= particle.rotation_decay;
                        if particle.rotation.abs() < 1.0 {
                            particle.rotation = 0.0;
                        }
                        transform.rotation = Quat::from_rotation_z(particle.rotation.to_radians());
                    }

                    let scale_step = Vec2::new(1.0 / particle.size.x, 1.0 / particle.size.y);
                    if transform.scale.x < 1.0 {
                        transform.scale.x = (transform.scale.x + scale_step.x).min(1.0);
                    }
                    if transform.scale.y < 1.0 {
                        transform.scale.y = (transform.scale.y + scale_step.y).min(1.0);
                    }

                    let alpha = sprite.color.alpha();
                    if alpha < particle.max_opacity {
                        sprite
                            .color
                            .set_alpha((alpha + SPAWN_OPACITY_STEP).min(particle.max_opacity));
                    }

                    if particle.rotation == 0.0
                        && transform.scale.x >= 1.0
                        && transform.scale.y >= 1.0
                        && sprite.color.alpha() >= particle.max_opacity
                    {
                        particle.phase = ParticlePhase::Idle;
                    }
                }
                ParticlePhase::Idle | ParticlePhase::BlowingUp => {}
            }
        }
    }

    /// Exit stepper. Removal happens the tick after opacity reaches zero
    /// and despawns the entity outright; that is the terminal transition.
    pub fn blow_out(
        mut commands: Commands,
        mut query: Query<(Entity, &mut Particle, &mut Transform, &mut Sprite)>,
    ) {
        for (entity, mut particle, mut transform, mut sprite) in query.iter_mut() {
            if particle.phase != ParticlePhase::BlowingUp {
                continue;
            }
            let Some(burst) = particle.burst else {
                continue;
            };

            let alpha = sprite.color.alpha();
            if alpha > 0.0 {
                transform.translation += (burst.direction * burst.speed).extend(0.0);
                particle.rotation += burst.speed;
                transform.rotation = Quat::from_rotation_z(particle.rotation.to_radians());
                sprite.color.set_alpha(alpha - BLOW_OPACITY_STEP);
            } else {
                commands.entity(entity).despawn();
            }
        }
    }

    /// The border backing sprite follows the fill's opacity.
    fn sync_border_alpha(
        particles: Query<(&Sprite, &Children), With<Particle>>,
        mut borders: Query<&mut Sprite, (With<ParticleBorderSprite>, Without<Particle>)>,
    ) {
        for (fill, children) in particles.iter() {
            for child in children.iter() {
                if let Ok(mut border) = borders.get_mut(child) {
                    border.color.set_alpha(fill.color.alpha());
                }
            }
        }
    }
}

/// Drift-up-and-fade removal for non-grid nodes absorbed into a closing
/// panel (tab buttons and the like). The faded alpha is pushed onto the
/// node's own sprite/text and every descendant's.
#[derive(Component)]
pub struct Dissolve {
    pub rise: f32,
    pub alpha_step: f32,
    alpha: f32,
}

impl Default for Dissolve {
    fn default() -> Self {
        Dissolve {
            rise: 1.0,
            alpha_step: BLOW_OPACITY_STEP,
            alpha: 1.0,
        }
    }
}

impl Dissolve {
    pub fn enact(
        mut commands: Commands,
        mut query: Query<(Entity, &mut Dissolve, &mut Transform)>,
        children_query: Query<&Children>,
        mut sprites: Query<&mut Sprite>,
        mut texts: Query<&mut TextColor>,
    ) {
        for (entity, mut dissolve, mut transform) in query.iter_mut() {
            if dissolve.alpha > 0.0 {
                transform.translation.y += dissolve.rise;
                dissolve.alpha -= dissolve.alpha_step;

                let mut stack = vec![entity];
                while let Some(node) = stack.pop() {
                    if let Ok(mut sprite) = sprites.get_mut(node) {
                        sprite.color.set_alpha(dissolve.alpha.max(0.0));
                    }
                    if let Ok(mut text) = texts.get_mut(node) {
                        text.0.set_alpha(dissolve.alpha.max(0.0));
                    }
                    if let Ok(children) = children_query.get(node) {
                        for child in children.iter() {
                            stack.push(child);
                        }
                    }
                }
            } else {
                commands.entity(entity).despawn();
            }
        }
    }
}
