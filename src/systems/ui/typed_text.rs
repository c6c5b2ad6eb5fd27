use std::time::Duration;

use bevy::prelude::*;

use crate::systems::time::Dilation;

/// Where a typed-text label is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedPhase {
    /// The underscore blinks a fixed number of times before typing starts.
    Blinking,
    /// One character appears per typing interval, underscore trailing.
    Typing,
    /// The full sentence is shown; the underscore keeps blinking.
    Settled,
    /// One character disappears per tick; the entity despawns at zero.
    Deleting,
}

/// A text label that types itself onto the screen character by character.
///
/// Blinking and typing run on their own wall-clock intervals; deletion is
/// per-tick, like the exit animations elsewhere in the crate.
#[derive(Component)]
#[require(Transform, Visibility)]
pub struct TypedText {
    sentence: String,
    blink_total: u32,
    blinking_delay: Duration,
    typing_delay: Duration,
    timer: Timer,
    step: u32,
    phase: TypedPhase,
}

impl TypedText {
    pub fn new(
        sentence: impl Into<String>,
        blink_total: u32,
        blinking_delay: Duration,
        typing_delay: Duration,
    ) -> Self {
        TypedText {
            sentence: sentence.into(),
            blink_total,
            blinking_delay,
            typing_delay,
            timer: Timer::new(blinking_delay, TimerMode::Repeating),
            step: 0,
            phase: TypedPhase::Blinking,
        }
    }

    pub fn bundle(self, position: Vec2, font_size: f32, color: Color) -> impl Bundle {
        (
            Text2d::new(""),
            TextFont {
                font_size,
                ..default()
            },
            TextColor(color),
            Transform::from_translation(position.extend(0.0)),
            self,
        )
    }

    pub fn phase(&self) -> TypedPhase {
        self.phase
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    /// Starts erasing the label one character per tick, underscore last.
    /// The entity despawns once nothing is left.
    pub fn delete_text(&mut self, text: &mut Text2d) {
        text.0 = format!("{}_", self.sentence);
        self.phase = TypedPhase::Deleting;
    }

    pub fn advance(
        time: Res<Time>,
        dilation: Res<Dilation>,
        mut commands: Commands,
        mut query: Query<(Entity, &mut TypedText, &mut Text2d)>,
    ) {
        for (entity, mut typed, mut text) in query.iter_mut() {
            if typed.phase == TypedPhase::Deleting {
                if text.0.is_empty() {
                    commands.entity(entity).despawn();
                } else {
                    text.0.pop();
                }
                continue;
            }

            typed.timer.tick(time.delta().mul_f32(dilation.0));
            if !typed.timer.just_finished() {
                continue;
            }

            match typed.phase {
                TypedPhase::Blinking => {
                    if typed.step != typed.blink_total {
                        text.0 = if typed.step % 2 == 1 { "_" } else { "" }.to_string();
                        typed.step += 1;
                    } else {
                        let delay = typed.typing_delay;
                        typed.timer = Timer::new(delay, TimerMode::Repeating);
                        typed.step = 0;
                        typed.phase = TypedPhase::Typing;
                    }
                }
                TypedPhase::Typing => {
                    if typed.step as usize != typed.sentence.chars().count() + 1 {
                        let shown: String =
                            typed.sentence.chars().take(typed.step as usize).collect();
                        text.0 = format!("{shown}_");
                        typed.step += 1;
                    } else {
                        let delay = typed.blinking_delay;
                        typed.timer = Timer::new(delay, TimerMode::Repeating);
                        typed.step = 0;
                        typed.phase = TypedPhase::Settled;
                    }
                }
                TypedPhase::Settled => {
                    // Alternately strip and restore the trailing underscore.
                    if typed.step == 0 {
                        text.0.pop();
                    } else {
                        text.0.push('_');
                    }
                    typed.step = (typed.step + 1) % 2;
                }
                TypedPhase::Deleting => {}
            }
        }
    }
}
