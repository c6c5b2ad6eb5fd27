use bevy::prelude::*;

use crate::systems::colors::{
    CLICKED_BUTTON, HOVERED_BUTTON, MENU_COLOR, OPENED_TAB, PANEL_BORDER_COLOR, PRIMARY_COLOR,
};

/// Fired when a tab button is pressed through [`TabButton::press`]. Menu
/// frames route these to content swaps or to their own teardown.
#[derive(Event, Debug, Clone)]
pub struct TabPressed {
    pub button: Entity,
    pub kind: TabKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabKind {
    /// Switches its frame to the content behind this tab.
    Tab,
    /// Closes the frame it sits on.
    Exit,
}

#[derive(Clone, Copy)]
pub struct TabPalette {
    pub idle: Color,
    pub hovered: Color,
    pub pressed: Color,
    pub opened: Color,
    pub border: Color,
    pub text: Color,
}

impl Default for TabPalette {
    fn default() -> Self {
        TabPalette {
            idle: MENU_COLOR,
            hovered: HOVERED_BUTTON,
            pressed: CLICKED_BUTTON,
            opened: OPENED_TAB,
            border: PANEL_BORDER_COLOR,
            text: PRIMARY_COLOR,
        }
    }
}

/// A tab link on a menu frame. The root sprite is the button face; the
/// label and border are children. Removal is not handled here: a closing
/// frame absorbs its tabs into its panel, which dissolves them.
#[derive(Component)]
pub struct TabButton {
    label: String,
    kind: TabKind,
    opened: bool,
    hovered: bool,
    press_queued: bool,
    palette: TabPalette,
    text: Entity,
    border: Entity,
}

impl TabButton {
    pub fn spawn(
        commands: &mut Commands,
        position: Vec2,
        label: impl Into<String>,
        kind: TabKind,
        size: Vec2,
        palette: TabPalette,
    ) -> Entity {
        let label = label.into();
        let root = commands
            .spawn((
                Sprite {
                    color: palette.idle,
                    custom_size: Some(size),
                    ..default()
                },
                Transform::from_translation(position.extend(0.0)),
            ))
            .id();
        let border = commands
            .spawn((
                Sprite {
                    color: palette.border,
                    custom_size: Some(size + Vec2::splat(2.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, -0.1)),
                ChildOf(root),
            ))
            .id();
        let text = commands
            .spawn((
                Text2d::new(label.clone()),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(palette.text),
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.1)),
                ChildOf(root),
            ))
            .id();

        commands.entity(root).insert(TabButton {
            label,
            kind,
            opened: false,
            hovered: false,
            press_queued: false,
            palette,
            text,
            border,
        });
        root
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> TabKind {
        self.kind
    }

    pub fn opened(&self) -> bool {
        self.opened
    }

    /// Swaps the button face between the opened and idle colors. A no-op
    /// when the state does not actually change.
    pub fn set_as_opened(&mut self, opened: bool) {
        if self.opened == opened {
            return;
        }
        self.opened = opened;
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Queues a press; the event goes out on the next tick.
    pub fn press(&mut self) {
        self.press_queued = true;
    }

    pub fn deliver_presses(
        mut query: Query<(Entity, &mut TabButton)>,
        mut pressed: EventWriter<TabPressed>,
    ) {
        for (entity, mut button) in query.iter_mut() {
            if !button.press_queued {
                continue;
            }
            button.press_queued = false;
            pressed.write(TabPressed {
                button: entity,
                kind: button.kind,
            });
        }
    }

    /// Recolors the face for the hover/opened state, keeping whatever alpha
    /// an entrance or teardown fade has set.
    pub fn sync_skin(
        mut buttons: Query<(&TabButton, &mut Sprite)>,
        mut plain_sprites: Query<&mut Sprite, Without<TabButton>>,
        mut texts: Query<&mut TextColor>,
    ) {
        for (button, mut sprite) in buttons.iter_mut() {
            let target = if button.hovered {
                button.palette.hovered
            } else if button.opened {
                button.palette.opened
            } else {
                button.palette.idle
            };
            let alpha = sprite.color.alpha();
            sprite.color = target.with_alpha(alpha);

            if let Ok(mut border) = plain_sprites.get_mut(button.border) {
                let alpha = border.color.alpha();
                border.color = button.palette.border.with_alpha(alpha);
            }
            if let Ok(mut text) = texts.get_mut(button.text) {
                let alpha = text.0.alpha();
                text.0 = button.palette.text.with_alpha(alpha);
            }
        }
    }
}
