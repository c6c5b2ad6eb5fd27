use bevy::{prelude::*, sprite::Anchor};

use crate::systems::colors::{CLICKED_BUTTON, HOVERED_BUTTON, MENU_COLOR, PRIMARY_COLOR};

/// Fired whenever a check box flips state through [`CheckBox::toggle`].
#[derive(Event, Debug, Clone)]
pub struct CheckBoxToggled {
    pub entity: Entity,
    pub checked: bool,
}

/// Which side a widget slides in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDir {
    Left,
    Right,
    Up,
    Down,
}

impl SlideDir {
    /// Unit step, in world units per tick, that undoes the entrance offset.
    fn step(self) -> Vec2 {
        match self {
            SlideDir::Left => Vec2::X,
            SlideDir::Right => Vec2::NEG_X,
            SlideDir::Up => Vec2::NEG_Y,
            SlideDir::Down => Vec2::Y,
        }
    }
}

#[derive(Clone, Copy)]
pub struct CheckBoxSkin {
    pub box_color: Color,
    pub border_color: Color,
    pub mark_color: Color,
    pub label_color: Color,
}

#[derive(Clone)]
pub struct CheckBoxConfig {
    pub label: String,
    pub checked: bool,
    pub box_size: f32,
    pub mark_size: f32,
    pub label_gap: f32,
    pub slide_offset: f32,
    pub slide_dir: SlideDir,
    pub skin: CheckBoxSkin,
    pub hover_skin: CheckBoxSkin,
}

impl Default for CheckBoxConfig {
    fn default() -> Self {
        CheckBoxConfig {
            label: String::new(),
            checked: true,
            box_size: 15.0,
            mark_size: 7.0,
            label_gap: 10.0,
            slide_offset: 10.0,
            slide_dir: SlideDir::Left,
            skin: CheckBoxSkin {
                box_color: PRIMARY_COLOR,
                border_color: MENU_COLOR,
                mark_color: CLICKED_BUTTON,
                label_color: PRIMARY_COLOR,
            },
            hover_skin: CheckBoxSkin {
                box_color: HOVERED_BUTTON,
                border_color: PRIMARY_COLOR,
                mark_color: PRIMARY_COLOR,
                label_color: HOVERED_BUTTON,
            },
        }
    }
}

/// Marks the X-mark container of a check box.
#[derive(Component, Default)]
pub struct CheckBoxMark;

/// A labelled toggle box with a slide-and-fade entrance.
///
/// Hit-testing is the caller's business: an input layer calls `toggle` and
/// `set_hovered`, and listens for [`CheckBoxToggled`].
#[derive(Component)]
pub struct CheckBox {
    checked: bool,
    hovered: bool,
    toggle_queued: bool,
    remaining_slide: f32,
    slide_dir: SlideDir,
    alpha: f32,
    skin: CheckBoxSkin,
    hover_skin: CheckBoxSkin,
    box_sprite: Entity,
    box_border: Entity,
    mark: Entity,
    label: Entity,
}

impl CheckBox {
    pub fn spawn(commands: &mut Commands, position: Vec2, config: CheckBoxConfig) -> Entity {
        let start = position - config.slide_dir.step() * config.slide_offset;
        let root = commands
            .spawn((Transform::from_translation(start.extend(0.0)), Visibility::default()))
            .id();

        let box_border = commands
            .spawn((
                Sprite {
                    color: config.skin.border_color.with_alpha(0.0),
                    custom_size: Some(Vec2::splat(config.box_size + 2.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, -0.1)),
                ChildOf(root),
            ))
            .id();
        let box_sprite = commands
            .spawn((
                Sprite {
                    color: config.skin.box_color.with_alpha(0.0),
                    custom_size: Some(Vec2::splat(config.box_size)),
                    ..default()
                },
                Transform::default(),
                ChildOf(root),
            ))
            .id();

        // The X mark is two crossed strokes under a toggleable container.
        let mark = commands
            .spawn((
                CheckBoxMark,
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.1)),
                if config.checked {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                },
                ChildOf(root),
            ))
            .id();
        let stroke_size = Vec2::new(config.mark_size * std::f32::consts::SQRT_2, 1.5);
        for angle in [45.0f32, -45.0] {
            commands.spawn((
                Sprite {
                    color: config.skin.mark_color.with_alpha(0.0),
                    custom_size: Some(stroke_size),
                    ..default()
                },
                Transform::from_rotation(Quat::from_rotation_z(angle.to_radians())),
                ChildOf(mark),
            ));
        }

        let label = commands
            .spawn((
                Text2d::new(config.label),
                TextFont {
                    font_size: 15.0,
                    ..default()
                },
                TextColor(config.skin.label_color.with_alpha(0.0)),
                Anchor::CenterLeft,
                Transform::from_translation(Vec3::new(
                    config.box_size / 2.0 + config.label_gap,
                    0.0,
                    0.0,
                )),
                ChildOf(root),
            ))
            .id();

        commands.entity(root).insert(CheckBox {
            checked: config.checked,
            hovered: false,
            toggle_queued: false,
            remaining_slide: config.slide_offset,
            slide_dir: config.slide_dir,
            alpha: 0.0,
            skin: config.skin,
            hover_skin: config.hover_skin,
            box_sprite,
            box_border,
            mark,
            label,
        });
        root
    }

    pub fn is_selected(&self) -> bool {
        self.checked
    }

    pub fn toggle(&mut self) {
        self.checked = !self.checked;
        self.toggle_queued = true;
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Entrance: one unit of travel and 0.05 alpha per tick until both the
    /// offset and the fade have been paid off.
    pub fn slide_in(mut query: Query<(&mut CheckBox, &mut Transform)>) {
        for (mut check_box, mut transform) in query.iter_mut() {
            if check_box.remaining_slide > 0.0 {
                let step = check_box.slide_dir.step();
                transform.translation += step.extend(0.0);
                check_box.remaining_slide -= 1.0;
            }
            if check_box.alpha < 1.0 {
                check_box.alpha = (check_box.alpha + 0.05).min(1.0);
            }
        }
    }

    pub fn apply_toggles(
        mut query: Query<(Entity, &mut CheckBox)>,
        mut toggled: EventWriter<CheckBoxToggled>,
    ) {
        for (entity, mut check_box) in query.iter_mut() {
            if !check_box.toggle_queued {
                continue;
            }
            check_box.toggle_queued = false;
            toggled.write(CheckBoxToggled {
                entity,
                checked: check_box.checked,
            });
        }
    }

    /// Applies the active skin (hover or not), the entrance alpha, and the
    /// mark's checked visibility.
    pub fn sync_visuals(
        check_boxes: Query<&CheckBox>,
        children: Query<&Children>,
        mut visibilities: Query<&mut Visibility>,
        mut sprites: Query<&mut Sprite>,
        mut texts: Query<&mut TextColor>,
    ) {
        for check_box in check_boxes.iter() {
            let skin = if check_box.hovered {
                &check_box.hover_skin
            } else {
                &check_box.skin
            };
            let alpha = check_box.alpha;

            if let Ok(mut sprite) = sprites.get_mut(check_box.box_sprite) {
                sprite.color = skin.box_color.with_alpha(alpha);
            }
            if let Ok(mut sprite) = sprites.get_mut(check_box.box_border) {
                sprite.color = skin.border_color.with_alpha(alpha);
            }
            if let Ok(mut text) = texts.get_mut(check_box.label) {
                text.0 = skin.label_color.with_alpha(alpha);
            }
            if let Ok(strokes) = children.get(check_box.mark) {
                for stroke in strokes.iter() {
                    if let Ok(mut sprite) = sprites.get_mut(stroke) {
                        sprite.color = skin.mark_color.with_alpha(alpha);
                    }
                }
            }
            if let Ok(mut visibility) = visibilities.get_mut(check_box.mark) {
                *visibility = if check_box.checked {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
            }
        }
    }
}
