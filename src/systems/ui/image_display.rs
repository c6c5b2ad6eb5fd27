use bevy::{prelude::*, sprite::Anchor};

use crate::systems::colors::PRIMARY_COLOR;

/// Per-tick fade of the switch flash overlay.
const FLASH_FADE_STEP: f32 = 0.05;
/// Per-tick horizontal scale step for the switch-in/delete animations.
const SCALE_STEP: f32 = 0.05;

pub struct ImageEntry {
    pub sprite: Sprite,
    pub caption: String,
}

/// Marks the flash overlay of an image display.
#[derive(Component, Default)]
pub struct ImageFlash;

/// Shows one image of a fixed set at a time, with a caption, a flash
/// overlay on every switch, and a horizontal scale-in.
#[derive(Component)]
pub struct ImageDisplay {
    images: Vec<Entity>,
    captions: Vec<String>,
    sizes: Vec<Vec2>,
    current: Option<usize>,
    switch_queued: Option<usize>,
    deleting: bool,
    delete_queued: bool,
    overlay: Entity,
    caption_text: Entity,
    caption_bg: Entity,
}

impl ImageDisplay {
    pub fn spawn(commands: &mut Commands, position: Vec2, entries: Vec<ImageEntry>) -> Entity {
        let root = commands
            .spawn((
                Transform::from_translation(position.extend(0.0)),
                Visibility::default(),
            ))
            .id();

        let mut images = Vec::new();
        let mut captions = Vec::new();
        let mut sizes = Vec::new();
        for entry in entries {
            let size = entry.sprite.custom_size.unwrap_or(Vec2::splat(100.0));
            let image = commands
                .spawn((
                    entry.sprite,
                    Transform::default(),
                    Visibility::Hidden,
                    ChildOf(root),
                ))
                .id();
            images.push(image);
            captions.push(entry.caption);
            sizes.push(size);
        }

        let overlay = commands
            .spawn((
                ImageFlash,
                Sprite {
                    color: Color::WHITE.with_alpha(0.0),
                    custom_size: Some(Vec2::splat(1.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.5)),
                ChildOf(root),
            ))
            .id();
        let caption_bg = commands
            .spawn((
                Sprite {
                    color: Color::BLACK.with_alpha(0.75),
                    custom_size: Some(Vec2::new(1.0, 16.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.3)),
                Visibility::Hidden,
                ChildOf(root),
            ))
            .id();
        let caption_text = commands
            .spawn((
                Text2d::new(""),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(PRIMARY_COLOR),
                Anchor::Center,
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.4)),
                ChildOf(caption_bg),
            ))
            .id();

        commands.entity(root).insert(ImageDisplay {
            images,
            captions,
            sizes,
            current: None,
            switch_queued: None,
            deleting: false,
            delete_queued: false,
            overlay,
            caption_text,
            caption_bg,
        });
        root
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn images(&self) -> &[Entity] {
        &self.images
    }

    /// Requests a switch to the image at `index`. Selecting the image that
    /// is already showing is a no-op, flash included; reports whether a
    /// switch was actually queued.
    pub fn display_image(&mut self, index: usize) -> bool {
        if self.deleting || index >= self.images.len() || self.current == Some(index) {
            return false;
        }
        self.switch_queued = Some(index);
        true
    }

    /// Flashes once more, scales the display back down, and despawns it.
    pub fn delete_from_display(&mut self) {
        if self.deleting {
            return;
        }
        self.deleting = true;
        self.delete_queued = true;
    }

    /// Applies queued switches and deletions: visibility flips, caption and
    /// overlay updates, and the scale reset that starts the scale-in.
    pub fn retarget(
        mut displays: Query<(&mut ImageDisplay, &mut Transform)>,
        mut visibilities: Query<&mut Visibility>,
        mut sprites: Query<&mut Sprite>,
        mut texts: Query<&mut Text2d>,
        mut transforms: Query<&mut Transform, Without<ImageDisplay>>,
    ) {
        for (mut display, mut transform) in displays.iter_mut() {
            if display.delete_queued {
                display.delete_queued = false;
                if let Some(current) = display.current {
                    if let Ok(mut visibility) = visibilities.get_mut(display.images[current]) {
                        *visibility = Visibility::Hidden;
                    }
                }
                if let Ok(mut overlay) = sprites.get_mut(display.overlay) {
                    overlay.color.set_alpha(1.0);
                }
                continue;
            }

            let Some(index) = display.switch_queued.take() else {
                continue;
            };
            if let Some(previous) = display.current {
                if let Ok(mut visibility) = visibilities.get_mut(display.images[previous]) {
                    *visibility = Visibility::Hidden;
                }
            }
            display.current = Some(index);
            if let Ok(mut visibility) = visibilities.get_mut(display.images[index]) {
                *visibility = Visibility::Inherited;
            }

            let size = display.sizes[index];
            if let Ok(mut overlay) = sprites.get_mut(display.overlay) {
                overlay.color.set_alpha(1.0);
                overlay.custom_size = Some(size);
            }
            if let Ok(mut caption) = texts.get_mut(display.caption_text) {
                caption.0 = display.captions[index].clone();
            }
            if let Ok(mut bg) = sprites.get_mut(display.caption_bg) {
                bg.custom_size = Some(Vec2::new(size.x, 16.0));
            }
            if let Ok(mut visibility) = visibilities.get_mut(display.caption_bg) {
                *visibility = Visibility::Inherited;
            }
            if let Ok(mut bg_transform) = transforms.get_mut(display.caption_bg) {
                bg_transform.translation.x = 0.0;
                bg_transform.translation.y = -size.y / 2.0 - 14.0;
            }

            // Scale collapses so the scale-in restarts on every switch.
            transform.scale.x = 0.0;
        }
    }

    /// Per-tick animation: the flash fades, the display scales in (or out,
    /// when deleting) and despawns once a deletion's flash has faded.
    pub fn animate(
        mut commands: Commands,
        mut displays: Query<(Entity, &ImageDisplay, &mut Transform)>,
        mut sprites: Query<&mut Sprite, With<ImageFlash>>,
    ) {
        for (entity, display, mut transform) in displays.iter_mut() {
            let mut flash_alpha = 0.0;
            if let Ok(mut overlay) = sprites.get_mut(display.overlay) {
                let alpha = overlay.color.alpha();
                if alpha > 0.0 {
                    overlay.color.set_alpha((alpha - FLASH_FADE_STEP).max(0.0));
                }
                flash_alpha = overlay.color.alpha();
            }

            if display.deleting {
                if transform.scale.x > 0.0 {
                    transform.scale.x = (transform.scale.x - SCALE_STEP).max(0.0);
                }
                if flash_alpha <= 0.0 {
                    commands.entity(entity).despawn();
                }
            } else if display.current.is_some() && transform.scale.x < 1.0 {
                transform.scale.x = (transform.scale.x + SCALE_STEP).min(1.0);
            }
        }
    }
}
