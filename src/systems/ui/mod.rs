use bevy::prelude::*;

use crate::{
    systems::{panels::PanelPlugin, time::DilationPlugin},
    MenuFxSystem,
};

pub mod check_box;
pub mod frame;
pub mod image_display;
pub mod tabs;
pub mod typed_text;


pub use check_box::{CheckBox, CheckBoxConfig, CheckBoxToggled, SlideDir};
pub use frame::{FrameContentItem, FrameTab, MenuFrame, MenuFrameConfig};
pub use image_display::{ImageDisplay, ImageEntry};
pub use tabs::{TabButton, TabKind, TabPalette, TabPressed};
pub use typed_text::{TypedPhase, TypedText};

pub struct WidgetPlugin;
impl Plugin for WidgetPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CheckBoxToggled>()
            .add_event::<TabPressed>()
            .add_systems(
                Update,
                (
                    TypedText::advance,
                    (
                        CheckBox::slide_in,
                        CheckBox::apply_toggles,
                        CheckBox::sync_visuals,
                    )
                        .chain(),
                    (TabButton::deliver_presses, TabButton::sync_skin).chain(),
                    (
                        MenuFrame::entrance,
                        MenuFrame::handle_presses,
                        MenuFrame::show_content,
                        MenuFrame::slide_content,
                        MenuFrame::close,
                        MenuFrame::fade_out,
                        MenuFrame::reap,
                    )
                        .chain(),
                    (ImageDisplay::retarget, ImageDisplay::animate).chain(),
                )
                    .chain()
                    .in_set(MenuFxSystem::Widgets),
            );

        if !app.is_plugin_added::<PanelPlugin>() {
            app.add_plugins(PanelPlugin);
        }
        if !app.is_plugin_added::<DilationPlugin>() {
            app.add_plugins(DilationPlugin);
        }
    }
}

/// Writes one alpha onto every sprite and text in a subtree. Widgets whose
/// fade animations live on a container use this to push the container's
/// alpha down to the leaves.
pub(crate) fn set_subtree_alpha(
    root: Entity,
    alpha: f32,
    children: &Query<&Children>,
    sprites: &mut Query<&mut Sprite>,
    texts: &mut Query<&mut TextColor>,
) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Ok(mut sprite) = sprites.get_mut(node) {
            sprite.color.set_alpha(alpha);
        }
        if let Ok(mut text) = texts.get_mut(node) {
            text.0.set_alpha(alpha);
        }
        if let Ok(kids) = children.get(node) {
            stack.extend(kids.iter());
        }
    }
}
