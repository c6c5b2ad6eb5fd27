use bevy::prelude::*;

pub const PRIMARY_COLOR: Color = Color::Srgba(Srgba::new(1.0, 1.0, 1.0, 1.0));
pub const MENU_COLOR: Color = Color::Srgba(Srgba::new(0.1, 0.12, 0.16, 1.0));
pub const PANEL_BORDER_COLOR: Color = Color::Srgba(Srgba::new(0.0, 0.0, 0.0, 1.0));

pub const HOVERED_BUTTON: Color = Color::srgb(0.35, 0.38, 0.45);
pub const CLICKED_BUTTON: Color = Color::srgb(0.55, 0.58, 0.65);
pub const OPENED_TAB: Color = Color::srgb(0.22, 0.28, 0.38);

pub const TUTORIAL_BG: Color = Color::Srgba(Srgba::new(0.0, 0.0, 0.0, 0.8));
pub const TUTORIAL_LINE: Color = Color::Srgba(Srgba::new(1.0, 1.0, 1.0, 1.0));
