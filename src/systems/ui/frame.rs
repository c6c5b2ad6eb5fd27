use bevy::{prelude::*, sprite::Anchor, text::TextBounds};

use crate::systems::{
    colors::{MENU_COLOR, PANEL_BORDER_COLOR, PRIMARY_COLOR},
    panels::{Panel, PanelConfig, PanelMemberKind},
};

use super::{
    set_subtree_alpha,
    tabs::{TabButton, TabKind, TabPalette, TabPressed},
};

const TAB_HEIGHT: f32 = 35.0;
const RAIL_HEIGHT: f32 = 30.0;
/// How far the tab row and top rail sink during the entrance.
const ENTRANCE_DROP: f32 = 50.0;
const FADE_STEP: f32 = 0.025;
/// Horizontal offset freshly displayed content slides in from.
const CONTENT_SLIDE: f32 = 5.0;

const CONTENT_LINE_HEIGHT: f32 = 14.0;
const CONTENT_LINE_GAP: f32 = 10.0;
const CONTENT_NODE_STEP: f32 = 30.0;
const CONTENT_CHAR_WIDTH: f32 = 6.6;

/// One item of a tab's content list. Anything pointing at an entity that no
/// longer exists is skipped silently when the content is built.
#[derive(Clone)]
pub enum FrameContentItem {
    Text(String),
    Node(Entity),
}

#[derive(Clone)]
pub struct FrameTab {
    pub label: String,
    pub items: Vec<FrameContentItem>,
}

pub struct MenuFrameConfig {
    pub title: String,
    pub text_padding: f32,
    pub panel: PanelConfig,
    pub tabs: Vec<FrameTab>,
    pub tab_palette: TabPalette,
}

impl Default for MenuFrameConfig {
    fn default() -> Self {
        MenuFrameConfig {
            title: String::new(),
            text_padding: 15.0,
            panel: PanelConfig::default(),
            tabs: Vec::new(),
            tab_palette: TabPalette::default(),
        }
    }
}

/// Marks a frame's active content container.
#[derive(Component, Default)]
pub struct FrameContent;

/// A tabbed window: a particle panel for the backdrop, a row of tab
/// buttons, a top rail with the title and an exit button, and a border.
///
/// Closing absorbs the tab buttons into the panel (they dissolve with it)
/// and the frame despawns once the panel has fully blown up.
#[derive(Component)]
pub struct MenuFrame {
    title: String,
    size: Vec2,
    text_padding: f32,
    panel: Entity,
    border: Entity,
    top_rail: Entity,
    exit_button: Entity,
    tabs: Vec<Entity>,
    tab_content: Vec<FrameTab>,
    content: Option<Entity>,
    content_home_x: f32,
    entrance_ticks: u32,
    alpha: f32,
    closing: bool,
    close_queued: bool,
    display_queued: Option<String>,
}

fn estimate_item_height(item: &FrameContentItem, wrap_width: f32) -> f32 {
    match item {
        FrameContentItem::Text(text) => {
            let chars_per_line = (wrap_width / CONTENT_CHAR_WIDTH).max(1.0) as usize;
            let lines: usize = text
                .lines()
                .map(|line| line.chars().count().div_ceil(chars_per_line).max(1))
                .sum();
            lines.max(1) as f32 * CONTENT_LINE_HEIGHT
        }
        FrameContentItem::Node(_) => CONTENT_NODE_STEP,
    }
}

impl MenuFrame {
    pub fn spawn(commands: &mut Commands, position: Vec2, config: MenuFrameConfig) -> Entity {
        let size = config.panel.size;
        let root = commands
            .spawn((
                Transform::from_translation(position.extend(0.0)),
                Visibility::default(),
            ))
            .id();

        let panel = commands
            .spawn((
                Panel::new(PanelConfig {
                    auto_open: true,
                    ..config.panel
                }),
                Transform::default(),
                ChildOf(root),
            ))
            .id();

        let border = commands
            .spawn((
                Sprite {
                    color: PANEL_BORDER_COLOR.with_alpha(0.0),
                    custom_size: Some(size + Vec2::splat(4.0)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, -0.2)),
                ChildOf(root),
            ))
            .id();

        // A single tab would be redundant; the row only exists for two or
        // more.
        let mut tabs = Vec::new();
        if config.tabs.len() > 1 {
            let tab_width = size.x / config.tabs.len() as f32;
            for (index, tab) in config.tabs.iter().enumerate() {
                let position = Vec2::new(
                    -size.x / 2.0 + tab_width * (index as f32 + 0.5),
                    size.y / 2.0 + TAB_HEIGHT / 2.0 + ENTRANCE_DROP,
                );
                let tab = TabButton::spawn(
                    commands,
                    position,
                    tab.label.clone(),
                    TabKind::Tab,
                    Vec2::new(tab_width, TAB_HEIGHT),
                    config.tab_palette,
                );
                commands.entity(tab).insert(ChildOf(root));
                tabs.push(tab);
            }
        }

        let rail_y = if tabs.is_empty() {
            size.y / 2.0 + RAIL_HEIGHT / 2.0
        } else {
            size.y / 2.0 + TAB_HEIGHT + RAIL_HEIGHT / 2.0
        };
        let top_rail = commands
            .spawn((
                Transform::from_translation(Vec3::new(0.0, rail_y + ENTRANCE_DROP, 0.2)),
                Visibility::default(),
                ChildOf(root),
            ))
            .id();
        commands.spawn((
            Sprite {
                color: MENU_COLOR.with_alpha(0.0),
                custom_size: Some(Vec2::new(size.x, RAIL_HEIGHT)),
                ..default()
            },
            Transform::default(),
            ChildOf(top_rail),
        ));
        commands.spawn((
            Text2d::new(config.title.clone()),
            TextFont {
                font_size: 15.0,
                ..default()
            },
            TextColor(PRIMARY_COLOR.with_alpha(0.0)),
            Anchor::CenterLeft,
            Transform::from_translation(Vec3::new(-size.x / 2.0 + 8.0, 0.0, 0.1)),
            ChildOf(top_rail),
        ));
        let exit_button = TabButton::spawn(
            commands,
            Vec2::new(size.x / 2.0 - RAIL_HEIGHT / 2.0, 0.0),
            "X",
            TabKind::Exit,
            Vec2::splat(RAIL_HEIGHT),
            config.tab_palette,
        );
        commands.entity(exit_button).insert(ChildOf(top_rail));

        let first_tab = config.tabs.first().map(|tab| tab.label.clone());
        commands.entity(root).insert(MenuFrame {
            title: config.title,
            size,
            text_padding: config.text_padding,
            panel,
            border,
            top_rail,
            exit_button,
            tabs,
            tab_content: config.tabs,
            content: None,
            content_home_x: -size.x / 2.0 + config.text_padding,
            entrance_ticks: 0,
            alpha: 0.0,
            closing: false,
            close_queued: false,
            display_queued: first_tab,
        });
        root
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn panel(&self) -> Entity {
        self.panel
    }

    pub fn tabs(&self) -> &[Entity] {
        &self.tabs
    }

    pub fn exit_button(&self) -> Entity {
        self.exit_button
    }

    pub fn content(&self) -> Option<Entity> {
        self.content
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Requests the content behind the named tab. Unknown names are ignored.
    pub fn display_content(&mut self, tab_name: impl Into<String>) {
        if self.closing {
            return;
        }
        self.display_queued = Some(tab_name.into());
    }

    /// Starts the teardown. Monotonic like the panel's: the first call wins
    /// and reports true, later calls change nothing.
    pub fn blow_up(&mut self) -> bool {
        if self.closing {
            return false;
        }
        self.closing = true;
        self.close_queued = true;
        self.alpha = 1.0;
        true
    }

    /// Entrance: tab row and rail sink one unit per tick for the drop
    /// distance while everything dressing fades in.
    pub fn entrance(
        mut frames: Query<&mut MenuFrame>,
        mut transforms: Query<&mut Transform>,
        children: Query<&Children>,
        mut sprites: Query<&mut Sprite>,
        mut texts: Query<&mut TextColor>,
    ) {
        for mut frame in frames.iter_mut() {
            if frame.closing {
                continue;
            }
            if frame.entrance_ticks < ENTRANCE_DROP as u32 {
                frame.entrance_ticks += 1;
                for &entity in frame.tabs.iter().chain([&frame.top_rail]) {
                    if let Ok(mut transform) = transforms.get_mut(entity) {
                        transform.translation.y -= 1.0;
                    }
                }
            }
            if frame.alpha < 1.0 {
                frame.alpha = (frame.alpha + FADE_STEP).min(1.0);
                for &entity in frame.tabs.iter().chain([&frame.top_rail, &frame.border]) {
                    set_subtree_alpha(entity, frame.alpha, &children, &mut sprites, &mut texts);
                }
            }
        }
    }

    /// Routes tab presses: a tab swaps the content, the exit button tears
    /// the frame down.
    pub fn handle_presses(
        mut pressed: EventReader<TabPressed>,
        mut frames: Query<&mut MenuFrame>,
        buttons: Query<&TabButton>,
    ) {
        for event in pressed.read() {
            for mut frame in frames.iter_mut() {
                if frame.exit_button == event.button {
                    frame.blow_up();
                } else if frame.tabs.contains(&event.button) {
                    if let Ok(button) = buttons.get(event.button) {
                        let label = button.label().to_string();
                        frame.display_content(label);
                    }
                }
            }
        }
    }

    /// Builds the requested tab's content container, replacing the previous
    /// one. Content entities that no longer exist are skipped silently.
    pub fn show_content(
        mut commands: Commands,
        mut frames: Query<(Entity, &mut MenuFrame)>,
        mut buttons: Query<&mut TabButton>,
    ) {
        for (entity, mut frame) in frames.iter_mut() {
            let Some(tab_name) = frame.display_queued.take() else {
                continue;
            };
            let Some(tab_index) = frame.tab_content.iter().position(|s| s.label == tab_name) else {
                continue;
            };

            if let Some(old) = frame.content.take() {
                if let Ok(mut old) = commands.get_entity(old) {
                    old.despawn();
                }
            }

            let wrap_width = frame.size.x - frame.text_padding * 2.0;
            let top_y = frame.size.y / 2.0 - frame.text_padding;
            let container = commands
                .spawn((
                    FrameContent,
                    Transform::from_translation(Vec3::new(
                        frame.content_home_x - CONTENT_SLIDE,
                        top_y,
                        0.3,
                    )),
                    Visibility::default(),
                    ChildOf(entity),
                ))
                .id();

            commands.spawn((
                Text2d::new(tab_name.clone()),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(PRIMARY_COLOR),
                Anchor::TopLeft,
                Transform::default(),
                ChildOf(container),
            ));

            let mut cursor_y = -(CONTENT_LINE_HEIGHT + CONTENT_LINE_GAP) * 2.0;
            let items = frame.tab_content[tab_index].items.clone();
            for item in items {
                match item {
                    FrameContentItem::Text(text) => {
                        commands.spawn((
                            Text2d::new(text.clone()),
                            TextFont {
                                font_size: 12.0,
                                ..default()
                            },
                            TextColor(PRIMARY_COLOR),
                            TextBounds {
                                width: Some(wrap_width),
                                ..default()
                            },
                            Anchor::TopLeft,
                            Transform::from_translation(Vec3::new(0.0, cursor_y, 0.0)),
                            ChildOf(container),
                        ));
                        cursor_y -=
                            estimate_item_height(&FrameContentItem::Text(text), wrap_width)
                                + CONTENT_LINE_GAP;
                    }
                    FrameContentItem::Node(node) => match commands.get_entity(node) {
                        Ok(mut node) => {
                            node.insert((
                                Transform::from_translation(Vec3::new(0.0, cursor_y, 0.0)),
                                ChildOf(container),
                            ));
                            cursor_y -= CONTENT_NODE_STEP + CONTENT_LINE_GAP;
                        }
                        Err(_) => {
                            log::debug!("frame content node is gone; skipping it");
                        }
                    },
                }
            }

            frame.content = Some(container);
            for &tab in &frame.tabs {
                if let Ok(mut button) = buttons.get_mut(tab) {
                    let opened = button.label() == tab_name;
                    button.set_as_opened(opened);
                }
            }
        }
    }

    /// Fresh content drifts one unit rightward per tick until it parks.
    pub fn slide_content(
        frames: Query<&MenuFrame>,
        mut contents: Query<&mut Transform, With<FrameContent>>,
    ) {
        for frame in frames.iter() {
            let Some(content) = frame.content else {
                continue;
            };
            if let Ok(mut transform) = contents.get_mut(content) {
                if transform.translation.x < frame.content_home_x {
                    transform.translation.x =
                        (transform.translation.x + 1.0).min(frame.content_home_x);
                }
            }
        }
    }

    /// Hands the tab buttons over to the panel and blows it up; the panel's
    /// completion gating then drives the frame's removal.
    pub fn close(mut frames: Query<&mut MenuFrame>, mut panels: Query<&mut Panel>) {
        for mut frame in frames.iter_mut() {
            if !frame.close_queued {
                continue;
            }
            frame.close_queued = false;

            if let Ok(mut panel) = panels.get_mut(frame.panel) {
                for &tab in &frame.tabs {
                    panel.add_particle(tab, PanelMemberKind::Absorbed);
                }
                panel.blow_up(true);
            }
        }
    }

    /// While closing, the rail, border, and content fade alongside the
    /// panel's own exit animation.
    pub fn fade_out(
        mut frames: Query<&mut MenuFrame>,
        children: Query<&Children>,
        mut sprites: Query<&mut Sprite>,
        mut texts: Query<&mut TextColor>,
    ) {
        for mut frame in frames.iter_mut() {
            if !frame.closing || frame.alpha <= 0.0 {
                continue;
            }
            frame.alpha = (frame.alpha - FADE_STEP).max(0.0);
            let targets = [Some(frame.top_rail), Some(frame.border), frame.content];
            for entity in targets.into_iter().flatten() {
                set_subtree_alpha(entity, frame.alpha, &children, &mut sprites, &mut texts);
            }
        }
    }

    /// The frame leaves the scene only after its panel has reaped itself.
    pub fn reap(
        mut commands: Commands,
        frames: Query<(Entity, &MenuFrame)>,
        panels: Query<(), With<Panel>>,
    ) {
        for (entity, frame) in frames.iter() {
            if frame.closing && panels.get(frame.panel).is_err() {
                commands.entity(entity).despawn();
            }
        }
    }
}
