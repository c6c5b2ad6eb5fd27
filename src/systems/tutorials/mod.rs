use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use bevy::{prelude::*, sprite::Anchor, text::TextBounds};
use serde::Deserialize;

use crate::{
    systems::{
        colors::{PRIMARY_COLOR, TUTORIAL_BG, TUTORIAL_LINE},
        panels::{Panel, PanelConfig, PanelPlugin},
        time::Dilation,
    },
    MenuFxSystem,
};

#[cfg(test)]
mod tests;

/// Per-tick fade applied to the whole window while a tutorial closes.
const CLOSE_ALPHA_STEP: f32 = 0.025;
/// Rough glyph advance used to size the frame without font metrics.
const TEXT_WIDTH_PER_CHAR: f32 = 7.92;

/// Grid the backing panel of every tutorial window uses.
const TUTORIAL_GRID: u32 = 5;
const TUTORIAL_PARTICLE_ROTATION: f32 = 2500.0;
const TUTORIAL_PARTICLE_DECAY: f32 = 1.25;
const TUTORIAL_PARTICLE_OPACITY: f32 = 0.8;
const TUTORIAL_PARTICLE_STAGGER: Duration = Duration::from_millis(100);

/// Layout of the catalog status list.
const LIST_ROW_HEIGHT: f32 = 20.0;
const LIST_MARKER_SIZE: f32 = 8.0;
const LIST_TEXT_GAP: f32 = 6.0;
const LIST_FONT_SIZE: f32 = 12.0;
const LIST_UNFINISHED_ALPHA: f32 = 0.25;

pub struct TutorialPlugin;
impl Plugin for TutorialPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TutorialQueue>().add_systems(
            Update,
            (
                Tutorial::refresh_panel,
                Tutorial::animate,
                Tutorial::speed_up_panels,
                Tutorial::sync_visuals,
                TutorialQueue::sync_coverage_text,
                TutorialList::refresh,
            )
                .chain()
                .in_set(MenuFxSystem::Tutorials),
        );

        if !app.is_plugin_added::<PanelPlugin>() {
            app.add_plugins(PanelPlugin);
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TutorialOptions {
    pub font_size: f32,
    pub frame_width: f32,
    /// Pixels each border line travels per tick while sliding open.
    pub move_lines_amount: f32,
    pub font_alpha_step: f32,
    pub txt_padding: f32,
    /// One-shot delay before the opening animation starts, milliseconds.
    pub opening_delay: Option<u64>,
    pub txt_line_height: f32,
}

impl Default for TutorialOptions {
    fn default() -> Self {
        TutorialOptions {
            font_size: 14.0,
            frame_width: 400.0,
            move_lines_amount: 5.0,
            font_alpha_step: 0.025,
            txt_padding: 15.0,
            opening_delay: None,
            txt_line_height: 22.0,
        }
    }
}

/// Definition-file form of a catalog entry, see
/// [`TutorialQueue::register_from_json`].
#[derive(Debug, Deserialize)]
pub struct TutorialEntry {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub options: TutorialOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialAnim {
    Closed,
    /// Opening delay running; nothing moves yet.
    WaitingToOpen,
    /// Border lines travelling from the center to the frame edges.
    SlidingLines,
    /// Lines parked; message text fading in.
    FadingText,
    Open,
    /// Panel blowing up underneath while the window fades out.
    Closing,
}

/// Marks the two slide-in border lines of a tutorial window.
#[derive(Component, Default)]
pub struct TutorialLine;

/// Marks the message text of a tutorial window.
#[derive(Component, Default)]
pub struct TutorialText;

/// Attach to any `Text2d` to have it mirror the covered-count status line.
#[derive(Component, Default)]
pub struct TutorialsCoveredText;

/// One overlay window: a particle panel, a message, and two border lines
/// that slide apart as it opens.
#[derive(Component)]
#[require(Transform, Visibility)]
pub struct Tutorial {
    id: String,
    message: String,
    options: TutorialOptions,
    frame_height: f32,
    finished: bool,
    anim: TutorialAnim,
    delay: Timer,
    line_offset: f32,
    text_alpha: f32,
    window_alpha: f32,
    panel: Option<Entity>,
    needs_panel: bool,
    panel_blown: bool,
    speed_up_queued: bool,
    left_line: Entity,
    right_line: Entity,
    text: Entity,
}

fn estimate_text_height(message: &str, wrap_width: f32, line_height: f32) -> f32 {
    let chars_per_line = (wrap_width / TEXT_WIDTH_PER_CHAR).max(1.0) as usize;
    let lines: usize = message
        .lines()
        .map(|line| line.chars().count().div_ceil(chars_per_line).max(1))
        .sum();
    lines.max(1) as f32 * line_height
}

impl Tutorial {
    /// Spawns a hidden tutorial window. Visuals come up only once the queue
    /// opens it.
    pub fn spawn(
        commands: &mut Commands,
        id: impl Into<String>,
        message: impl Into<String>,
        options: TutorialOptions,
    ) -> Entity {
        let id = id.into();
        let message = message.into();
        let wrap_width = options.frame_width - options.txt_padding * 2.0;
        let frame_height = estimate_text_height(&message, wrap_width, options.txt_line_height)
            + options.txt_padding * 2.0;

        let tutorial = commands
            .spawn((Transform::default(), Visibility::Hidden))
            .id();
        let line_sprite = || Sprite {
            color: TUTORIAL_LINE.with_alpha(1.0),
            custom_size: Some(Vec2::new(2.0, frame_height)),
            ..default()
        };
        let left_line = commands
            .spawn((
                TutorialLine,
                line_sprite(),
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.5)),
                ChildOf(tutorial),
            ))
            .id();
        let right_line = commands
            .spawn((
                TutorialLine,
                line_sprite(),
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.5)),
                ChildOf(tutorial),
            ))
            .id();
        let text = commands
            .spawn((
                TutorialText,
                Text2d::new(message.clone()),
                TextFont {
                    font_size: options.font_size,
                    ..default()
                },
                TextColor(PRIMARY_COLOR.with_alpha(0.0)),
                TextBounds {
                    width: Some(wrap_width),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, 0.6)),
                ChildOf(tutorial),
            ))
            .id();

        commands.entity(tutorial).insert(Tutorial {
            id,
            message,
            options,
            frame_height,
            finished: false,
            anim: TutorialAnim::Closed,
            delay: Timer::new(Duration::ZERO, TimerMode::Once),
            line_offset: 0.0,
            text_alpha: 0.0,
            window_alpha: 1.0,
            panel: None,
            needs_panel: false,
            panel_blown: false,
            speed_up_queued: false,
            left_line,
            right_line,
            text,
        });
        tutorial
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    pub fn anim(&self) -> TutorialAnim {
        self.anim
    }

    /// The current backing panel, if one has been generated.
    pub fn panel(&self) -> Option<Entity> {
        self.panel
    }

    /// True whenever an opening or closing animation is in flight; the
    /// queue's fast-forward check is exactly this state read.
    pub fn is_animating(&self) -> bool {
        !matches!(self.anim, TutorialAnim::Open | TutorialAnim::Closed)
    }

    /// Resets the window to its initial look and starts the opening
    /// sequence (optionally after the configured delay). A fresh backing
    /// panel is generated; blown-up panels are never reopened.
    pub fn open(&mut self) {
        self.window_alpha = 1.0;
        self.line_offset = 0.0;
        self.text_alpha = 0.0;
        self.panel_blown = false;
        self.needs_panel = true;
        self.anim = match self.options.opening_delay {
            Some(ms) => {
                self.delay = Timer::new(Duration::from_millis(ms), TimerMode::Once);
                TutorialAnim::WaitingToOpen
            }
            None => TutorialAnim::SlidingLines,
        };
    }

    /// Starts the closing animation. Ignored while any animation is in
    /// flight, matching the guard the queue relies on.
    pub fn close(&mut self) {
        if self.is_animating() || self.anim == TutorialAnim::Closed {
            return;
        }
        self.anim = TutorialAnim::Closing;
    }

    /// Collapses a running opening animation straight to the settled state.
    pub fn speed_up(&mut self) {
        if self.anim == TutorialAnim::Closing || self.anim == TutorialAnim::Closed {
            return;
        }
        self.line_offset = self.options.frame_width / 2.0;
        self.text_alpha = 1.0;
        self.anim = TutorialAnim::Open;
        self.speed_up_queued = true;
    }

    /// Gives every opening tutorial a fresh backing panel, retiring
    /// whatever panel a previous session left behind.
    fn refresh_panel(mut commands: Commands, mut tutorials: Query<(Entity, &mut Tutorial)>) {
        for (entity, mut tutorial) in tutorials.iter_mut() {
            if !tutorial.needs_panel {
                continue;
            }
            tutorial.needs_panel = false;

            if let Some(old) = tutorial.panel.take() {
                if let Ok(mut old_panel) = commands.get_entity(old) {
                    old_panel.despawn();
                }
            }

            let panel = commands
                .spawn((
                    Panel::new(PanelConfig {
                        size: Vec2::new(tutorial.options.frame_width, tutorial.frame_height),
                        columns: TUTORIAL_GRID,
                        rows: TUTORIAL_GRID,
                        palette: vec![TUTORIAL_BG],
                        rotation_amount: TUTORIAL_PARTICLE_ROTATION,
                        appear_delay: TUTORIAL_PARTICLE_STAGGER,
                        max_opacity: TUTORIAL_PARTICLE_OPACITY,
                        border: None,
                        rotation_decay: TUTORIAL_PARTICLE_DECAY,
                        auto_open: true,
                    }),
                    Transform::from_translation(Vec3::new(0.0, 0.0, 0.0)),
                    ChildOf(entity),
                ))
                .id();
            tutorial.panel = Some(panel);
        }
    }

    /// Advances the open/close state machine by one tick.
    fn animate(
        time: Res<Time>,
        dilation: Res<Dilation>,
        mut commands: Commands,
        mut tutorials: Query<&mut Tutorial>,
        mut panels: Query<&mut Panel>,
    ) {
        for mut tutorial in tutorials.iter_mut() {
            match tutorial.anim {
                TutorialAnim::WaitingToOpen => {
                    let scaled = time.delta().mul_f32(dilation.0);
                    tutorial.delay.tick(scaled);
                    if tutorial.delay.finished() {
                        tutorial.anim = TutorialAnim::SlidingLines;
                    }
                }
                TutorialAnim::SlidingLines => {
                    let rest = tutorial.options.frame_width / 2.0;
                    tutorial.line_offset += tutorial.options.move_lines_amount;
                    if tutorial.line_offset >= rest {
                        tutorial.line_offset = rest;
                        tutorial.anim = TutorialAnim::FadingText;
                    }
                }
                TutorialAnim::FadingText => {
                    tutorial.text_alpha += tutorial.options.font_alpha_step;
                    if tutorial.text_alpha >= 1.0 {
                        tutorial.text_alpha = 1.0;
                        tutorial.anim = TutorialAnim::Open;
                    }
                }
                TutorialAnim::Closing => {
                    if !tutorial.panel_blown {
                        tutorial.panel_blown = true;
                        if let Some(panel) = tutorial.panel {
                            if let Ok(mut panel) = panels.get_mut(panel) {
                                panel.blow_up(false);
                            }
                        }
                    }
                    tutorial.line_offset =
                        (tutorial.line_offset - tutorial.options.move_lines_amount).max(0.0);
                    tutorial.window_alpha -= CLOSE_ALPHA_STEP;
                    if tutorial.window_alpha <= 0.0 {
                        tutorial.window_alpha = 0.0;
                        tutorial.anim = TutorialAnim::Closed;
                        if let Some(panel) = tutorial.panel.take() {
                            if let Ok(mut panel) = commands.get_entity(panel) {
                                panel.despawn();
                            }
                        }
                    }
                }
                TutorialAnim::Closed | TutorialAnim::Open => {}
            }
        }
    }

    /// Delivers a queued fast-forward to the backing panel's particles. The
    /// request stays pending until the panel has actually populated.
    fn speed_up_panels(mut tutorials: Query<&mut Tutorial>, mut panels: Query<&mut Panel>) {
        for mut tutorial in tutorials.iter_mut() {
            if !tutorial.speed_up_queued {
                continue;
            }
            let Some(panel) = tutorial.panel else {
                tutorial.speed_up_queued = false;
                continue;
            };
            if let Ok(mut panel) = panels.get_mut(panel) {
                if panel.opened() {
                    panel.speed_up_particles();
                    tutorial.speed_up_queued = false;
                }
            } else {
                tutorial.speed_up_queued = false;
            }
        }
    }

    /// Pushes the state machine's scalar outputs onto the window's visual
    /// children.
    fn sync_visuals(
        mut tutorials: Query<(&Tutorial, &mut Visibility)>,
        mut lines: Query<(&mut Transform, &mut Sprite), With<TutorialLine>>,
        mut texts: Query<&mut TextColor, With<TutorialText>>,
    ) {
        for (tutorial, mut visibility) in tutorials.iter_mut() {
            *visibility = if tutorial.anim == TutorialAnim::Closed {
                Visibility::Hidden
            } else {
                Visibility::Inherited
            };

            if let Ok((mut transform, mut sprite)) = lines.get_mut(tutorial.left_line) {
                transform.translation.x = -tutorial.line_offset;
                sprite.color.set_alpha(tutorial.window_alpha);
            }
            if let Ok((mut transform, mut sprite)) = lines.get_mut(tutorial.right_line) {
                transform.translation.x = tutorial.line_offset;
                sprite.color.set_alpha(tutorial.window_alpha);
            }
            if let Ok(mut text) = texts.get_mut(tutorial.text) {
                text.0
                    .set_alpha(tutorial.text_alpha * tutorial.window_alpha);
            }
        }
    }
}

/// Sequencing engine over the catalog of one-shot tutorial windows: at most
/// one window is open at a time, advancing while the current window is
/// still opening fast-forwards it instead, and the covered counter only
/// moves on genuine advances.
#[derive(Resource, Default)]
pub struct TutorialQueue {
    tutorial_mode: bool,
    catalog: HashMap<String, Entity>,
    prepared: Vec<Entity>,
    used: HashSet<String>,
    prev: Option<Entity>,
    curr: Option<Entity>,
    count: usize,
    covered: u32,
}

impl TutorialQueue {
    /// Adds a tutorial to the catalog, silently replacing (and despawning)
    /// any previous entry under the same id.
    pub fn register(
        &mut self,
        commands: &mut Commands,
        id: impl Into<String>,
        message: impl Into<String>,
        options: TutorialOptions,
    ) -> Entity {
        let id = id.into();
        let entity = Tutorial::spawn(commands, id.clone(), message, options);
        if let Some(old) = self.catalog.insert(id.clone(), entity) {
            log::debug!("tutorial {id:?} re-registered; replacing the old window");
            if let Ok(mut old) = commands.get_entity(old) {
                old.despawn();
            }
        }
        entity
    }

    /// Bulk registration from a JSON array of `{id, message, options?}`.
    pub fn register_from_json(
        &mut self,
        commands: &mut Commands,
        json: &str,
    ) -> Result<usize, serde_json::Error> {
        let entries: Vec<TutorialEntry> = serde_json::from_str(json)?;
        let registered = entries.len();
        for entry in entries {
            self.register(commands, entry.id, entry.message, entry.options);
        }
        Ok(registered)
    }

    /// Selects a catalog entry into this session's display queue. False on
    /// an unknown id, with tutorial mode off, or when the id was already
    /// used this session.
    pub fn prepare(&mut self, id: &str, tutorials: &mut Query<&mut Tutorial>) -> bool {
        let Some(&entity) = self.catalog.get(id) else {
            return false;
        };
        if !self.tutorial_mode {
            return false;
        }
        if self.used.contains(id) {
            return false;
        }

        self.prepared.push(entity);
        self.used.insert(id.to_string());
        if let Ok(mut tutorial) = tutorials.get_mut(entity) {
            tutorial.set_finished(true);
        }
        true
    }

    /// Loads the next prepared tutorial.
    ///
    /// If the current window is still animating open this fast-forwards it
    /// and reports true without touching the cursor or the covered count.
    /// With the queue exhausted (or empty) it closes whatever is showing,
    /// resets the cursor, and reports false.
    pub fn load_next(&mut self, tutorials: &mut Query<&mut Tutorial>) -> bool {
        if let Some(curr) = self.curr {
            if let Ok(mut tutorial) = tutorials.get_mut(curr) {
                if tutorial.is_animating() {
                    tutorial.speed_up();
                    return true;
                }
            }
        }

        self.prev = self.curr;

        if self.count == self.prepared.len() || self.prepared.is_empty() {
            if self.count == self.prepared.len() {
                self.prepared.clear();
            }
            if let Some(prev) = self.prev.take() {
                if let Ok(mut tutorial) = tutorials.get_mut(prev) {
                    tutorial.close();
                }
            }
            self.count = 0;
            self.curr = None;
            return false;
        }

        if let Some(prev) = self.prev {
            if let Ok(mut tutorial) = tutorials.get_mut(prev) {
                tutorial.close();
            }
        }

        let next = self.prepared[self.count];
        self.count += 1;
        self.curr = Some(next);
        if let Ok(mut tutorial) = tutorials.get_mut(next) {
            tutorial.open();
        }
        self.covered += 1;
        true
    }

    pub fn set_tutorial_mode(&mut self, on: bool) {
        self.tutorial_mode = on;
    }

    pub fn tutorial_mode(&self) -> bool {
        self.tutorial_mode
    }

    pub fn prepared_amount(&self) -> usize {
        self.prepared.len()
    }

    pub fn covered(&self) -> u32 {
        self.covered
    }

    pub fn current(&self) -> Option<Entity> {
        self.curr
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    pub fn coverage_line(&self) -> String {
        format!(
            "Tutorials covered: {} out of {}",
            self.covered,
            self.catalog.len()
        )
    }

    /// Full session reset: queue, used set, cursor, pointers, and the
    /// covered counter all clear, and every catalog entry is un-finished.
    /// The catalog itself survives.
    pub fn reset(&mut self, tutorials: &mut Query<&mut Tutorial>) {
        self.prepared.clear();
        self.used.clear();
        self.prev = None;
        self.curr = None;
        self.count = 0;
        self.covered = 0;
        for &entity in self.catalog.values() {
            if let Ok(mut tutorial) = tutorials.get_mut(entity) {
                tutorial.set_finished(false);
            }
        }
    }

    fn sync_coverage_text(
        queue: Res<TutorialQueue>,
        mut labels: Query<&mut Text2d, With<TutorialsCoveredText>>,
    ) {
        if !queue.is_changed() {
            return;
        }
        for mut label in labels.iter_mut() {
            label.0 = queue.coverage_line();
        }
    }
}

/// Marks the status square of one row in a [`TutorialList`].
#[derive(Component, Default)]
pub struct TutorialListMarker;

/// Catalog browser: one row per registered tutorial, id-ordered, with the
/// entry's message and a status square that fills in once the entry has
/// been prepared this session.
#[derive(Component, Default)]
#[require(Transform, Visibility)]
pub struct TutorialList {
    rows: Vec<Entity>,
    shown: Vec<(String, String, bool)>,
}

impl TutorialList {
    pub fn spawn(commands: &mut Commands, position: Vec2) -> Entity {
        commands
            .spawn((
                TutorialList::default(),
                Transform::from_translation(position.extend(0.0)),
            ))
            .id()
    }

    /// Row container entities, one per catalog entry, in display order.
    pub fn rows(&self) -> &[Entity] {
        &self.rows
    }

    /// Rebuilds the rows whenever the catalog or any finished flag changes.
    fn refresh(
        mut commands: Commands,
        queue: Res<TutorialQueue>,
        tutorials: Query<&Tutorial>,
        mut lists: Query<(Entity, &mut TutorialList)>,
    ) {
        if lists.is_empty() {
            return;
        }
        let mut entries: Vec<(String, String, bool)> = queue
            .catalog
            .iter()
            .filter_map(|(id, &entity)| {
                tutorials
                    .get(entity)
                    .ok()
                    .map(|tutorial| (id.clone(), tutorial.message.clone(), tutorial.finished))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (root, mut list) in lists.iter_mut() {
            if list.shown == entries {
                continue;
            }
            for row in list.rows.drain(..) {
                if let Ok(mut row) = commands.get_entity(row) {
                    row.despawn();
                }
            }
            for (index, (id, message, finished)) in entries.iter().enumerate() {
                let alpha = if *finished { 1.0 } else { LIST_UNFINISHED_ALPHA };
                let row = commands
                    .spawn((
                        Transform::from_translation(Vec3::new(
                            0.0,
                            -(index as f32) * LIST_ROW_HEIGHT,
                            0.0,
                        )),
                        Visibility::Inherited,
                        ChildOf(root),
                    ))
                    .id();
                commands.spawn((
                    TutorialListMarker,
                    Sprite {
                        color: TUTORIAL_LINE.with_alpha(alpha),
                        custom_size: Some(Vec2::splat(LIST_MARKER_SIZE)),
                        ..default()
                    },
                    Transform::default(),
                    ChildOf(row),
                ));
                commands.spawn((
                    Text2d::new(format!("{id}: {message}")),
                    TextFont {
                        font_size: LIST_FONT_SIZE,
                        ..default()
                    },
                    TextColor(PRIMARY_COLOR),
                    Anchor::CenterLeft,
                    Transform::from_translation(Vec3::new(
                        LIST_MARKER_SIZE + LIST_TEXT_GAP,
                        0.0,
                        0.0,
                    )),
                    ChildOf(row),
                ));
                list.rows.push(row);
            }
            list.shown = entries.clone();
        }
    }
}
