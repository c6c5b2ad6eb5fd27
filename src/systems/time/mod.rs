use bevy::prelude::*;

/// Global animation-time scale. Duration-based timers (spawn staggering,
/// tutorial opening delays, typed-text cadence) tick with
/// `time.delta().mul_f32(dilation.0)`; the fixed per-tick animation steps are
/// frame-bound and unaffected.
#[derive(Resource)]
pub struct Dilation(pub f32);

pub struct DilationPlugin;
impl Plugin for DilationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Dilation(1.0));
    }
}
