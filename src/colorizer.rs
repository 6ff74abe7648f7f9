use crate::layout::Palette;
use crate::types::{Rgb, Status};

/// Full nameplate capacity; reaching it means the target is met whatever the plan.
pub const FULL_CAPACITY: f64 = 100.0;

/// Actual-vs-plan standing.
///
/// `behind` below plan, `met` at or above 100, `on-track` in between. The
/// upper boundary stays at 100 even when the plan itself is lower.
pub fn status(actual: f64, plan: f64) -> Status {
    if actual < plan {
        Status::Behind
    } else if actual < FULL_CAPACITY {
        Status::OnTrack
    } else {
        Status::Met
    }
}

pub fn status_color(status: Status, palette: &Palette) -> Rgb {
    match status {
        Status::Behind => palette.behind,
        Status::OnTrack => palette.on_track,
        Status::Met => palette.met,
    }
}

pub fn colorize(actual: f64, plan: f64, palette: &Palette) -> (Status, Rgb) {
    let s = status(actual, plan);
    (s, status_color(s, palette))
}
