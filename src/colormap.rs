//! Intensity to color mapping for the waterfall.

use egui::Color32;

/// Break points of the ramp and the color reached at each of them.
/// black -> blue -> cyan -> green -> yellow -> red -> white
const STOPS: [(f32, [f32; 3]); 7] = [
    (0.0, [0.0, 0.0, 0.0]),
    (0.2, [0.0, 0.0, 255.0]),
    (0.4, [0.0, 255.0, 255.0]),
    (0.6, [0.0, 255.0, 0.0]),
    (0.8, [255.0, 255.0, 0.0]),
    (0.95, [255.0, 0.0, 0.0]),
    (1.0, [255.0, 255.0, 255.0]),
];

/// Maps a normalized intensity to a color. Values outside [0, 1] are clamped,
/// NaN maps to black.
pub fn ramp_color(t: f32) -> Color32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

    for pair in STOPS.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if t < end || end >= 1.0 {
            let local = (t - start) / (end - start);
            return Color32::from_rgb(
                lerp_channel(from[0], to[0], local),
                lerp_channel(from[1], to[1], local),
                lerp_channel(from[2], to[2], local),
            );
        }
    }

    Color32::WHITE
}

fn lerp_channel(from: f32, to: f32, t: f32) -> u8 {
    (from + (to - from) * t).round().clamp(0.0, 255.0) as u8
}
