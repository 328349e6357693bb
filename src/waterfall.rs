//! Scrolling spectrogram image.

use egui::{Color32, ColorImage};
use log::debug;

use crate::colormap::ramp_color;
use crate::config::{IntensityScale, NewestEdge};
use crate::utils::{max_magnitude, scale_divisor};

/// Row-major grid of colors holding the last `height` frames.
///
/// Each `push` moves every row one step away from the newest edge with a
/// single memory copy and colors only the vacated row, so the cost per frame
/// is one row of color work plus the shift.
pub struct WaterfallBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color32>,
    background: Color32,
    newest_at: NewestEdge,
    intensity: IntensityScale,
    rows_pushed: u64,
}

impl WaterfallBuffer {
    pub fn new(width: usize, height: usize, newest_at: NewestEdge, intensity: IntensityScale) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut buffer = Self {
            width,
            height,
            pixels: Vec::new(),
            background: Color32::BLACK,
            newest_at,
            intensity,
            rows_pushed: 0,
        };
        buffer.reset();
        buffer
    }

    /// Clears the whole grid to the background color.
    pub fn reset(&mut self) {
        self.pixels.clear();
        self.pixels.resize(self.width * self.height, self.background);
        self.rows_pushed = 0;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn newest_at(&self) -> NewestEdge {
        self.newest_at
    }

    pub fn rows_pushed(&self) -> u64 {
        self.rows_pushed
    }

    pub fn pixels(&self) -> &[Color32] {
        &self.pixels
    }

    pub fn row(&self, index: usize) -> &[Color32] {
        let start = index * self.width;
        &self.pixels[start..start + self.width]
    }

    /// Index of the row written by the most recent `push`.
    pub fn newest_row_index(&self) -> usize {
        match self.newest_at {
            NewestEdge::Top => 0,
            NewestEdge::Bottom => self.height - 1,
        }
    }

    /// Scrolls the history by one row and writes `frame` into the freed row.
    pub fn push(&mut self, frame: &[f32]) {
        let width = self.width;
        let shifted = (self.height - 1) * width;

        match self.newest_at {
            NewestEdge::Top => self.pixels.copy_within(0..shifted, width),
            NewestEdge::Bottom => self.pixels.copy_within(width.., 0),
        }

        let start = self.newest_row_index() * width;
        let intensity = self.intensity;
        fill_row(&mut self.pixels[start..start + width], frame, intensity);
        self.rows_pushed += 1;

        if self.rows_pushed % 100 == 0 {
            debug!(target: "waterfall", "{} rows pushed ({}x{})", self.rows_pushed, self.width, self.height);
        }
    }

    /// Copies the grid into an image ready for texture upload.
    pub fn to_color_image(&self) -> ColorImage {
        ColorImage {
            size: [self.width, self.height],
            pixels: self.pixels.clone(),
        }
    }
}

/// Colors one output row from `frame`, resampled to the row's width.
pub fn fill_row(row: &mut [Color32], frame: &[f32], intensity: IntensityScale) {
    let divisor = scale_divisor(max_magnitude(frame));
    let width = row.len();

    for (x, pixel) in row.iter_mut().enumerate() {
        let magnitude = resample(frame, x, width);
        let normalized = intensity.apply(magnitude / divisor);
        *pixel = ramp_color(normalized);
    }
}

/// Linearly interpolated magnitude for output column `x` of `width`,
/// reading the frame at bin position `x * (N - 1) / (width - 1)`.
pub fn resample(frame: &[f32], x: usize, width: usize) -> f32 {
    match frame.len() {
        0 => return 0.0,
        1 => return frame[0],
        _ => {}
    }
    if width <= 1 {
        return frame[0];
    }

    let last = frame.len() - 1;
    let position = x as f32 * last as f32 / (width - 1) as f32;
    let lower = (position.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let fraction = position - lower as f32;

    frame[lower] + (frame[upper] - frame[lower]) * fraction
}
