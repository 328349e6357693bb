//! Pixel layout of the magnitude-vs-frequency line chart.
//!
//! Everything here is pure: the GUI paints the returned points, ticks and
//! grid lines without further computation, so the same frame and area always
//! give the same picture.

use crate::display::{format_frequency, format_magnitude};
use crate::utils::{bin_to_frequency, frequency_resolution, max_magnitude, nyquist, scale_divisor};

pub const X_TICKS: usize = 5;
pub const Y_TICKS: usize = 6;

/// Screen rectangle the chart is drawn into, in pixels (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PlotArea {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub position: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumPlot {
    pub max_val: f32,
    pub points: Vec<[f32; 2]>,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub info: Vec<String>,
}

impl SpectrumPlot {
    pub fn layout(frame: &[f32], area: &PlotArea, sample_rate: f32, fft_size: usize) -> Self {
        let max_val = max_magnitude(frame);
        let scale = scale_divisor(max_val);

        let last = frame.len().saturating_sub(1);
        let points = frame
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let x = if last == 0 {
                    area.left
                } else {
                    map_range(i as f32, 0.0, last as f32, area.left, area.right)
                };
                let y = map_range(value, 0.0, scale, area.bottom, area.top);
                [x, y]
            })
            .collect();

        Self {
            max_val,
            points,
            x_ticks: frequency_ticks(area.left, area.right, sample_rate),
            y_ticks: magnitude_ticks(area, scale),
            info: vec![
                format!("FFT Size: {}", fft_size),
                format!("Freq Resolution: {:.2} Hz/bin", frequency_resolution(sample_rate, fft_size)),
                format!("Max Magnitude: {:.4}", max_val),
                format!("Peak: {}", format_frequency(bin_to_frequency(peak_bin(frame), sample_rate, fft_size))),
            ],
        }
    }
}

/// First bin holding the frame maximum.
fn peak_bin(frame: &[f32]) -> usize {
    frame
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

/// Five labels at 0, 1/4, 1/2, 3/4 and 1 of Nyquist spread over [left, right].
pub fn frequency_ticks(left: f32, right: f32, sample_rate: f32) -> Vec<Tick> {
    let nyquist = nyquist(sample_rate);
    (0..X_TICKS)
        .map(|i| {
            let fraction = i as f32 / (X_TICKS - 1) as f32;
            Tick {
                position: left + (right - left) * fraction,
                label: format_frequency(nyquist * fraction),
            }
        })
        .collect()
}

fn magnitude_ticks(area: &PlotArea, scale: f32) -> Vec<Tick> {
    let steps = (Y_TICKS - 1) as f32;
    (0..Y_TICKS)
        .map(|i| {
            let value = scale * i as f32 / steps;
            Tick {
                position: area.bottom - i as f32 * area.height() / steps,
                label: format_magnitude(value, scale),
            }
        })
        .collect()
}

fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{FFT_SIZE, NUM_BINS, SAMPLE_RATE};

    fn area() -> PlotArea {
        PlotArea { left: 50.0, top: 50.0, right: 1150.0, bottom: 350.0 }
    }

    #[test]
    fn flat_frame_draws_full_scale_line() {
        let plot = SpectrumPlot::layout(&[3.0; NUM_BINS], &area(), SAMPLE_RATE, FFT_SIZE);

        assert_eq!(plot.max_val, 3.0);
        assert_eq!(plot.points.len(), NUM_BINS);
        assert!(plot.points.iter().all(|p| (p[1] - area().top).abs() < 1e-3));
        assert_eq!(plot.points[0][0], area().left);
        assert!((plot.points[NUM_BINS - 1][0] - area().right).abs() < 1e-3);
    }

    #[test]
    fn points_run_left_to_right_in_bin_order() {
        let frame: Vec<f32> = (0..NUM_BINS).map(|i| (i % 7) as f32).collect();
        let plot = SpectrumPlot::layout(&frame, &area(), SAMPLE_RATE, FFT_SIZE);
        assert!(plot.points.windows(2).all(|w| w[1][0] > w[0][0]));

        let zero_y = area().bottom;
        assert_eq!(plot.points[0][1], zero_y);
        assert!((plot.points[6][1] - area().top).abs() < 1e-3);
    }

    #[test]
    fn five_frequency_labels_up_to_nyquist() {
        let plot = SpectrumPlot::layout(&[1.0; NUM_BINS], &area(), SAMPLE_RATE, FFT_SIZE);
        let labels: Vec<&str> = plot.x_ticks.iter().map(|t| t.label.as_str()).collect();

        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0], "0 Hz");
        assert_eq!(labels[2], "11025 Hz");
        assert_eq!(labels[4], "22050 Hz");
        assert_eq!(plot.x_ticks[4].position, area().right);
    }

    #[test]
    fn six_magnitude_labels_with_adaptive_precision() {
        let plot = SpectrumPlot::layout(&[0.5, 0.25], &area(), SAMPLE_RATE, FFT_SIZE);
        let labels: Vec<&str> = plot.y_ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["0.0000", "0.1000", "0.2000", "0.3000", "0.4000", "0.5000"]);
        assert_eq!(plot.y_ticks[0].position, area().bottom);
        assert!((plot.y_ticks[5].position - area().top).abs() < 1e-3);

        let loud = SpectrumPlot::layout(&[250.0], &area(), SAMPLE_RATE, FFT_SIZE);
        assert_eq!(loud.y_ticks[5].label, "250.00");
    }

    #[test]
    fn silent_frame_does_not_divide_by_zero() {
        let plot = SpectrumPlot::layout(&[0.0; 16], &area(), SAMPLE_RATE, FFT_SIZE);
        assert_eq!(plot.max_val, 0.0);
        assert!(plot.points.iter().all(|p| p[1] == area().bottom));
        assert_eq!(plot.y_ticks[5].label, "1.00");
    }

    #[test]
    fn layout_is_repeatable() {
        let frame: Vec<f32> = (0..NUM_BINS).map(|i| (i as f32).sin().abs()).collect();
        let a = SpectrumPlot::layout(&frame, &area(), SAMPLE_RATE, FFT_SIZE);
        let b = SpectrumPlot::layout(&frame, &area(), SAMPLE_RATE, FFT_SIZE);
        assert_eq!(a, b);
        assert_eq!(a.info[1], "Freq Resolution: 43.07 Hz/bin");
    }

    #[test]
    fn info_reports_peak_frequency() {
        let mut frame = vec![0.1; NUM_BINS];
        frame[100] = 4.0;
        let plot = SpectrumPlot::layout(&frame, &area(), SAMPLE_RATE, FFT_SIZE);
        assert_eq!(plot.info[3], "Peak: 4307 Hz");
    }

    #[test]
    fn single_bin_sits_on_left_edge() {
        let plot = SpectrumPlot::layout(&[2.0], &area(), SAMPLE_RATE, FFT_SIZE);
        assert_eq!(plot.points, vec![[area().left, area().top]]);
    }
}
