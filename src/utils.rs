pub const SAMPLE_RATE: f32 = 44100.0;  // Sampling rate used by the firmware
pub const FFT_SIZE: usize = 1024;  // Transform length on the device
#[allow(dead_code)]
pub const NUM_BINS: usize = FFT_SIZE / 2;  // Device sends only up to Nyquist
pub const WATERFALL_DEPTH: usize = 300;  // Rows of history kept in the waterfall
pub const WINDOW_WIDTH: f32 = 1200.0;
pub const WINDOW_HEIGHT: f32 = 950.0;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const START_SENTINEL: &str = "FFT_DATA_START";
pub const END_SENTINEL: &str = "FFT_DATA_END";
pub const PAYLOAD_PREFIX: &str = "CORR:";

/// Frequency in Hz of a given bin.
pub fn bin_to_frequency(bin: usize, sample_rate: f32, fft_size: usize) -> f32 {
    bin as f32 * sample_rate / fft_size as f32
}

pub fn nyquist(sample_rate: f32) -> f32 {
    sample_rate / 2.0
}

/// Width of one bin in Hz.
pub fn frequency_resolution(sample_rate: f32, fft_size: usize) -> f32 {
    sample_rate / fft_size as f32
}

/// Largest value in the slice, 0.0 for an empty or all-zero slice.
pub fn max_magnitude(values: &[f32]) -> f32 {
    values.iter().cloned().fold(0.0, f32::max)
}

/// Divisor used when scaling a frame; an all-zero frame scales by 1.
pub fn scale_divisor(max_val: f32) -> f32 {
    if max_val > 0.0 {
        max_val
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_frequencies_follow_sample_rate() {
        assert_eq!(bin_to_frequency(0, SAMPLE_RATE, FFT_SIZE), 0.0);
        assert_eq!(bin_to_frequency(NUM_BINS, SAMPLE_RATE, FFT_SIZE), nyquist(SAMPLE_RATE));
        assert!((frequency_resolution(SAMPLE_RATE, FFT_SIZE) - 43.066).abs() < 0.01);
    }

    #[test]
    fn zero_frames_scale_by_one() {
        assert_eq!(max_magnitude(&[0.0; 8]), 0.0);
        assert_eq!(scale_divisor(0.0), 1.0);
        assert_eq!(scale_divisor(max_magnitude(&[0.5, 2.0, 1.0])), 2.0);
    }
}
