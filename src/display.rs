/// Decimal places used for magnitude labels on an axis whose top is `max_val`.
/// Small spectra get more digits so the ticks stay distinguishable.
pub fn magnitude_precision(max_val: f32) -> usize {
    if max_val < 0.01 {
        6
    } else if max_val < 1.0 {
        4
    } else {
        2
    }
}

pub fn format_magnitude(value: f32, max_val: f32) -> String {
    format!("{:.*}", magnitude_precision(max_val), value)
}

/// Whole-Hz frequency label, e.g. `11025 Hz`.
pub fn format_frequency(hz: f32) -> String {
    format!("{:.0} Hz", hz)
}

/// Status line shown under the plots.
pub fn format_status(accepted: u64, rejected: u64, last_frame: Option<&str>) -> String {
    match last_frame {
        Some(time) => format!("Frames: {}  Rejected: {}  Last frame: {}", accepted, rejected, time),
        None => format!("Frames: {}  Rejected: {}", accepted, rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_tracks_dynamic_range() {
        assert_eq!(format_magnitude(0.001234, 0.005), "0.001234");
        assert_eq!(format_magnitude(0.25, 0.5), "0.2500");
        assert_eq!(format_magnitude(1234.5678, 2000.0), "1234.57");
    }

    #[test]
    fn frequencies_are_whole_hz() {
        assert_eq!(format_frequency(0.0), "0 Hz");
        assert_eq!(format_frequency(22050.0), "22050 Hz");
    }

    #[test]
    fn status_mentions_last_frame_when_known() {
        assert_eq!(format_status(3, 1, None), "Frames: 3  Rejected: 1");
        assert!(format_status(3, 1, Some("12:00:01")).ends_with("Last frame: 12:00:01"));
    }
}
