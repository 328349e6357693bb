use log::debug;

use crate::config::Framing;

const VALUES_PER_LINE: usize = 64;  // Mimics a transport that splits long lines
const FLOOR: f32 = 0.02;

/// Synthetic device output: a tone that sweeps up and down the spectrum with
/// its second harmonic, on top of a rippling noise floor.
pub struct DemoSignal {
    bin_count: usize,
    framing: Framing,
    frame_index: u64,
    sweep_period: u64,  // Frames for one full sweep up and back
}

impl DemoSignal {
    pub fn new(bin_count: usize, framing: Framing) -> Self {
        Self {
            bin_count,
            framing,
            frame_index: 0,
            sweep_period: 240,
        }
    }

    /// Bin holding the tone's peak for a given frame.
    pub fn peak_bin(&self, frame_index: u64) -> usize {
        if self.bin_count < 2 {
            return 0;
        }
        let half = self.sweep_period / 2;
        let phase = frame_index % self.sweep_period;
        let progress = if phase < half { phase } else { self.sweep_period - phase };
        let span = (self.bin_count - 1) as u64;
        ((progress * span) / half) as usize
    }

    /// Magnitudes for one frame.
    pub fn magnitudes(&self, frame_index: u64) -> Vec<f32> {
        let peak = self.peak_bin(frame_index) as f32;
        let t = frame_index as f32 * 0.1;

        (0..self.bin_count)
            .map(|i| {
                let bin = i as f32;
                let ripple = FLOOR * (1.0 + 0.5 * (bin * 0.37 + t).sin());
                let tone = gaussian(bin, peak, 3.0);
                let harmonic = 0.4 * gaussian(bin, peak * 2.0, 3.0);
                ripple + tone + harmonic
            })
            .collect()
    }

    /// Wire-format lines for the next frame, sentinels included.
    pub fn next_frame_lines(&mut self) -> Vec<String> {
        let values = self.magnitudes(self.frame_index);
        self.frame_index += 1;

        let mut lines = Vec::with_capacity(values.len() / VALUES_PER_LINE + 3);
        lines.push(self.framing.start_sentinel.clone());

        let chunks: Vec<&[f32]> = values.chunks(VALUES_PER_LINE).collect();
        for (n, chunk) in chunks.iter().enumerate() {
            let mut line = chunk
                .iter()
                .map(|v| format!("{:.4}", v))
                .collect::<Vec<_>>()
                .join(",");
            if n + 1 < chunks.len() {
                line.push(',');
            }
            if n == 0 {
                if let Some(prefix) = &self.framing.payload_prefix {
                    line.insert_str(0, prefix);
                }
            }
            lines.push(line);
        }

        lines.push(self.framing.end_sentinel.clone());
        debug!(target: "demo_signal", "Generated demo frame #{} ({} lines)", self.frame_index - 1, lines.len());
        lines
    }
}

fn gaussian(x: f32, center: f32, width: f32) -> f32 {
    let d = (x - center) / width;
    (-0.5 * d * d).exp()
}
