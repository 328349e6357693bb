use chrono::{DateTime, Local};
use log::{debug, warn};
use nom::combinator::all_consuming;
use nom::number::complete::float;
use nom::IResult;
use thiserror::Error;

use crate::config::Framing;

/// One complete spectrum received from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeFrame {
    pub sequence: u64,
    pub received_at: DateTime<Local>,
    values: Vec<f32>,
}

impl MagnitudeFrame {
    pub fn new(sequence: u64, values: Vec<f32>) -> Self {
        Self {
            sequence,
            received_at: Local::now(),
            values,
        }
    }

    /// Magnitudes from DC up to (but excluding) Nyquist.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} values, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("token {index} ('{token}') is not a finite number")]
    InvalidToken { index: usize, token: String },
}

/// Line-oriented decoder for sentinel-framed, comma separated magnitudes.
///
/// Lines between the start and end sentinel are concatenated; the end
/// sentinel turns the accumulated text into a [`MagnitudeFrame`] when it
/// holds exactly `bin_count` numbers. A start sentinel always discards
/// whatever was accumulated before it.
pub struct FrameDecoder {
    bin_count: usize,
    framing: Framing,
    accumulator: String,
    next_sequence: u64,
}

impl FrameDecoder {
    pub fn new(bin_count: usize, framing: Framing) -> Self {
        Self {
            bin_count,
            framing,
            accumulator: String::new(),
            next_sequence: 0,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    /// Bytes of payload waiting for an end sentinel.
    pub fn pending_len(&self) -> usize {
        self.accumulator.len()
    }

    /// Feeds one line (without its newline). Returns `Ok(Some(frame))` when
    /// the line completed a valid frame.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<MagnitudeFrame>, DecodeError> {
        let line = line.trim();

        if line == self.framing.start_sentinel {
            if !self.accumulator.is_empty() {
                debug!("Start sentinel discarded {} pending bytes", self.accumulator.len());
            }
            self.accumulator.clear();
            return Ok(None);
        }

        if line == self.framing.end_sentinel {
            let payload = std::mem::take(&mut self.accumulator);
            return match parse_magnitudes(&payload, self.bin_count) {
                Ok(values) => {
                    let frame = MagnitudeFrame::new(self.next_sequence, values);
                    self.next_sequence += 1;
                    debug!(
                        "Frame #{} complete: {} values, max {:.4}",
                        frame.sequence,
                        frame.len(),
                        crate::utils::max_magnitude(frame.values())
                    );
                    Ok(Some(frame))
                }
                Err(e) => {
                    warn!("Dropping frame: {}", e);
                    Err(e)
                }
            };
        }

        let content = match &self.framing.payload_prefix {
            Some(prefix) if !prefix.is_empty() => line.strip_prefix(prefix.as_str()).unwrap_or(line),
            _ => line,
        };
        self.accumulator.push_str(content);
        Ok(None)
    }
}

/// Splits `payload` on commas and parses every token as an absolute
/// magnitude. Any malformed token rejects the whole payload.
pub fn parse_magnitudes(payload: &str, expected: usize) -> Result<Vec<f32>, DecodeError> {
    let mut tokens: Vec<&str> = payload.split(',').map(str::trim).collect();

    // "1,2,3," ends in one empty token; "" yields exactly one
    if tokens.last().map_or(false, |t| t.is_empty()) {
        tokens.pop();
    }

    if tokens.len() != expected {
        return Err(DecodeError::CountMismatch {
            expected,
            actual: tokens.len(),
        });
    }

    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            parse_token(token)
                .map(f32::abs)
                .ok_or_else(|| DecodeError::InvalidToken {
                    index,
                    token: token.to_string(),
                })
        })
        .collect()
}

fn parse_token(token: &str) -> Option<f32> {
    let parsed: IResult<&str, f32> = all_consuming(float)(token);
    match parsed {
        Ok((_, value)) if value.is_finite() => Some(value),
        _ => None,
    }
}
