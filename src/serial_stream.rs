use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};

use crate::demo_signal::DemoSignal;
use crate::frame_decoder::FrameDecoder;
use crate::handoff::FrameHandoff;

const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Where lines come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Serial { port: String, baud_rate: u32 },
    Replay { path: PathBuf, frame_interval: Duration },
    Demo { frame_interval: Duration },
}

/// Counters shared between the reader thread and the GUI.
#[derive(Debug, Default)]
pub struct ReaderStats {
    pub lines: AtomicU64,
    pub frames_accepted: AtomicU64,
    pub frames_rejected: AtomicU64,
}

impl ReaderStats {
    pub fn accepted(&self) -> u64 {
        self.frames_accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.frames_rejected.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Pending,
    Published,
    Rejected,
}

/// Decode stage: owns the decoder and feeds completed frames to the handoff.
pub struct FrameReader {
    decoder: FrameDecoder,
    handoff: FrameHandoff,
    stats: Arc<ReaderStats>,
}

impl FrameReader {
    pub fn new(decoder: FrameDecoder, handoff: FrameHandoff, stats: Arc<ReaderStats>) -> Self {
        Self {
            decoder,
            handoff,
            stats,
        }
    }

    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines.fetch_add(1, Ordering::Relaxed);

        match self.decoder.feed_line(line) {
            Ok(Some(frame)) => {
                self.stats.frames_accepted.fetch_add(1, Ordering::Relaxed);
                let evicted = self.handoff.publish(frame);
                if evicted > 0 {
                    debug!("Display lagging, {} unread frame(s) replaced", evicted);
                }
                LineOutcome::Published
            }
            Ok(None) => LineOutcome::Pending,
            Err(e) => {
                let rejected = self.stats.frames_rejected.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Rejected frame ({} so far): {}", rejected, e);
                LineOutcome::Rejected
            }
        }
    }

    /// Reads newline-terminated lines until EOF or shutdown. Read timeouts
    /// are retried without losing the partial line.
    pub fn pump<R: BufRead>(
        &mut self,
        mut reader: R,
        shutdown: &AtomicBool,
        frame_interval: Option<Duration>,
    ) -> Result<()> {
        let mut buf: Vec<u8> = Vec::with_capacity(8192);

        while !shutdown.load(Ordering::SeqCst) {
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    if !buf.is_empty() {
                        self.dispatch(&buf, frame_interval, shutdown);
                    }
                    info!("Input reached end of stream");
                    return Ok(());
                }
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        self.dispatch(&buf, frame_interval, shutdown);
                        buf.clear();
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                    continue;
                }
                Err(e) => return Err(anyhow!("Failed to read input: {}", e)),
            }
        }

        debug!(
            "Reader stopped by shutdown flag ({} bytes of an unfinished frame dropped)",
            self.decoder.pending_len()
        );
        Ok(())
    }

    fn dispatch(&mut self, raw: &[u8], frame_interval: Option<Duration>, shutdown: &AtomicBool) {
        let line = String::from_utf8_lossy(raw);
        let outcome = self.handle_line(line.trim_end_matches(&['\r', '\n'][..]));
        if outcome != LineOutcome::Pending {
            if let Some(interval) = frame_interval {
                sleep_unless_shutdown(interval, shutdown);
            }
        }
    }

    fn run_demo(&mut self, mut demo: DemoSignal, frame_interval: Duration, shutdown: &AtomicBool) {
        info!("Demo signal running, one frame every {:?}", frame_interval);
        while !shutdown.load(Ordering::SeqCst) {
            for line in demo.next_frame_lines() {
                self.handle_line(&line);
            }
            sleep_unless_shutdown(frame_interval, shutdown);
        }
    }
}

/// Names of the serial ports the OS reports.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

fn open_source(source: &InputSource) -> Result<Box<dyn BufRead + Send>> {
    match source {
        InputSource::Serial { port, baud_rate } => {
            let serial = serialport::new(port.as_str(), *baud_rate)
                .timeout(SERIAL_READ_TIMEOUT)
                .open()
                .with_context(|| format!("Failed to open serial port {} at {} baud", port, baud_rate))?;
            info!("Opened serial port {} at {} baud", port, baud_rate);
            Ok(Box::new(BufReader::new(serial)))
        }
        InputSource::Replay { path, .. } => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open replay file {}", path.display()))?;
            info!("Replaying {}", path.display());
            Ok(Box::new(BufReader::new(file)))
        }
        InputSource::Demo { .. } => Err(anyhow!("demo source has no byte stream")),
    }
}

/// Opens the source and spawns the decode stage. Opening happens on the
/// caller's thread so a missing port fails startup instead of the thread.
pub fn start_reader_thread(
    source: InputSource,
    mut reader: FrameReader,
    shutdown: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    let input = match &source {
        InputSource::Demo { .. } => None,
        other => Some(open_source(other)?),
    };

    let handle = thread::Builder::new()
        .name("frame-reader".to_string())
        .spawn(move || {
            let started = Instant::now();
            match (source, input) {
                (InputSource::Demo { frame_interval }, _) => {
                    let demo = DemoSignal::new(reader.decoder.bin_count(), reader.decoder.framing().clone());
                    reader.run_demo(demo, frame_interval, &shutdown);
                }
                (InputSource::Replay { frame_interval, .. }, Some(input)) => {
                    if let Err(e) = reader.pump(input, &shutdown, Some(frame_interval)) {
                        error!("Replay stopped: {:?}", e);
                    }
                }
                (InputSource::Serial { .. }, Some(input)) => {
                    if let Err(e) = reader.pump(input, &shutdown, None) {
                        error!("Serial input stopped: {:?}", e);
                    }
                }
                (_, None) => error!("Input source was not opened"),
            }
            info!(
                "Reader thread finished after {:.1}s: {} frames accepted, {} rejected",
                started.elapsed().as_secs_f32(),
                reader.stats.accepted(),
                reader.stats.rejected()
            );
        })?;

    Ok(handle)
}

fn sleep_unless_shutdown(duration: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(20)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Framing;
    use std::io::{Cursor, Read};

    fn reader(bins: usize) -> (FrameReader, FrameHandoff, Arc<ReaderStats>) {
        let handoff = FrameHandoff::new();
        let stats = Arc::new(ReaderStats::default());
        let reader = FrameReader::new(
            FrameDecoder::new(bins, Framing::default()),
            handoff.clone(),
            Arc::clone(&stats),
        );
        (reader, handoff, stats)
    }

    #[test]
    fn pump_publishes_and_counts() {
        let (mut reader, handoff, stats) = reader(3);
        let input = "noise\r\nFFT_DATA_START\r\n1,2,3\r\nFFT_DATA_END\r\n\
                     FFT_DATA_START\r\n1,2\r\nFFT_DATA_END\r\n";
        let shutdown = AtomicBool::new(false);

        reader.pump(Cursor::new(input), &shutdown, None).unwrap();

        assert_eq!(stats.accepted(), 1);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.lines.load(Ordering::Relaxed), 7);
        let frame = handoff.take_latest().expect("frame");
        assert_eq!(frame.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn last_line_without_newline_is_handled() {
        let (mut reader, handoff, _) = reader(2);
        let shutdown = AtomicBool::new(false);
        reader
            .pump(Cursor::new("FFT_DATA_START\n4,5\nFFT_DATA_END"), &shutdown, None)
            .unwrap();
        assert_eq!(handoff.take_latest().map(|f| f.values().to_vec()), Some(vec![4.0, 5.0]));
    }

    /// Yields its data in small pieces with a timeout between each, like a
    /// serial port with a read timeout.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        timed_out: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if !self.timed_out && self.pos < self.data.len() {
                self.timed_out = true;
                return Err(std::io::Error::new(ErrorKind::TimedOut, "timeout"));
            }
            self.timed_out = false;
            let n = 5.min(out.len()).min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn timeouts_do_not_split_lines() {
        let (mut reader, handoff, stats) = reader(4);
        let trickle = Trickle {
            data: b"FFT_DATA_START\nCORR:0.5,-1.5,2.5,3.5\nFFT_DATA_END\n".to_vec(),
            pos: 0,
            timed_out: false,
        };
        let shutdown = AtomicBool::new(false);

        reader.pump(BufReader::with_capacity(8, trickle), &shutdown, None).unwrap();

        assert_eq!(stats.rejected(), 0);
        let frame = handoff.take_latest().expect("frame");
        assert_eq!(frame.values(), &[0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn shutdown_stops_pump_before_reading() {
        let (mut reader, handoff, stats) = reader(1);
        let shutdown = AtomicBool::new(true);
        reader
            .pump(Cursor::new("FFT_DATA_START\n1\nFFT_DATA_END\n"), &shutdown, None)
            .unwrap();
        assert_eq!(stats.lines.load(Ordering::Relaxed), 0);
        assert!(handoff.take_latest().is_none());
    }

    #[test]
    fn replay_thread_feeds_handoff() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"FFT_DATA_START\n1,2\nFFT_DATA_END\n").unwrap();

        let (reader, handoff, stats) = reader(2);
        let source = InputSource::Replay {
            path: file.path().to_path_buf(),
            frame_interval: Duration::from_millis(0),
        };
        let shutdown = Arc::new(AtomicBool::new(false));

        start_reader_thread(source, reader, shutdown).unwrap().join().unwrap();

        assert_eq!(stats.accepted(), 1);
        assert_eq!(handoff.take_latest().map(|f| f.len()), Some(2));
    }

    #[test]
    fn demo_thread_publishes_until_shutdown() {
        let (reader, handoff, stats) = reader(64);
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = InputSource::Demo { frame_interval: Duration::from_millis(5) };

        let handle = start_reader_thread(source, reader, Arc::clone(&shutdown)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while stats.accepted() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();

        assert!(stats.accepted() >= 3);
        assert_eq!(stats.rejected(), 0);
        assert_eq!(handoff.take_latest().map(|f| f.len()), Some(64));
    }

    #[test]
    fn missing_replay_file_fails_up_front() {
        let (reader, _, _) = reader(2);
        let source = InputSource::Replay {
            path: PathBuf::from("/definitely/not/here.txt"),
            frame_interval: Duration::from_millis(0),
        };
        let result = start_reader_thread(source, reader, Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }
}
