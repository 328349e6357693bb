use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, warn};

use crate::frame_decoder::MagnitudeFrame;

/// Single-slot channel between the decode stage and the display tick.
///
/// Holds at most one unread frame. Publishing while a frame is still unread
/// replaces it, so the display always picks up the newest spectrum and never
/// a half-written one.
#[derive(Clone)]
pub struct FrameHandoff {
    tx: Sender<MagnitudeFrame>,
    rx: Receiver<MagnitudeFrame>,
}

impl FrameHandoff {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Publishes `frame`, evicting an unread older frame if there is one.
    /// Returns the number of frames that were evicted.
    pub fn publish(&self, frame: MagnitudeFrame) -> usize {
        let mut evicted = 0;
        let mut pending = frame;

        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(frame)) => {
                    pending = frame;
                    if let Ok(stale) = self.rx.try_recv() {
                        debug!(target: "handoff", "Replacing unread frame #{} with #{}", stale.sequence, pending.sequence);
                        evicted += 1;
                    }
                }
                Err(TrySendError::Disconnected(frame)) => {
                    warn!(target: "handoff", "Handoff closed, dropping frame #{}", frame.sequence);
                    return evicted;
                }
            }
        }
    }

    /// Takes the newest unread frame, if any.
    pub fn take_latest(&self) -> Option<MagnitudeFrame> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }
}

impl Default for FrameHandoff {
    fn default() -> Self {
        Self::new()
    }
}
