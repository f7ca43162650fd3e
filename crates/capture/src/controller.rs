//! Session boundaries in a stream of frames.
//!
//! A session starts the first time the time of day moves away from the value
//! seen in the first frame, and ends when it falls back to (or before) the
//! start time. The end check only arms after [`DEBOUNCE_FRAMES`] captured
//! frames because the clock jitters right after a session begins.

use model::{ReplaySession, TelemetryFrame};
use tracing::{info, warn, Span};

pub const DEBOUNCE_FRAMES: u64 = 60;
pub const PROGRESS_EVERY: u64 = 300;

#[derive(Clone, Debug, PartialEq)]
pub enum CaptureEvent {
    /// Before the session starts; nothing to write.
    Waiting,
    /// First frame of the session; write it.
    Started(ReplaySession),
    /// Write the frame. `dropped` counts sequence ids missed since the previous frame.
    Captured { dropped: u32 },
    /// Inside the debounce window with a stale clock; not written.
    Skipped,
    /// Same sequence id as the previous frame.
    Duplicate,
    /// Session over; the frame belongs to the next run and is not written.
    Finished(ReplaySession),
}

pub struct CaptureController {
    baseline: Option<u32>,
    last_sequence: Option<u32>,
    session: Option<ReplaySession>,
    done: bool,
    span: Span,
}

impl CaptureController {
    pub fn new(span: Span) -> Self {
        Self { baseline: None, last_sequence: None, session: None, done: false, span }
    }

    pub fn session(&self) -> Option<&ReplaySession> {
        self.session.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn observe(&mut self, frame: &TelemetryFrame) -> CaptureEvent {
        let seq = frame.sequence_id;
        // signed so a wrapped id is still "next" and a late one is negative
        let delta = match self.last_sequence {
            Some(last) => seq.wrapping_sub(last) as i32,
            None => 1,
        };
        if delta == 0 {
            return CaptureEvent::Duplicate;
        }
        if delta > 0 {
            self.last_sequence = Some(seq);
        }
        let tod = frame.time_of_day_ms;

        let Some(baseline) = self.baseline else {
            self.baseline = Some(tod);
            return CaptureEvent::Waiting;
        };

        if self.done {
            return CaptureEvent::Waiting;
        }

        if self.session.is_none() {
            if tod == baseline {
                return CaptureEvent::Waiting;
            }
            let mut session = ReplaySession::start(tod);
            session.frames = 1;
            info!(parent: &self.span, session = %session.id.simple(), time_of_day_ms = tod, "capture started");
            self.session = Some(session.clone());
            return CaptureEvent::Started(session);
        }
        let span = &self.span;
        let Some(session) = self.session.as_mut() else {
            return CaptureEvent::Waiting;
        };

        if tod <= session.start_time_of_day_ms {
            if session.frames < DEBOUNCE_FRAMES {
                return CaptureEvent::Skipped;
            }
            self.done = true;
            info!(parent: span, frames = session.frames, dropped = session.dropped_frames, "restart detected, capture finished");
            return CaptureEvent::Finished(session.clone());
        }

        // late frames are written but never counted as loss
        let dropped = if delta > 1 { (delta - 1) as u32 } else { 0 };
        if dropped > 0 {
            warn!(parent: span, dropped, "dropped frames");
            session.dropped_frames += u64::from(dropped);
        }
        session.frames += 1;
        if session.frames % PROGRESS_EVERY == 0 {
            info!(parent: span, frames = session.frames, "frames captured");
        }
        CaptureEvent::Captured { dropped }
    }
}
