//! Blocking capture loop: RUNNING until the source ends or the viewer quits.

use crate::detector::Detector;
use crate::ledger::LedgerError;
use crate::render::Renderer;
use crate::session::{AttendanceSession, FrameReport};
use crate::verifier::Verifier;
use chrono::NaiveTime;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("display error: {0}")]
    Display(String),
}

/// Produces frames. `None` means the stream has ended (or a read failed).
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Shows annotated frames and reports whether the viewer asked to stop.
pub trait FrameSink {
    fn present(&mut self, frame: &RgbImage) -> Result<(), CaptureError>;
    fn quit_requested(&mut self) -> bool;
}

/// Wall-clock time of day used to stamp records.
pub trait Clock {
    fn now(&self) -> NaiveTime;
}

/// Local time from the system clock.
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned no frame.
    EndOfStream,
    /// ESC pressed or window closed.
    QuitRequested,
    /// The configured frame limit was reached.
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub frames_without_faces: u64,
    pub marked: Vec<String>,
    pub stop: StopReason,
}

/// Drives an [`AttendanceSession`] from a frame source to a sink.
///
/// The loop owns the source and sink, so dropping it releases the camera
/// and closes the window on every exit path.
pub struct CaptureLoop<S, K, C> {
    source: S,
    sink: K,
    clock: C,
    renderer: Renderer,
    max_frames: Option<u64>,
    state: LoopState,
}

impl<S: FrameSource, K: FrameSink, C: Clock> CaptureLoop<S, K, C> {
    pub fn new(source: S, sink: K, clock: C, renderer: Renderer) -> Self {
        Self {
            source,
            sink,
            clock,
            renderer,
            max_frames: None,
            state: LoopState::Running,
        }
    }

    /// Stop after `limit` frames.
    pub fn with_max_frames(mut self, limit: Option<u64>) -> Self {
        self.max_frames = limit;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run until stopped. A failed log append or display aborts the loop.
    pub fn run<D: Detector, V: Verifier>(
        &mut self,
        session: &mut AttendanceSession<D, V>,
    ) -> Result<LoopSummary, CaptureError> {
        let mut frames = 0u64;
        let mut frames_without_faces = 0u64;

        let stop = loop {
            if let LoopState::Stopped(reason) = self.state {
                break reason;
            }
            if self.max_frames.is_some_and(|limit| frames >= limit) {
                self.state = LoopState::Stopped(StopReason::FrameLimit);
                continue;
            }

            let Some(mut frame) = self.source.next_frame() else {
                self.state = LoopState::Stopped(StopReason::EndOfStream);
                continue;
            };
            frames += 1;

            let report = session.process_frame(&frame, self.clock.now())?;
            if report == FrameReport::NoFace {
                frames_without_faces += 1;
            }
            for outcome in report.outcomes() {
                tracing::trace!(region = ?outcome.region, status = ?outcome.status, "face");
            }

            self.renderer.draw(&mut frame, &report);
            self.sink.present(&frame)?;

            if self.sink.quit_requested() {
                self.state = LoopState::Stopped(StopReason::QuitRequested);
            }
        };

        tracing::info!(frames, ?stop, marked = session.tracker().len(), "capture loop stopped");

        Ok(LoopSummary {
            frames,
            frames_without_faces,
            marked: session.tracker().marked().to_vec(),
            stop,
        })
    }
}
