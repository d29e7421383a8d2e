use chrono::Local;
use picam_motion_common::frame::MotionEvent;
use tracing::{debug, info};

use crate::camera::{CameraError, FrameSource, ImageCapture};
use crate::delivery::{Delivery, Dispatcher, Notifier, Uploader};
use crate::filter::scanner::{MotionScanner, ScanError};
use crate::filter::traits::MotionFilter;

use super::counter::{CounterExhausted, ImageSequencer};
use super::keys::{CaptureId, CaptureNamer, CaptureRecord, NamingMode};
use super::scale::ScaleFactors;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// Constructed, not yet scanning.
    Idle,
    /// Waiting for the scanner to report motion.
    Scanning,
    /// Motion found; the full-resolution image is being taken.
    Capturing(MotionEvent),
    /// Image saved; handed to the delivery collaborators.
    Dispatching(CaptureRecord),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("motion scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("image capture failed: {0}")]
    Capture(#[from] CameraError),
    #[error(transparent)]
    Counter(#[from] CounterExhausted),
}

/// Drives scan -> capture -> dispatch for the lifetime of the process.
///
/// The camera is owned here and used by one operation at a time. Camera
/// failures end the loop, as does running out of sequence numbers; delivery
/// failures never do.
pub struct PipelineController<C, F, U, N> {
    camera: C,
    scanner: MotionScanner<F>,
    namer: CaptureNamer,
    sequencer: ImageSequencer,
    scale: ScaleFactors,
    dispatcher: Dispatcher<U, N>,
    state: PipelineState,
}

impl<C, F, U, N> PipelineController<C, F, U, N>
where
    C: FrameSource + ImageCapture,
    F: MotionFilter,
    U: Uploader,
    N: Notifier,
{
    pub fn new(
        camera: C,
        scanner: MotionScanner<F>,
        namer: CaptureNamer,
        sequencer: ImageSequencer,
        scale: ScaleFactors,
        dispatcher: Dispatcher<U, N>,
    ) -> Self {
        Self {
            camera,
            scanner,
            namer,
            sequencer,
            scale,
            dispatcher,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Next sequence number that a numeric-mode capture would use.
    pub fn next_sequence(&self) -> u64 {
        self.sequencer.current()
    }

    /// Deliveries still running in the background.
    pub fn pending_deliveries(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Loop until a camera failure. Cancellation is by dropping the future.
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        loop {
            self.step().await?;
        }
    }

    /// One full detection cycle, returning the capture that was written.
    pub async fn step(&mut self) -> Result<CaptureRecord, PipelineError> {
        self.transition(PipelineState::Scanning);
        let event = self.scanner.detect(&mut self.camera).await?;

        self.transition(PipelineState::Capturing(event));
        let id = match self.namer.mode() {
            NamingMode::Numeric => CaptureId::Sequence(self.sequencer.current()),
            NamingMode::Timestamp => CaptureId::Timestamp(Local::now()),
        };
        let record = self.namer.name_for(id);
        self.camera.capture_image(&record.path).await?;

        self.transition(PipelineState::Dispatching(record.clone()));
        let image_xy = self.scale.to_image(event);
        info!(
            scan_x = event.x,
            scan_y = event.y,
            image_x = image_xy.0,
            image_y = image_xy.1,
            path = record.path.display().to_string(),
            sequence = ?record.sequence_number,
            timestamp = ?record.timestamp,
            "motion capture saved"
        );

        if !self.dispatcher.is_empty() {
            self.dispatcher.spawn(Delivery {
                local_path: record.path.clone(),
                file_name: record.file_name(),
                image_xy,
            });
        }

        // The saved image is already handed off; only later captures lose
        // their number if the counter cannot move on.
        if self.namer.mode() == NamingMode::Numeric {
            self.sequencer.advance()?;
        }
        Ok(record)
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
    }
}
