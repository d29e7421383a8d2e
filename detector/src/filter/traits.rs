use picam_motion_common::frame::{Frame, FrameError, MotionEvent};

/// Frame-comparison interface for motion detection.
///
/// Implementations compare a baseline frame against a newer one and report
/// where motion was found, if anywhere.
pub trait MotionFilter: Send + Sync {
    /// Returns `Some(event)` when `next` differs enough from `baseline`.
    fn compare(&self, baseline: &Frame, next: &Frame)
        -> Result<Option<MotionEvent>, FrameError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
