use picam_motion_common::frame::{FrameError, MotionEvent};
use tracing::{debug, info};

use crate::camera::{CameraError, FrameSource};

use super::traits::MotionFilter;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Pulls frames from a [`FrameSource`] until the filter reports motion.
pub struct MotionScanner<F> {
    filter: F,
}

impl<F: MotionFilter> MotionScanner<F> {
    pub fn new(filter: F) -> Self {
        Self { filter }
    }

    /// Block until motion is found between two successive frames.
    ///
    /// A fresh baseline is taken on every call. When a pair shows no motion
    /// the newer frame becomes the baseline. There is no timeout; the only
    /// ways out are motion or a camera failure.
    pub async fn detect<S: FrameSource>(&self, source: &mut S) -> Result<MotionEvent, ScanError> {
        let mut baseline = source.capture_frame().await?;
        let mut compared: u64 = 0;

        loop {
            let next = source.capture_frame().await?;
            compared += 1;

            if let Some(event) = self.filter.compare(&baseline, &next)? {
                info!(
                    x = event.x,
                    y = event.y,
                    width = next.width(),
                    height = next.height(),
                    filter = self.filter.name(),
                    compared,
                    "motion found in stream"
                );
                return Ok(event);
            }

            if compared % 100 == 0 {
                debug!(compared, "frame pairs scanned without motion");
            }
            baseline = next;
        }
    }
}
