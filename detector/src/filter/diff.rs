use picam_motion_common::frame::{Frame, FrameError, MotionEvent};
use tracing::debug;

use super::traits::MotionFilter;

/// Pixel-differencing motion filter.
///
/// Walks both frames in row-major order (y outer, x inner) and counts pixels
/// whose channel difference exceeds `threshold`. As soon as that count
/// exceeds `sensitivity` the current pixel is reported, so the location is
/// the first pixel past the limit rather than the centre of the motion.
/// Identical frames never report motion; a `threshold` of 255 or more can
/// never be exceeded and disables detection.
pub struct PixelDiffFilter {
    threshold: u32,
    sensitivity: u32,
}

impl PixelDiffFilter {
    pub fn new(threshold: u32, sensitivity: u32) -> Self {
        Self {
            threshold,
            sensitivity,
        }
    }
}

impl MotionFilter for PixelDiffFilter {
    fn compare(
        &self,
        baseline: &Frame,
        next: &Frame,
    ) -> Result<Option<MotionEvent>, FrameError> {
        if baseline.dimensions() != next.dimensions() {
            return Err(FrameError::DimensionMismatch {
                a: baseline.dimensions(),
                b: next.dimensions(),
            });
        }

        let mut diff_count: u64 = 0;
        for y in 0..baseline.height() {
            let (row_a, row_b) = (baseline.row(y), next.row(y));
            for (x, (&a, &b)) in row_a.iter().zip(row_b).enumerate() {
                // Widen before subtracting so u8 values cannot wrap.
                let diff = (i32::from(a) - i32::from(b)).unsigned_abs();
                if diff > self.threshold {
                    diff_count += 1;
                    if diff_count > u64::from(self.sensitivity) {
                        return Ok(Some(MotionEvent { x: x as u32, y }));
                    }
                }
            }
        }

        debug!(
            diff_count,
            threshold = self.threshold,
            sensitivity = self.sensitivity,
            "no motion in frame pair"
        );
        Ok(None)
    }

    fn name(&self) -> &str {
        "pixel-diff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_block(base: &Frame, x0: u32, y0: u32, size: u32, value: u8) -> Frame {
        let mut frame = base.clone();
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                frame.set(x, y, value);
            }
        }
        frame
    }

    #[test]
    fn identical_frames_never_trigger() {
        let a = Frame::filled(40, 30, 128);
        for (threshold, sensitivity) in [(0, 0), (1, 0), (0, 10), (255, 0)] {
            let filter = PixelDiffFilter::new(threshold, sensitivity);
            assert_eq!(filter.compare(&a, &a.clone()).unwrap(), None);
        }
    }

    #[test]
    fn block_change_reports_pixel_inside_block() {
        let a = Frame::filled(40, 30, 100);
        let b = with_block(&a, 20, 10, 3, 150);
        let filter = PixelDiffFilter::new(25, 5);

        let event = filter.compare(&a, &b).unwrap().expect("motion");
        assert!((20..23).contains(&event.x), "x = {}", event.x);
        assert!((10..13).contains(&event.y), "y = {}", event.y);
        // Sixth changed pixel in row-major order is the last one of the
        // second block row.
        assert_eq!(event, MotionEvent { x: 22, y: 11 });
    }

    #[test]
    fn count_must_strictly_exceed_sensitivity() {
        let a = Frame::filled(40, 30, 100);
        let b = with_block(&a, 0, 0, 3, 150); // 9 changed pixels
        assert!(PixelDiffFilter::new(25, 8).compare(&a, &b).unwrap().is_some());
        assert!(PixelDiffFilter::new(25, 9).compare(&a, &b).unwrap().is_none());
    }

    #[test]
    fn diff_must_strictly_exceed_threshold() {
        let a = Frame::filled(10, 10, 100);
        let b = Frame::filled(10, 10, 150);
        assert!(PixelDiffFilter::new(49, 0).compare(&a, &b).unwrap().is_some());
        assert!(PixelDiffFilter::new(50, 0).compare(&a, &b).unwrap().is_none());
    }

    #[test]
    fn zero_sensitivity_triggers_on_first_changed_pixel() {
        let a = Frame::filled(10, 10, 0);
        let mut b = a.clone();
        b.set(7, 4, 200);
        b.set(2, 9, 200);
        let event = PixelDiffFilter::new(0, 0).compare(&a, &b).unwrap();
        assert_eq!(event, Some(MotionEvent { x: 7, y: 4 }));
    }

    #[test]
    fn darker_pixels_count_without_wrapping() {
        let a = Frame::filled(4, 4, 250);
        let b = Frame::filled(4, 4, 5);
        let event = PixelDiffFilter::new(200, 0).compare(&a, &b).unwrap();
        assert_eq!(event, Some(MotionEvent { x: 0, y: 0 }));
    }

    #[test]
    fn max_threshold_disables_detection() {
        let a = Frame::filled(4, 4, 0);
        let b = Frame::filled(4, 4, 255);
        assert!(PixelDiffFilter::new(255, 0).compare(&a, &b).unwrap().is_none());
    }

    #[test]
    fn reported_coordinate_is_in_bounds() {
        let a = Frame::filled(40, 30, 0);
        let b = Frame::filled(40, 30, 255);
        for sensitivity in [0, 39, 40, 599, 1198] {
            let event = PixelDiffFilter::new(10, sensitivity)
                .compare(&a, &b)
                .unwrap()
                .expect("motion");
            assert!(event.x < 40 && event.y < 30);
        }
        assert!(PixelDiffFilter::new(10, 1200).compare(&a, &b).unwrap().is_none());
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let err = PixelDiffFilter::new(10, 0)
            .compare(&Frame::filled(4, 4, 0), &Frame::filled(4, 5, 0))
            .unwrap_err();
        assert!(matches!(err, FrameError::DimensionMismatch { .. }));
    }
}
