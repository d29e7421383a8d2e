use picam_motion_common::config::CameraConfig;
use picam_motion_common::frame::MotionEvent;

/// Linear map from scan-space to full-image-space, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    x: f64,
    y: f64,
}

impl ScaleFactors {
    pub fn new(stream: (u32, u32), image: (u32, u32)) -> Self {
        Self {
            x: f64::from(image.0) / f64::from(stream.0),
            y: f64::from(image.1) / f64::from(stream.1),
        }
    }

    pub fn from_camera(config: &CameraConfig) -> Self {
        Self::new(
            (config.stream_width, config.stream_height),
            (config.image_width, config.image_height),
        )
    }

    /// Full-image coordinate of a scan-space event, truncated to whole pixels.
    pub fn to_image(&self, event: MotionEvent) -> (u32, u32) {
        (
            (f64::from(event.x) * self.x) as u32,
            (f64::from(event.y) * self.y) as u32,
        )
    }
}
