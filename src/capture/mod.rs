//! Camera Capture Layer
//!
//! Owns the camera device handle for the duration of one scan session. The
//! device is opened through nokhwa, so the same code path works across
//! platform capture backends.

pub mod frame;

use image::imageops::FilterType;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info};

use crate::config::CameraSettings;
pub use frame::{PreviewFrame, Snapshot};

/// Errors from camera acquisition and frame access
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// The OS or user refused camera access
    #[error("camera access denied — check system permissions")]
    PermissionDenied,
    /// No device, device busy, or the stream could not be set up
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Source of live frames for a scan session.
///
/// `snapshot` must read the current frame at call time; `release` must be
/// idempotent and is also invoked on drop.
pub trait FrameSource {
    /// Render the current frame, cropped to the central scan region and
    /// downscaled to `output_size`² for recognition.
    fn snapshot(&mut self, region_fraction: f32, output_size: u32) -> Result<Snapshot, CaptureError>;

    /// Downscaled RGBA copy of the current frame for the live preview.
    /// Returns None when a frame is momentarily unavailable.
    fn preview_frame(&mut self, max_width: u32) -> Option<PreviewFrame>;

    /// Stop the stream and free the device. Safe to call multiple times.
    fn release(&mut self);
}

/// Camera device handle backed by nokhwa
#[derive(Default)]
pub struct CameraSource {
    camera: Option<Camera>,
}

impl CameraSource {
    /// Open the configured device and start streaming.
    ///
    /// Requesting the stream is what triggers the OS permission prompt, so a
    /// denial surfaces here as `PermissionDenied`.
    pub fn acquire(settings: &CameraSettings) -> Result<Self, CaptureError> {
        let index = CameraIndex::Index(settings.device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(settings.width, settings.height),
                FrameFormat::MJPEG,
                settings.fps,
            ),
        ));

        let mut camera = Camera::new(index, requested).map_err(map_device_error)?;
        camera.open_stream().map_err(map_device_error)?;

        info!(
            "Camera {} acquired at {}",
            settings.device_index,
            camera.camera_format()
        );

        Ok(Self { camera: Some(camera) })
    }

    /// Decode the current frame from the live stream
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| CaptureError::DeviceUnavailable("camera already released".to_string()))?;

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
    }
}

impl FrameSource for CameraSource {
    fn snapshot(&mut self, region_fraction: f32, output_size: u32) -> Result<Snapshot, CaptureError> {
        let frame = self.current_frame()?;
        Ok(crop_scan_region(&frame, region_fraction, output_size))
    }

    fn preview_frame(&mut self, max_width: u32) -> Option<PreviewFrame> {
        let frame = self.current_frame().ok()?;

        let (w, h) = frame.dimensions();
        let scaled = if w > max_width {
            let scale = max_width as f32 / w as f32;
            image::imageops::resize(
                &frame,
                max_width,
                ((h as f32 * scale) as u32).max(1),
                FilterType::Triangle,
            )
        } else {
            frame
        };

        let (w, h) = scaled.dimensions();
        let rgba = image::DynamicImage::ImageRgb8(scaled).into_rgba8().into_raw();
        Some(PreviewFrame { rgba, width: w, height: h })
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                debug!("Camera stream stop reported: {}", e);
            }
            info!("Camera released");
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Crop the central square scan region and downscale it for recognition.
///
/// The region side is `region_fraction` of the shorter frame dimension,
/// centered, matching the HUD target frame shown in the scanner view.
pub fn crop_scan_region(frame: &RgbImage, region_fraction: f32, output_size: u32) -> Snapshot {
    let (width, height) = frame.dimensions();
    let fraction = region_fraction.clamp(0.05, 1.0);

    let side = ((width.min(height) as f32) * fraction).round().max(1.0) as u32;
    let x = (width - side) / 2;
    let y = (height - side) / 2;

    let region = image::imageops::crop_imm(frame, x, y, side, side).to_image();
    let scaled = image::imageops::resize(&region, output_size, output_size, FilterType::Triangle);

    Snapshot::new(scaled.into_raw(), output_size, output_size)
}

/// Enumerate available camera devices as (index, name) pairs
pub fn list_cameras() -> Vec<(String, String)> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|cam| (cam.index().to_string(), cam.human_name()))
            .collect(),
        Err(e) => {
            debug!("Camera enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Map a nokhwa open error onto the session error taxonomy
fn map_device_error(e: nokhwa::NokhwaError) -> CaptureError {
    let text = e.to_string();
    let lowered = text.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized")
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_idempotent_without_device() {
        // A session that never acquired the device must still be able to run
        // its teardown path any number of times.
        let mut source = CameraSource::default();
        source.release();
        source.release();
        assert!(source.snapshot(0.8, 400).is_err());
    }

    #[test]
    fn test_crop_scan_region_geometry() {
        let frame = RgbImage::from_pixel(100, 60, image::Rgb([10, 20, 30]));
        let snapshot = crop_scan_region(&frame, 0.5, 40);

        assert_eq!(snapshot.dimensions(), (40, 40));
        assert_eq!(snapshot.data.len(), 40 * 40 * 3);
        assert_eq!(&snapshot.data[0..3], &[10, 20, 30]);
    }

    #[test]
    fn test_crop_scan_region_clamps_fraction() {
        let frame = RgbImage::from_pixel(32, 32, image::Rgb([0, 0, 0]));
        // Fractions beyond 1.0 must not push the crop out of bounds.
        let snapshot = crop_scan_region(&frame, 4.0, 16);
        assert_eq!(snapshot.dimensions(), (16, 16));
    }

    #[test]
    fn test_snapshot_to_rgb_image() {
        let snapshot = Snapshot::new(vec![0; 12], 2, 2);
        let img = snapshot.to_rgb_image().unwrap();
        assert_eq!(img.dimensions(), (2, 2));
    }
}
