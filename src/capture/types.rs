//! Capture types and data structures.

use std::fmt;
use std::time::Instant;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Low resolution (320x240)
    pub const LOW: Resolution = Resolution {
        width: 320,
        height: 240,
    };

    /// Medium resolution (640x480)
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// High resolution (1280x720) - preferred for face submissions
    pub const HIGH: Resolution = Resolution {
        width: 1280,
        height: 720,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HIGH
    }
}

/// Pixel format of a live frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
}

/// A live camera frame as published to the preview surface.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data in RGB format
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when the frame was grabbed
    pub timestamp: Instant,
}

impl Frame {
    /// Get the number of bytes per pixel (3 for RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
        }
    }
}

/// A single extracted still image, JPEG-encoded.
///
/// Produced on demand by [`CaptureSession::capture`](super::CaptureSession::capture).
/// The session does not retain it; ownership transfers to the caller, which
/// typically attaches it to an outgoing multipart form.
#[derive(Debug, Clone)]
pub struct StillFrame {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl StillFrame {
    /// Consume the still frame, yielding the JPEG bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Settings for a capture session.
///
/// Frames are published exactly as the camera delivers them; the backend
/// matches faces against enrollment photos, so both must see the same
/// orientation.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Camera device index
    pub device_index: u32,
    /// Requested resolution (actual may vary)
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
        }
    }
}

/// Errors that can occur during capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No cameras found")]
    NoDevices,

    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Camera permission denied. Grant camera access in your system privacy settings")]
    PermissionDenied,

    #[error("Camera device {0} not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(u32),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("Failed to encode still frame: {0}")]
    EncodeFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 0,
            name: "Test Camera".to_string(),
            description: "Built-in".to_string(),
        };
        assert_eq!(format!("{}", info), "[0] Test Camera (Built-in)");
    }

    #[test]
    fn test_resolution_constants() {
        assert_eq!(Resolution::LOW.width, 320);
        assert_eq!(Resolution::LOW.height, 240);
        assert_eq!(Resolution::MEDIUM.width, 640);
        assert_eq!(Resolution::MEDIUM.height, 480);
        assert_eq!(Resolution::HIGH.width, 1280);
        assert_eq!(Resolution::HIGH.height, 720);
    }

    #[test]
    fn test_resolution_default_is_high() {
        // Face submissions prefer 1280x720
        assert_eq!(Resolution::default(), Resolution::HIGH);
    }

    #[test]
    fn test_capture_settings_default() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.resolution.width, 1280);
        assert_eq!(settings.resolution.height, 720);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_capture_error_display() {
        assert_eq!(format!("{}", CaptureError::NoDevices), "No cameras found");
        assert_eq!(
            format!("{}", CaptureError::QueryFailed("test".to_string())),
            "Failed to query cameras: test"
        );
        assert_eq!(
            format!("{}", CaptureError::OpenFailed("test".to_string())),
            "Failed to open camera: test"
        );
        assert!(format!("{}", CaptureError::PermissionDenied).contains("permission denied"));
        assert!(format!("{}", CaptureError::DeviceNotFound(5)).contains("5"));
        assert_eq!(
            format!("{}", CaptureError::StreamFailed("test".to_string())),
            "Failed to start camera stream: test"
        );
        assert_eq!(
            format!("{}", CaptureError::EncodeFailed("test".to_string())),
            "Failed to encode still frame: test"
        );
    }

    #[test]
    fn test_frame_bytes_per_pixel() {
        let frame = Frame {
            data: vec![0; 6], // 2 RGB pixels
            width: 2,
            height: 1,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        };
        assert_eq!(frame.bytes_per_pixel(), 3);
    }

    #[test]
    fn test_still_frame_into_bytes() {
        let still = StillFrame {
            data: vec![0xFF, 0xD8, 0xFF],
            width: 1,
            height: 1,
        };
        assert_eq!(still.into_bytes(), vec![0xFF, 0xD8, 0xFF]);
    }
}
