//! Camera capture module: session lifecycle, preview binding, and
//! still-frame extraction.
//!
//! - Device enumeration via [`list_devices`]
//! - Session lifecycle via [`CaptureSession`]
//! - Hardware access via [`HardwareSource`] (nokhwa)
//! - Configuration via [`CaptureSettings`] and [`Resolution`]

mod device;
mod hardware;
mod session;
mod stream;
mod surface;
mod types;

pub use device::list_devices;
pub use hardware::{HardwareSource, HardwareStream};
pub use session::{CaptureSession, STILL_JPEG_QUALITY};
pub use stream::{CameraStream, StreamSource};
pub use surface::PreviewSurface;
pub use types::{
    CameraInfo, CaptureError, CaptureSettings, Frame, FrameFormat, Resolution, StillFrame,
};
