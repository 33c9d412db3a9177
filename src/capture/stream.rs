//! Stream acquisition traits.
//!
//! The session manager is written against these traits so its lifecycle
//! logic (replace-on-restart, teardown races, readiness checks) can be
//! tested without camera hardware. [`HardwareSource`](super::HardwareSource)
//! is the nokhwa-backed production implementation.

use std::sync::Weak;

use super::surface::PreviewSurface;
use super::types::{CaptureError, CaptureSettings};

/// A granted camera stream.
///
/// A stream owns the underlying hardware acquisition exclusively. It is
/// released by [`stop`](CameraStream::stop) or on drop; both are idempotent.
pub trait CameraStream {
    /// Bind the stream's frame output to a preview surface.
    ///
    /// The stream holds only a weak reference: once the surface is dropped,
    /// frames are discarded rather than published.
    fn attach(&mut self, sink: Weak<PreviewSurface>);

    /// Whether the stream is still delivering frames.
    fn is_live(&self) -> bool;

    /// Release the hardware acquisition. Idempotent.
    fn stop(&mut self);
}

/// A source of camera streams.
pub trait StreamSource {
    type Stream: CameraStream;

    /// Request camera access with the given settings.
    ///
    /// Blocks until the platform grants or denies the stream. On denial or
    /// hardware unavailability returns an error and leaves nothing acquired.
    fn acquire(&self, settings: &CaptureSettings) -> Result<Self::Stream, CaptureError>;
}
