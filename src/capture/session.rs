//! Capture session lifecycle management.
//!
//! A [`CaptureSession`] owns acquisition, preview binding, still-frame
//! extraction, and teardown of one camera stream. Lifecycle:
//!
//! Idle -> Starting -> Active -> (Capturing -> Active)* -> Stopped
//!
//! Start while Active forces an implicit stop first; the old stream is fully
//! released before the new one is acquired, so at most one stream handle is
//! ever open.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

use super::stream::{CameraStream, StreamSource};
use super::surface::PreviewSurface;
use super::types::{CaptureError, CaptureSettings, Frame, StillFrame};

/// JPEG quality for extracted still frames (0-100).
pub const STILL_JPEG_QUALITY: u8 = 90;

/// Manages one camera capture session.
///
/// Generic over the stream source so the lifecycle logic is testable
/// without hardware; production code uses
/// [`HardwareSource`](super::HardwareSource).
pub struct CaptureSession<S: StreamSource> {
    source: S,
    settings: CaptureSettings,
    /// The bound preview surface. Weak: the owning view may drop it at any
    /// time, including between a start request and the stream grant.
    surface: Weak<PreviewSurface>,
    /// The active stream, if any. Exclusively owned.
    stream: Option<S::Stream>,
    /// True while a still frame is being extracted.
    busy: AtomicBool,
    /// User-facing error message; cleared on successful (re)start.
    error: Option<String>,
}

impl<S: StreamSource> CaptureSession<S> {
    /// Create an idle session. No camera access happens until [`start`](Self::start).
    pub fn new(source: S, settings: CaptureSettings) -> Self {
        Self {
            source,
            settings,
            surface: Weak::new(),
            stream: None,
            busy: AtomicBool::new(false),
            error: None,
        }
    }

    /// Bind the session to a preview surface.
    ///
    /// The session holds only a weak reference; dropping the surface is how
    /// the owning view signals teardown.
    pub fn bind(&mut self, surface: &Arc<PreviewSurface>) {
        self.surface = Arc::downgrade(surface);
    }

    /// Start a capture session, replacing any active one.
    ///
    /// Any existing stream is fully released before the new acquisition
    /// begins. If the preview surface was dropped while waiting for the
    /// grant, the newly granted stream is released immediately rather than
    /// attached. On denial or hardware failure the session records a
    /// user-facing error and stays idle with no stream attached.
    pub fn start(&mut self) {
        // Release the previous stream first to avoid a double camera open.
        self.stop();

        match self.source.acquire(&self.settings) {
            Ok(mut stream) => {
                let Some(surface) = self.surface.upgrade() else {
                    // The view was torn down while we waited for the grant;
                    // release the stream immediately instead of attaching it.
                    log::debug!("preview surface gone after grant; releasing stream");
                    stream.stop();
                    return;
                };
                stream.attach(Arc::downgrade(&surface));
                self.stream = Some(stream);
                log::info!("capture session started");
            }
            Err(e) => {
                log::warn!("camera start failed: {}", e);
                self.error = Some(match e {
                    CaptureError::PermissionDenied => {
                        "Could not start the camera. Check camera permissions!".to_string()
                    }
                    other => format!("Could not start the camera: {}", other),
                });
            }
        }
    }

    /// Stop the session. Idempotent; safe when no session is active.
    ///
    /// Releases the stream if present, detaches from the preview surface,
    /// and clears transient error/busy state.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("capture session stopped");
        }

        // Detach from the surface so it no longer shows a stale frame.
        if let Some(surface) = self.surface.upgrade() {
            surface.clear();
        }

        self.error = None;
        self.busy.store(false, Ordering::SeqCst);
    }

    /// Extract a still frame from the current session.
    ///
    /// Fails fast (returns `None`) when a capture is already in progress or
    /// when no ready stream exists (readiness requires the preview surface
    /// to have decoded at least one frame). On encoding failure a message is
    /// recorded and `None` returned; the session stays active. The busy flag
    /// is held for the duration and always cleared afterward.
    pub fn capture(&mut self) -> Option<StillFrame> {
        // A second extraction never starts while one is in flight.
        if self.busy.swap(true, Ordering::SeqCst) {
            return None;
        }

        let result = self.extract_still();
        self.busy.store(false, Ordering::SeqCst);

        match result {
            Ok(still) => still,
            Err(e) => {
                log::warn!("still frame extraction failed: {}", e);
                self.error = Some(format!("Could not create the image: {}", e));
                None
            }
        }
    }

    /// Copy the current surface frame into an owned JPEG buffer.
    ///
    /// `Ok(None)` means not ready (silent no-op); `Err` means the frame was
    /// there but encoding failed.
    fn extract_still(&self) -> Result<Option<StillFrame>, CaptureError> {
        let Some(stream) = self.stream.as_ref() else {
            return Ok(None);
        };
        if !stream.is_live() {
            return Ok(None);
        }
        let Some(surface) = self.surface.upgrade() else {
            return Ok(None);
        };
        if !surface.is_ready() {
            return Ok(None);
        }
        let Some(frame) = surface.current_frame() else {
            return Ok(None);
        };

        let still = encode_jpeg(&frame)?;
        Ok(Some(still))
    }

    /// Whether a stream is currently attached and live.
    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_live())
    }

    /// Whether a still-frame extraction is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The current user-facing error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<S: StreamSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encode an RGB frame as JPEG at quality [`STILL_JPEG_QUALITY`].
fn encode_jpeg(frame: &Frame) -> Result<StillFrame, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * frame.bytes_per_pixel();
    if frame.data.len() != expected {
        return Err(CaptureError::EncodeFailed(format!(
            "frame buffer size mismatch: got {} bytes, expected {}",
            frame.data.len(),
            expected
        )));
    }

    let img: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
            || CaptureError::EncodeFailed("frame dimensions do not match buffer".to_string()),
        )?;

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, STILL_JPEG_QUALITY)
        .encode_image(&img)
        .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;

    Ok(StillFrame {
        data: jpeg,
        width: frame.width,
        height: frame.height,
    })
}
