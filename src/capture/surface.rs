//! Preview surface - the display binding for a capture session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::types::Frame;

/// The display binding for a live camera stream.
///
/// A `PreviewSurface` plays the role the video element plays in a browser
/// client: the stream publishes decoded frames into it, a UI (or test) reads
/// the current frame out of it, and the still-frame extraction copies from
/// it. The owning view holds the `Arc`; the capture session and the stream
/// hold only weak references, so tearing down the view is observable to both.
#[derive(Debug, Default)]
pub struct PreviewSurface {
    /// Most recent decoded frame
    latest: Mutex<Option<Frame>>,
    /// Total frames presented since the last clear
    frames_seen: AtomicU64,
}

impl PreviewSurface {
    /// Create a new, empty surface.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish a decoded frame. Called from the stream's capture thread.
    pub fn present(&self, frame: Frame) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame);
            self.frames_seen.fetch_add(1, Ordering::Release);
        }
    }

    /// Whether the surface has decoded at least one frame.
    ///
    /// This is the readiness condition for still-frame extraction
    /// (the `readyState >= 2` analog).
    pub fn is_ready(&self) -> bool {
        self.frames_seen.load(Ordering::Acquire) >= 1
    }

    /// Get a copy of the current frame, if any.
    pub fn current_frame(&self) -> Option<Frame> {
        self.latest.lock().ok()?.clone()
    }

    /// Drop the current frame and reset readiness. Called on detach.
    pub fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
        self.frames_seen.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::FrameFormat;
    use std::time::Instant;

    fn test_frame() -> Frame {
        Frame {
            data: vec![1, 2, 3],
            width: 1,
            height: 1,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_new_surface_is_not_ready() {
        let surface = PreviewSurface::new();
        assert!(!surface.is_ready());
        assert!(surface.current_frame().is_none());
    }

    #[test]
    fn test_present_makes_surface_ready() {
        let surface = PreviewSurface::new();
        surface.present(test_frame());
        assert!(surface.is_ready());
        assert!(surface.current_frame().is_some());
    }

    #[test]
    fn test_current_frame_returns_latest() {
        let surface = PreviewSurface::new();
        surface.present(test_frame());
        let mut second = test_frame();
        second.data = vec![9, 9, 9];
        surface.present(second);
        assert_eq!(surface.current_frame().unwrap().data, vec![9, 9, 9]);
    }

    #[test]
    fn test_clear_resets_readiness() {
        let surface = PreviewSurface::new();
        surface.present(test_frame());
        surface.clear();
        assert!(!surface.is_ready());
        assert!(surface.current_frame().is_none());
    }
}
