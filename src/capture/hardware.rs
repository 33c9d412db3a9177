//! nokhwa-backed stream source.
//!
//! nokhwa's `Camera` is not `Send`, so each granted stream owns a worker
//! thread that opens the camera, reports grant or denial over a one-shot
//! channel, and then publishes decoded frames to whatever preview surface
//! is attached until told to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as SensorFormat, RequestedFormat, RequestedFormatType,
};
use nokhwa::{Buffer, Camera, NokhwaError};

use super::device::list_devices;
use super::stream::{CameraStream, StreamSource};
use super::surface::PreviewSurface;
use super::types::{CaptureError, CaptureSettings, Frame, FrameFormat, Resolution};

/// Stream source backed by the system camera via nokhwa.
#[derive(Debug, Default)]
pub struct HardwareSource;

impl StreamSource for HardwareSource {
    type Stream = HardwareStream;

    fn acquire(&self, settings: &CaptureSettings) -> Result<HardwareStream, CaptureError> {
        HardwareStream::open(settings.clone())
    }
}

/// What the worker reports back once the camera responds.
type Grant = Result<(Resolution, u32), CaptureError>;

/// A granted hardware camera stream.
///
/// `open()` blocks until the worker thread reports the grant; after that the
/// worker runs until [`stop`](CameraStream::stop) raises the stop flag. The
/// sink slot starts empty so a stream can be granted first and attached to a
/// surface second.
pub struct HardwareStream {
    sink: Arc<Mutex<Weak<PreviewSurface>>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    granted_resolution: Resolution,
    granted_fps: u32,
}

impl HardwareStream {
    fn open(settings: CaptureSettings) -> Result<Self, CaptureError> {
        if !list_devices()?
            .iter()
            .any(|d| d.index == settings.device_index)
        {
            return Err(CaptureError::DeviceNotFound(settings.device_index));
        }

        let sink: Arc<Mutex<Weak<PreviewSurface>>> = Arc::new(Mutex::new(Weak::new()));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (grant_tx, grant_rx) = mpsc::channel::<Grant>();

        let worker = {
            let sink = Arc::clone(&sink);
            let stop_flag = Arc::clone(&stop_flag);
            thread::spawn(move || stream_worker(settings, sink, stop_flag, grant_tx))
        };

        match grant_rx.recv() {
            Ok(Ok((resolution, fps))) => Ok(Self {
                sink,
                stop_flag,
                worker: Some(worker),
                granted_resolution: resolution,
                granted_fps: fps,
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                // Worker died without reporting; nothing was left open.
                let _ = worker.join();
                Err(CaptureError::StreamFailed(
                    "camera worker exited before granting a stream".to_string(),
                ))
            }
        }
    }

    /// Resolution the camera actually granted; may differ from the request.
    pub fn granted_resolution(&self) -> Resolution {
        self.granted_resolution
    }

    /// Frame rate the camera actually granted.
    pub fn granted_fps(&self) -> u32 {
        self.granted_fps
    }
}

impl CameraStream for HardwareStream {
    fn attach(&mut self, sink: Weak<PreviewSurface>) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = sink;
        }
    }

    fn is_live(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            // Blocks for at most one frame interval while the worker
            // finishes its current grab and releases the camera.
            let _ = worker.join();
        }
    }
}

impl Drop for HardwareStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HardwareStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareStream")
            .field("granted_resolution", &self.granted_resolution)
            .field("granted_fps", &self.granted_fps)
            .field("is_live", &self.is_live())
            .finish_non_exhaustive()
    }
}

/// Worker body: open the camera, report the grant, pump frames until stopped.
fn stream_worker(
    settings: CaptureSettings,
    sink: Arc<Mutex<Weak<PreviewSurface>>>,
    stop_flag: Arc<AtomicBool>,
    grant_tx: Sender<Grant>,
) {
    let mut camera = match open_camera(&settings) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = grant_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = grant_tx.send(Err(CaptureError::StreamFailed(e.to_string())));
        return;
    }

    let granted = camera.resolution();
    let _ = grant_tx.send(Ok((
        Resolution {
            width: granted.width(),
            height: granted.height(),
        },
        camera.frame_rate(),
    )));

    // frame() blocks until the sensor delivers, so the stop flag is checked
    // once per frame interval.
    while !stop_flag.load(Ordering::SeqCst) {
        let Ok(buffer) = camera.frame() else {
            // A failed grab returns immediately; back off so a wedged
            // sensor doesn't spin this thread.
            thread::sleep(Duration::from_millis(5));
            continue;
        };
        // Undecodable frames are dropped; the next one usually isn't.
        let Some(frame) = decode_rgb(&buffer) else {
            continue;
        };
        if let Some(surface) = sink.lock().ok().and_then(|slot| slot.upgrade()) {
            surface.present(frame);
        }
    }

    let _ = camera.stop_stream();
}

/// Open the camera, walking down a list of format requests.
///
/// NV12 first (native on macOS), then MJPEG (the widest USB support), then
/// whatever the device offers at its highest resolution. Only the last
/// failure is reported.
fn open_camera(settings: &CaptureSettings) -> Result<Camera, CaptureError> {
    let index = CameraIndex::Index(settings.device_index);
    let wanted = nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);

    let requests = [
        RequestedFormatType::Closest(CameraFormat::new(wanted, SensorFormat::NV12, settings.fps)),
        RequestedFormatType::Closest(CameraFormat::new(wanted, SensorFormat::MJPEG, settings.fps)),
        RequestedFormatType::AbsoluteHighestResolution,
    ];

    let mut last_error = None;
    for request in requests {
        match Camera::new(index.clone(), RequestedFormat::new::<RgbFormat>(request)) {
            Ok(camera) => return Ok(camera),
            Err(e) => last_error = Some(e),
        }
    }

    // requests is non-empty, so last_error is set by the time we get here
    let e = last_error.expect("at least one format request was attempted");
    if is_denial(&e) {
        Err(CaptureError::PermissionDenied)
    } else {
        Err(CaptureError::OpenFailed(e.to_string()))
    }
}

/// nokhwa surfaces OS permission failures as backend-specific strings, so
/// denial detection is a keyword check over the message.
fn is_denial(error: &NokhwaError) -> bool {
    let message = error.to_string().to_lowercase();
    ["permission", "denied", "authorization", "access"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Decode a raw sensor buffer into an RGB frame, whatever its wire format.
fn decode_rgb(buffer: &Buffer) -> Option<Frame> {
    let pixels = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();
    Some(Frame {
        data: pixels.into_raw(),
        width: resolution.width(),
        height: resolution.height(),
        format: FrameFormat::Rgb,
        timestamp: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_unknown_device_fails() {
        let settings = CaptureSettings {
            device_index: 999,
            ..CaptureSettings::default()
        };
        match HardwareSource.acquire(&settings) {
            Err(CaptureError::DeviceNotFound(index)) => assert_eq!(index, 999),
            // Machines without a camera stack fail at enumeration instead
            Err(CaptureError::QueryFailed(_)) | Err(CaptureError::NoDevices) => {}
            other => panic!("expected a device lookup failure, got {:?}", other),
        }
    }
}
