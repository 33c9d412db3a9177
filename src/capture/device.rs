//! Camera enumeration.

use nokhwa::utils::ApiBackend;

use super::types::{CameraInfo, CaptureError};

/// Enumerate the cameras the OS currently exposes.
///
/// An empty list is a valid answer (no camera attached); only a failing
/// query is an error. Devices whose backend identifier isn't numeric are
/// skipped, since selection here is by index.
pub fn list_devices() -> Result<Vec<CameraInfo>, CaptureError> {
    let found =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::QueryFailed(e.to_string()))?;

    let mut devices: Vec<CameraInfo> = found
        .into_iter()
        .filter_map(|d| {
            let index = d.index().as_index().ok()?;
            Some(CameraInfo {
                index,
                name: d.human_name(),
                description: d.description().to_string(),
            })
        })
        .collect();
    devices.sort_by_key(|d| d.index);

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_reports_query_failure_not_panic() {
        // With or without a camera attached this must produce either a
        // (possibly empty) list or a QueryFailed, never a panic.
        match list_devices() {
            Ok(_) => {}
            Err(CaptureError::QueryFailed(msg)) => assert!(!msg.is_empty()),
            Err(other) => panic!("unexpected enumeration error: {:?}", other),
        }
    }
}
