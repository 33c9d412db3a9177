//! Subcommand handlers.
//!
//! Network commands build a tokio runtime and block on the async API
//! client; capture commands drive a [`CaptureSession`] against the real
//! hardware source.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::runtime::Runtime;

use super::args::{Args, Command, WatermarkAction};
use crate::api::{ApiClient, ApiEnvelope, ApiError};
use crate::capture::{self, CaptureSession, CaptureSettings, HardwareSource, PreviewSurface};
use crate::config::{self, Config};
use crate::session_store::{
    SessionStore, ROLE_KEY, TEACHER_ROLE, TOKEN_KEY, USERNAME_KEY,
};

/// How long to wait for the first decoded preview frame before giving up.
const READY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// File the watermark preview is written to for inspection.
const WATERMARK_PREVIEW_FILE: &str = "watermark_preview.jpg";

/// Dispatch a parsed command line.
pub fn run(args: Args) -> Result<(), String> {
    let config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    let store = SessionStore::with_default_dir();

    match args.command {
        Command::Login { username, password } => login(&config, &store, &username, &password),
        Command::Attend => attend(&config, &store, args.camera),
        Command::Enroll { student_id } => enroll(&config, &store, args.camera, &student_id),
        Command::Watermark { action } => match action {
            WatermarkAction::Capture => watermark_capture(&config, &store, args.camera),
            WatermarkAction::Upload { file } => watermark_upload(&config, &store, &file),
            WatermarkAction::Confirm => watermark_confirm(&config, &store),
        },
        Command::ClearEncodings { yes } => clear_encodings(&config, &store, yes),
        Command::Logout => logout(&store),
        Command::Status => status(&config, &store, args.config.as_deref()),
        Command::ListCameras => list_cameras(),
    }
}

/// Log in and persist the session on success.
fn login(
    config: &Config,
    store: &SessionStore,
    username: &str,
    password: &str,
) -> Result<(), String> {
    let client = api_client(config, store)?;
    let rt = runtime()?;

    let envelope = rt
        .block_on(client.login(username, password))
        .map_err(|e| connection_message(client.base_url(), e))?;

    if !envelope.is_ok() {
        return Err(format!("Login failed: {}", envelope.message()));
    }

    let name = persist_session(store, &envelope, username)?;
    println!("Logged in as {}.", name);
    Ok(())
}

/// Persist a successful login envelope, returning the logged-in username.
///
/// The role key is removed when the response omits it; otherwise a teacher
/// role from an earlier session would survive a new student login.
fn persist_session(
    store: &SessionStore,
    envelope: &ApiEnvelope,
    fallback_username: &str,
) -> Result<String, String> {
    let name = envelope
        .username
        .as_deref()
        .unwrap_or(fallback_username)
        .to_string();
    let token = envelope
        .token
        .as_deref()
        .ok_or("Login response did not include a token")?;

    store
        .save(USERNAME_KEY, &name)
        .and_then(|_| store.save(TOKEN_KEY, token))
        .and_then(|_| match envelope.role.as_deref() {
            Some(role) => store.save(ROLE_KEY, role),
            None => store.remove(ROLE_KEY),
        })
        .map_err(|e| format!("Could not save the session: {}", e))?;

    Ok(name)
}

/// Capture a still frame and submit it as attendance.
fn attend(config: &Config, store: &SessionStore, camera: Option<u32>) -> Result<(), String> {
    let username = require_login(store)?;
    let client = api_client(config, store)?;
    let rt = runtime()?;

    let still = capture_still(config, camera)?;
    println!("Submitting attendance for {}...", username);

    let envelope = rt
        .block_on(client.attendance(&username, still.into_bytes()))
        .map_err(|e| connection_message(client.base_url(), e))?;

    report(&envelope, "Attendance recorded.")
}

/// Capture a sample photo and enroll a student.
fn enroll(
    config: &Config,
    store: &SessionStore,
    camera: Option<u32>,
    student_id: &str,
) -> Result<(), String> {
    require_teacher(store)?;
    let client = api_client(config, store)?;
    let rt = runtime()?;

    let still = capture_still(config, camera)?;
    println!("Enrolling student {}...", student_id);

    let envelope = rt
        .block_on(client.enroll(student_id, still.into_bytes()))
        .map_err(|e| connection_message(client.base_url(), e))?;

    report(&envelope, "Student enrolled.")
}

/// Capture the watermark image from the camera and upload it.
fn watermark_capture(
    config: &Config,
    store: &SessionStore,
    camera: Option<u32>,
) -> Result<(), String> {
    require_teacher(store)?;
    let still = capture_still(config, camera)?;
    submit_watermark(config, store, still.into_bytes())
}

/// Upload a watermark image from disk instead of the camera.
fn watermark_upload(config: &Config, store: &SessionStore, file: &Path) -> Result<(), String> {
    require_teacher(store)?;
    let image =
        fs::read(file).map_err(|e| format!("Could not read {}: {}", file.display(), e))?;
    submit_watermark(config, store, image)
}

/// Upload the image, ask the backend for the cropped watermark region, and
/// write the preview locally so it can be inspected before confirming.
fn submit_watermark(config: &Config, store: &SessionStore, image: Vec<u8>) -> Result<(), String> {
    let client = api_client(config, store)?;
    let rt = runtime()?;

    let envelope = rt
        .block_on(client.upload_watermark(image.clone(), "watermark.jpg"))
        .map_err(|e| connection_message(client.base_url(), e))?;
    if !envelope.is_ok() {
        return Err(format!("Watermark upload failed: {}", envelope.message()));
    }

    let envelope = rt
        .block_on(client.generate_watermark(image))
        .map_err(|e| connection_message(client.base_url(), e))?;
    if !envelope.is_ok() {
        return Err(format!(
            "Watermark generation failed: {}",
            envelope.message()
        ));
    }

    let preview = envelope
        .watermark
        .as_deref()
        .ok_or("Watermark response did not include a preview")?;
    let jpeg = BASE64
        .decode(preview)
        .map_err(|e| format!("Could not decode the watermark preview: {}", e))?;

    let mut out = fs::File::create(WATERMARK_PREVIEW_FILE)
        .map_err(|e| format!("Could not write {}: {}", WATERMARK_PREVIEW_FILE, e))?;
    out.write_all(&jpeg)
        .map_err(|e| format!("Could not write {}: {}", WATERMARK_PREVIEW_FILE, e))?;

    println!("Watermark preview written to {}.", WATERMARK_PREVIEW_FILE);
    println!("Inspect it, then run 'attendant watermark confirm' to activate it.");
    Ok(())
}

/// Confirm the pending watermark as the active one.
fn watermark_confirm(config: &Config, store: &SessionStore) -> Result<(), String> {
    require_teacher(store)?;
    let client = api_client(config, store)?;
    let rt = runtime()?;

    let envelope = rt
        .block_on(client.set_watermark())
        .map_err(|e| connection_message(client.base_url(), e))?;

    report(&envelope, "Watermark activated.")
}

/// Delete all stored face encodings on the backend.
fn clear_encodings(config: &Config, store: &SessionStore, yes: bool) -> Result<(), String> {
    require_teacher(store)?;
    if !yes {
        return Err(
            "This deletes every stored face encoding. Re-run with --yes to confirm.".to_string(),
        );
    }

    let client = api_client(config, store)?;
    let rt = runtime()?;

    let envelope = rt
        .block_on(client.clear_encodings())
        .map_err(|e| connection_message(client.base_url(), e))?;

    report(&envelope, "All face encodings cleared.")
}

/// Clear the local session.
fn logout(store: &SessionStore) -> Result<(), String> {
    store
        .logout()
        .map_err(|e| format!("Could not clear the session: {}", e))?;
    println!("Logged out.");
    Ok(())
}

/// Show the current session and where config/session files live.
fn status(config: &Config, store: &SessionStore, config_path: Option<&Path>) -> Result<(), String> {
    match store.get(USERNAME_KEY) {
        Some(username) if store.is_logged_in() => {
            let role = store.get(ROLE_KEY).unwrap_or_else(|| "student".to_string());
            println!("Logged in as {} ({})", username, role);
        }
        _ => println!("Not logged in."),
    }
    println!("Server: {}", config.api_base_url());

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_path);
    if path.exists() {
        println!("Config file: {} (exists)", path.display());
    } else {
        println!("Config file: {} (not found)", path.display());
    }
    println!("Session dir: {}", store.dir().display());
    Ok(())
}

/// List available cameras and print them to stdout.
fn list_cameras() -> Result<(), String> {
    let devices = capture::list_devices().map_err(|e| e.to_string())?;

    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
        println!("On macOS, grant access in System Settings > Privacy & Security > Camera.");
    } else {
        println!("Available cameras:");
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Use --camera <index> to select a camera.");
    }
    Ok(())
}

/// Run one capture session to completion: start, wait for the first decoded
/// frame, extract a still, stop.
fn capture_still(
    config: &Config,
    camera: Option<u32>,
) -> Result<crate::capture::StillFrame, String> {
    let settings = config.capture_settings(camera).map_err(|e| e.to_string())?;
    capture_still_with(settings)
}

fn capture_still_with(settings: CaptureSettings) -> Result<crate::capture::StillFrame, String> {
    let surface = PreviewSurface::new();
    let mut session = CaptureSession::new(HardwareSource, settings);
    session.bind(&surface);

    println!("Starting camera...");
    session.start();
    if let Some(error) = session.error() {
        return Err(error.to_string());
    }

    // Extraction is a silent no-op until the first frame has been decoded,
    // so wait for readiness before asking for the still.
    let deadline = Instant::now() + READY_TIMEOUT;
    while !surface.is_ready() {
        if Instant::now() >= deadline {
            session.stop();
            return Err("Camera produced no frames. Is it in use by another app?".to_string());
        }
        thread::sleep(READY_POLL_INTERVAL);
    }

    let still = session.capture();
    let error = session.error().map(str::to_string);
    session.stop();

    match still {
        Some(still) => Ok(still),
        None => Err(error.unwrap_or_else(|| "Could not capture a frame.".to_string())),
    }
}

/// Build an API client with the stored bearer token, if any.
fn api_client(config: &Config, store: &SessionStore) -> Result<ApiClient, String> {
    let client = ApiClient::new(config.api_base_url())
        .map_err(|e| format!("Could not build the HTTP client: {}", e))?;
    Ok(match store.get(TOKEN_KEY) {
        Some(token) => client.with_token(token),
        None => client,
    })
}

fn runtime() -> Result<Runtime, String> {
    Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

/// Print the backend's answer, failing when it reported an error.
fn report(envelope: &ApiEnvelope, success: &str) -> Result<(), String> {
    if envelope.is_ok() {
        println!("{}", success);
        if let Some(msg) = envelope.msg.as_deref() {
            println!("{}", msg);
        }
        Ok(())
    } else {
        Err(match envelope.status.as_str() {
            "no_face" | "noface" => "No face detected in the frame. Try again.".to_string(),
            _ => envelope.message().to_string(),
        })
    }
}

/// Translate transport failures into one stable user-facing message.
fn connection_message(base_url: &str, error: ApiError) -> String {
    match error {
        ApiError::Http(e) if e.is_connect() || e.is_timeout() => {
            format!("Cannot reach the attendance server at {}.", base_url)
        }
        other => other.to_string(),
    }
}

/// The logged-in username, or an error telling the user to log in.
fn require_login(store: &SessionStore) -> Result<String, String> {
    if !store.is_logged_in() {
        return Err("Not logged in. Run 'attendant login <username> <password>' first.".to_string());
    }
    store
        .get(USERNAME_KEY)
        .ok_or_else(|| "Not logged in. Run 'attendant login <username> <password>' first.".to_string())
}

/// Require a logged-in teacher account.
fn require_teacher(store: &SessionStore) -> Result<(), String> {
    require_login(store)?;
    match store.get(ROLE_KEY).as_deref() {
        Some(TEACHER_ROLE) => Ok(()),
        _ => Err("This command requires a teacher account.".to_string()),
    }
}
