//! ApiClient - handles communication with the attendance backend.

use std::time::Duration;

use reqwest::multipart;
use serde::Deserialize;

/// The environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "ATTENDANT_API_URL";

/// Default base URL for the attendance backend.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status/message envelope returned by every backend endpoint.
///
/// The backend signals success with `status` of `"ok"` or `"success"`;
/// anything else is a failure described by `msg` (or by the status itself
/// when `msg` is absent, e.g. `"no_face"`).
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    /// Outcome marker: "ok", "success", "fail", "error", "no_face", ...
    pub status: String,
    /// Human-readable message, when the backend provides one.
    #[serde(default)]
    pub msg: Option<String>,
    /// Bearer token (login only).
    #[serde(default)]
    pub token: Option<String>,
    /// Logged-in username (login only).
    #[serde(default)]
    pub username: Option<String>,
    /// Account role, "teacher" or "student" (login only).
    #[serde(default)]
    pub role: Option<String>,
    /// Base64-encoded JPEG preview (watermark generation only).
    #[serde(default)]
    pub watermark: Option<String>,
}

impl ApiEnvelope {
    /// Whether the backend reported success.
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "success")
    }

    /// The message to show the user: `msg` when present, else the raw status.
    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or(&self.status)
    }
}

/// Errors that can occur talking to the attendance backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Server { status: u16, body: String },
}

/// Client for the attendance backend API.
///
/// All submission endpoints take multipart form data and answer with an
/// [`ApiEnvelope`]. When a bearer token is set it is attached to every
/// request, mirroring the login session.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            token: None,
            http_client,
        })
    }

    /// Attach a bearer token to all subsequent requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the bearer token, if set.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in with username and password.
    ///
    /// On success the envelope carries `token`, `username`, and `role`.
    pub async fn login(&self, username: &str, password: &str) -> Result<ApiEnvelope, ApiError> {
        let form = multipart::Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());
        self.post_form("/api/login", form).await
    }

    /// Submit an attendance still frame for the given user.
    pub async fn attendance(&self, username: &str, face: Vec<u8>) -> Result<ApiEnvelope, ApiError> {
        let form = multipart::Form::new()
            .text("username", username.to_string())
            .part("file", jpeg_part(face, "face.jpg")?);
        self.post_form("/api/attendance", form).await
    }

    /// Enroll a student with a sample photo (teacher only).
    pub async fn enroll(&self, student_id: &str, photo: Vec<u8>) -> Result<ApiEnvelope, ApiError> {
        let form = multipart::Form::new()
            .text("username", student_id.to_string())
            .part("file", jpeg_part(photo, "enroll.jpg")?);
        self.post_form("/api/enroll", form).await
    }

    /// Upload a room watermark image (teacher only).
    pub async fn upload_watermark(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<ApiEnvelope, ApiError> {
        let form = multipart::Form::new().part("file", jpeg_part(image, filename)?);
        self.post_form("/api/upload_watermark", form).await
    }

    /// Ask the backend to crop a watermark region out of the image.
    ///
    /// On success the envelope carries `watermark`: a base64 JPEG preview
    /// of the cropped region.
    pub async fn generate_watermark(&self, image: Vec<u8>) -> Result<ApiEnvelope, ApiError> {
        let form = multipart::Form::new().part("file", jpeg_part(image, "watermark.jpg")?);
        self.post_form("/api/teacher_generate_watermark", form)
            .await
    }

    /// Confirm the pending watermark as the active one (teacher only).
    pub async fn set_watermark(&self) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}/api/set_watermark", self.base_url);
        let response = self.authorized(self.http_client.post(&url)).send().await?;
        Self::parse_envelope(response).await
    }

    /// Delete all stored face encodings (teacher only).
    pub async fn clear_encodings(&self) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}/api/clear_encodings", self.base_url);
        let response = self.authorized(self.http_client.get(&url)).send().await?;
        Self::parse_envelope(response).await
    }

    /// POST a multipart form and parse the envelope.
    async fn post_form(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {}", url);

        let response = self
            .authorized(self.http_client.post(&url))
            .multipart(form)
            .send()
            .await?;

        Self::parse_envelope(response).await
    }

    /// Attach the bearer token, if one is set.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn parse_envelope(response: reqwest::Response) -> Result<ApiEnvelope, ApiError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("API request failed with status {}: {}", status, body);
            return Err(ApiError::Server { status, body });
        }

        let envelope: ApiEnvelope = response.json().await?;
        Ok(envelope)
    }
}

/// Build a JPEG multipart file part.
fn jpeg_part(bytes: Vec<u8>, filename: &str) -> Result<multipart::Part, ApiError> {
    let part = multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("image/jpeg")
        .map_err(ApiError::Http)?;
    Ok(part)
}
