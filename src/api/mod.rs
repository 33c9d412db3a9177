//! Attendance backend API integration.
//!
//! The backend is an opaque HTTP collaborator: login, attendance
//! submission, student enrollment, and watermark management, all as
//! multipart form posts answered with a status/message envelope.

mod client;

pub use client::{ApiClient, ApiEnvelope, ApiError, API_URL_ENV, DEFAULT_API_BASE_URL};
