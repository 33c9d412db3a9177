//! attendant library crate.
//!
//! This module exposes the internal components for integration testing.

pub mod api;
pub mod capture;
pub mod cli;
pub mod config;
pub mod session_store;
