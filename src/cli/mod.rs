//! Command-line interface: argument definitions and subcommand handlers.

pub mod args;
pub mod commands;

pub use args::{Args, Command, WatermarkAction};
pub use commands::run;
