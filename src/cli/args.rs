//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Webcam attendance client for a face-recognition backend
#[derive(Parser, Debug)]
#[command(name = "attendant")]
#[command(version, about = "Capture webcam stills and submit them for attendance", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Camera device index (from list-cameras), overrides the config file
    #[arg(long)]
    pub camera: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in to the attendance backend
    Login {
        /// Account username
        username: String,
        /// Account password
        password: String,
    },
    /// Capture a still frame and submit it as attendance (student)
    Attend,
    /// Capture a sample photo and enroll a student (teacher)
    Enroll {
        /// Student id to enroll
        student_id: String,
    },
    /// Room watermark management (teacher)
    Watermark {
        #[command(subcommand)]
        action: WatermarkAction,
    },
    /// Delete all stored face encodings (teacher)
    ClearEncodings {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Clear the local login session
    Logout,
    /// Show the current login session and config locations
    Status,
    /// List available cameras
    ListCameras,
}

#[derive(Subcommand, Debug)]
pub enum WatermarkAction {
    /// Capture the watermark image from the camera
    Capture,
    /// Upload a watermark image from a file instead
    Upload {
        /// Path to an image file
        file: PathBuf,
    },
    /// Confirm the pending watermark as the active one
    Confirm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_login_subcommand() {
        let args = Args::parse_from(["attendant", "login", "student1", "123456"]);
        match args.command {
            Command::Login { username, password } => {
                assert_eq!(username, "student1");
                assert_eq!(password, "123456");
            }
            _ => panic!("Expected Login subcommand"),
        }
        assert!(args.config.is_none());
        assert!(args.camera.is_none());
    }

    #[test]
    fn test_args_attend_subcommand() {
        let args = Args::parse_from(["attendant", "attend"]);
        assert!(matches!(args.command, Command::Attend));
    }

    #[test]
    fn test_args_enroll_subcommand() {
        let args = Args::parse_from(["attendant", "enroll", "363636"]);
        match args.command {
            Command::Enroll { student_id } => assert_eq!(student_id, "363636"),
            _ => panic!("Expected Enroll subcommand"),
        }
    }

    #[test]
    fn test_args_watermark_capture() {
        let args = Args::parse_from(["attendant", "watermark", "capture"]);
        match args.command {
            Command::Watermark {
                action: WatermarkAction::Capture,
            } => (),
            _ => panic!("Expected Watermark Capture subcommand"),
        }
    }

    #[test]
    fn test_args_watermark_upload() {
        let args = Args::parse_from(["attendant", "watermark", "upload", "/tmp/room.jpg"]);
        match args.command {
            Command::Watermark {
                action: WatermarkAction::Upload { file },
            } => assert_eq!(file, PathBuf::from("/tmp/room.jpg")),
            _ => panic!("Expected Watermark Upload subcommand"),
        }
    }

    #[test]
    fn test_args_watermark_confirm() {
        let args = Args::parse_from(["attendant", "watermark", "confirm"]);
        match args.command {
            Command::Watermark {
                action: WatermarkAction::Confirm,
            } => (),
            _ => panic!("Expected Watermark Confirm subcommand"),
        }
    }

    #[test]
    fn test_args_clear_encodings_requires_explicit_yes() {
        let args = Args::parse_from(["attendant", "clear-encodings"]);
        match args.command {
            Command::ClearEncodings { yes } => assert!(!yes),
            _ => panic!("Expected ClearEncodings subcommand"),
        }

        let args = Args::parse_from(["attendant", "clear-encodings", "--yes"]);
        match args.command {
            Command::ClearEncodings { yes } => assert!(yes),
            _ => panic!("Expected ClearEncodings subcommand"),
        }
    }

    #[test]
    fn test_args_logout_and_status() {
        assert!(matches!(
            Args::parse_from(["attendant", "logout"]).command,
            Command::Logout
        ));
        assert!(matches!(
            Args::parse_from(["attendant", "status"]).command,
            Command::Status
        ));
    }

    #[test]
    fn test_args_list_cameras_subcommand() {
        let args = Args::parse_from(["attendant", "list-cameras"]);
        assert!(matches!(args.command, Command::ListCameras));
    }

    #[test]
    fn test_args_global_options() {
        let args = Args::parse_from([
            "attendant",
            "--config",
            "/tmp/config.toml",
            "--camera",
            "1",
            "attend",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));
        assert_eq!(args.camera, Some(1));
    }
}
