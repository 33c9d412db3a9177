//! Persisted login session flags.
//!
//! The logged-in identity (username, role, bearer token) is kept as plain
//! string key/value pairs on disk, one file per key, under the platform
//! data directory. The route guard consults this store before any
//! authenticated command runs.

use std::io;
use std::path::{Path, PathBuf};

/// Key under which the logged-in username is stored.
pub const USERNAME_KEY: &str = "username";
/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";
/// Key under which the account role is stored.
pub const ROLE_KEY: &str = "role";

/// Role value granting access to teacher commands.
pub const TEACHER_ROLE: &str = "teacher";

/// Plain string key/value store persisted on disk.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the given directory.
    /// Does not create the directory until the first `save`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Create a store in the default location:
    /// `<data_dir>/attendant/session/`.
    pub fn with_default_dir() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join("attendant")
            .join("session");
        Self::new(dir)
    }

    /// Get the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Save a value, overwriting any previous one.
    pub fn save(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.key_path(key), value)
    }

    /// Get a value, or `None` when the key was never saved.
    pub fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    /// Remove a value. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether a login session is present (username and token both saved).
    pub fn is_logged_in(&self) -> bool {
        self.get(USERNAME_KEY).is_some() && self.get(TOKEN_KEY).is_some()
    }

    /// Clear all login flags.
    pub fn logout(&self) -> io::Result<()> {
        self.remove(USERNAME_KEY)?;
        self.remove(TOKEN_KEY)?;
        self.remove(ROLE_KEY)?;
        Ok(())
    }
}
