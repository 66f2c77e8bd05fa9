//! Sudo-awareness helpers for Unix desktop integration.
//!
//! An elevated process does not inherit the invoking user's graphical
//! session; these helpers identify that user and the environment needed
//! to reach their display and home directory.

use std::env;
use std::path::PathBuf;

/// The desktop user behind `sudo`, when the process runs elevated.
///
/// Returns `None` for a regular process, and for a root session that was
/// not started through sudo (there is no desktop user to hand back to).
pub fn invoking_user() -> Option<String> {
    if !nix::unistd::Uid::effective().is_root() {
        return None;
    }
    env::var("SUDO_USER").ok().filter(|user| user != "root")
}

/// Home directory of the invoking user.
pub fn user_home(user: &str) -> PathBuf {
    PathBuf::from("/home").join(user)
}

/// `DISPLAY` and `XAUTHORITY` values for reaching the invoking user's
/// session from an elevated process.
pub fn session_env(user: &str) -> (String, String) {
    let display = env::var("DISPLAY").unwrap_or_else(|_| ":0".into());
    let xauthority = env::var("XAUTHORITY")
        .unwrap_or_else(|_| format!("{}/.Xauthority", user_home(user).display()));
    (display, xauthority)
}
