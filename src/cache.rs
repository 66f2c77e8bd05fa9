//! Cache directory resolution for transient screenshot artifacts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Where screenshot artifacts are staged before upload.
///
/// The persistent variant follows the OS cache convention and is left in
/// place between runs; the ephemeral variant is a fallback temporary
/// directory that is removed when the value is dropped.
#[derive(Debug)]
pub enum CacheDir {
    Persistent(PathBuf),
    Ephemeral(TempDir),
}

impl CacheDir {
    pub fn path(&self) -> &Path {
        match self {
            CacheDir::Persistent(path) => path,
            CacheDir::Ephemeral(dir) => dir.path(),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CacheDir::Ephemeral(_))
    }
}

/// Resolve a writable cache directory for `namespace`.
///
/// Tries the OS cache convention first and falls back to a process
/// temporary directory when that fails, so callers always get a usable
/// path. On Unix, an elevated process roots the cache under the invoking
/// user's home and hands ownership of a freshly created directory back
/// to that user.
pub fn resolve(namespace: &str) -> io::Result<CacheDir> {
    match convention_dir(namespace) {
        Ok(path) => {
            log::debug!("Using cache directory {}", path.display());
            Ok(CacheDir::Persistent(path))
        }
        Err(err) => {
            log::warn!("Cache directory unavailable ({err}); falling back to a temporary directory");
            Ok(CacheDir::Ephemeral(TempDir::new()?))
        }
    }
}

fn convention_dir(namespace: &str) -> io::Result<PathBuf> {
    let root = cache_root()?;
    namespace_dir(&root, namespace)
}

/// Create (if needed) and return `<root>/<namespace>`.
fn namespace_dir(root: &Path, namespace: &str) -> io::Result<PathBuf> {
    let dir = root.join(namespace);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        restore_invoking_user_ownership(&dir);
    }
    Ok(dir)
}

#[cfg(unix)]
fn cache_root() -> io::Result<PathBuf> {
    // Under sudo, dirs::cache_dir() points at root's home; artifacts
    // written there are unreadable for the user who triggered the run.
    if let Some(user) = crate::elevation::invoking_user() {
        return Ok(crate::elevation::user_home(&user).join(".cache"));
    }
    dirs::cache_dir()
        .ok_or_else(|| io::Error::other("no cache directory convention for this platform"))
}

#[cfg(not(unix))]
fn cache_root() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| io::Error::other("no cache directory convention for this platform"))
}

/// Hand a directory created while elevated back to the invoking user,
/// so they can read artifacts the elevated process writes into it.
#[cfg(unix)]
fn restore_invoking_user_ownership(dir: &Path) {
    use nix::unistd::{User, chown};

    let Some(name) = crate::elevation::invoking_user() else {
        return;
    };
    match User::from_name(&name) {
        Ok(Some(user)) => {
            if let Err(err) = chown(dir, Some(user.uid), Some(user.gid)) {
                log::warn!("Failed to chown {} to {}: {}", dir.display(), name, err);
            }
        }
        Ok(None) => log::warn!(
            "SUDO_USER '{}' not found; leaving {} owned by root",
            name,
            dir.display()
        ),
        Err(err) => log::warn!("Failed to look up SUDO_USER '{name}': {err}"),
    }
}
