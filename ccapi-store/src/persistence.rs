//! On-disk JSON for settings and token files.
//!
//! Everything lives under one config directory. Files are written through a
//! temp file and a rename, owner-only on Unix.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/ccapi`
/// - Linux: `~/.config/ccapi`
/// - Windows: `%APPDATA%\ccapi`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("ccapi"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("ccapi"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Returns the default token bundle file path.
pub fn default_tokens_path() -> PathBuf {
    default_config_dir().join("tokens.json")
}

// ============================================================================
// Permissions
// ============================================================================

const FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;

/// Distinguishes temp files of concurrent writers in one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Restricts `path` to `mode` (Unix only).
#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = format_args!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates the directory holding `path`, owner-only.
///
/// Pre-existing ancestors are left alone.
async fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
        debug!(path = %parent.display(), "Creating config directory");
        tokio::fs::create_dir_all(parent).await?;
        restrict(parent, DIR_MODE).await?;
    }
    Ok(())
}

/// Replaces `path` with `contents`, readable by the owner only.
///
/// The data goes to a sibling temp file first and is renamed into place, so
/// readers in other processes see either the old or the new file.
pub async fn write_secure(path: &Path, contents: &str) -> Result<(), StoreError> {
    ensure_parent_dir(path).await?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    temp_name.push(format!(".{}-{seq}.tmp", std::process::id()));
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, contents).await?;
    restrict(&temp_path, FILE_MODE).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = contents.len(), "File written");
    Ok(())
}

/// Serializes `data` as pretty JSON into an owner-only file.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)?;
    write_secure(path, &json).await
}

/// Reads and deserializes a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Like [`load_json`], but a missing or unreadable file yields `T::default()`.
///
/// Only failures other than "not found" are logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load_json(path).await.unwrap_or_else(|e: StoreError| {
        if !e.is_not_found() {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable file, using defaults");
        }
        T::default()
    })
}

/// Removes a file; a missing file is not an error.
pub async fn remove_file(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "File removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
