use std::path::{Path, PathBuf};

/// Environment variable that overrides the platform data directory.
pub const HOME_ENV: &str = "BLINDFOLD_HOME";

/// Platform-specific filesystem conventions abstracted behind a common interface.
/// Each OS provides its own `NativePlatform` so call sites stay free of `#[cfg]` blocks.
pub trait Platform {
    /// Set restrictive *directory* permissions (0o700 on Unix, no-op on Windows).
    fn restrict_dir_permissions(path: &Path);

    /// Set restrictive *file* permissions (0o600 on Unix, no-op on Windows).
    fn restrict_file_permissions(path: &Path);

    /// Binary filename for this platform (`"blindfold"` / `"blindfold.exe"`).
    fn binary_name() -> &'static str;

    /// Root data directory for blindfold.
    /// Unix: `~/.blindfold`, Windows: `%APPDATA%\blindfold`.
    fn data_dir() -> PathBuf;
}

/// `BLINDFOLD_HOME` wins over the platform default when set and non-empty.
pub(crate) fn resolve_data_dir(default: PathBuf) -> PathBuf {
    match std::env::var(HOME_ENV) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
        _ => default,
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
