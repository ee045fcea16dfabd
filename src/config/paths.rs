use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "hive", "hive").map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Get the data directory path (host keys, event records)
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "hive", "hive").map(|proj_dirs| proj_dirs.data_dir().to_path_buf())
}

/// Get the path to the main config file
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("hive.toml"))
}

/// Default directory for the persistent host key pair
pub fn default_key_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("keys"))
}

/// Default path for the JSON-lines event record file
pub fn default_events_file() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("events.jsonl"))
}

/// Get the log directory path
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("logs"))
}

/// Ensure the config directory exists with proper permissions
pub fn ensure_config_dir() -> std::io::Result<PathBuf> {
    ensure_dir(config_dir())
}

/// Ensure the log directory exists, creating it if needed
pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    ensure_dir(log_dir())
}

fn ensure_dir(dir: Option<PathBuf>) -> std::io::Result<PathBuf> {
    let dir = dir.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine directory path",
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        // Restrictive permissions on Unix (owner-only access)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    Ok(dir)
}
