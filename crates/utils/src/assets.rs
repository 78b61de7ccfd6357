use std::path::PathBuf;

use directories::ProjectDirs;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "chatbase-unlimited";
const APPLICATION: &str = "kb-dashboard";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Directory for local data (sqlite store, uploaded files). Created on demand.
pub fn asset_dir() -> PathBuf {
    let dir = match std::env::var_os("KB_DASHBOARD_ASSET_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".kb-dashboard")),
    };

    if !dir.exists() {
        if let Err(err) = std::fs::create_dir_all(&dir) {
            tracing::warn!(path = %dir.display(), error = %err, "Failed to create asset dir");
        }
    }
    dir
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}
