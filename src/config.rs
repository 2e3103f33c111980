use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub struct Config {
    git_path: String,
    keep_scratch_on_failure: bool,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Deserialize, Serialize, Default)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_scratch_on_failure: Option<bool>,
}

impl Config {
    /// Access the global configuration. Lazily initializes if not already initialized.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(build_config)
    }

    /// Returns the command to invoke git.
    pub fn git_cmd(&self) -> &str {
        &self.git_path
    }

    /// Returns true when a failed run should leave its scratch directory
    /// behind for diagnosis.
    pub fn keep_scratch_on_failure(&self) -> bool {
        self.keep_scratch_on_failure
    }
}

fn build_config() -> Config {
    let file_cfg = load_file_config();

    let git_path = resolve_git_path(&file_cfg);

    let keep_scratch_on_failure = file_cfg
        .as_ref()
        .and_then(|c| c.keep_scratch_on_failure)
        .unwrap_or(true);

    Config {
        git_path,
        keep_scratch_on_failure,
    }
}

fn resolve_git_path(file_cfg: &Option<FileConfig>) -> String {
    // 1) From config file
    if let Some(cfg) = file_cfg
        && let Some(path) = cfg.git_path.as_ref()
    {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            let p = Path::new(trimmed);
            if is_executable(p) {
                return trimmed.to_string();
            }
            eprintln!(
                "Warning: configured git_path '{}' is not executable, falling back to PATH lookup",
                trimmed
            );
        }
    }

    // 2) Probe common locations across platforms
    let candidates: &[&str] = &[
        // macOS Homebrew (ARM and Intel)
        "/opt/homebrew/bin/git",
        "/usr/local/bin/git",
        // Common Unix paths
        "/usr/bin/git",
        "/bin/git",
        // Windows Git for Windows
        r"C:\Program Files\Git\bin\git.exe",
        r"C:\Program Files (x86)\Git\bin\git.exe",
    ];

    if let Some(found) = candidates.iter().map(Path::new).find(|p| is_executable(p)) {
        return found.to_string_lossy().to_string();
    }

    // 3) Let the OS resolve it from PATH
    "git".to_string()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn load_file_config() -> Option<FileConfig> {
    let path = config_file_path()?;
    let data = fs::read(&path).ok()?;
    serde_json::from_slice::<FileConfig>(&data).ok()
}

fn config_file_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".git-import-file").join("config.json"))
}
