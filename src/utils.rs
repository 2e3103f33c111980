static DEBUG_ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

fn is_debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        std::env::var("GIT_IMPORT_FILE_DEBUG").unwrap_or_default() == "1"
    })
}

/// Debug logging utility function
///
/// Prints debug messages with a colored prefix when the
/// `GIT_IMPORT_FILE_DEBUG` environment variable is set to "1".
pub fn debug_log(msg: &str) {
    if is_debug_enabled() {
        eprintln!("\x1b[1;33m[git-import-file]\x1b[0m {}", msg);
    }
}

#[inline]
pub fn normalize_to_posix(path: &str) -> String {
    path.replace('\\', "/")
}
