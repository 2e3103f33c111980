use std::fmt;

#[derive(Debug)]
pub enum ImportError {
    #[cfg(feature = "test-support")]
    GitError(git2::Error),
    /// Bad arguments: missing source file, pre-existing target, paths
    /// outside any repository, or importing a file onto itself.
    InvalidInput(String),
    /// The source or target repository has uncommitted tracked changes.
    DirtyRepository(String),
    /// History extraction produced no output.
    HistoryUnavailable(String),
    /// The retained history does not trace back to the file's genesis commit.
    BrokenHistory(String),
    /// A commit renames the file and changes its content in the same step.
    UnsupportedRename(String),
    /// The dry-run apply rejected the rewritten patch series.
    PatchConflict(String),
    /// The apply started but failed partway; the target has been rolled back.
    ApplyFailed(String),
    /// Post-apply content comparison failed for a reason other than a diff.
    VerificationError(String),
    /// Errors from invoking the git CLI that exited with a non-zero status
    GitCliError {
        code: Option<i32>,
        stderr: String,
        args: Vec<String>,
    },
    IoError(std::io::Error),
    Utf8Error(std::str::Utf8Error),
    FromUtf8Error(std::string::FromUtf8Error),
    Generic(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "test-support")]
            ImportError::GitError(e) => write!(f, "git error: {}", e),
            ImportError::InvalidInput(e) => write!(f, "invalid input: {}", e),
            ImportError::DirtyRepository(e) => write!(f, "dirty repository: {}", e),
            ImportError::HistoryUnavailable(e) => write!(f, "history unavailable: {}", e),
            ImportError::BrokenHistory(e) => write!(f, "broken history: {}", e),
            ImportError::UnsupportedRename(e) => write!(f, "unsupported rename: {}", e),
            ImportError::PatchConflict(e) => write!(f, "patch conflict: {}", e),
            ImportError::ApplyFailed(e) => write!(f, "apply failed: {}", e),
            ImportError::VerificationError(e) => write!(f, "verification error: {}", e),
            ImportError::GitCliError { code, stderr, args } => match code {
                Some(c) => write!(
                    f,
                    "git CLI ({}) failed with exit code {}: {}",
                    args.join(" "),
                    c,
                    stderr.trim_end()
                ),
                None => write!(
                    f,
                    "git CLI ({}) failed: {}",
                    args.join(" "),
                    stderr.trim_end()
                ),
            },
            ImportError::IoError(e) => write!(f, "IO error: {}", e),
            ImportError::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
            ImportError::FromUtf8Error(e) => write!(f, "from UTF-8 error: {}", e),
            ImportError::Generic(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ImportError {}

#[cfg(feature = "test-support")]
impl From<git2::Error> for ImportError {
    fn from(err: git2::Error) -> Self {
        ImportError::GitError(err)
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::IoError(err)
    }
}

impl From<std::str::Utf8Error> for ImportError {
    fn from(err: std::str::Utf8Error) -> Self {
        ImportError::Utf8Error(err)
    }
}

impl From<std::string::FromUtf8Error> for ImportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ImportError::FromUtf8Error(err)
    }
}
