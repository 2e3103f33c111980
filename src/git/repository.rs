use crate::config;
use crate::error::ImportError;
use crate::utils::normalize_to_posix;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Handle to a git repository, addressed through `-C <workdir>` global
/// arguments passed to every git invocation.
#[derive(Debug, Clone)]
pub struct Repository {
    global_args: Vec<String>,
    git_dir: PathBuf,
    workdir: PathBuf,
    /// Canonical (absolute, resolved) version of workdir for reliable path
    /// comparisons. On Windows, this uses the \\?\ UNC prefix format.
    canonical_workdir: PathBuf,
}

impl Repository {
    // Util for preparing global args for execution
    pub fn global_args_for_exec(&self) -> Vec<String> {
        let mut args = self.global_args.clone();
        if !args.iter().any(|arg| arg == "--no-pager") {
            args.push("--no-pager".to_string());
        }
        args
    }

    // Returns the path to the .git folder.
    pub fn path(&self) -> &Path {
        self.git_dir.as_path()
    }

    // Get the path of the working directory for this repository.
    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    /// Get the canonical (absolute, resolved) path of the working directory
    pub fn canonical_workdir(&self) -> &Path {
        &self.canonical_workdir
    }

    /// Resolve an absolute path inside this repository to its repo-relative
    /// form, with forward slashes, as git pathspecs expect.
    pub fn rel_path(&self, abs: &Path) -> Result<String, ImportError> {
        // Canonicalize as far as the deepest existing ancestor so that the
        // prefix comparison is stable even for paths that do not exist yet.
        let resolved = resolve_against_existing_ancestors(abs);
        let rel = resolved
            .strip_prefix(&self.canonical_workdir)
            .or_else(|_| resolved.strip_prefix(&self.workdir))
            .map_err(|_| {
                ImportError::Generic(format!(
                    "path {} is not inside repository {}",
                    abs.display(),
                    self.workdir.display()
                ))
            })?;
        Ok(normalize_to_posix(&rel.to_string_lossy()))
    }

    /// Resolve HEAD to a commit id.
    pub fn head_oid(&self) -> Result<String, ImportError> {
        let mut args = self.global_args_for_exec();
        args.push("rev-parse".to_string());
        args.push("HEAD".to_string());
        let output = exec_git(&args)?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

/// Find the git repository that contains the given path by walking up the
/// directory tree. The leaf components are allowed to not exist yet (the
/// import target is created by the apply stage).
pub fn find_repository_for_file(file_path: &Path) -> Result<Repository, ImportError> {
    let start_dir = if file_path.is_dir() {
        file_path.to_path_buf()
    } else {
        file_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| file_path.to_path_buf())
    };

    let start_dir = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.clone());

    let mut current_dir = Some(start_dir.as_path());

    while let Some(dir) = current_dir {
        // .git may be a directory or, for worktrees and submodules, a file.
        if dir.join(".git").exists() {
            return find_repository_in_path(dir);
        }
        current_dir = dir.parent();
    }

    Err(ImportError::InvalidInput(format!(
        "no git repository found for path: {}",
        file_path.display()
    )))
}

pub fn find_repository_in_path(path: &Path) -> Result<Repository, ImportError> {
    let global_args = vec!["-C".to_string(), path.to_string_lossy().to_string()];

    let mut rev_parse_args = global_args.clone();
    rev_parse_args.push("rev-parse".to_string());
    rev_parse_args.push("--is-bare-repository".to_string());
    rev_parse_args.push("--git-dir".to_string());

    let rev_parse_output = exec_git(&rev_parse_args)?;
    let rev_parse_stdout = String::from_utf8(rev_parse_output.stdout)?;
    let mut lines = rev_parse_stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    match lines.next() {
        Some("false") => {}
        Some("true") => {
            return Err(ImportError::InvalidInput(format!(
                "bare repository at {}: importing requires a working tree",
                path.display()
            )));
        }
        other => {
            return Err(ImportError::Generic(format!(
                "unexpected --is-bare-repository output: {:?}",
                other
            )));
        }
    }

    let git_dir_str = lines.next().ok_or_else(|| {
        ImportError::Generic("missing --git-dir output from git rev-parse".to_string())
    })?;
    let git_dir = if Path::new(git_dir_str).is_relative() {
        path.join(git_dir_str)
    } else {
        PathBuf::from(git_dir_str)
    };

    let mut top_level_args = global_args.clone();
    top_level_args.push("rev-parse".to_string());
    top_level_args.push("--show-toplevel".to_string());
    let output = exec_git(&top_level_args)?;
    let workdir = PathBuf::from(String::from_utf8(output.stdout)?.trim());

    if !workdir.is_dir() {
        return Err(ImportError::Generic(format!(
            "work directory does not exist: {}",
            workdir.display()
        )));
    }

    // Canonicalize workdir for reliable path comparisons (especially on Windows)
    let canonical_workdir = workdir.canonicalize().map_err(|e| {
        ImportError::Generic(format!(
            "failed to canonicalize working directory {}: {}",
            workdir.display(),
            e
        ))
    })?;

    // All internal git commands address the repository through its top level.
    let normalized_global_args = vec!["-C".to_string(), workdir.display().to_string()];

    Ok(Repository {
        global_args: normalized_global_args,
        git_dir,
        workdir,
        canonical_workdir,
    })
}

/// Canonicalize the deepest existing ancestor of `path` and re-join the
/// remaining components onto it.
fn resolve_against_existing_ancestors(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        return resolve_against_existing_ancestors(parent).join(name);
    }
    path.to_path_buf()
}

/// Helper to execute a git command
pub fn exec_git(args: &[String]) -> Result<Output, ImportError> {
    let mut cmd = Command::new(config::Config::get().git_cmd());
    cmd.args(args);

    let output = cmd.output().map_err(ImportError::IoError)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ImportError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}

/// Helper to execute a git command with data provided on stdin
pub fn exec_git_stdin(args: &[String], stdin_data: &[u8]) -> Result<Output, ImportError> {
    let mut cmd = Command::new(config::Config::get().git_cmd());
    cmd.args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = cmd.spawn().map_err(ImportError::IoError)?;

    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        if let Err(e) = stdin.write_all(stdin_data) {
            return Err(ImportError::IoError(e));
        }
    }

    let output = child.wait_with_output().map_err(ImportError::IoError)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ImportError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}
