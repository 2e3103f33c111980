use crate::error::ImportError;
use crate::git::repository::{Repository, exec_git, exec_git_stdin};
use crate::utils::debug_log;

/// Transactional scope over the target repository. This is the only place
/// the target is ever mutated; any failure inside rolls the in-progress
/// application back before the error propagates.
pub struct ApplySession<'a> {
    repo: &'a Repository,
}

impl<'a> ApplySession<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Dry-run the rewritten series against the target's current state.
    /// Rejection means no mutation has happened and none will.
    pub fn check(&self, series: &[u8]) -> Result<(), ImportError> {
        let mut args = self.repo.global_args_for_exec();
        args.push("apply".to_string());
        args.push("--check".to_string());

        match exec_git_stdin(&args, series) {
            Ok(_) => Ok(()),
            Err(ImportError::GitCliError { stderr, .. }) => {
                Err(ImportError::PatchConflict(format!(
                    "patch series does not apply cleanly to {}: {}",
                    self.repo.workdir().display(),
                    stderr.trim_end()
                )))
            }
            Err(other) => Err(other),
        }
    }

    /// Replay the series as one commit per record, preserving each
    /// original author, date and message. On failure the partial
    /// application is aborted so the target ends exactly as it began.
    pub fn apply(&self, series: &[u8]) -> Result<(), ImportError> {
        if let Ok(head) = self.repo.head_oid() {
            debug_log(&format!("applying series onto {}", &head[..12]));
        } else {
            debug_log("applying series onto an empty repository");
        }

        let mut args = self.repo.global_args_for_exec();
        args.push("am".to_string());

        match exec_git_stdin(&args, series) {
            Ok(_) => Ok(()),
            Err(ImportError::GitCliError { stderr, .. }) => {
                self.abort();
                Err(ImportError::ApplyFailed(format!(
                    "git am failed and the partial application was aborted: {}",
                    stderr.trim_end()
                )))
            }
            Err(other) => {
                self.abort();
                Err(other)
            }
        }
    }

    /// Roll back an in-progress `git am`, restoring the pre-apply state.
    fn abort(&self) {
        let mut args = self.repo.global_args_for_exec();
        args.push("am".to_string());
        args.push("--abort".to_string());

        if let Err(e) = exec_git(&args) {
            debug_log(&format!("git am --abort failed: {}", e));
        }
    }
}
