#![allow(dead_code)]

use git2::Repository;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A throwaway git repository under the system temp dir, configured with a
/// default test identity.
#[derive(Clone, Debug)]
pub struct TestRepo {
    path: PathBuf,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let n: u64 = rng.gen_range(0..10000000000);
        let base = std::env::temp_dir();
        let path = base.join(format!("git-import-file-test-{}", n));

        let repo = Repository::init(&path).expect("failed to initialize git2 repository");
        let mut config = repo.config().expect("failed to open repository config");
        config
            .set_str("user.name", "Test User")
            .expect("failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("failed to set user.email");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Run a git command in this repository, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        self.git_with_env(args, &[])
    }

    pub fn git_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> String {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.path).args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("failed to spawn git");
        if !output.status.success() {
            panic!(
                "git {:?} failed in {}:\nstdout: {}\nstderr: {}",
                args,
                self.path.display(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        let path = self.file_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories");
        }
        fs::write(path, contents).expect("failed to write file");
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.file_path(name)).expect("failed to read file")
    }

    /// Stage everything and commit with the repository's default identity.
    pub fn stage_all_and_commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message]);
    }

    /// Stage everything and commit as a specific author/committer.
    pub fn commit_all_as(&self, name: &str, email: &str, message: &str) {
        self.git(&["add", "-A"]);
        self.git_with_env(
            &["commit", "-m", message],
            &[
                ("GIT_AUTHOR_NAME", name),
                ("GIT_AUTHOR_EMAIL", email),
                ("GIT_COMMITTER_NAME", name),
                ("GIT_COMMITTER_EMAIL", email),
            ],
        );
    }

    /// Content-free rename committed as a specific author.
    pub fn rename_and_commit_as(&self, name: &str, email: &str, from: &str, to: &str) {
        self.git(&["mv", from, to]);
        self.git_with_env(
            &["commit", "-m", &format!("rename {} to {}", from, to)],
            &[
                ("GIT_AUTHOR_NAME", name),
                ("GIT_AUTHOR_EMAIL", email),
                ("GIT_COMMITTER_NAME", name),
                ("GIT_COMMITTER_EMAIL", email),
            ],
        );
    }

    pub fn commit_count(&self) -> usize {
        self.git(&["rev-list", "--count", "HEAD"])
            .trim()
            .parse()
            .expect("unparseable rev-list count")
    }

    /// Commit subjects, newest first.
    pub fn subjects(&self) -> Vec<String> {
        self.git(&["log", "--format=%s"])
            .lines()
            .map(|s| s.to_string())
            .collect()
    }

    /// Commit authors as "Name <email>", newest first.
    pub fn authors(&self) -> Vec<String> {
        self.git(&["log", "--format=%an <%ae>"])
            .lines()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn head_oid(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }
}
