use crate::error::ImportError;
use crate::git::repository::{Repository, exec_git};
use crate::utils::debug_log;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::bytes::Regex;

/// Line that opens every record in `--pretty=email` output: a fake mbox
/// "From " line carrying the full commit id.
fn commit_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^From ([0-9a-f]{40}) ").unwrap())
}

/// A rename recorded in a commit's diff header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// One commit's email-formatted patch, parsed once into the fields the
/// pipeline needs. `raw` preserves every byte of the record, including
/// binary-diff sections.
#[derive(Debug, Clone)]
pub struct CommitPatch {
    pub oid: String,
    pub raw: Vec<u8>,
    pub rename: Option<Rename>,
    pub has_content_changes: bool,
    pub is_genesis: bool,
}

impl CommitPatch {
    fn parse(oid: String, raw: Vec<u8>) -> Self {
        let mut rename_from: Option<String> = None;
        let mut rename_to: Option<String> = None;
        let mut has_content_changes = false;
        let mut zero_old_index = false;
        let mut old_is_dev_null = false;
        let mut new_file = false;

        // Only the diff section is scanned; commit messages are free to
        // contain lines that look like diff markers.
        let mut in_diff = false;
        for line in split_lines(&raw) {
            let line = trim_newline(line);
            if !in_diff {
                in_diff = line.starts_with(b"diff --git ");
                if !in_diff {
                    continue;
                }
            }
            if let Some(rest) = line.strip_prefix(b"rename from ") {
                rename_from = String::from_utf8(rest.to_vec()).ok();
            } else if let Some(rest) = line.strip_prefix(b"rename to ") {
                rename_to = String::from_utf8(rest.to_vec()).ok();
            } else if line.starts_with(b"@@ ") || line == b"GIT binary patch" {
                has_content_changes = true;
            } else if line.starts_with(b"index ") {
                zero_old_index = line[6..].starts_with(ZERO_OID.as_bytes())
                    && line[6 + ZERO_OID.len()..].starts_with(b"..");
            } else if line == b"--- /dev/null" {
                old_is_dev_null = true;
            } else if line.starts_with(b"new file mode ") {
                new_file = true;
            }
        }

        let rename = match (rename_from, rename_to) {
            (Some(from), Some(to)) => Some(Rename { from, to }),
            _ => None,
        };

        // Genesis signature: all-zero previous revision and no previous
        // file. Binary creations carry no `--- /dev/null` line, only the
        // new-file mode marker.
        let is_genesis = zero_old_index && (old_is_dev_null || new_file);

        CommitPatch {
            oid,
            raw,
            rename,
            has_content_changes,
            is_genesis,
        }
    }

    /// True for commits that changed the file's path but not its content.
    pub fn is_rename_only(&self) -> bool {
        self.rename.is_some() && !self.has_content_changes
    }

    pub fn short_oid(&self) -> &str {
        &self.oid[..12]
    }
}

const ZERO_OID: &str = "0000000000000000000000000000000000000000";

/// Ask the source repository for the file's complete patch-formatted
/// history, newest first, following renames.
///
/// `--reverse` is deliberately absent: combined with `--follow` it stops
/// rename tracking, so ordering is fixed up in memory later.
pub fn extract_file_history(repo: &Repository, rel_path: &str) -> Result<Vec<u8>, ImportError> {
    let mut args = repo.global_args_for_exec();
    args.push("-c".to_string());
    args.push("core.quotepath=false".to_string());
    args.push("log".to_string());
    args.push("--follow".to_string());
    args.push("--pretty=email".to_string());
    args.push("--patch-with-stat".to_string());
    args.push("--full-index".to_string());
    args.push("--binary".to_string());
    args.push("--".to_string());
    args.push(rel_path.to_string());

    let output = exec_git(&args).map_err(|e| match e {
        ImportError::GitCliError { stderr, .. } => ImportError::HistoryUnavailable(format!(
            "git log failed for {}: {}",
            rel_path,
            stderr.trim_end()
        )),
        other => other,
    })?;

    if output.stdout.is_empty() {
        return Err(ImportError::HistoryUnavailable(format!(
            "no commit history found for {}",
            rel_path
        )));
    }

    Ok(output.stdout)
}

/// Split the extracted blob into per-commit records, newest first,
/// preserving every byte of each record.
pub fn split_history(blob: &[u8]) -> Result<Vec<CommitPatch>, ImportError> {
    let boundaries: Vec<(usize, String)> = commit_boundary()
        .captures_iter(blob)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let oid = String::from_utf8_lossy(caps.get(1).unwrap().as_bytes()).to_string();
            (whole.start(), oid)
        })
        .collect();

    if boundaries.is_empty() {
        return Err(ImportError::HistoryUnavailable(
            "history output contained no commit records".to_string(),
        ));
    }

    let mut patches = Vec::with_capacity(boundaries.len());
    for (i, (start, oid)) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(i + 1)
            .map(|(next_start, _)| *next_start)
            .unwrap_or(blob.len());
        patches.push(CommitPatch::parse(oid.clone(), blob[*start..end].to_vec()));
    }

    Ok(patches)
}

struct PatchRecord {
    patch: CommitPatch,
    file: PathBuf,
}

/// The on-disk working set of per-commit patch records for one run.
///
/// Records start out newest first, as extracted; `verify_genesis` flips
/// the set to oldest-first replay order.
pub struct PatchSet {
    records: Vec<PatchRecord>,
}

impl PatchSet {
    /// Extract the source file's history and materialize one scratch file
    /// per commit.
    pub fn extract(
        repo: &Repository,
        rel_path: &str,
        scratch: &Path,
    ) -> Result<Self, ImportError> {
        let blob = extract_file_history(repo, rel_path)?;
        let patches = split_history(&blob)?;
        debug_log(&format!(
            "extracted {} commit record(s) for {}",
            patches.len(),
            rel_path
        ));

        let mut records = Vec::with_capacity(patches.len());
        for (seq, patch) in patches.into_iter().enumerate() {
            let file = scratch.join(format!("{:04}-{}.patch", seq + 1, patch.short_oid()));
            fs::write(&file, &patch.raw)?;
            records.push(PatchRecord { patch, file });
        }

        Ok(Self { records })
    }

    /// Drop rename-only records from the set (and from disk), returning
    /// every path the file has ever had, plus its current one.
    pub fn filter_renames(&mut self, current_path: &str) -> Result<BTreeSet<String>, ImportError> {
        if let Some(record) = self
            .records
            .iter()
            .find(|r| r.patch.rename.is_some() && r.patch.has_content_changes)
        {
            let rename = record.patch.rename.as_ref().unwrap();
            return Err(ImportError::UnsupportedRename(format!(
                "commit {} renames {} to {} and changes its content in the same commit; split such history manually before importing",
                record.patch.short_oid(),
                rename.from,
                rename.to
            )));
        }

        let mut paths = BTreeSet::new();
        paths.insert(current_path.to_string());

        let mut retained = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            if let Some(rename) = &record.patch.rename {
                paths.insert(rename.from.clone());
                paths.insert(rename.to.clone());
                debug_log(&format!(
                    "dropping rename-only commit {} ({} -> {})",
                    record.patch.short_oid(),
                    rename.from,
                    rename.to
                ));
                fs::remove_file(&record.file)?;
            } else {
                retained.push(record);
            }
        }
        self.records = retained;

        Ok(paths)
    }

    /// Reorder the retained records oldest first and confirm the oldest
    /// one is the file's genesis commit.
    pub fn verify_genesis(&mut self) -> Result<(), ImportError> {
        self.records.reverse();

        match self.records.first() {
            Some(first) if first.patch.is_genesis => Ok(()),
            Some(first) => Err(ImportError::BrokenHistory(format!(
                "oldest retained commit {} does not create the file; its history cannot be traced back to a genesis commit",
                first.patch.short_oid()
            ))),
            None => Err(ImportError::BrokenHistory(
                "no content-changing commits remain after rename filtering".to_string(),
            )),
        }
    }

    /// The full replay series, in current record order.
    pub fn concatenated(&self) -> Vec<u8> {
        let mut series = Vec::new();
        for record in &self.records {
            series.extend_from_slice(&record.patch.raw);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn split_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = data;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.iter().position(|&b| b == b'\n') {
            Some(i) => {
                let (line, tail) = rest.split_at(i + 1);
                rest = tail;
                Some(line)
            }
            None => {
                let line = rest;
                rest = &[];
                Some(line)
            }
        }
    })
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
