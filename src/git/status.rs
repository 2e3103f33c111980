use crate::error::ImportError;
use crate::git::repository::{Repository, exec_git};
use std::str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
    Unknown(char),
}

impl From<char> for StatusCode {
    fn from(value: char) -> Self {
        match value {
            '.' => StatusCode::Unmodified,
            'M' => StatusCode::Modified,
            'A' => StatusCode::Added,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'U' => StatusCode::Unmerged,
            '?' => StatusCode::Untracked,
            '!' => StatusCode::Ignored,
            other => StatusCode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Ordinary,
    Rename,
    Copy,
    Unmerged,
    Untracked,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub staged: StatusCode,
    pub unstaged: StatusCode,
    pub kind: EntryKind,
    pub orig_path: Option<String>,
}

impl StatusEntry {
    /// True when the entry represents a tracked modification, staged or
    /// unstaged. Untracked and ignored files do not count.
    pub fn is_tracked_modification(&self) -> bool {
        !matches!(self.kind, EntryKind::Untracked | EntryKind::Ignored)
    }
}

impl Repository {
    pub fn status(&self) -> Result<Vec<StatusEntry>, ImportError> {
        let mut args = self.global_args_for_exec();
        args.push("status".to_string());
        args.push("--porcelain=v2".to_string());
        args.push("-z".to_string()); // NUL-separated output for proper UTF-8 handling

        let output = exec_git(&args)?;

        parse_porcelain_v2(&output.stdout)
    }

    /// True when the working tree has no tracked modifications (staged or
    /// unstaged). Untracked files are ignored.
    pub fn is_clean(&self) -> Result<bool, ImportError> {
        let entries = self.status()?;
        Ok(!entries.iter().any(StatusEntry::is_tracked_modification))
    }
}

fn parse_porcelain_v2(data: &[u8]) -> Result<Vec<StatusEntry>, ImportError> {
    let mut entries = Vec::new();
    let mut parts = data
        .split(|byte| *byte == 0)
        .filter(|slice| !slice.is_empty())
        .peekable();

    while let Some(raw) = parts.next() {
        let record = str::from_utf8(raw)?;
        let mut chars = record.chars();
        let tag = chars
            .next()
            .ok_or_else(|| ImportError::Generic("unexpected empty porcelain v2 record".into()))?;

        match tag {
            '1' | 'u' => {
                let mut fields = record.splitn(9, ' ');
                let _ = fields.next(); // tag
                let xy = fields
                    .next()
                    .ok_or_else(|| ImportError::Generic("missing XY field".into()))?;
                if xy.len() != 2 {
                    return Err(ImportError::Generic(format!(
                        "unexpected XY field length: {}",
                        xy
                    )));
                }
                let mut xy_chars = xy.chars();
                let staged = StatusCode::from(xy_chars.next().unwrap_or('.'));
                let unstaged = StatusCode::from(xy_chars.next().unwrap_or('.'));

                // skip submodule/metadata fields to capture path
                for _ in 0..6 {
                    fields.next();
                }

                let path = fields
                    .next()
                    .ok_or_else(|| ImportError::Generic("missing path field".into()))?
                    .to_string();

                entries.push(StatusEntry {
                    path,
                    staged,
                    unstaged,
                    kind: if matches!(staged, StatusCode::Unmerged)
                        || matches!(unstaged, StatusCode::Unmerged)
                    {
                        EntryKind::Unmerged
                    } else {
                        EntryKind::Ordinary
                    },
                    orig_path: None,
                });
            }
            '2' => {
                let mut fields = record.splitn(10, ' ');
                let _ = fields.next(); // tag
                let xy = fields
                    .next()
                    .ok_or_else(|| ImportError::Generic("missing XY field".into()))?;
                if xy.len() != 2 {
                    return Err(ImportError::Generic(format!(
                        "unexpected XY field length: {}",
                        xy
                    )));
                }
                let mut xy_chars = xy.chars();
                let staged = StatusCode::from(xy_chars.next().unwrap_or('.'));
                let unstaged = StatusCode::from(xy_chars.next().unwrap_or('.'));

                // skip submodule/metadata fields
                for _ in 0..7 {
                    fields.next();
                }

                let path = fields
                    .next()
                    .ok_or_else(|| ImportError::Generic("missing path field".into()))?
                    .to_string();

                // The original path follows in its own NUL-separated record.
                let orig_path_bytes = parts.next().ok_or_else(|| {
                    ImportError::Generic("missing original path for rename/copy".into())
                })?;
                let orig_path = str::from_utf8(orig_path_bytes)?.to_string();

                let kind = match staged {
                    StatusCode::Renamed => EntryKind::Rename,
                    StatusCode::Copied => EntryKind::Copy,
                    _ => EntryKind::Ordinary,
                };

                entries.push(StatusEntry {
                    path,
                    staged,
                    unstaged,
                    kind,
                    orig_path: Some(orig_path),
                });
            }
            '?' => {
                let path = record.strip_prefix("? ").unwrap_or(record).to_string();

                entries.push(StatusEntry {
                    path,
                    staged: StatusCode::Unmodified,
                    unstaged: StatusCode::Untracked,
                    kind: EntryKind::Untracked,
                    orig_path: None,
                });
            }
            '!' => {
                let path = record.strip_prefix("! ").unwrap_or(record).to_string();

                entries.push(StatusEntry {
                    path,
                    staged: StatusCode::Unmodified,
                    unstaged: StatusCode::Ignored,
                    kind: EntryKind::Ignored,
                    orig_path: None,
                });
            }
            other => {
                return Err(ImportError::Generic(format!(
                    "unsupported porcelain v2 record tag: {}",
                    other
                )));
            }
        }
    }

    Ok(entries)
}
