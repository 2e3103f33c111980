pub mod apply;
pub mod history;
pub mod rewrite;

use crate::config::Config;
use crate::error::ImportError;
use crate::git::repository::{Repository, find_repository_for_file};
use crate::utils::debug_log;

use apply::ApplySession;
use history::PatchSet;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub struct ImportOptions {
    pub source: PathBuf,
    pub target: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub commits_imported: usize,
    pub destination: PathBuf,
    /// False when the replayed file differs from the live source file —
    /// the import still succeeded, but the caller should warn.
    pub content_matches: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    ValidatedInputs,
    HistoryExtracted,
    RenamesFiltered,
    InitialCommitVerified,
    PathsRewritten,
    PatchValidated,
    Applied,
    Verified,
}

fn enter(stage: Stage) {
    debug_log(&format!("stage: {:?}", stage));
}

/// One side of the import: a repository plus the tracked file's absolute
/// and repo-relative locations.
struct RepoFile {
    repo: Repository,
    abs: PathBuf,
    rel: String,
}

/// Pipeline context threaded through every stage; owned by one run.
struct ImportContext {
    source: RepoFile,
    target: RepoFile,
}

/// Import `opts.source`'s full commit history into the repository
/// containing the target path.
pub fn run(opts: ImportOptions) -> Result<ImportOutcome, ImportError> {
    enter(Stage::Init);
    let ctx = resolve_inputs(opts)?;
    enter(Stage::ValidatedInputs);

    let scratch = ScratchDir::create()?;
    let result = run_pipeline(&ctx, &scratch);

    match &result {
        Ok(_) => scratch.remove(),
        Err(_) if Config::get().keep_scratch_on_failure() => {
            debug_log(&format!(
                "keeping scratch directory {} for diagnosis",
                scratch.path().display()
            ));
        }
        Err(_) => scratch.remove(),
    }

    result
}

fn run_pipeline(ctx: &ImportContext, scratch: &ScratchDir) -> Result<ImportOutcome, ImportError> {
    let mut patches = PatchSet::extract(&ctx.source.repo, &ctx.source.rel, scratch.path())?;
    enter(Stage::HistoryExtracted);

    let historical_paths = patches.filter_renames(&ctx.source.rel)?;
    enter(Stage::RenamesFiltered);

    patches.verify_genesis()?;
    enter(Stage::InitialCommitVerified);

    let series = rewrite::rewrite_series(&patches.concatenated(), &historical_paths, &ctx.target.rel);
    fs::write(scratch.path().join("series.patch"), &series)?;
    enter(Stage::PathsRewritten);

    let session = ApplySession::new(&ctx.target.repo);
    session.check(&series)?;
    enter(Stage::PatchValidated);

    session.apply(&series)?;
    enter(Stage::Applied);

    let content_matches = verify_content(ctx)?;
    enter(Stage::Verified);

    Ok(ImportOutcome {
        commits_imported: patches.len(),
        destination: ctx.target.abs.clone(),
        content_matches,
    })
}

fn resolve_inputs(opts: ImportOptions) -> Result<ImportContext, ImportError> {
    let source_abs = absolutize(&opts.source)?;
    if !source_abs.is_file() {
        return Err(ImportError::InvalidInput(format!(
            "source file does not exist: {}",
            source_abs.display()
        )));
    }
    let source_abs = source_abs.canonicalize()?;

    let target_abs = match opts.target {
        Some(target) => absolutize(&target)?,
        None => {
            let name = source_abs.file_name().ok_or_else(|| {
                ImportError::InvalidInput(format!(
                    "source path has no file name: {}",
                    source_abs.display()
                ))
            })?;
            env::current_dir()?.join(name)
        }
    };

    // Checked before any repository command runs.
    if target_abs.exists() {
        return Err(ImportError::InvalidInput(format!(
            "target already exists: {}",
            target_abs.display()
        )));
    }

    let source_repo = find_repository_for_file(&source_abs)?;
    let source_rel = source_repo.rel_path(&source_abs)?;

    let target_repo = find_repository_for_file(&target_abs)?;
    let target_rel = target_repo.rel_path(&target_abs)?;

    if source_repo.canonical_workdir() == target_repo.canonical_workdir()
        && source_rel == target_rel
    {
        return Err(ImportError::InvalidInput(format!(
            "target resolves to the source file itself: {}",
            target_abs.display()
        )));
    }

    if !source_repo.is_clean()? {
        return Err(ImportError::DirtyRepository(format!(
            "source repository {} has uncommitted changes",
            source_repo.workdir().display()
        )));
    }
    if !target_repo.is_clean()? {
        return Err(ImportError::DirtyRepository(format!(
            "target repository {} has uncommitted changes",
            target_repo.workdir().display()
        )));
    }

    Ok(ImportContext {
        source: RepoFile {
            repo: source_repo,
            abs: source_abs,
            rel: source_rel,
        },
        target: RepoFile {
            repo: target_repo,
            abs: target_abs,
            rel: target_rel,
        },
    })
}

/// Byte-compare the replayed file against the live source file.
fn verify_content(ctx: &ImportContext) -> Result<bool, ImportError> {
    let source = fs::read(&ctx.source.abs).map_err(|e| {
        ImportError::VerificationError(format!(
            "failed to read {}: {}",
            ctx.source.abs.display(),
            e
        ))
    })?;
    let target = fs::read(&ctx.target.abs).map_err(|e| {
        ImportError::VerificationError(format!(
            "failed to read {}: {}",
            ctx.target.abs.display(),
            e
        ))
    })?;
    Ok(source == target)
}

fn absolutize(path: &Path) -> Result<PathBuf, ImportError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Uniquely named scratch directory, exclusively owned by one run.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> Result<Self, ImportError> {
        let path = env::temp_dir().join(format!("git-import-file-{}", Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        debug_log(&format!("scratch directory: {}", path.display()));
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn remove(&self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            debug_log(&format!(
                "failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ));
        }
    }
}
