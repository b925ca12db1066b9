use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// Suffix of in-flight temp files.
pub const PART_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("target has no file name: {0:?}")]
    InvalidTarget(PathBuf),
    #[error("target exists and is not a regular file: {0:?}")]
    TargetNotFile(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result of a successful [`AtomicFileWriter::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Saved(PathBuf),
    /// The target already existed; nothing was written.
    Skipped(PathBuf),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Delete `.part` leftovers of an interrupted earlier run. Returns how many
/// files were removed.
pub fn remove_stale_parts(dir: &Path) -> Result<usize, PersistError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with('.') && name.ends_with(PART_SUFFIX)) {
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(removed)
}

/// `Skipped` for an existing regular file, an error for anything else in the
/// way, `None` when the path is free.
fn existing_target(target: &Path) -> Result<Option<CommitOutcome>, PersistError> {
    match fs::metadata(target) {
        Ok(meta) if meta.is_file() => Ok(Some(CommitOutcome::Skipped(target.to_path_buf()))),
        Ok(_) => Err(PersistError::TargetNotFile(target.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Writes files through a same-directory temp file and a rename, so the final
/// path never shows partial content.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to `{dir}/{filename}`, replacing any existing file.
    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let tmp = self.stage(&target, |file| file.write_all(content.as_bytes()))?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Write `bytes` to `target` unless a file already exists there.
    pub fn commit(&self, bytes: &[u8], target: &Path) -> Result<CommitOutcome, PersistError> {
        self.commit_with(target, |file| file.write_all(bytes))
    }

    /// Like [`commit`](Self::commit), with the content produced by `fill`.
    ///
    /// If `fill` fails the temp file is removed and `target` is left untouched.
    /// A file that appears at `target` while staging is never overwritten.
    pub fn commit_with<F>(&self, target: &Path, fill: F) -> Result<CommitOutcome, PersistError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        if let Some(outcome) = existing_target(target)? {
            return Ok(outcome);
        }

        let tmp = self.stage(target, fill)?;
        let tmp_path = tmp.path().to_path_buf();
        match tmp.persist_noclobber(target) {
            Ok(_) => Ok(CommitOutcome::Saved(target.to_path_buf())),
            // `e.file` still owns the temp file and removes it on drop.
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                engine_debug!("{:?} appeared while staging", target);
                existing_target(target)?.ok_or_else(|| PersistError::Io(e.error))
            }
            Err(e) => {
                engine_warn!("rename {:?} -> {:?} failed: {}", tmp_path, target, e.error);
                Err(PersistError::Io(e.error))
            }
        }
    }

    /// Create `.{name}.XXXXXX.part` next to `target`, fill, flush and fsync it.
    fn stage<F>(&self, target: &Path, fill: F) -> Result<NamedTempFile, PersistError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let name = target
            .file_name()
            .ok_or_else(|| PersistError::InvalidTarget(target.to_path_buf()))?
            .to_string_lossy();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => self.dir.as_path(),
        };

        let mut tmp = Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(PART_SUFFIX)
            .tempfile_in(dir)?;
        fill(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}
