//! Run configuration.
//!
//! Output destinations are explicit configuration rather than hardcoded
//! paths, so tests (and callers) can point a run at temporary roots.

use std::path::{Path, PathBuf};

use crate::classify::FileKind;

/// The four destination buckets classified files are copied into.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// C/C++ sources and headers.
    pub source_dir: PathBuf,
    /// Raw archive files, copied before any unpack attempt.
    pub archive_dir: PathBuf,
    /// Files whose content signature disagrees with their extension.
    pub disguised_dir: PathBuf,
    /// Everything else.
    pub other_dir: PathBuf,
}

impl OutputLayout {
    /// Standard bucket layout under a single root directory.
    pub fn under(root: &Path) -> Self {
        Self {
            source_dir: root.join("extracted_c_files"),
            archive_dir: root.join("extracted_archives"),
            disguised_dir: root.join("extracted_modified_files"),
            other_dir: root.join("extracted_other_files"),
        }
    }

    /// Bucket a classification maps to.
    pub fn bucket_for(&self, kind: FileKind) -> &Path {
        match kind {
            FileKind::SourceCode => &self.source_dir,
            FileKind::Archive => &self.archive_dir,
            FileKind::DisguisedExtension => &self.disguised_dir,
            FileKind::Other => &self.other_dir,
        }
    }

    /// Create all four buckets. Pre-existing directories and their contents
    /// are left alone.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.source_dir,
            &self.archive_dir,
            &self.disguised_dir,
            &self.other_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::under(Path::new("result"))
    }
}

/// Configuration for one extraction run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The top-level archive to process.
    pub archive_path: PathBuf,

    /// Destination buckets.
    pub output: OutputLayout,

    /// Where scratch workspaces are created (system temp dir when unset).
    pub work_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.archive_path.exists() {
            return Err(ConfigError::ArchiveNotFound(self.archive_path.clone()));
        }

        if !self.archive_path.is_file() {
            return Err(ConfigError::NotAFile(self.archive_path.clone()));
        }

        if let Some(dir) = &self.work_dir {
            if !dir.is_dir() {
                return Err(ConfigError::WorkDirNotFound(dir.clone()));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("work directory not found: {0}")]
    WorkDirNotFound(PathBuf),
}
