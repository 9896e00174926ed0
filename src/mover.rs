//! Mover - relocates a file into its category folder
//!
//! Tries an atomic rename first. Only a cross-device failure falls back to
//! copy + remove; every other failure is returned as-is.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::rules::Rule;

/// Filesystem operations used by the mover
pub trait FileSystem: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Why a move failed
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("File has no name: {path}")]
    NoFileName { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy landed but the original could not be removed, so the file
    /// now exists in both places.
    #[error("Copied to {copied_to} but failed to remove {path}: {source}")]
    RemoveSource {
        path: PathBuf,
        copied_to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    /// The file exists at both the source and the destination
    pub fn is_duplicated(&self) -> bool {
        matches!(self, MoveError::RemoveSource { .. })
    }

    /// Underlying I/O error kind, if any
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            MoveError::NoFileName { .. } => None,
            MoveError::CreateDir { source, .. }
            | MoveError::Rename { source, .. }
            | MoveError::Copy { source, .. }
            | MoveError::RemoveSource { source, .. } => Some(source.kind()),
        }
    }
}

/// How a successful move was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    Rename,
    CopyAndDelete,
}

/// A completed move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub destination: PathBuf,
    pub method: MoveMethod,
}

/// Move `path` into `base_target / rule.target_folder`, keeping its name.
///
/// An existing file at the destination is replaced.
pub fn move_file(
    fs: &dyn FileSystem,
    path: &Path,
    base_target: &Path,
    rule: &Rule,
) -> Result<MovedFile, MoveError> {
    let file_name = path.file_name().ok_or_else(|| MoveError::NoFileName {
        path: path.to_path_buf(),
    })?;

    let dest_dir = base_target.join(&rule.target_folder);
    fs.create_dir_all(&dest_dir)
        .map_err(|source| MoveError::CreateDir {
            path: dest_dir.clone(),
            source,
        })?;

    let dest_path = dest_dir.join(file_name);

    match fs.rename(path, &dest_path) {
        Ok(()) => {
            info!("Moved {} -> {}", path.display(), dest_path.display());
            Ok(MovedFile {
                destination: dest_path,
                method: MoveMethod::Rename,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            warn!(
                "Rename crosses devices, copying {} -> {}",
                path.display(),
                dest_path.display()
            );
            fs.copy(path, &dest_path).map_err(|source| MoveError::Copy {
                from: path.to_path_buf(),
                to: dest_path.clone(),
                source,
            })?;
            fs.remove_file(path)
                .map_err(|source| MoveError::RemoveSource {
                    path: path.to_path_buf(),
                    copied_to: dest_path.clone(),
                    source,
                })?;

            info!("Copied {} -> {}", path.display(), dest_path.display());
            Ok(MovedFile {
                destination: dest_path,
                method: MoveMethod::CopyAndDelete,
            })
        }
        Err(source) => Err(MoveError::Rename {
            from: path.to_path_buf(),
            to: dest_path,
            source,
        }),
    }
}
