//! Recursive discovery of source files

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, AssetPipeError};

/// Lazy iterator over every regular file below a root directory
///
/// Entries come out sorted by file name within each directory, so two walks
/// of an unchanged tree yield the same sequence. Unreadable directories and
/// symbolic link cycles surface as `Err` items instead of being dropped.
/// A non-directory entry that cannot be inspected, such as a dangling link,
/// is still yielded so the failure lands on that one file.
pub struct TreeWalker {
    inner: walkdir::IntoIter,
}

impl TreeWalker {
    /// Start walking `root`, following symbolic links
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::with_options(root, true)
    }

    /// Start walking `root`
    ///
    /// With `follow_symlinks` off, links are neither descended into nor yielded.
    pub fn with_options<P: AsRef<Path>>(root: P, follow_symlinks: bool) -> Result<Self> {
        let root = root.as_ref();

        let metadata = std::fs::metadata(root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetPipeError::not_found(root.to_path_buf())
            } else {
                AssetPipeError::WalkError {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        if !metadata.is_dir() {
            return Err(AssetPipeError::WalkError {
                path: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        debug!("Walking {:?} (follow symlinks: {})", root, follow_symlinks);

        let inner = WalkDir::new(root)
            .follow_links(follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        Ok(Self { inner })
    }
}

impl Iterator for TreeWalker {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(path) = broken_file(&e) {
                        debug!("Yielding unreadable entry {:?}: {}", path, e);
                        return Some(Ok(path));
                    }
                    return Some(Err(e.into()));
                }
            };

            // With links followed, file_type() already reports the target
            if entry.file_type().is_file() {
                return Some(Ok(entry.into_path()));
            }
        }
    }
}

/// Path of a failed entry below the root that is not a directory
fn broken_file(err: &walkdir::Error) -> Option<PathBuf> {
    if err.depth() == 0 || err.loop_ancestor().is_some() {
        return None;
    }

    let path = err.path()?;
    if path.is_dir() {
        return None;
    }
    Some(path.to_path_buf())
}

/// Collect every file below `root`, stopping at the first walk error
pub fn walk<P: AsRef<Path>>(root: P, follow_symlinks: bool) -> Result<Vec<PathBuf>> {
    TreeWalker::with_options(root, follow_symlinks)?.collect()
}
