//! Core building blocks: discovery, path mapping, planning and codecs

use std::path::{Path, PathBuf};

use crate::error::Result;

pub mod codec;
pub mod formats;
pub mod paths;
pub mod planner;
pub mod resize;
pub mod walker;

pub use codec::{CodecService, ImageCodec};
pub use formats::*;
pub use paths::{map_path, MappedPath};
pub use planner::*;
pub use resize::{FilterType, ImageResizer};
pub use walker::{walk, TreeWalker};

/// One discovered source file, consumed once by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Path as produced by the walker
    pub input_path: PathBuf,

    /// Mirrored location in the output tree
    pub mapped: MappedPath,
}

impl FileTask {
    /// Map a walked path onto the output tree
    pub fn new(input_root: &Path, output_root: &Path, input_path: PathBuf) -> Result<Self> {
        let mapped = map_path(input_root, output_root, &input_path)?;
        Ok(Self { input_path, mapped })
    }

    pub fn relative_path(&self) -> &Path {
        &self.mapped.relative_path
    }

    /// Lowercased, dotted extension
    pub fn extension(&self) -> &str {
        &self.mapped.ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_task_from_walked_path() {
        let task = FileTask::new(
            Path::new("assets/img"),
            Path::new("dist/assets/img"),
            PathBuf::from("assets/img/icons/Logo.PNG"),
        )
        .unwrap();

        assert_eq!(task.relative_path(), Path::new("icons/Logo.PNG"));
        assert_eq!(task.extension(), ".png");
        assert_eq!(task.mapped.output_dir, PathBuf::from("dist/assets/img/icons"));
    }
}
