//! Mapping source paths onto the mirrored output tree

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, AssetPipeError};
use crate::processing::formats::dotted_extension;

/// Where one source file lands in the output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    /// Path relative to the input root
    pub relative_path: PathBuf,

    /// Output root joined with the relative directory
    pub output_dir: PathBuf,

    /// File name without its final extension
    pub base_name: OsString,

    /// Lowercased extension with its leading dot, or "" when absent
    pub ext: String,

    /// Original file name, extension case preserved
    pub file_name: OsString,
}

impl MappedPath {
    /// Output path of the optimized same-format copy
    pub fn optimized_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Output path of a resized variant: `<base>-<suffix>.<extension>`
    pub fn variant_path(&self, suffix: &str, extension: &str) -> PathBuf {
        let mut name = self.base_name.clone();
        name.push("-");
        name.push(suffix);
        name.push(".");
        name.push(extension);
        self.output_dir.join(name)
    }
}

/// Map `path` (below `input_root`) onto `output_root`
///
/// Pure: no filesystem access. Both roots and the path must use the same
/// form (all absolute or all relative to one working directory).
pub fn map_path(input_root: &Path, output_root: &Path, path: &Path) -> Result<MappedPath> {
    let relative_path = path
        .strip_prefix(input_root)
        .map_err(|_| AssetPipeError::OutsideRoot {
            path: path.to_path_buf(),
            root: input_root.to_path_buf(),
        })?
        .to_path_buf();

    let file_name = relative_path
        .file_name()
        .ok_or_else(|| AssetPipeError::OutsideRoot {
            path: path.to_path_buf(),
            root: input_root.to_path_buf(),
        })?
        .to_os_string();

    let output_dir = match relative_path.parent() {
        Some(parent) => output_root.join(parent),
        None => output_root.to_path_buf(),
    };

    let base_name = Path::new(&file_name)
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| file_name.clone());

    Ok(MappedPath {
        ext: dotted_extension(&relative_path),
        relative_path,
        output_dir,
        base_name,
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_file_mapping() {
        let mapped = map_path(
            Path::new("/in"),
            Path::new("/out"),
            Path::new("/in/a/b/photo.JPEG"),
        )
        .unwrap();

        assert_eq!(mapped.relative_path, PathBuf::from("a/b/photo.JPEG"));
        assert_eq!(mapped.output_dir, PathBuf::from("/out/a/b"));
        assert_eq!(mapped.base_name, OsString::from("photo"));
        assert_eq!(mapped.ext, ".jpeg");
        assert_eq!(mapped.optimized_path(), PathBuf::from("/out/a/b/photo.JPEG"));
        assert_eq!(
            mapped.variant_path("mobile", "webp"),
            PathBuf::from("/out/a/b/photo-mobile.webp")
        );
    }

    #[test]
    fn test_root_level_file_mapping() {
        let mapped = map_path(Path::new("in"), Path::new("out"), Path::new("in/logo.png")).unwrap();
        assert_eq!(mapped.output_dir, PathBuf::from("out"));
        assert_eq!(mapped.ext, ".png");
    }

    #[test]
    fn test_multi_dot_and_extensionless_names() {
        let mapped = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in/x.min.png")).unwrap();
        assert_eq!(mapped.base_name, OsString::from("x.min"));

        let mapped = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in/LICENSE")).unwrap();
        assert_eq!(mapped.base_name, OsString::from("LICENSE"));
        assert_eq!(mapped.ext, "");
    }

    #[test]
    fn test_outside_root_is_rejected() {
        let result = map_path(Path::new("/in"), Path::new("/out"), Path::new("/elsewhere/a.jpg"));
        assert!(matches!(result, Err(AssetPipeError::OutsideRoot { .. })));

        let result = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in"));
        assert!(result.is_err());
    }

    #[test]
    fn test_distinct_directories_do_not_collide() {
        let a = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in/a/p.jpg")).unwrap();
        let b = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in/b/p.jpg")).unwrap();
        assert_ne!(a.output_dir, b.output_dir);
        assert_ne!(a.optimized_path(), b.optimized_path());
    }
}
