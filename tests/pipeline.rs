//! End-to-end runs over real fixture trees

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use assetpipe::parallel::OutcomeStatus;
use assetpipe::{BreakpointSpec, Config, Pipeline, RunSummary};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;
use walkdir::WalkDir;

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("assets/img");
        let output = dir.path().join("dist/assets/img");
        fs::create_dir_all(&input).unwrap();
        Self {
            _dir: dir,
            input,
            output,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        let path = self.input.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        path
    }

    fn jpeg(&self, relative: &str, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
            .save_with_format(self.path(relative), image::ImageFormat::Jpeg)
            .unwrap();
    }

    fn png(&self, relative: &str, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]))
            .save_with_format(self.path(relative), image::ImageFormat::Png)
            .unwrap();
    }

    fn raw(&self, relative: &str, bytes: &[u8]) {
        fs::write(self.path(relative), bytes).unwrap();
    }

    fn config(&self, breakpoints: Vec<BreakpointSpec>) -> Config {
        let mut config = Config::default();
        config.input_folder = self.input.clone();
        config.output_folder = self.output.clone();
        config.breakpoints = breakpoints;
        config.processing.threads = Some(2);
        config
    }

    fn run(&self, breakpoints: Vec<BreakpointSpec>) -> RunSummary {
        Pipeline::new(self.config(breakpoints)).unwrap().run().unwrap()
    }

    /// Every file below the output root, relative to it
    fn outputs(&self) -> BTreeSet<PathBuf> {
        if !self.output.exists() {
            return BTreeSet::new();
        }
        WalkDir::new(&self.output)
            .into_iter()
            .map(Result::unwrap)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&self.output).unwrap().to_path_buf())
            .collect()
    }
}

fn breakpoints() -> Vec<BreakpointSpec> {
    vec![
        BreakpointSpec::new("mobile", 480),
        BreakpointSpec::new("desktop", 1920),
    ]
}

fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

fn counts(summary: &RunSummary) -> (usize, usize, usize) {
    (summary.succeeded, summary.skipped, summary.failed)
}

#[test]
fn nested_jpeg_gets_optimized_copy_and_breakpoints() {
    let fixture = Fixture::new();
    fixture.jpeg("a/b/photo.jpeg", 64, 48);

    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (1, 0, 0));
    assert_eq!(
        fixture.outputs(),
        set(&[
            "a/b/photo.jpeg",
            "a/b/photo-mobile.webp",
            "a/b/photo-desktop.webp",
        ])
    );

    let mobile = image::open(fixture.output.join("a/b/photo-mobile.webp")).unwrap();
    assert_eq!((mobile.width(), mobile.height()), (480, 360));
    let optimized = image::open(fixture.output.join("a/b/photo.jpeg")).unwrap();
    assert_eq!((optimized.width(), optimized.height()), (64, 48));
}

#[test]
fn corrupt_sibling_does_not_stop_good_file() {
    let fixture = Fixture::new();
    fixture.jpeg("good.jpg", 32, 32);
    fixture.raw("corrupt.png", b"\x89PNG\r\n\x1a\nthis is not really a png");

    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (1, 0, 1));
    assert!(!summary.is_failure(false));
    assert!(summary.is_failure(true));

    let failed: Vec<_> = summary.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].relative_path, Path::new("corrupt.png"));
    let OutcomeStatus::Failed { failures } = &failed[0].status else {
        panic!("expected a failed outcome");
    };
    // Every variant was attempted and reported
    assert_eq!(failures.len(), 3);

    assert_eq!(
        fixture.outputs(),
        set(&["good.jpg", "good-mobile.webp", "good-desktop.webp"])
    );
}

#[test]
fn unsupported_files_are_skipped_not_failed() {
    let fixture = Fixture::new();
    fixture.raw("readme.txt", b"hello");

    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (0, 1, 0));
    assert!(fixture.outputs().is_empty());
    assert!(!summary.is_failure(true));
}

#[test]
fn empty_input_runs_cleanly() {
    let fixture = Fixture::new();

    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (0, 0, 0));
    assert!(fixture.outputs().is_empty());
}

#[test]
fn directory_structure_is_mirrored() {
    let fixture = Fixture::new();
    fixture.jpeg("heroes/banner.JPG", 40, 20);
    fixture.png("icons/logo.png", 16, 16);
    fixture.png("icons/social/share.png", 16, 16);
    fixture.raw("icons/notes.md", b"# notes");

    let summary = fixture.run(vec![BreakpointSpec::new("thumb", 8)]);

    assert_eq!(counts(&summary), (3, 1, 0));
    assert_eq!(
        fixture.outputs(),
        set(&[
            "heroes/banner.JPG",
            "heroes/banner-thumb.webp",
            "icons/logo.png",
            "icons/logo-thumb.webp",
            "icons/social/share.png",
            "icons/social/share-thumb.webp",
        ])
    );

    // Alpha survives the optimized PNG copy
    let logo = image::open(fixture.output.join("icons/logo.png")).unwrap().to_rgba8();
    assert_eq!(logo.get_pixel(0, 0)[3], 128);
}

#[test]
fn second_run_produces_same_path_set() {
    let fixture = Fixture::new();
    fixture.jpeg("a.jpg", 20, 20);
    fixture.png("nested/b.png", 20, 20);

    fixture.run(breakpoints());
    let first = fixture.outputs();
    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (2, 0, 0));
    assert_eq!(fixture.outputs(), first);
}

#[test]
fn colliding_breakpoint_outputs_fail_the_later_file() {
    let fixture = Fixture::new();
    fixture.jpeg("photo.jpg", 20, 20);
    fixture.png("photo.png", 20, 20);

    let summary = fixture.run(vec![BreakpointSpec::new("mobile", 10)]);

    assert_eq!(counts(&summary), (1, 0, 1));
    let failed: Vec<_> = summary.failures().collect();
    assert_eq!(failed[0].relative_path, Path::new("photo.png"));
    let OutcomeStatus::Failed { failures } = &failed[0].status else {
        panic!("expected a failed outcome");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].variant, "mobile");

    // The optimized copy of the later file is still written
    assert_eq!(
        fixture.outputs(),
        set(&["photo.jpg", "photo.png", "photo-mobile.webp"])
    );
}

#[test]
fn output_inside_input_is_rejected() {
    let fixture = Fixture::new();
    let mut config = fixture.config(breakpoints());
    config.output_folder = fixture.input.join("out/nested");

    let err = Pipeline::new(config).unwrap().run().unwrap_err();
    assert!(err.to_string().contains("must not be inside"));
    // Nothing is created in the source tree
    assert!(!fixture.input.join("out").exists());
}

#[cfg(unix)]
#[test]
fn dangling_link_fails_only_that_file() {
    let fixture = Fixture::new();
    fixture.jpeg("good.jpg", 16, 16);
    std::os::unix::fs::symlink(fixture.input.join("gone.png"), fixture.input.join("stale.png"))
        .unwrap();

    let summary = fixture.run(breakpoints());

    assert_eq!(counts(&summary), (1, 0, 1));
    let failed: Vec<_> = summary.failures().collect();
    assert_eq!(failed[0].relative_path, Path::new("stale.png"));
    assert_eq!(
        fixture.outputs(),
        set(&["good.jpg", "good-mobile.webp", "good-desktop.webp"])
    );
}

#[test]
fn dry_run_plan_writes_nothing() {
    let fixture = Fixture::new();
    fixture.jpeg("a.jpg", 8, 8);
    fixture.raw("b.txt", b"x");

    let planned = Pipeline::new(fixture.config(breakpoints())).unwrap().plan().unwrap();

    assert_eq!(planned.len(), 2);
    assert_eq!(planned[0].variants().len(), 3);
    assert!(planned[1].variants().is_empty());
    assert!(!fixture.output.exists());
}
