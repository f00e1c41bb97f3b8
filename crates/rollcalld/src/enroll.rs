//! Gallery enrollment from the one-image-per-identity directory.
//!
//! The filename stem is the student id. Only the first detected face of
//! an image is enrolled; images with no detectable face are skipped with
//! a diagnostic. No single bad image aborts the load.

use std::path::Path;

use rollcall_core::{FaceOracle, Gallery, GalleryError, OracleError};
use thiserror::Error;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("no face detected in enrollment image")]
    NoFace,
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
}

/// Counts from one directory load. Partial success is normal.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadReport {
    pub enrolled: usize,
    pub no_face: usize,
    pub failed: usize,
}

/// Whether the extension names a supported enrollment image.
fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|s| *s == e)
        })
        .unwrap_or(false)
}

/// Enroll one image file: decode, detect, keep the first face's descriptor.
pub fn enroll_image(
    path: &Path,
    identity: &str,
    oracle: &dyn FaceOracle,
    gallery: &Gallery,
) -> Result<(), EnrollError> {
    let image = image::open(path)?.to_rgb8();
    let regions = oracle.detect(&image)?;
    let first = regions.first().ok_or(EnrollError::NoFace)?;
    let descriptor = oracle.encode(&image, first)?.ok_or(EnrollError::NoFace)?;
    gallery.add(identity, descriptor)?;
    Ok(())
}

/// Scan `dir` for supported images and enroll each, filename stem as
/// identity. Files are visited in name order so gallery order (and
/// therefore tie-breaking) is stable across runs.
pub fn load_gallery(dir: &Path, oracle: &dyn FaceOracle, gallery: &Gallery) -> LoadReport {
    let mut report = LoadReport::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(dir = %dir.display(), %error, "enrollment directory unreadable");
            return report;
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort();

    for path in paths {
        let Some(identity) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
        else {
            continue;
        };

        match enroll_image(&path, &identity, oracle, gallery) {
            Ok(()) => {
                tracing::info!(identity = %identity, file = %path.display(), "enrolled face");
                report.enrolled += 1;
            }
            Err(EnrollError::NoFace) => {
                tracing::warn!(file = %path.display(), "no face found, skipping");
                report.no_face += 1;
            }
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "enrollment failed, skipping");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        enrolled = report.enrolled,
        no_face = report.no_face,
        failed = report.failed,
        "gallery load complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use rollcall_core::{Descriptor, FaceRegion};
    use std::path::PathBuf;

    /// Oracle that "finds" one face per image, except in images whose
    /// top-left pixel is black, which count as faceless.
    struct StubOracle;

    impl FaceOracle for StubOracle {
        fn detect(&self, image: &RgbImage) -> Result<Vec<FaceRegion>, OracleError> {
            if image.get_pixel(0, 0).0 == [0, 0, 0] {
                return Ok(Vec::new());
            }
            Ok(vec![FaceRegion { x: 0, y: 0, width: 2, height: 2 }])
        }

        fn encode(
            &self,
            image: &RgbImage,
            _region: &FaceRegion,
        ) -> Result<Option<Descriptor>, OracleError> {
            let p = image.get_pixel(0, 0).0;
            Ok(Some(Descriptor::new(vec![p[0] as f32, p[1] as f32])))
        }
    }

    fn write_png(dir: &Path, name: &str, pixel: [u8; 3]) -> PathBuf {
        let mut img = RgbImage::new(4, 4);
        for p in img.pixels_mut() {
            p.0 = pixel;
        }
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_gallery_stem_as_identity() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "1001.png", [10, 20, 0]);
        write_png(dir.path(), "1002.jpg", [30, 40, 0]);

        let gallery = Gallery::new();
        let report = load_gallery(dir.path(), &StubOracle, &gallery);

        assert_eq!(report.enrolled, 2);
        let snap = gallery.snapshot();
        assert_eq!(snap.entries()[0].identity, "1001");
        assert_eq!(snap.entries()[1].identity, "1002");
    }

    #[test]
    fn test_zero_face_image_skipped_without_failing_load() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "1001.png", [10, 20, 0]);
        write_png(dir.path(), "blank.png", [0, 0, 0]); // faceless

        let gallery = Gallery::new();
        let report = load_gallery(dir.path(), &StubOracle, &gallery);

        assert_eq!(report.enrolled, 1);
        assert_eq!(report.no_face, 1);
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_unsupported_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "1001.png", [10, 20, 0]);
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

        let gallery = Gallery::new();
        let report = load_gallery(dir.path(), &StubOracle, &gallery);

        // .txt ignored entirely; broken.jpg counted as failed; load survives.
        assert_eq!(report.enrolled, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_missing_directory_yields_empty_report() {
        let gallery = Gallery::new();
        let report = load_gallery(Path::new("/nonexistent/faces"), &StubOracle, &gallery);
        assert_eq!(report.enrolled, 0);
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_extension_matching_case_insensitive() {
        assert!(is_supported(Path::new("a.JPG")));
        assert!(is_supported(Path::new("a.jpeg")));
        assert!(is_supported(Path::new("a.PnG")));
        assert!(!is_supported(Path::new("a.gif")));
        assert!(!is_supported(Path::new("noext")));
    }
}
