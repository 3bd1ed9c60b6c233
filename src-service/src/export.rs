//! Writing cropped results to disk.
//!
//! Files carry no orientation metadata, so the orientation tag is applied to
//! the pixels before encoding and saved images display upright.

use crate::capture::thumbnail::bgra_to_rgba_image;
use crate::capture::{CroppedResult, ExportError};
use camscan_common::ImageOrientation;
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbaImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported output encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    /// Format for a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(ExportError::UnsupportedFormat(ext)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Rotate/flip pixels so the image displays upright.
pub fn apply_orientation(img: RgbaImage, orientation: ImageOrientation) -> RgbaImage {
    match orientation {
        ImageOrientation::Up => img,
        ImageOrientation::Down => imageops::rotate180(&img),
        ImageOrientation::Left => imageops::rotate270(&img),
        ImageOrientation::Right => imageops::rotate90(&img),
        ImageOrientation::UpMirrored => imageops::flip_horizontal(&img),
        ImageOrientation::DownMirrored => imageops::flip_vertical(&img),
        ImageOrientation::LeftMirrored => imageops::flip_horizontal(&imageops::rotate90(&img)),
        ImageOrientation::RightMirrored => imageops::flip_horizontal(&imageops::rotate270(&img)),
    }
}

/// Save `result` to `path`, format chosen by extension.
pub fn save_result(result: &CroppedResult, path: &Path, jpeg_quality: u8) -> Result<(), ExportError> {
    let format = ExportFormat::from_path(path)?;
    let img = bgra_to_rgba_image(&result.data, result.width, result.height)?;
    let img = apply_orientation(img, result.orientation);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match format {
        ExportFormat::Png => img.save_with_format(path, image::ImageFormat::Png)?,
        ExportFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            let writer = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(writer, jpeg_quality.clamp(1, 100));
            encoder.encode_image(&rgb)?;
        }
    }

    info!(
        "Saved {}x{} result to {}",
        result.width,
        result.height,
        path.display()
    );
    Ok(())
}

/// Timestamped file name for a new scan, e.g. `scan_2026-01-16_09-30-00.jpg`.
pub fn scan_file_name(now: DateTime<Local>, format: ExportFormat) -> String {
    format!("scan_{}.{}", now.format("%Y-%m-%d_%H-%M-%S"), format.extension())
}

/// Path for a new scan inside `dir`.
pub fn default_output_path(dir: &Path, format: ExportFormat) -> PathBuf {
    dir.join(scan_file_name(Local::now(), format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result_2x1(orientation: ImageOrientation) -> CroppedResult {
        // Left pixel blue, right pixel red (BGRA)
        CroppedResult {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 0, 255, 255],
            orientation,
            crop_rect: None,
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.PNG")).unwrap(),
            ExportFormat::Png
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("scan.jpeg")).unwrap(),
            ExportFormat::Jpeg
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("scan.tiff")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_apply_orientation_right_rotates_clockwise() {
        let img = bgra_to_rgba_image(&result_2x1(ImageOrientation::Up).data, 2, 1).unwrap();
        let rotated = apply_orientation(img, ImageOrientation::Right);
        assert_eq!(rotated.dimensions(), (1, 2));
        // Left (blue) pixel ends up on top
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(rotated.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_apply_orientation_transpose() {
        let img = bgra_to_rgba_image(&result_2x1(ImageOrientation::Up).data, 2, 1).unwrap();
        let transposed = apply_orientation(img, ImageOrientation::LeftMirrored);
        assert_eq!(transposed.dimensions(), (1, 2));
        assert_eq!(transposed.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_save_png_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scan.png");

        save_result(&result_2x1(ImageOrientation::Up), &path, 90).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(loaded.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_save_jpeg_applies_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpg");

        save_result(&result_2x1(ImageOrientation::Left), &path, 80).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (1, 2));
    }

    #[test]
    fn test_scan_file_name() {
        let now = Local.with_ymd_and_hms(2026, 1, 16, 9, 30, 0).unwrap();
        assert_eq!(
            scan_file_name(now, ExportFormat::Jpeg),
            "scan_2026-01-16_09-30-00.jpg"
        );
    }
}
