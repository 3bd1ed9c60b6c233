//! Foreground masking and contour detection seams.
//!
//! Segmentation and contour extraction are provided by external
//! implementations; this module only defines their interfaces and the
//! mask-then-detect orchestration.

use crate::capture::{RawCapturedImage, BYTES_PER_PIXEL};
use camscan_common::ImageOrientation;
use std::fmt;
use tracing::{debug, warn};

/// Errors from the contour pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ContourError {
    /// Mask dimensions differ from the image
    MaskSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// Segmentation request failed
    Masking(String),
    /// Contour extraction failed
    Detection(String),
}

impl fmt::Display for ContourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContourError::MaskSizeMismatch { expected, actual } => write!(
                f,
                "Mask is {}x{}, image is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            ContourError::Masking(msg) => write!(f, "Foreground masking failed: {}", msg),
            ContourError::Detection(msg) => write!(f, "Contour detection failed: {}", msg),
        }
    }
}

impl std::error::Error for ContourError {}

impl From<ContourError> for String {
    fn from(err: ContourError) -> String {
        err.to_string()
    }
}

/// Per-pixel foreground weights in `0.0..=1.0`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl Mask {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, ContourError> {
        let len = width as usize * height as usize;
        if values.len() != len {
            return Err(ContourError::Masking(format!(
                "expected {} mask values, got {}",
                len,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Apply to `image` in place. Alpha is scaled by the mask weight, so
    /// pixels outside the mask become fully transparent.
    pub fn apply(&self, image: &mut RawCapturedImage) -> Result<(), ContourError> {
        if (self.width, self.height) != (image.width, image.height) {
            return Err(ContourError::MaskSizeMismatch {
                expected: (image.width, image.height),
                actual: (self.width, self.height),
            });
        }

        for (pixel, weight) in image
            .data
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(self.values.iter())
        {
            let weight = weight.clamp(0.0, 1.0);
            pixel[3] = (pixel[3] as f32 * weight).round() as u8;
        }
        Ok(())
    }
}

/// A closed polyline in normalized image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<(f32, f32)>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourSettings {
    pub contrast_adjustment: f32,
    pub contrast_pivot: f32,
    /// Orientation the detector reads the image in
    pub orientation: ImageOrientation,
}

impl Default for ContourSettings {
    fn default() -> Self {
        Self {
            contrast_adjustment: 2.0,
            contrast_pivot: 0.5,
            orientation: ImageOrientation::DownMirrored,
        }
    }
}

/// Produces a foreground mask. `Ok(None)` means no foreground was found.
pub trait ForegroundMasker: Send + Sync {
    fn mask(&self, image: &RawCapturedImage) -> Result<Option<Mask>, ContourError>;
}

/// Extracts contours from an image.
pub trait ContourDetector: Send + Sync {
    fn detect(
        &self,
        image: &RawCapturedImage,
        settings: &ContourSettings,
    ) -> Result<Vec<Contour>, ContourError>;
}

/// Output of [`ContourPipeline::run`].
#[derive(Debug, Clone)]
pub struct ContourOutput {
    /// Image the detector ran on (masked when a mask was applied)
    pub image: RawCapturedImage,
    pub masked: bool,
    pub contours: Vec<Contour>,
}

/// Mask, then detect.
pub struct ContourPipeline<M, D> {
    masker: M,
    detector: D,
    settings: ContourSettings,
}

impl<M: ForegroundMasker, D: ContourDetector> ContourPipeline<M, D> {
    pub fn new(masker: M, detector: D) -> Self {
        Self {
            masker,
            detector,
            settings: ContourSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ContourSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ContourSettings {
        &self.settings
    }

    pub fn run(&self, mut image: RawCapturedImage) -> Result<ContourOutput, ContourError> {
        let masked = match self.masker.mask(&image) {
            Ok(Some(mask)) => {
                mask.apply(&mut image)?;
                true
            }
            Ok(None) => {
                debug!("No foreground found, detecting on full image");
                false
            }
            Err(e) => {
                warn!("{}. Continuing with unmasked image.", e);
                false
            }
        };

        let contours = self.detector.detect(&image, &self.settings)?;
        debug!("Detected {} contours (masked: {})", contours.len(), masked);

        Ok(ContourOutput {
            image,
            masked,
            contours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn image(width: u32, height: u32) -> RawCapturedImage {
        let data = vec![128u8; (width * height * 4) as usize];
        RawCapturedImage::new(width, height, data, ImageOrientation::Up).unwrap()
    }

    enum MaskBehavior {
        Weights(Mask),
        Nothing,
        Fail,
    }

    struct FakeMasker(MaskBehavior);

    impl ForegroundMasker for FakeMasker {
        fn mask(&self, _image: &RawCapturedImage) -> Result<Option<Mask>, ContourError> {
            match &self.0 {
                MaskBehavior::Weights(mask) => Ok(Some(mask.clone())),
                MaskBehavior::Nothing => Ok(None),
                MaskBehavior::Fail => Err(ContourError::Masking("model unavailable".into())),
            }
        }
    }

    /// Records the alpha channel and settings it was given.
    #[derive(Default)]
    struct RecordingDetector {
        seen_alpha: Mutex<Vec<u8>>,
        seen_settings: Mutex<Option<ContourSettings>>,
    }

    impl ContourDetector for &RecordingDetector {
        fn detect(
            &self,
            image: &RawCapturedImage,
            settings: &ContourSettings,
        ) -> Result<Vec<Contour>, ContourError> {
            *self.seen_alpha.lock().unwrap() = image.data.chunks(4).map(|p| p[3]).collect();
            *self.seen_settings.lock().unwrap() = Some(*settings);
            Ok(vec![Contour {
                points: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
            }])
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ContourSettings::default();
        assert_eq!(settings.contrast_adjustment, 2.0);
        assert_eq!(settings.contrast_pivot, 0.5);
        assert_eq!(settings.orientation, ImageOrientation::DownMirrored);
    }

    #[test]
    fn test_mask_scales_alpha() {
        let mut img = image(2, 1);
        img.data[3] = 200;
        img.data[7] = 200;
        let mask = Mask::new(2, 1, vec![0.0, 0.5]).unwrap();
        mask.apply(&mut img).unwrap();
        assert_eq!(img.data[3], 0);
        assert_eq!(img.data[7], 100);
        // Color channels untouched
        assert_eq!(img.data[4], 128);
    }

    #[test]
    fn test_mask_size_mismatch() {
        let mut img = image(2, 2);
        let mask = Mask::new(1, 1, vec![1.0]).unwrap();
        assert_eq!(
            mask.apply(&mut img),
            Err(ContourError::MaskSizeMismatch {
                expected: (2, 2),
                actual: (1, 1)
            })
        );
    }

    #[test]
    fn test_mask_value_count_checked() {
        assert!(Mask::new(2, 2, vec![1.0]).is_err());
    }

    #[test]
    fn test_pipeline_applies_mask_before_detection() {
        let detector = RecordingDetector::default();
        let mask = Mask::new(2, 1, vec![1.0, 0.0]).unwrap();
        let pipeline = ContourPipeline::new(FakeMasker(MaskBehavior::Weights(mask)), &detector);

        let output = pipeline.run(image(2, 1)).unwrap();
        assert!(output.masked);
        assert_eq!(output.contours.len(), 1);
        assert_eq!(*detector.seen_alpha.lock().unwrap(), vec![128, 0]);
        assert_eq!(
            *detector.seen_settings.lock().unwrap(),
            Some(ContourSettings::default())
        );
    }

    #[test]
    fn test_pipeline_continues_when_masking_fails() {
        let detector = RecordingDetector::default();
        let pipeline = ContourPipeline::new(FakeMasker(MaskBehavior::Fail), &detector);

        let output = pipeline.run(image(2, 1)).unwrap();
        assert!(!output.masked);
        assert_eq!(*detector.seen_alpha.lock().unwrap(), vec![128, 128]);
    }

    #[test]
    fn test_pipeline_without_foreground() {
        let detector = RecordingDetector::default();
        let settings = ContourSettings {
            contrast_adjustment: 1.0,
            ..ContourSettings::default()
        };
        let pipeline =
            ContourPipeline::new(FakeMasker(MaskBehavior::Nothing), &detector).with_settings(settings);

        let output = pipeline.run(image(3, 3)).unwrap();
        assert!(!output.masked);
        assert_eq!(*detector.seen_settings.lock().unwrap(), Some(settings));
    }

    #[test]
    fn test_mismatched_mask_fails_pipeline() {
        let detector = RecordingDetector::default();
        let mask = Mask::new(1, 1, vec![1.0]).unwrap();
        let pipeline = ContourPipeline::new(FakeMasker(MaskBehavior::Weights(mask)), &detector);

        assert!(matches!(
            pipeline.run(image(2, 2)),
            Err(ContourError::MaskSizeMismatch { .. })
        ));
    }
}
