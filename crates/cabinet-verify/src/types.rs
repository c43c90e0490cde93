//! Core data types flowing through a single cabinet verification.

use image::RgbImage;
use ndarray::{Array2, Array3, ArrayView3};
use serde::{Deserialize, Serialize};

/// Side length of the canonical square tensor every image is normalized into.
pub const CANONICAL_SIZE: usize = 224;

/// Channel count of every canonical tensor (RGB).
pub const CANONICAL_CHANNELS: usize = 3;

/// A decoded image as a flat, row-major, interleaved byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelImage {
    /// Build an image from raw parts.
    ///
    /// Fails when `data.len() != width * height * channels`. The channel count
    /// itself is not restricted here; the preprocessor rejects anything but RGB.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> EngineResult<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(VerifyError::Preprocess(format!(
                "Pixel buffer holds {} bytes, expected {expected} for {width}x{height}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Wrap an 8-bit RGB buffer from the `image` crate.
    pub fn from_rgb(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: CANONICAL_CHANNELS as u8,
            data: img.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert back into an `RgbImage`. Returns `None` unless the image has 3 channels.
    pub fn into_rgb(self) -> Option<RgbImage> {
        if self.channels as usize != CANONICAL_CHANNELS {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data)
    }
}

/// A `224x224x3` float tensor with values in `[-1, 1]`, laid out as `(y, x, c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array3<f32>,
}

impl NormalizedTensor {
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Shape as `[height, width, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        let (h, w, c) = self.data.dim();
        [h, w, c]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }
}

/// Per-pixel difference magnitude (mean over channels), laid out as `(y, x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMap {
    magnitudes: Array2<f32>,
}

impl DifferenceMap {
    pub fn from_array(magnitudes: Array2<f32>) -> Self {
        Self { magnitudes }
    }

    pub fn height(&self) -> usize {
        self.magnitudes.nrows()
    }

    pub fn width(&self) -> usize {
        self.magnitudes.ncols()
    }

    pub fn get(&self, y: usize, x: usize) -> f32 {
        self.magnitudes[[y, x]]
    }
}

/// A flagged grid cell in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Fraction of the cell's pixels above the per-pixel threshold.
    pub confidence: f64,
}

impl GridRegion {
    /// Closed-rectangle containment test.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// A catalogued tool judged likely missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingTool {
    pub tool_id: u64,
    pub confidence: f64,
}

/// Outcome of one verification, serialized in the shape collaborators consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub similarity_score: f64,
    pub confidence_score: f64,
    pub has_significant_difference: bool,
    pub difference_regions: Vec<GridRegion>,
    pub missing_tools: Vec<MissingTool>,
}

/// Errors a verification can end with. Exactly one is reported per failed call.
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Preprocess error: {0}")]
    Preprocess(String),

    #[error("Shape mismatch: reference {reference:?}, captured {captured:?}")]
    ShapeMismatch {
        reference: [usize; 3],
        captured: [usize; 3],
    },

    #[error("Verification cancelled")]
    Cancelled,
}

impl VerifyError {
    /// Taxonomy name as published to collaborators.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::ImageLoad(_) => "ImageLoadError",
            VerifyError::Preprocess(_) => "PreprocessError",
            VerifyError::ShapeMismatch { .. } => "ShapeMismatchError",
            VerifyError::Cancelled => "Cancelled",
        }
    }

    /// Whether the same call may succeed if retried (or re-captured).
    pub fn is_retryable(&self) -> bool {
        matches!(self, VerifyError::ImageLoad(_))
    }
}

impl From<image::ImageError> for VerifyError {
    fn from(e: image::ImageError) -> Self {
        VerifyError::ImageLoad(e.to_string())
    }
}

/// Convenience result type.
pub type EngineResult<T> = Result<T, VerifyError>;
