//! Resize and normalize pixel images into the canonical comparison tensor.

use image::imageops::{self, FilterType};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::types::{
    EngineResult, NormalizedTensor, PixelImage, VerifyError, CANONICAL_CHANNELS, CANONICAL_SIZE,
};

/// Midpoint used to map `[0, 255]` onto `[-1, 1]`.
const INTENSITY_OFFSET: f32 = 127.5;

/// Resampling used when an image is not already canonical size.
///
/// `Nearest` is the reference behaviour. `Bilinear` gives smoother tensors but
/// changes numeric results, so scores are not comparable across the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
}

impl Resampling {
    fn filter(self) -> FilterType {
        match self {
            Resampling::Nearest => FilterType::Nearest,
            Resampling::Bilinear => FilterType::Triangle,
        }
    }
}

/// Produce a `224x224x3` tensor with values `(v - 127.5) / 127.5`.
pub fn preprocess(img: PixelImage, resampling: Resampling) -> EngineResult<NormalizedTensor> {
    let (w, h, channels) = (img.width(), img.height(), img.channels());
    if w == 0 || h == 0 {
        return Err(VerifyError::Preprocess(format!(
            "Image has zero extent ({w}x{h})"
        )));
    }
    if channels as usize != CANONICAL_CHANNELS {
        return Err(VerifyError::Preprocess(format!(
            "Expected {CANONICAL_CHANNELS} channels, got {channels}"
        )));
    }

    let rgb = img
        .into_rgb()
        .ok_or_else(|| VerifyError::Preprocess("Pixel buffer does not match its dimensions".to_string()))?;

    let size = CANONICAL_SIZE as u32;
    let rgb = if (w, h) == (size, size) {
        rgb
    } else {
        tracing::debug!("Resizing {w}x{h} to {size}x{size} ({resampling:?})");
        imageops::resize(&rgb, size, size, resampling.filter())
    };

    let mut tensor = Array3::<f32>::zeros((CANONICAL_SIZE, CANONICAL_SIZE, CANONICAL_CHANNELS));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..CANONICAL_CHANNELS {
            tensor[[y as usize, x as usize, c]] =
                (pixel[c] as f32 - INTENSITY_OFFSET) / INTENSITY_OFFSET;
        }
    }

    Ok(NormalizedTensor::from_array(tensor))
}
