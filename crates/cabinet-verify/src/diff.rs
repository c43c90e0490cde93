//! Element-wise comparison of two canonical tensors.

use ndarray::{Array2, Axis, Zip};

use crate::types::{DifferenceMap, EngineResult, NormalizedTensor, VerifyError};

/// Above this similarity the score is trusted as the confidence.
const TRUSTED_SIMILARITY: f64 = 0.8;

/// Flat confidence reported for comparisons below the trusted band.
const UNTRUSTED_CONFIDENCE: f64 = 0.5;

/// Below this similarity the images are considered significantly different.
const SIGNIFICANT_SIMILARITY: f64 = 0.9;

/// Scores and per-pixel magnitudes from one tensor comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorComparison {
    pub similarity_score: f64,
    pub confidence_score: f64,
    pub has_significant_difference: bool,
    pub difference_map: DifferenceMap,
}

/// Compare `reference` against `captured`.
///
/// `similarity = 1 - mean(|reference - captured|)`, clamped to `[0, 1]`.
/// The difference map holds the per-pixel mean over channels.
pub fn compare_tensors(
    reference: &NormalizedTensor,
    captured: &NormalizedTensor,
) -> EngineResult<TensorComparison> {
    let (ref_shape, cap_shape) = (reference.shape(), captured.shape());
    if ref_shape != cap_shape {
        return Err(VerifyError::ShapeMismatch {
            reference: ref_shape,
            captured: cap_shape,
        });
    }

    let [h, w, c] = ref_shape;
    let abs_diff = Zip::from(&reference.view())
        .and(&captured.view())
        .map_collect(|a, b| (a - b).abs());

    // Sequential f64 sum keeps the score bit-identical run to run.
    let total: f64 = abs_diff.iter().map(|&d| d as f64).sum();
    let count = (h * w * c) as f64;
    let mean = if count > 0.0 { total / count } else { 0.0 };

    let similarity_score = (1.0 - mean).clamp(0.0, 1.0);
    let confidence_score = if similarity_score > TRUSTED_SIMILARITY {
        similarity_score
    } else {
        UNTRUSTED_CONFIDENCE
    };

    let magnitudes: Array2<f32> = if c > 0 {
        abs_diff.sum_axis(Axis(2)).mapv(|s| s / c as f32)
    } else {
        Array2::zeros((h, w))
    };

    Ok(TensorComparison {
        similarity_score,
        confidence_score,
        has_significant_difference: similarity_score < SIGNIFICANT_SIMILARITY,
        difference_map: DifferenceMap::from_array(magnitudes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn filled(value: f32) -> NormalizedTensor {
        NormalizedTensor::from_array(Array3::from_elem((224, 224, 3), value))
    }

    #[test]
    fn test_identical_tensors() {
        let t = filled(0.25);
        let cmp = compare_tensors(&t, &t).unwrap();
        assert_eq!(cmp.similarity_score, 1.0);
        assert_eq!(cmp.confidence_score, 1.0);
        assert!(!cmp.has_significant_difference);
        assert_eq!(cmp.difference_map.get(10, 10), 0.0);
    }

    #[test]
    fn test_opposite_tensors_clamp_to_zero() {
        let cmp = compare_tensors(&filled(1.0), &filled(-1.0)).unwrap();
        assert_eq!(cmp.similarity_score, 0.0);
        assert_eq!(cmp.confidence_score, 0.5);
        assert!(cmp.has_significant_difference);
        assert_eq!(cmp.difference_map.get(0, 0), 2.0);
    }

    #[test]
    fn test_confidence_bands() {
        // mean |diff| = 0.15 -> similarity 0.85: trusted, but significant
        let cmp = compare_tensors(&filled(0.0), &filled(0.15)).unwrap();
        assert!((cmp.similarity_score - 0.85).abs() < 1e-6);
        assert_eq!(cmp.confidence_score, cmp.similarity_score);
        assert!(cmp.has_significant_difference);

        // similarity 0.75: untrusted
        let cmp = compare_tensors(&filled(0.0), &filled(0.25)).unwrap();
        assert_eq!(cmp.confidence_score, 0.5);
    }

    #[test]
    fn test_map_is_channel_mean() {
        let a = NormalizedTensor::from_array(Array3::zeros((224, 224, 3)));
        let mut b = Array3::<f32>::zeros((224, 224, 3));
        b[[7, 9, 0]] = 0.9;
        let cmp = compare_tensors(&a, &NormalizedTensor::from_array(b)).unwrap();
        assert!((cmp.difference_map.get(7, 9) - 0.3).abs() < 1e-6);
        assert_eq!(cmp.difference_map.height(), 224);
        assert_eq!(cmp.difference_map.width(), 224);
    }

    #[test]
    fn test_shape_mismatch() {
        let small = NormalizedTensor::from_array(Array3::zeros((10, 10, 3)));
        let err = compare_tensors(&filled(0.0), &small).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::ShapeMismatch {
                reference: [224, 224, 3],
                captured: [10, 10, 3]
            }
        ));
    }
}
