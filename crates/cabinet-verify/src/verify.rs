//! The verification pipeline: decode, preprocess, diff, analyze, match.

use crate::cancel::CancelToken;
use crate::catalog::ToolCatalog;
use crate::config::VerifyConfig;
use crate::decode::{load_image, ImageRef};
use crate::diff::compare_tensors;
use crate::grid::{GridAnalyzer, GridResolution};
use crate::matcher::find_missing_tools;
use crate::preprocess::preprocess;
use crate::resources::SharedResources;
use crate::types::{EngineResult, PixelImage, VerificationResult, VerifyError};

/// Runs verifications with a fixed configuration. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Load both images and compare them against the catalog.
    ///
    /// `grid` overrides the configured resolution. The first failing stage
    /// ends the call; no partial result is returned.
    pub async fn verify(
        &self,
        reference: &ImageRef,
        captured: &ImageRef,
        catalog: &ToolCatalog,
        grid: Option<GridResolution>,
        cancel: &CancelToken,
    ) -> EngineResult<VerificationResult> {
        let resources = SharedResources::acquire();
        let timeout = self.config.fetch_timeout();

        cancel.check()?;
        tracing::debug!("Loading reference image: {}", reference.describe());
        let reference_img = cancel
            .guard(load_image(reference, &resources, timeout))
            .await?;

        cancel.check()?;
        tracing::debug!("Loading captured image: {}", captured.describe());
        let captured_img = cancel
            .guard(load_image(captured, &resources, timeout))
            .await?;

        let verifier = self.clone();
        let catalog = catalog.clone();
        let token = cancel.clone();
        let comparison = tokio::task::spawn_blocking(move || {
            verifier.compare_with(&resources, reference_img, captured_img, &catalog, grid, &token)
        });

        // The blocking job stops at its next stage or cell check once cancelled.
        cancel
            .guard(async move {
                comparison.await.map_err(|e| {
                    VerifyError::Preprocess(format!("Comparison task failed: {e}"))
                })?
            })
            .await
    }

    /// Compare two already-decoded images on the calling thread. Pixel buffers are consumed.
    pub fn compare(
        &self,
        reference: PixelImage,
        captured: PixelImage,
        catalog: &ToolCatalog,
        grid: Option<GridResolution>,
        cancel: &CancelToken,
    ) -> EngineResult<VerificationResult> {
        let resources = SharedResources::acquire();
        self.compare_with(&resources, reference, captured, catalog, grid, cancel)
    }

    fn compare_with(
        &self,
        resources: &SharedResources,
        reference: PixelImage,
        captured: PixelImage,
        catalog: &ToolCatalog,
        grid: Option<GridResolution>,
        cancel: &CancelToken,
    ) -> EngineResult<VerificationResult> {
        let grid = grid.unwrap_or(self.config.grid_resolution);

        cancel.check()?;
        tracing::debug!(
            "Preprocessing {}x{} reference and {}x{} capture",
            reference.width(),
            reference.height(),
            captured.width(),
            captured.height()
        );
        let reference_tensor = preprocess(reference, self.config.resampling)?;
        let captured_tensor = preprocess(captured, self.config.resampling)?;

        cancel.check()?;
        let comparison = compare_tensors(&reference_tensor, &captured_tensor)?;
        drop(reference_tensor);
        drop(captured_tensor);
        tracing::debug!("Similarity {:.4}", comparison.similarity_score);

        cancel.check()?;
        let analyzer = GridAnalyzer::new(grid)
            .with_thresholds(self.config.pixel_threshold, self.config.cell_ratio_threshold);
        let regions = resources.install(|| analyzer.analyze(&comparison.difference_map, cancel))?;

        cancel.check()?;
        let missing_tools = find_missing_tools(catalog, &regions, self.config.confidence_policy);

        tracing::info!(
            "Verification done: similarity={:.4}, regions={}, missing={}/{} tools",
            comparison.similarity_score,
            regions.len(),
            missing_tools.len(),
            catalog.len()
        );

        Ok(VerificationResult {
            similarity_score: comparison.similarity_score,
            confidence_score: comparison.confidence_score,
            has_significant_difference: comparison.has_significant_difference,
            difference_regions: regions,
            missing_tools,
        })
    }
}

/// One-shot verification with the default configuration and no cancellation.
pub async fn verify(
    reference: &ImageRef,
    captured: &ImageRef,
    catalog: &ToolCatalog,
    grid: Option<GridResolution>,
) -> EngineResult<VerificationResult> {
    Verifier::default()
        .verify(reference, captured, catalog, grid, &CancelToken::new())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolRecord;
    use image::{Rgb, RgbImage};

    fn white() -> PixelImage {
        PixelImage::from_rgb(RgbImage::from_pixel(224, 224, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let err = Verifier::default()
            .compare(white(), white(), &ToolCatalog::default(), None, &token)
            .unwrap_err();
        assert_eq!(err.kind(), "Cancelled");
    }

    #[test]
    fn test_preprocess_failure_is_surfaced() {
        let bad = PixelImage::from_raw(224, 224, 1, vec![0; 224 * 224]).unwrap();
        let err = Verifier::default()
            .compare(white(), bad, &ToolCatalog::default(), None, &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), "PreprocessError");
    }

    #[test]
    fn test_grid_override() {
        let mut captured = RgbImage::from_pixel(224, 224, Rgb([255, 255, 255]));
        for y in 0..112 {
            for x in 0..112 {
                captured.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let catalog =
            ToolCatalog::from_records(&[ToolRecord::positioned(1, 0.1, 0.1, 0.1, 0.1)]).unwrap();
        let result = Verifier::default()
            .compare(
                white(),
                PixelImage::from_rgb(captured),
                &catalog,
                GridResolution::new(2),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(result.difference_regions.len(), 1);
        assert_eq!(result.difference_regions[0].width, 0.5);
        assert_eq!(result.missing_tools.len(), 1);
    }
}
