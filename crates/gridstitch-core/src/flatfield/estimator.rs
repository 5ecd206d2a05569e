use ndarray::Array2;

use crate::error::{Result, StitchError};
use crate::filters::gaussian_blur::gaussian_blur_array;

/// Fits an illumination gain field from a stack of same-shape raw tiles.
///
/// The returned field has the tiles' shape; tiles are corrected by dividing
/// by it.
pub trait FlatfieldEstimator: Sync {
    fn fit(&self, stack: &[Array2<f32>]) -> Result<Array2<f32>>;
}

/// Per-pixel mean of the stack, Gaussian-smoothed and scaled to unit mean.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedMeanEstimator {
    /// Blur sigma as a fraction of the shorter tile side.
    pub smoothing: f32,
}

impl Default for SmoothedMeanEstimator {
    fn default() -> Self {
        Self {
            smoothing: crate::consts::DEFAULT_FLATFIELD_SMOOTHING,
        }
    }
}

impl FlatfieldEstimator for SmoothedMeanEstimator {
    fn fit(&self, stack: &[Array2<f32>]) -> Result<Array2<f32>> {
        let Some(first) = stack.first() else {
            return Err(StitchError::InvalidGeometry(
                "flatfield estimator received no tiles".into(),
            ));
        };
        let dim = first.dim();

        let mut sum = Array2::<f32>::zeros(dim);
        for tile in stack {
            if tile.dim() != dim {
                return Err(StitchError::InvalidGeometry(format!(
                    "flatfield sample is {:?}, expected {:?}",
                    tile.dim(),
                    dim
                )));
            }
            sum += tile;
        }
        sum /= stack.len() as f32;

        let sigma = self.smoothing * dim.0.min(dim.1) as f32;
        let mut field = gaussian_blur_array(&sum, sigma);

        let mean = field.mean().unwrap_or(0.0);
        if mean > f32::EPSILON {
            field /= mean;
        } else {
            field.fill(1.0);
        }
        Ok(field)
    }
}
