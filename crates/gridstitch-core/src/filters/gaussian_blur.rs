use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Gaussian blur by separable 1D convolution with clamped borders.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_axis(data, &kernel, Axis(1));
    convolve_axis(&row_pass, &kernel, Axis(0))
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Convolve every lane along `axis` with `kernel`.
fn convolve_axis(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));
    let lane_axis = Axis(1 - axis.index());

    let convolve_lane = |(src, mut dst): (ndarray::ArrayView1<f32>, ndarray::ArrayViewMut1<f32>)| {
        let n = src.len() as isize;
        let radius = (kernel.len() / 2) as isize;
        for (i, out) in dst.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src_idx = (i as isize + ki as isize - radius).clamp(0, n - 1) as usize;
                sum += src[src_idx] * kv;
            }
            *out = sum;
        }
    };

    let lanes = data.axis_iter(lane_axis).zip(result.axis_iter_mut(lane_axis));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        lanes.par_bridge().for_each(convolve_lane);
    } else {
        lanes.for_each(convolve_lane);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalised() {
        let kernel = make_gaussian_kernel(2.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 13);
    }

    #[test]
    fn test_constant_image_unchanged() {
        let data = Array2::from_elem((20, 30), 7.0f32);
        let blurred = gaussian_blur_array(&data, 3.0);
        for &v in blurred.iter() {
            assert!((v - 7.0).abs() < 1e-4);
        }
    }
}
