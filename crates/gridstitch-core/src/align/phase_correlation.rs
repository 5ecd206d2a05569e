//! Translation registration by FFT phase correlation with upsampled DFT
//! refinement (Guizar-Sicairos et al., 2008).
//!
//! 1. **Coarse**: peak of the inverse FFT of the normalised cross-power
//!    spectrum gives the integer-pixel shift.
//! 2. **Fine**: the same correlation is evaluated by matrix-multiply DFT on a
//!    `1/upsample_factor` grid inside a small window around the coarse peak.
//!
//! Reference: "Efficient subpixel image registration algorithms",
//!            M. Guizar-Sicairos, S. T. Thurman, J. R. Fienup, Optics Letters 33(2), 2008.

use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::TAU;

use crate::consts::REGISTRATION_SEARCH_WINDOW;
use crate::error::{Result, StitchError};

/// Sub-pixel shift, in pixels, that registers the moving image onto the
/// reference: content displaced by `(+a, +b)` in `moving` yields `(-a, -b)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistrationOffset {
    pub dy: f64,
    pub dx: f64,
}

impl RegistrationOffset {
    pub fn is_finite(&self) -> bool {
        self.dy.is_finite() && self.dx.is_finite()
    }
}

/// Phase cross-correlation between two equally sized images.
///
/// `upsample_factor <= 1` returns the integer-pixel estimate.
pub fn phase_cross_correlation(
    reference: ArrayView2<f32>,
    moving: ArrayView2<f32>,
    upsample_factor: usize,
) -> Result<RegistrationOffset> {
    let (h, w) = reference.dim();
    let (mh, mw) = moving.dim();
    if h != mh || w != mw {
        return Err(StitchError::InvalidGeometry(format!(
            "registration regions differ in size: {}x{} vs {}x{}",
            w, h, mw, mh
        )));
    }
    if h == 0 || w == 0 {
        return Err(StitchError::InvalidGeometry(
            "registration region is empty".into(),
        ));
    }

    let ref_fft = fft2d(reference);
    let mov_fft = fft2d(moving);
    let cross_power = normalized_cross_power(&ref_fft, &mov_fft);
    let correlation = ifft2d_real(&cross_power);

    let (peak_row, peak_col) = find_peak(&correlation);

    // Peaks past the midpoint are negative shifts (wrap-around)
    let coarse_dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let coarse_dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    if upsample_factor <= 1 {
        return Ok(RegistrationOffset {
            dy: coarse_dy,
            dx: coarse_dx,
        });
    }

    let upsample = upsample_factor as f64;
    let region = (REGISTRATION_SEARCH_WINDOW * upsample).ceil() as usize;
    let center = (region / 2) as f64;

    let positions = |coarse: f64| -> Array1<f64> {
        Array1::from_shape_fn(region, |j| coarse + (j as f64 - center) / upsample)
    };
    let rows_at = positions(coarse_dy);
    let cols_at = positions(coarse_dx);

    let row_kernel = dft_kernel(h, &rows_at);
    let col_kernel = dft_kernel(w, &cols_at);

    // (region, h) x (h, w) x (w, region)
    let upsampled = row_kernel.t().dot(&cross_power).dot(&col_kernel);

    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((r, c), value) in upsampled.indexed_iter() {
        let magnitude = value.norm();
        if magnitude > best_val {
            best_val = magnitude;
            best = (r, c);
        }
    }

    Ok(RegistrationOffset {
        dy: rows_at[best.0],
        dx: cols_at[best.1],
    })
}

/// Inverse-DFT kernel of shape `(n, positions)` evaluating a length-`n`
/// spectrum at arbitrary (fractional) spatial positions.
fn dft_kernel(n: usize, positions: &Array1<f64>) -> Array2<Complex<f64>> {
    Array2::from_shape_fn((n, positions.len()), |(k, j)| {
        let freq = fft_frequency(k, n);
        let phase = TAU * freq * positions[j] / n as f64;
        Complex::new(phase.cos(), phase.sin())
    })
}

/// Signed frequency index of FFT bin `k`, matching numpy's `fftfreq(n) * n`.
fn fft_frequency(k: usize, n: usize) -> f64 {
    if k < n.div_ceil(2) {
        k as f64
    } else {
        k as f64 - n as f64
    }
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: ArrayView2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v as f64, 0.0));

    for mut row in result.rows_mut() {
        let mut buf = row.to_vec();
        fft_row.process(&mut buf);
        row.assign(&Array1::from(buf));
    }
    for mut col in result.columns_mut() {
        let mut buf = col.to_vec();
        fft_col.process(&mut buf);
        col.assign(&Array1::from(buf));
    }

    result
}

/// Inverse 2D FFT, real part, normalised by the element count.
fn ifft2d_real(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    for mut col in work.columns_mut() {
        let mut buf = col.to_vec();
        ifft_col.process(&mut buf);
        col.assign(&Array1::from(buf));
    }
    for mut row in work.rows_mut() {
        let mut buf = row.to_vec();
        ifft_row.process(&mut buf);
        row.assign(&Array1::from(buf));
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|v| v.re * scale)
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    mov_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = ref_fft * &mov_fft.mapv(|v| v.conj());
    result.mapv_inplace(|cross| {
        let mag = cross.norm();
        if mag > 1e-12 {
            cross / mag
        } else {
            Complex::new(0.0, 0.0)
        }
    });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &value) in data.indexed_iter() {
        if value > best_val {
            best_val = value;
            best = (row, col);
        }
    }
    best
}
