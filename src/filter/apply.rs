//! Zero-phase FIR application.
//!
//! Each row is padded with `N-1` odd-reflected samples per side, convolved
//! with the kernel in one FFT pass, shifted left by `(N-1)/2` and cropped
//! back to its original length.
use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{QualityError, Result};

/// Filter every row of `data` ([C, T]) in place.
pub fn apply_fir_zero_phase(data: &mut Array2<f32>, h: &[f32]) -> Result<()> {
    for mut row in data.rows_mut() {
        let filtered = filter_1d(row.view(), h)?;
        row.assign(&ArrayView1::from(&filtered));
    }
    Ok(())
}

/// Filter one signal; the output has the input's length.
pub fn filter_1d(x: ArrayView1<'_, f32>, h: &[f32]) -> Result<Vec<f32>> {
    if h.len() % 2 == 0 {
        return Err(QualityError::Configuration(format!(
            "zero-phase FIR needs an odd kernel, got {} taps",
            h.len()
        )));
    }
    let n_x = x.len();
    if n_x == 0 {
        return Ok(vec![]);
    }
    let edge = h.len() - 1;
    let padded = odd_reflect_pad(x, edge);
    let n_conv = padded.len() + h.len() - 1;
    let n_fft = n_conv.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fwd = planner.plan_fft_forward(n_fft);
    let inv = planner.plan_fft_inverse(n_fft);

    let mut xs = complex_buf(padded.iter().copied(), n_fft);
    let mut hs = complex_buf(h.iter().map(|&v| v as f64), n_fft);
    fwd.process(&mut xs);
    fwd.process(&mut hs);
    for (a, b) in xs.iter_mut().zip(&hs) {
        *a *= b;
    }
    inv.process(&mut xs);

    let scale = 1.0 / n_fft as f64;
    let start = edge + (h.len() - 1) / 2;
    Ok(xs[start..start + n_x].iter().map(|c| (c.re * scale) as f32).collect())
}

fn complex_buf(values: impl Iterator<Item = f64>, n_fft: usize) -> Vec<Complex<f64>> {
    let mut buf: Vec<Complex<f64>> = values.map(|re| Complex { re, im: 0.0 }).collect();
    buf.resize(n_fft, Complex::default());
    buf
}

/// Odd reflection about each end, limited to `n - 1` samples; the rest of a
/// longer request is zero-filled.
fn odd_reflect_pad(x: ArrayView1<'_, f32>, pad: usize) -> Vec<f64> {
    let n = x.len();
    let avail = pad.min(n - 1);
    let first = x[0] as f64;
    let last = x[n - 1] as f64;

    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend(std::iter::repeat(0.0).take(pad - avail));
    out.extend((1..=avail).rev().map(|i| 2.0 * first - x[i] as f64));
    out.extend(x.iter().map(|&v| v as f64));
    out.extend((1..=avail).map(|i| 2.0 * last - x[n - 1 - i] as f64));
    out.extend(std::iter::repeat(0.0).take(pad - avail));
    out
}
