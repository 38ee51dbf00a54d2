//! FFT resampling to the pipeline's target rate.
//!
//! Per channel:
//!   1. Odd-reflect pad to the next power of two above `n + 2·min(n/8, 100)`.
//!   2. FFT, keep the half spectrum up to the new Nyquist (or zero-extend it).
//!   3. Fold the Nyquist bin (×2 when shrinking, ×½ when growing).
//!   4. Inverse FFT at the new padded length, scaled by `new / old`.
//!   5. Crop the resampled padding.
use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{QualityError, Result};

/// Left/right padding that brings `n` to the next power of two with at
/// least `2·min(n/8, 100)` extra samples.
pub fn auto_npad(n: usize) -> (usize, usize) {
    let min_add = (n / 8).min(100) * 2;
    let total = (n + min_add).next_power_of_two() - n;
    (total / 2, total - total / 2)
}

/// Output length for `n` samples resampled by `ratio`.
pub fn final_length(n: usize, ratio: f64) -> usize {
    (ratio * n as f64).round() as usize
}

/// Resample `data` ([C, T]) from `src_sfreq` to `dst_sfreq`.
///
/// Returns a copy when the rates agree within 1 mHz.
pub fn resample(data: &Array2<f32>, src_sfreq: f32, dst_sfreq: f32) -> Result<Array2<f32>> {
    for rate in [src_sfreq, dst_sfreq] {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(QualityError::InvalidSampleRate(rate));
        }
    }
    if (src_sfreq - dst_sfreq).abs() < 1e-3 {
        return Ok(data.clone());
    }
    let ratio = dst_sfreq as f64 / src_sfreq as f64;
    let n_out = final_length(data.ncols(), ratio);
    if n_out == 0 {
        return Err(QualityError::EmptyRecording);
    }

    let mut out = Array2::<f32>::zeros((data.nrows(), n_out));
    for (src, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
        dst.assign(&ArrayView1::from(&resample_1d(src, ratio)?));
    }
    Ok(out)
}

/// Resample one signal by `ratio = dst / src`.
pub fn resample_1d(x: ArrayView1<'_, f32>, ratio: f64) -> Result<Vec<f32>> {
    let n_in = x.len();
    if n_in == 0 {
        return Ok(vec![]);
    }
    let n_out = final_length(n_in, ratio);
    let (npad_l, npad_r) = auto_npad(n_in);
    let pad_l = npad_l.min(n_in - 1);
    let pad_r = npad_r.min(n_in - 1);

    let first = x[0] as f64;
    let last = x[n_in - 1] as f64;
    let mut buf: Vec<Complex<f64>> = (1..=pad_l)
        .rev()
        .map(|i| 2.0 * first - x[i] as f64)
        .chain(x.iter().map(|&v| v as f64))
        .chain((1..=pad_r).map(|i| 2.0 * last - x[n_in - 1 - i] as f64))
        .map(|re| Complex { re, im: 0.0 })
        .collect();
    let old_len = buf.len();
    let new_len = final_length(old_len, ratio);
    if new_len == 0 {
        return Err(QualityError::EmptyRecording);
    }

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(old_len).process(&mut buf);

    let half = (old_len / 2 + 1).min(new_len / 2 + 1);
    let mut spec = vec![Complex::<f64>::default(); new_len];
    spec[..half].copy_from_slice(&buf[..half]);

    let shrinking = new_len < old_len;
    let fold_len = if shrinking { new_len } else { old_len };
    if fold_len % 2 == 0 && fold_len / 2 < half {
        spec[fold_len / 2] *= if shrinking { 2.0 } else { 0.5 };
    }
    // Hermitian mirror of the kept half spectrum.
    for k in 1..(new_len + 1) / 2 {
        spec[new_len - k] = spec[k].conj();
    }

    planner.plan_fft_inverse(new_len).process(&mut spec);
    let scale = (new_len as f64 / old_len as f64) / new_len as f64;

    let crop_l = (ratio * npad_l as f64).round() as usize;
    let mut out: Vec<f32> = spec
        .iter()
        .skip(crop_l)
        .take(n_out)
        .map(|c| (c.re * scale) as f32)
        .collect();
    out.resize(n_out, 0.0);
    Ok(out)
}
