//! Welch power spectral density.
//!
//! Algorithm (one-sided density, matching `scipy.signal.welch` defaults):
//!   1. Split each channel into segments of `nperseg` samples, 50 % overlap.
//!   2. Remove each segment's mean, multiply by a periodic Hann window.
//!   3. FFT, take `|X|²` for bins `0..=nperseg/2`.
//!   4. Scale by `1 / (fs · Σw²)` and double every bin except DC and Nyquist.
//!   5. Average over segments.
//!
//! Units: input µV → output µV²/Hz.
use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{QualityError, Result};

/// PSD of one segment: frequency axis and `[C, F]` power.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Increasing frequencies in Hz, length `F`.
    pub freqs: Array1<f64>,
    /// `[C, F]` power in µV²/Hz.
    pub power: Array2<f64>,
}

impl PowerSpectrum {
    /// Build a spectrum, checking that the axis matches the power columns.
    pub fn new(freqs: Array1<f64>, power: Array2<f64>) -> Result<Self> {
        if freqs.len() != power.ncols() {
            return Err(QualityError::ShapeMismatch(format!(
                "{} frequencies for {} power columns",
                freqs.len(),
                power.ncols()
            )));
        }
        Ok(Self { freqs, power })
    }

    /// Collapse an `[E, C, F]` estimate to its first epoch slice.
    ///
    /// Adapter for estimators that return one power matrix per epoch, as
    /// consumed by [`crate::bad_leads::BadLeadDetector::detect_with_epoch_psd`].
    pub fn from_epochs(freqs: Array1<f64>, power: &Array3<f64>) -> Result<Self> {
        if power.shape()[0] == 0 {
            return Err(QualityError::ShapeMismatch("PSD has no epoch slice".into()));
        }
        Self::new(freqs, power.index_axis(Axis(0), 0).to_owned())
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.power.nrows()
    }

    /// Frequency resolution in Hz (0 for a single-bin axis).
    pub fn resolution(&self) -> f64 {
        if self.freqs.len() < 2 { 0.0 } else { self.freqs[1] - self.freqs[0] }
    }

    /// Indices of the bins inside `[lo, hi]`, inclusive on both ends.
    pub fn band_indices(&self, lo: f64, hi: f64) -> Vec<usize> {
        self.freqs
            .iter()
            .enumerate()
            .filter(|(_, &f)| f >= lo && f <= hi)
            .map(|(i, _)| i)
            .collect()
    }

    /// Copy restricted to the given channel rows, in the given order.
    pub fn select_channels(&self, rows: &[usize]) -> PowerSpectrum {
        PowerSpectrum { freqs: self.freqs.clone(), power: self.power.select(Axis(0), rows) }
    }
}

/// Reusable Welch estimator with a fixed segment length.
///
/// Holding `nperseg` in the estimator keeps the frequency axis identical for
/// every epoch of a run.
#[derive(Clone)]
pub struct Welch {
    nperseg: usize,
    noverlap: usize,
    window: Vec<f64>,
    win_power: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Welch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Welch")
            .field("nperseg", &self.nperseg)
            .field("noverlap", &self.noverlap)
            .finish()
    }
}

impl Welch {
    /// Estimator with `nperseg`-sample segments and 50 % overlap.
    pub fn new(nperseg: usize) -> Result<Self> {
        if nperseg < 2 {
            return Err(QualityError::Configuration(format!(
                "welch segment of {nperseg} samples is too short"
            )));
        }
        let window = hann_periodic(nperseg);
        let win_power = window.iter().map(|w| w * w).sum();
        let fft = FftPlanner::new().plan_fft_forward(nperseg);
        Ok(Self { nperseg, noverlap: nperseg / 2, window, win_power, fft })
    }

    /// Estimator whose segment spans `window_sec` seconds at `sfreq`.
    pub fn with_duration(window_sec: f32, sfreq: f32) -> Result<Self> {
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(QualityError::InvalidSampleRate(sfreq));
        }
        Self::new((window_sec * sfreq).round() as usize)
    }

    #[inline]
    pub fn nperseg(&self) -> usize {
        self.nperseg
    }

    /// Frequency axis produced at `sfreq`: `k · sfreq / nperseg`.
    pub fn freqs(&self, sfreq: f32) -> Array1<f64> {
        let df = sfreq as f64 / self.nperseg as f64;
        Array1::from_shape_fn(self.nperseg / 2 + 1, |k| k as f64 * df)
    }

    /// PSD of every row of `data` ([C, T]).
    pub fn estimate(&self, data: ArrayView2<'_, f32>, sfreq: f32) -> Result<PowerSpectrum> {
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(QualityError::InvalidSampleRate(sfreq));
        }
        let n_t = data.ncols();
        if n_t < self.nperseg {
            return Err(QualityError::InsufficientSamples {
                required: self.nperseg,
                available: n_t,
            });
        }

        let step = self.nperseg - self.noverlap;
        let n_seg = (n_t - self.nperseg) / step + 1;
        let n_freq = self.nperseg / 2 + 1;
        let scale = 1.0 / (sfreq as f64 * self.win_power * n_seg as f64);

        let mut power = Array2::<f64>::zeros((data.nrows(), n_freq));
        let mut buf = vec![Complex::<f64>::default(); self.nperseg];
        let mut scratch = vec![Complex::<f64>::default(); self.fft.get_inplace_scratch_len()];

        for (row, mut out) in data.rows().into_iter().zip(power.rows_mut()) {
            for seg in 0..n_seg {
                let start = seg * step;
                let segment = row.slice(s![start..start + self.nperseg]);
                let mean = segment.iter().map(|&v| v as f64).sum::<f64>() / self.nperseg as f64;
                for ((b, &v), &w) in buf.iter_mut().zip(segment.iter()).zip(&self.window) {
                    *b = Complex { re: (v as f64 - mean) * w, im: 0.0 };
                }
                self.fft.process_with_scratch(&mut buf, &mut scratch);
                for (o, c) in out.iter_mut().zip(&buf[..n_freq]) {
                    *o += c.norm_sqr();
                }
            }
            let nyquist_bin = if self.nperseg % 2 == 0 { Some(n_freq - 1) } else { None };
            for (k, o) in out.iter_mut().enumerate() {
                let one_sided = if k == 0 || Some(k) == nyquist_bin { 1.0 } else { 2.0 };
                *o *= scale * one_sided;
            }
        }

        PowerSpectrum::new(self.freqs(sfreq), power)
    }
}

/// Welch PSD with a 2 s Hann window; see [`Welch`] for a reusable estimator.
pub fn estimate_psd(data: ArrayView2<'_, f32>, sfreq: f32) -> Result<PowerSpectrum> {
    Welch::with_duration(2.0, sfreq)?.estimate(data, sfreq)
}

/// Periodic Hann window of length `n` (the DFT-even variant used by Welch).
pub fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(n_ch: usize, n_t: usize, sfreq: f32, f: f32, amp: f32) -> Array2<f32> {
        Array2::from_shape_fn((n_ch, n_t), |(_, t)| {
            amp * (2.0 * std::f32::consts::PI * f * t as f32 / sfreq).sin()
        })
    }

    #[test]
    fn frequency_axis_matches_power_columns() {
        let data = sine(3, 2560, 256.0, 10.0, 5.0);
        let psd = estimate_psd(data.view(), 256.0).unwrap();
        assert_eq!(psd.freqs.len(), 257);
        assert_eq!(psd.power.dim(), (3, 257));
        assert_relative_eq!(psd.resolution(), 0.5);
        assert_relative_eq!(psd.freqs[256], 128.0);
    }

    #[test]
    fn sine_peaks_at_its_frequency() {
        let data = sine(1, 2560, 256.0, 10.0, 5.0);
        let psd = estimate_psd(data.view(), 256.0).unwrap();
        let row = psd.power.row(0);
        let argmax = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_relative_eq!(psd.freqs[argmax], 10.0);
    }

    #[test]
    fn parseval_total_power_matches_variance() {
        // Integrated density of a sine equals its variance A²/2.
        let data = sine(1, 5120, 256.0, 12.0, 4.0);
        let psd = estimate_psd(data.view(), 256.0).unwrap();
        let total: f64 = psd.power.row(0).sum() * psd.resolution();
        assert_relative_eq!(total, 8.0, max_relative = 1e-3);
    }

    #[test]
    fn constant_signal_has_no_power() {
        let data = Array2::from_elem((2, 1024), 25.0_f32);
        let psd = estimate_psd(data.view(), 256.0).unwrap();
        assert!(psd.power.iter().all(|&p| p.abs() < 1e-12));
    }

    #[test]
    fn too_short_segment_fails() {
        let data = Array2::zeros((2, 511));
        let err = estimate_psd(data.view(), 256.0).unwrap_err();
        assert_eq!(err, QualityError::InsufficientSamples { required: 512, available: 511 });
    }

    #[test]
    fn first_epoch_slice_is_used() {
        let freqs = Array1::from(vec![0.0, 1.0]);
        let power = Array3::from_shape_fn((2, 3, 2), |(e, c, f)| (e * 100 + c * 10 + f) as f64);
        let psd = PowerSpectrum::from_epochs(freqs, &power).unwrap();
        assert_eq!(psd.power.dim(), (3, 2));
        assert_eq!(psd.power[[2, 1]], 21.0);
    }

    #[test]
    fn mismatched_axis_rejected() {
        let err = PowerSpectrum::new(Array1::zeros(3), Array2::zeros((1, 4)));
        assert!(matches!(err, Err(QualityError::ShapeMismatch(_))));
    }
}
