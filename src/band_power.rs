//! Relative band power.
//!
//! For each channel the PSD is integrated over the feature band and over a
//! wider reference band with composite Simpson's rule against the frequency
//! axis.  The feature is the **sum** over channels of `band / total`, so it
//! grows with the number of channels that show alpha dominance.
//!
//! A channel with a zero or non-finite integral on either side is missing,
//! not a zero contribution.
use ndarray::ArrayView1;

use crate::spectrum::PowerSpectrum;

/// Default numerator band (alpha), Hz.
pub const ALPHA_BAND: (f64, f64) = (8.0, 13.0);
/// Default denominator band, Hz.
pub const TOTAL_BAND: (f64, f64) = (2.2, 25.0);

/// Composite Simpson integral of `y` sampled at increasing `x`.
///
/// Handles uneven spacing.  With an even number of samples the last interval
/// is closed with the trapezoid rule.  Fewer than two samples integrate to 0.
pub fn simpson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    if n == 2 {
        return 0.5 * (x[1] - x[0]) * (y[0] + y[1]);
    }

    let last = if n % 2 == 1 { n - 1 } else { n - 2 };
    let mut total = 0.0;
    let mut i = 0;
    while i + 2 <= last {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hs = h0 + h1;
        total += hs / 6.0
            * (y[i] * (2.0 - h1 / h0) + y[i + 1] * hs * hs / (h0 * h1) + y[i + 2] * (2.0 - h0 / h1));
        i += 2;
    }
    if last < n - 1 {
        total += 0.5 * (x[n - 1] - x[n - 2]) * (y[n - 2] + y[n - 1]);
    }
    total
}

/// Integral of one PSD row over `[lo, hi]`.
pub fn band_integral(freqs: ArrayView1<'_, f64>, power: ArrayView1<'_, f64>, band: (f64, f64)) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = freqs
        .iter()
        .zip(power.iter())
        .filter(|(&f, _)| f >= band.0 && f <= band.1)
        .map(|(&f, &p)| (f, p))
        .unzip();
    simpson(&x, &y)
}

/// Per-channel `band / total` ratios; `None` where either integral is
/// missing.
pub fn channel_ratios(psd: &PowerSpectrum, band: (f64, f64), total_band: (f64, f64)) -> Vec<Option<f64>> {
    let usable = |v: f64| v.is_finite() && v != 0.0;
    psd.power
        .rows()
        .into_iter()
        .map(|row| {
            let num = band_integral(psd.freqs.view(), row, band);
            let den = band_integral(psd.freqs.view(), row, total_band);
            (usable(num) && usable(den)).then(|| num / den)
        })
        .collect()
}

/// Sum over channels of the relative power in `band`.
pub fn relative_band_power(psd: &PowerSpectrum, band: (f64, f64), total_band: (f64, f64)) -> f64 {
    channel_ratios(psd, band, total_band).into_iter().flatten().sum()
}

/// Relative alpha power with the default bands.
pub fn relative_alpha_power(psd: &PowerSpectrum) -> f64 {
    relative_band_power(psd, ALPHA_BAND, TOTAL_BAND)
}
