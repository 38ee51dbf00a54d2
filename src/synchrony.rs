//! Alpha-band synchrony score.
//!
//! For every channel the PSD is cut to the alpha band, local maxima are
//! located and each peak contributes `frequency × prominence` to one pooled
//! list.  The score is the median of that list, `0` when it is empty.
//!
//! Peak and prominence rules follow `scipy.signal.find_peaks` /
//! `peak_prominences`:
//!   • the first and last sample of the band are never peaks;
//!   • a flat plateau counts once, at its middle sample (lower index on ties);
//!   • prominence = height − max(left base, right base), where each base is the
//!     minimum between the peak and the nearest higher sample (or band edge).
use ndarray::ArrayView1;

use crate::spectrum::PowerSpectrum;

/// Alpha band used when no other band is configured.
pub const ALPHA_BAND: (f64, f64) = (8.0, 13.0);

/// One spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index into the band-restricted curve.
    pub index: usize,
    pub freq: f64,
    pub prominence: f64,
}

/// Indices of local maxima of `x`, plateaus resolved to their middle.
pub fn find_peaks(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Prominence of the peak at `peak` in `x`.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &x[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Peaks of one channel's PSD within `band`.
pub fn band_peaks(freqs: ArrayView1<'_, f64>, power: ArrayView1<'_, f64>, band: (f64, f64)) -> Vec<Peak> {
    let (f, p): (Vec<f64>, Vec<f64>) = freqs
        .iter()
        .zip(power.iter())
        .filter(|(&fr, _)| fr >= band.0 && fr <= band.1)
        .map(|(&fr, &pw)| (fr, pw))
        .unzip();
    find_peaks(&p)
        .into_iter()
        .map(|i| Peak { index: i, freq: f[i], prominence: prominence(&p, i) })
        .collect()
}

/// Median of `values`; `None` when empty.
///
/// Even-length lists average the two middle elements.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) * 0.5 } else { values[mid] })
}

/// Total synchrony score of a PSD over `band`.
///
/// Non-finite products are left out of the pool.
pub fn sync_score_in_band(psd: &PowerSpectrum, band: (f64, f64)) -> f64 {
    let mut pooled: Vec<f64> = psd
        .power
        .rows()
        .into_iter()
        .flat_map(|row| band_peaks(psd.freqs.view(), row, band))
        .map(|p| p.freq * p.prominence)
        .filter(|v| v.is_finite())
        .collect();
    median(&mut pooled).unwrap_or(0.0)
}

/// Total synchrony score over the 8–13 Hz alpha band.
pub fn total_sync_score(psd: &PowerSpectrum) -> f64 {
    sync_score_in_band(psd, ALPHA_BAND)
}
