//! Per-epoch bad-channel ("bad lead") detection.
//!
//! Four independent tests run on each EEG channel of a segment:
//!
//! | test | rule (defaults) |
//! |---|---|
//! | variance outlier | `var(x) > 3000 µV²` |
//! | poor connection | `|offset| > 35` |
//! | flat channel | `|offset| < 0.01` |
//! | high-frequency noise | `slope > 0` |
//!
//! `offset` and `slope` come from a least-squares line through the channel's
//! PSD (µV²/Hz against Hz) over the fit band.  A channel whose line fit is
//! numerically undefined is never flagged, whatever the other tests say.
use std::collections::BTreeMap;

use ndarray::{Array1, Array3, ArrayView2};
use serde::Serialize;

use crate::config::BadLeadThresholds;
use crate::error::{QualityError, Result};
use crate::recording::{classify_label, ChannelKind};
use crate::spectrum::{PowerSpectrum, Welch};

/// Which test flagged a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadLeadReason {
    Variance,
    PoorConnection,
    Flat,
    HighFrequencyNoise,
}

/// Labels flagged bad for one segment, in channel order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BadLeadSet(Vec<String>);

impl BadLeadSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl FromIterator<String> for BadLeadSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        BadLeadSet(iter.into_iter().collect())
    }
}

/// Offset and slope of a PSD line fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub offset: f64,
    pub slope: f64,
}

/// Full detector output: the bad set plus per-channel diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadLeadReport {
    pub bad: BadLeadSet,
    /// Reasons per flagged label.
    pub reasons: BTreeMap<String, Vec<BadLeadReason>>,
    /// Labels whose line fit failed; excluded from `bad`.
    pub degenerate: Vec<String>,
    /// Row indices of `bad` within the EEG-only channel ordering.
    pub bad_rows: Vec<usize>,
}

/// Least-squares line through `power` against `freqs` over `[lo, hi]`.
///
/// Fails with [`QualityError::DegenerateFit`] when the band holds a
/// non-finite value, fewer than two points, no frequency spread, or
/// power that is identically zero.
pub fn fit_line(
    freqs: &[f64],
    power: &[f64],
    band: (f64, f64),
    channel: usize,
) -> Result<LineFit> {
    let degenerate = || QualityError::DegenerateFit { channel };
    let pts: Vec<(f64, f64)> = freqs
        .iter()
        .zip(power)
        .filter(|(&f, _)| f >= band.0 && f <= band.1)
        .map(|(&f, &p)| (f, p))
        .collect();
    if pts.len() < 2 || pts.iter().any(|(_, p)| !p.is_finite()) {
        return Err(degenerate());
    }
    // A silent channel carries no spectral shape to fit.
    if pts.iter().all(|&(_, p)| p == 0.0) {
        return Err(degenerate());
    }

    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pts.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for &(x, y) in &pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if sxx <= 0.0 {
        return Err(degenerate());
    }
    let slope = sxy / sxx;
    let offset = mean_y - slope * mean_x;
    if !(slope.is_finite() && offset.is_finite()) {
        return Err(degenerate());
    }
    Ok(LineFit { offset, slope })
}

/// Population variance of the finite samples of `x`; `0` when none are finite.
pub fn nan_variance(x: impl Iterator<Item = f32>) -> f64 {
    let vals: Vec<f64> = x.filter(|v| v.is_finite()).map(f64::from).collect();
    if vals.is_empty() {
        return 0.0;
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Bad-lead detector with fixed thresholds and spectral estimator.
#[derive(Debug, Clone)]
pub struct BadLeadDetector {
    welch: Welch,
    thresholds: BadLeadThresholds,
}

impl BadLeadDetector {
    pub fn new(welch: Welch, thresholds: BadLeadThresholds) -> Self {
        Self { welch, thresholds }
    }

    pub fn thresholds(&self) -> &BadLeadThresholds {
        &self.thresholds
    }

    /// Run every test on `segment` ([C, T]).
    ///
    /// Rows whose label is not EEG are dropped before indexing.  The PSD is
    /// computed here; use [`BadLeadDetector::detect_with_psd`] to reuse one.
    pub fn detect(
        &self,
        segment: ArrayView2<'_, f32>,
        labels: &[String],
        sfreq: f32,
    ) -> Result<BadLeadReport> {
        check_labels(segment.nrows(), labels)?;
        let eeg_rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| classify_label(l) == ChannelKind::Eeg)
            .map(|(i, _)| i)
            .collect();
        let eeg = segment.select(ndarray::Axis(0), &eeg_rows);
        let eeg_labels: Vec<String> = eeg_rows.iter().map(|&i| labels[i].clone()).collect();

        let psd = self.welch.estimate(eeg.view(), sfreq)?;
        self.detect_with_psd(eeg.view(), &psd, &eeg_labels)
    }

    /// Run every test given a PSD already computed for the rows of `segment`.
    ///
    /// Every row is treated as EEG; `labels[i]` names row `i`.
    pub fn detect_with_psd(
        &self,
        segment: ArrayView2<'_, f32>,
        psd: &PowerSpectrum,
        labels: &[String],
    ) -> Result<BadLeadReport> {
        check_labels(segment.nrows(), labels)?;
        if psd.n_channels() != segment.nrows() {
            return Err(QualityError::ShapeMismatch(format!(
                "PSD has {} channels, segment has {}",
                psd.n_channels(),
                segment.nrows()
            )));
        }
        let th = &self.thresholds;
        let freqs = psd.freqs.to_vec();

        let mut reasons: BTreeMap<usize, Vec<BadLeadReason>> = BTreeMap::new();
        let mut nan_fits = Vec::new();

        for (ch, row) in segment.rows().into_iter().enumerate() {
            let mut flag = |r: BadLeadReason| reasons.entry(ch).or_default().push(r);

            if nan_variance(row.iter().copied()) > th.variance {
                flag(BadLeadReason::Variance);
            }

            let power = psd.power.row(ch).to_vec();
            match fit_line(&freqs, &power, th.fit_band, ch) {
                Ok(fit) => {
                    if fit.offset.abs() > th.poor_connection_offset {
                        flag(BadLeadReason::PoorConnection);
                    }
                    if fit.offset.abs() < th.flat_offset {
                        flag(BadLeadReason::Flat);
                    }
                    if fit.slope > 0.0 {
                        flag(BadLeadReason::HighFrequencyNoise);
                    }
                }
                Err(err) => {
                    tracing::warn!(channel = %labels[ch], %err, "PSD fit undefined, channel kept");
                    nan_fits.push(ch);
                }
            }
        }

        for ch in &nan_fits {
            reasons.remove(ch);
        }

        let bad_rows: Vec<usize> = reasons.keys().copied().collect();
        Ok(BadLeadReport {
            bad: bad_rows.iter().map(|&i| labels[i].clone()).collect(),
            reasons: reasons.into_iter().map(|(i, r)| (labels[i].clone(), r)).collect(),
            degenerate: nan_fits.iter().map(|&i| labels[i].clone()).collect(),
            bad_rows,
        })
    }

    /// [`BadLeadDetector::detect_with_psd`] for an `[E, C, F]` power array
    /// from an external estimator; only the first epoch slice is read.
    pub fn detect_with_epoch_psd(
        &self,
        segment: ArrayView2<'_, f32>,
        freqs: Array1<f64>,
        power: &Array3<f64>,
        labels: &[String],
    ) -> Result<BadLeadReport> {
        let psd = PowerSpectrum::from_epochs(freqs, power)?;
        self.detect_with_psd(segment, &psd, labels)
    }
}

/// Bad leads of `segment` with the default thresholds and a 2 s Welch window.
pub fn detect_bad_channels(
    segment: ArrayView2<'_, f32>,
    labels: &[String],
    sfreq: f32,
) -> Result<BadLeadSet> {
    let detector =
        BadLeadDetector::new(Welch::with_duration(2.0, sfreq)?, BadLeadThresholds::default());
    Ok(detector.detect(segment, labels, sfreq)?.bad)
}

fn check_labels(n_rows: usize, labels: &[String]) -> Result<()> {
    if n_rows != labels.len() {
        return Err(QualityError::ShapeMismatch(format!(
            "{} labels for {n_rows} channels",
            labels.len()
        )));
    }
    Ok(())
}
