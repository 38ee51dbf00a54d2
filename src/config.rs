//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of a ranking run.  The
//! defaults reproduce the clinical review settings: 256 Hz, 0.5 Hz highpass,
//! 10 s epochs on a 1 s hop, 2 s Welch windows.
//!
//! The struct deserialises with `#[serde(default)]`, so a JSON file only has
//! to name the fields it overrides.
use serde::Deserialize;

use crate::error::{QualityError, Result};

/// Shortest accepted epoch duration in seconds.
pub const MIN_EPOCH_DUR: f32 = 3.0;
/// Longest accepted epoch duration in seconds.
pub const MAX_EPOCH_DUR: f32 = 30.0;

/// Configuration for a full ranking run.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use epochrank::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     epoch_dur: 5.0,
///     parallel:  false,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.epoch_samples(), 1280);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sampling rate in Hz every recording is brought to before epoching.
    ///
    /// Default: `256.0` Hz.
    pub target_sfreq: f32,

    /// Zero-phase highpass FIR cutoff in Hz, `None` to skip.
    ///
    /// Default: `Some(0.5)`.
    pub hp_freq: Option<f32>,

    /// Zero-phase lowpass FIR cutoff in Hz, `None` to skip.
    ///
    /// Default: `None`.
    pub lp_freq: Option<f32>,

    /// Epoch duration in seconds, accepted range `[3, 30]`.
    ///
    /// Default: `10.0` s.
    pub epoch_dur: f32,

    /// Distance between consecutive epoch starts in seconds.
    ///
    /// Overlap is `epoch_dur - hop`.  Default: `1.0` s.
    pub hop: f32,

    /// Welch segment length in seconds.  Held fixed for a whole run so that
    /// every epoch's PSD shares one frequency axis.
    ///
    /// Default: `2.0` s (0.5 Hz resolution).
    pub welch_window_sec: f32,

    /// Bad-lead detector thresholds.
    pub bad_leads: BadLeadThresholds,

    /// Alpha band in Hz used by the synchrony score and band-power ratio.
    ///
    /// Default: `(8.0, 13.0)`.
    pub alpha_band: (f64, f64),

    /// Denominator band in Hz for the relative alpha power.
    ///
    /// Default: `(2.2, 25.0)`.
    pub total_band: (f64, f64),

    /// Alpha letter-grade percentile cut-offs.
    pub grading: GradeConfig,

    /// Epochs with a synchrony score at or above this value are treated as
    /// artifact-dominated by [`crate::ranking::select_best`].
    ///
    /// Default: `200.0`.
    pub sync_artifact_limit: f64,

    /// Number of rows offered for presentation.
    ///
    /// Default: `20`.
    pub top_n: usize,

    /// Fan per-epoch work out over the rayon thread pool.
    ///
    /// Output is identical either way.  Default: `true`.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sfreq: 256.0,
            hp_freq: Some(0.5),
            lp_freq: None,
            epoch_dur: 10.0,
            hop: 1.0,
            welch_window_sec: 2.0,
            bad_leads: BadLeadThresholds::default(),
            alpha_band: (8.0, 13.0),
            total_band: (2.2, 25.0),
            grading: GradeConfig::default(),
            sync_artifact_limit: 200.0,
            top_n: 20,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Number of samples per epoch at the target sampling rate.
    ///
    /// ```
    /// use epochrank::PipelineConfig;
    /// assert_eq!(PipelineConfig::default().epoch_samples(), 2560);
    /// ```
    pub fn epoch_samples(&self) -> usize {
        (self.epoch_dur * self.target_sfreq).round() as usize
    }

    /// Hop between epoch starts in samples.
    pub fn hop_samples(&self) -> usize {
        (self.hop * self.target_sfreq).round() as usize
    }

    /// Welch segment length in samples.
    pub fn welch_samples(&self) -> usize {
        (self.welch_window_sec * self.target_sfreq).round() as usize
    }

    /// Reject every value the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.target_sfreq.is_finite() && self.target_sfreq > 0.0) {
            return Err(QualityError::InvalidSampleRate(self.target_sfreq));
        }
        if !(MIN_EPOCH_DUR..=MAX_EPOCH_DUR).contains(&self.epoch_dur) {
            return Err(QualityError::Configuration(format!(
                "epoch duration {} s outside [{MIN_EPOCH_DUR}, {MAX_EPOCH_DUR}]",
                self.epoch_dur
            )));
        }
        if !(self.hop > 0.0 && self.hop <= self.epoch_dur) || self.hop_samples() == 0 {
            return Err(QualityError::Configuration(format!(
                "hop {} s must be positive and no longer than the epoch",
                self.hop
            )));
        }
        if !(self.welch_window_sec > 0.0 && self.welch_window_sec <= self.epoch_dur)
            || self.welch_samples() < 2
        {
            return Err(QualityError::Configuration(format!(
                "welch window {} s must be positive and fit inside one epoch",
                self.welch_window_sec
            )));
        }
        let nyquist = self.target_sfreq / 2.0;
        for (name, cut) in [("hp_freq", self.hp_freq), ("lp_freq", self.lp_freq)] {
            if let Some(f) = cut {
                if !(f > 0.0 && f < nyquist) {
                    return Err(QualityError::Configuration(format!(
                        "{name} {f} Hz must lie in (0, {nyquist})"
                    )));
                }
            }
        }
        for (name, (lo, hi)) in [
            ("alpha_band", self.alpha_band),
            ("total_band", self.total_band),
            ("fit_band", self.bad_leads.fit_band),
        ] {
            if !(lo >= 0.0 && lo < hi) {
                return Err(QualityError::Configuration(format!(
                    "{name} ({lo}, {hi}) is not an increasing frequency range"
                )));
            }
        }
        self.grading.validate()
    }
}

/// Thresholds of the four bad-lead tests.
///
/// Amplitudes are in µV, so variance is µV² and PSD values are µV²/Hz.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BadLeadThresholds {
    /// Variance above which a channel is an outlier.  Default: `3000.0`.
    pub variance: f64,
    /// PSD fit offset magnitude above which contact is poor.  Default: `35.0`.
    pub poor_connection_offset: f64,
    /// PSD fit offset magnitude below which a channel is flat.  Default: `0.01`.
    pub flat_offset: f64,
    /// Frequency range in Hz the line is fitted over, clamped to Nyquist.
    ///
    /// Default: `(1.0, 40.0)`.
    pub fit_band: (f64, f64),
}

impl Default for BadLeadThresholds {
    fn default() -> Self {
        Self {
            variance: 3000.0,
            poor_connection_offset: 35.0,
            flat_offset: 0.01,
            fit_band: (1.0, 40.0),
        }
    }
}

/// Percentile cut-offs for the alpha letter grade, best grade first.
///
/// An epoch at or above `cutoffs[0]` gets `A`, at or above `cutoffs[1]` gets
/// `B`, and so on; below the last cut-off it gets `F`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradeConfig {
    /// Default: `[85.0, 70.0, 55.0, 40.0]`.
    pub cutoffs: [f64; 4],
}

impl Default for GradeConfig {
    fn default() -> Self {
        Self { cutoffs: [85.0, 70.0, 55.0, 40.0] }
    }
}

impl GradeConfig {
    fn validate(&self) -> Result<()> {
        let in_range = self.cutoffs.iter().all(|p| (0.0..=100.0).contains(p));
        let descending = self.cutoffs.windows(2).all(|w| w[0] > w[1]);
        if in_range && descending {
            Ok(())
        } else {
            Err(QualityError::Configuration(format!(
                "grade cut-offs {:?} must be strictly descending percentiles",
                self.cutoffs
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn epoch_duration_bounds() {
        for dur in [2.9_f32, 30.5, 0.0] {
            let cfg = PipelineConfig { epoch_dur: dur, ..PipelineConfig::default() };
            assert!(matches!(cfg.validate(), Err(QualityError::Configuration(_))), "dur={dur}");
        }
        for dur in [3.0_f32, 30.0] {
            let cfg = PipelineConfig { epoch_dur: dur, ..PipelineConfig::default() };
            cfg.validate().unwrap();
        }
    }

    #[test]
    fn lowpass_above_nyquist_rejected() {
        let cfg = PipelineConfig { lp_freq: Some(200.0), ..PipelineConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_descending_cutoffs_rejected() {
        let cfg = PipelineConfig {
            grading: GradeConfig { cutoffs: [40.0, 55.0, 70.0, 85.0] },
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{ "epoch_dur": 5.0, "bad_leads": { "variance": 2500.0 } }"#)
                .unwrap();
        assert_eq!(cfg.epoch_dur, 5.0);
        assert_eq!(cfg.bad_leads.variance, 2500.0);
        assert_eq!(cfg.bad_leads.poor_connection_offset, 35.0);
        assert_eq!(cfg.target_sfreq, 256.0);
    }
}
