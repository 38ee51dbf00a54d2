//! In-memory multi-channel recording.
//!
//! A [`Recording`] is what the upstream file reader hands to the core: a
//! `[C, T]` sample matrix in microvolts, one label per row and a sample
//! rate.  Labels double as the channel-kind source; cardiac and other
//! non-EEG rows are kept in the recording but excluded from the EEG label
//! space the quality detector indexes into.
use std::collections::HashSet;

use ndarray::{Array2, Axis};

use crate::error::{QualityError, Result};

/// Signal kind of one channel, derived from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Eeg,
    /// ECG / EKG lead.
    Cardiac,
    /// Anything that is neither EEG nor cardiac (EOG, EMG, triggers, ...).
    Other,
}

/// Optional subject metadata carried alongside the samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectInfo {
    pub id: Option<String>,
    pub age_years: Option<f32>,
}

/// A continuous recording, immutable once constructed.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Array2<f32>,
    labels: Vec<String>,
    sfreq: f32,
    /// Free-form measurement timestamp as written by the source file.
    pub meas_date: Option<String>,
    pub subject: Option<SubjectInfo>,
}

impl Recording {
    /// Build a recording, checking shape, label uniqueness and sample rate.
    pub fn new(data: Array2<f32>, labels: Vec<String>, sfreq: f32) -> Result<Self> {
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(QualityError::InvalidSampleRate(sfreq));
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(QualityError::EmptyRecording);
        }
        if labels.len() != data.nrows() {
            return Err(QualityError::ShapeMismatch(format!(
                "{} labels for {} channels",
                labels.len(),
                data.nrows()
            )));
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for l in &labels {
            if !seen.insert(normalize_label(l)) {
                return Err(QualityError::DuplicateChannel(l.clone()));
            }
        }
        Ok(Self { data, labels, sfreq, meas_date: None, subject: None })
    }

    pub fn with_meas_date(mut self, date: impl Into<String>) -> Self {
        self.meas_date = Some(date.into());
        self
    }

    pub fn with_subject(mut self, subject: SubjectInfo) -> Self {
        self.subject = Some(subject);
        self
    }

    #[inline]
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn sfreq(&self) -> f32 {
        self.sfreq
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.n_times() as f32 / self.sfreq
    }

    /// Kind of every channel, in row order.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.labels.iter().map(|l| classify_label(l)).collect()
    }

    /// Row index of `label`, matched on the normalised form.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        let target = normalize_label(label);
        self.labels.iter().position(|l| normalize_label(l) == target)
    }

    /// Copy of this recording restricted to EEG channels.
    ///
    /// Metadata is carried over.  Fails with [`QualityError::EmptyRecording`]
    /// when no EEG channel remains.
    pub fn eeg_only(&self) -> Result<Recording> {
        let keep: Vec<usize> = self
            .kinds()
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == ChannelKind::Eeg)
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Err(QualityError::EmptyRecording);
        }
        self.derive(
            self.data.select(Axis(0), &keep),
            keep.iter().map(|&i| self.labels[i].clone()).collect(),
        )
    }

    /// New recording with the same sample rate and metadata but other rows.
    ///
    /// Used by reference transforms, whose output channel set differs.
    pub fn derive(&self, data: Array2<f32>, labels: Vec<String>) -> Result<Recording> {
        self.derive_resampled(data, labels, self.sfreq)
    }

    pub(crate) fn derive_resampled(
        &self,
        data: Array2<f32>,
        labels: Vec<String>,
        sfreq: f32,
    ) -> Result<Recording> {
        let mut out = Recording::new(data, labels, sfreq)?;
        out.meas_date = self.meas_date.clone();
        out.subject = self.subject.clone();
        Ok(out)
    }
}

/// Canonical comparison form of a label: lowercase, no spaces, no `eeg`
/// type prefix, no `-ref`/`-le` reference suffix.
///
/// ```
/// use epochrank::recording::normalize_label;
/// assert_eq!(normalize_label("EEG Fp1-REF"), "fp1");
/// assert_eq!(normalize_label(" Cz "), "cz");
/// ```
pub fn normalize_label(label: &str) -> String {
    let mut s: String = label.chars().filter(|c| !c.is_whitespace()).collect();
    s.make_ascii_lowercase();
    if let Some(rest) = s.strip_prefix("eeg") {
        if !rest.is_empty() {
            s = rest.to_string();
        }
    }
    for suffix in ["-ref", "-le", "-ar"] {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest.to_string();
        }
    }
    s
}

/// Map 10-10 electrode names onto their 10-20 equivalents.
pub(crate) fn canonical_electrode(label: &str) -> String {
    let norm = normalize_label(label);
    match norm.as_str() {
        "t7" => "t3",
        "t8" => "t4",
        "p7" => "t5",
        "p8" => "t6",
        "m1" => "a1",
        "m2" => "a2",
        other => other,
    }
    .to_string()
}

const CARDIAC_PATTERNS: &[&str] = &["ecg", "ekg", "hr", "pulse"];

const OTHER_PATTERNS: &[&str] = &[
    "eog", "emg", "resp", "stim", "trig", "status", "photic", "misc", "spo2", "event",
];

/// Classify a channel label.
///
/// Cardiac patterns win over everything else; then other known
/// physiological or trigger channels; everything else is EEG.
pub fn classify_label(label: &str) -> ChannelKind {
    let lower = label.trim().to_ascii_lowercase();
    let head = lower.trim_start_matches("eeg").trim_start();
    if CARDIAC_PATTERNS.iter().any(|p| starts_with_token(head, p)) {
        return ChannelKind::Cardiac;
    }
    if OTHER_PATTERNS.iter().any(|p| head.starts_with(p)) {
        return ChannelKind::Other;
    }
    ChannelKind::Eeg
}

/// `head` begins with the whole token `pattern`: nothing, a digit or a
/// separator may follow, but not another letter.
fn starts_with_token(head: &str, pattern: &str) -> bool {
    head.strip_prefix(pattern)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphabetic()))
}
