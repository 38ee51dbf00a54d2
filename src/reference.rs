//! Montage / reference transforms.
//!
//! Each [`ReferenceId`] is a pure function from one recording to another.
//! Non-EEG rows are dropped first, so every output holds EEG derivations
//! only.
//!
//! | scheme | output channels |
//! |---|---|
//! | linked ears | every EEG electrode − mean(A1, A2); ear rows dropped |
//! | centroid | every EEG electrode − mean over all EEG electrodes |
//! | bipolar longitudinal | double banana, 18 pairs |
//! | bipolar transverse | 20 left-to-right pairs |
//! | temporal-central-parasagittal | TCP, 22 pairs |
//!
//! Bipolar rows are labelled `"<anode>-<cathode>"` with the source labels.
//! Pairs whose electrodes are missing are skipped.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{QualityError, Result};
use crate::recording::{canonical_electrode, Recording};

/// Supported reference schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceId {
    LinkedEars,
    Centroid,
    BipolarTransverse,
    BipolarLongitudinal,
    TemporalCentralParasagittal,
}

impl ReferenceId {
    pub const ALL: [ReferenceId; 5] = [
        ReferenceId::LinkedEars,
        ReferenceId::Centroid,
        ReferenceId::BipolarTransverse,
        ReferenceId::BipolarLongitudinal,
        ReferenceId::TemporalCentralParasagittal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceId::LinkedEars => "linked-ears",
            ReferenceId::Centroid => "centroid",
            ReferenceId::BipolarTransverse => "bipolar-transverse",
            ReferenceId::BipolarLongitudinal => "bipolar-longitudinal",
            ReferenceId::TemporalCentralParasagittal => "temporal-central-parasagittal",
        }
    }

    /// Apply this reference to `recording`.
    pub fn transform(&self, recording: &Recording) -> Result<Recording> {
        let eeg = recording.eeg_only()?;
        match self {
            ReferenceId::LinkedEars => linked_ears(&eeg),
            ReferenceId::Centroid => {
                let mut data = eeg.data().clone();
                average_reference_inplace(&mut data);
                eeg.derive(data, eeg.labels().to_vec())
            }
            ReferenceId::BipolarTransverse => bipolar(&eeg, *self, TRANSVERSE),
            ReferenceId::BipolarLongitudinal => bipolar(&eeg, *self, LONGITUDINAL),
            ReferenceId::TemporalCentralParasagittal => bipolar(&eeg, *self, TCP),
        }
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceId {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        let id = match key.as_str() {
            "linked-ears" | "le" => ReferenceId::LinkedEars,
            "centroid" | "average" | "car" => ReferenceId::Centroid,
            "bipolar-transverse" => ReferenceId::BipolarTransverse,
            "bipolar-longitudinal" | "double-banana" => ReferenceId::BipolarLongitudinal,
            "temporal-central-parasagittal" | "tcp" => ReferenceId::TemporalCentralParasagittal,
            _ => {
                return Err(QualityError::Configuration(format!("unknown reference id {s:?}")))
            }
        };
        Ok(id)
    }
}

/// Subtract the mean across channels at each time point.
///
/// `data`: [C, T]  →  `data[c, t] -= mean(data[:, t])`
pub fn average_reference_inplace(data: &mut Array2<f32>) {
    let Some(means) = data.mean_axis(Axis(0)) else { return };
    for mut row in data.rows_mut() {
        row -= &means;
    }
}

fn linked_ears(eeg: &Recording) -> Result<Recording> {
    let ears: Vec<Option<usize>> = ["a1", "a2"].iter().map(|e| find(eeg, e)).collect();
    let missing: Vec<String> = ["a1", "a2"]
        .iter()
        .zip(&ears)
        .filter(|(_, i)| i.is_none())
        .map(|(e, _)| e.to_string())
        .collect();
    let (Some(a1), Some(a2)) = (ears[0], ears[1]) else {
        return Err(QualityError::MissingChannels {
            reference: ReferenceId::LinkedEars.to_string(),
            missing,
        });
    };

    let data = eeg.data();
    let ear_mean: Array1<f32> = (&data.row(a1) + &data.row(a2)) * 0.5;
    let keep: Vec<usize> = (0..eeg.n_channels()).filter(|&i| i != a1 && i != a2).collect();
    if keep.is_empty() {
        return Err(QualityError::EmptyRecording);
    }

    let mut out = data.select(Axis(0), &keep);
    for mut row in out.rows_mut() {
        row -= &ear_mean;
    }
    let labels = keep.iter().map(|&i| eeg.labels()[i].clone()).collect();
    eeg.derive(out, labels)
}

fn bipolar(eeg: &Recording, id: ReferenceId, pairs: &[(&str, &str)]) -> Result<Recording> {
    let mut rows = Vec::with_capacity(pairs.len());
    let mut labels = Vec::with_capacity(pairs.len());
    let mut missing = Vec::new();
    for &(anode, cathode) in pairs {
        match (find(eeg, anode), find(eeg, cathode)) {
            (Some(a), Some(c)) => {
                rows.push(&eeg.data().row(a) - &eeg.data().row(c));
                labels.push(format!("{}-{}", eeg.labels()[a], eeg.labels()[c]));
            }
            (a, c) => {
                for (name, idx) in [(anode, a), (cathode, c)] {
                    if idx.is_none() && !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                }
            }
        }
    }
    if rows.is_empty() {
        return Err(QualityError::MissingChannels { reference: id.to_string(), missing });
    }
    if !missing.is_empty() {
        tracing::debug!(reference = %id, ?missing, "skipping bipolar pairs with missing electrodes");
    }

    let n_t = eeg.n_times();
    let mut data = Array2::<f32>::zeros((rows.len(), n_t));
    for (mut dst, src) in data.rows_mut().into_iter().zip(rows.iter()) {
        dst.assign(src);
    }
    eeg.derive(data, labels)
}

fn find(eeg: &Recording, electrode: &str) -> Option<usize> {
    eeg.labels().iter().position(|l| canonical_electrode(l) == electrode)
}

const LONGITUDINAL: &[(&str, &str)] = &[
    ("fp1", "f7"), ("f7", "t3"), ("t3", "t5"), ("t5", "o1"),
    ("fp2", "f8"), ("f8", "t4"), ("t4", "t6"), ("t6", "o2"),
    ("fp1", "f3"), ("f3", "c3"), ("c3", "p3"), ("p3", "o1"),
    ("fp2", "f4"), ("f4", "c4"), ("c4", "p4"), ("p4", "o2"),
    ("fz", "cz"), ("cz", "pz"),
];

const TRANSVERSE: &[(&str, &str)] = &[
    ("f7", "fp1"), ("fp1", "fp2"), ("fp2", "f8"),
    ("f7", "f3"), ("f3", "fz"), ("fz", "f4"), ("f4", "f8"),
    ("a1", "t3"), ("t3", "c3"), ("c3", "cz"), ("cz", "c4"), ("c4", "t4"), ("t4", "a2"),
    ("t5", "p3"), ("p3", "pz"), ("pz", "p4"), ("p4", "t6"),
    ("t5", "o1"), ("o1", "o2"), ("o2", "t6"),
];

const TCP: &[(&str, &str)] = &[
    ("fp1", "f7"), ("f7", "t3"), ("t3", "t5"), ("t5", "o1"),
    ("fp2", "f8"), ("f8", "t4"), ("t4", "t6"), ("t6", "o2"),
    ("a1", "t3"), ("t3", "c3"), ("c3", "cz"), ("cz", "c4"), ("c4", "t4"), ("t4", "a2"),
    ("fp1", "f3"), ("f3", "c3"), ("c3", "p3"), ("p3", "o1"),
    ("fp2", "f4"), ("f4", "c4"), ("c4", "p4"), ("p4", "o2"),
];
