//! End-to-end ranking run.
//!
//! ```text
//! Recording
//!   ├─ preprocess()         resample → highpass FIR → optional lowpass FIR
//!   ├─ build_epochs()       reference transform → sliding windows (1 s hop)
//!   ├─ EpochAnalyzer        per epoch, in parallel:
//!   │    ├─ Welch PSD
//!   │    ├─ bad leads       on every channel
//!   │    └─ synchrony + relative alpha power on the good channels
//!   └─ ranking::rank()      batch percentile grades, stable sort
//! ```
//!
//! A failure in any epoch aborts the run with that epoch's error.
use std::collections::HashMap;

use rayon::prelude::*;

use crate::band_power::relative_band_power;
use crate::bad_leads::BadLeadDetector;
use crate::config::{PipelineConfig, MAX_EPOCH_DUR, MIN_EPOCH_DUR};
use crate::epoch::{sliding_epochs, Epoch};
use crate::error::{QualityError, Result};
use crate::filter::{apply_fir_zero_phase, design_highpass, design_lowpass};
use crate::ranking::{rank, RankedEpochTable, RawEpochMetrics};
use crate::recording::Recording;
use crate::reference::ReferenceId;
use crate::resample::resample;
use crate::spectrum::Welch;
use crate::synchrony::sync_score_in_band;

/// Resample to `cfg.target_sfreq` and apply the configured FIR filters.
pub fn preprocess(recording: &Recording, cfg: &PipelineConfig) -> Result<Recording> {
    let mut data = resample(recording.data(), recording.sfreq(), cfg.target_sfreq)?;
    if let Some(hp) = cfg.hp_freq {
        apply_fir_zero_phase(&mut data, &design_highpass(hp, cfg.target_sfreq))?;
    }
    if let Some(lp) = cfg.lp_freq {
        apply_fir_zero_phase(&mut data, &design_lowpass(lp, cfg.target_sfreq))?;
    }
    tracing::debug!(
        src_sfreq = recording.sfreq(),
        sfreq = cfg.target_sfreq,
        n_times = data.ncols(),
        hp = ?cfg.hp_freq,
        lp = ?cfg.lp_freq,
        "preprocessed"
    );
    recording.derive_resampled(data, recording.labels().to_vec(), cfg.target_sfreq)
}

/// A referenced recording together with its window geometry.
///
/// Owns the referenced data; [`EpochSet::epochs`] hands out views into it.
#[derive(Debug, Clone)]
pub struct EpochSet {
    recording: Recording,
    reference: ReferenceId,
    epoch_samples: usize,
    hop_samples: usize,
}

impl EpochSet {
    /// The referenced recording the epochs view into.
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn reference(&self) -> ReferenceId {
        self.reference
    }

    pub fn labels(&self) -> &[String] {
        self.recording.labels()
    }

    pub fn epoch_samples(&self) -> usize {
        self.epoch_samples
    }

    /// Number of complete windows.
    pub fn len(&self) -> usize {
        crate::epoch::n_epochs(self.recording.n_times(), self.epoch_samples, self.hop_samples)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn epochs(&self) -> Result<Vec<Epoch<'_>>> {
        sliding_epochs(
            self.recording.data(),
            self.recording.sfreq(),
            self.epoch_samples,
            self.hop_samples,
        )
    }
}

/// Reference `recording` and window it into `duration`-second epochs on a
/// 1 s hop.
pub fn build_epochs(recording: &Recording, duration: f32, reference: ReferenceId) -> Result<EpochSet> {
    check_duration(duration)?;
    build_epochs_with(recording, reference, duration, PipelineConfig::default().hop)
}

fn build_epochs_with(
    recording: &Recording,
    reference: ReferenceId,
    duration: f32,
    hop: f32,
) -> Result<EpochSet> {
    let referenced = reference.transform(recording)?;
    let sfreq = referenced.sfreq();
    let set = EpochSet {
        epoch_samples: (duration * sfreq).round() as usize,
        hop_samples: (hop * sfreq).round() as usize,
        recording: referenced,
        reference,
    };
    tracing::debug!(
        %reference,
        n_channels = set.recording.n_channels(),
        n_epochs = set.len(),
        "epochs built"
    );
    Ok(set)
}

fn check_duration(duration: f32) -> Result<()> {
    if !(MIN_EPOCH_DUR..=MAX_EPOCH_DUR).contains(&duration) {
        return Err(QualityError::Configuration(format!(
            "epoch duration {duration} s outside [{MIN_EPOCH_DUR}, {MAX_EPOCH_DUR}]"
        )));
    }
    Ok(())
}

/// Per-epoch metric extraction with one spectral estimator for the run.
#[derive(Debug, Clone)]
pub struct EpochAnalyzer {
    welch: Welch,
    detector: BadLeadDetector,
    alpha_band: (f64, f64),
    total_band: (f64, f64),
    sfreq: f32,
}

impl EpochAnalyzer {
    pub fn new(cfg: &PipelineConfig, sfreq: f32) -> Result<Self> {
        let welch = Welch::with_duration(cfg.welch_window_sec, sfreq)?;
        Ok(Self {
            detector: BadLeadDetector::new(welch.clone(), cfg.bad_leads.clone()),
            welch,
            alpha_band: cfg.alpha_band,
            total_band: cfg.total_band,
            sfreq,
        })
    }

    /// Bad leads on every row, then synchrony and alpha power on the rest.
    ///
    /// `labels` name the rows of `epoch.data`, all of which are EEG
    /// derivations.
    pub fn analyze(&self, epoch: &Epoch<'_>, labels: &[String]) -> Result<RawEpochMetrics> {
        let psd = self.welch.estimate(epoch.data, self.sfreq)?;
        let report = self.detector.detect_with_psd(epoch.data, &psd, labels)?;

        let good: Vec<usize> =
            (0..psd.n_channels()).filter(|i| !report.bad_rows.contains(i)).collect();
        let good_psd = psd.select_channels(&good);
        let sync_score = sync_score_in_band(&good_psd, self.alpha_band);
        let alpha_power = relative_band_power(&good_psd, self.alpha_band, self.total_band);

        tracing::debug!(
            epoch = epoch.index,
            bad = ?report.bad.as_slice(),
            sync_score,
            alpha_power,
            "epoch analysed"
        );
        Ok(RawEpochMetrics {
            index: epoch.index,
            start_sec: epoch.start_sec,
            sync_score,
            alpha_power,
            bad_leads: report.bad,
        })
    }
}

/// Rank the epochs of `recording` with default settings and the given
/// epoch duration.
pub fn run_pipeline(
    recording: &Recording,
    reference: ReferenceId,
    epoch_duration_seconds: f32,
) -> Result<RankedEpochTable> {
    let cfg = PipelineConfig { epoch_dur: epoch_duration_seconds, ..PipelineConfig::default() };
    run_pipeline_with(recording, reference, &cfg)
}

/// Rank the epochs of `recording` under `cfg`.
///
/// The configuration is validated before any sample is touched.
pub fn run_pipeline_with(
    recording: &Recording,
    reference: ReferenceId,
    cfg: &PipelineConfig,
) -> Result<RankedEpochTable> {
    cfg.validate()?;
    let prepared = preprocess(recording, cfg)?;
    rank_prepared(&prepared, reference, cfg)
}

/// Reference, epoch, analyse and rank an already preprocessed recording.
fn rank_prepared(
    prepared: &Recording,
    reference: ReferenceId,
    cfg: &PipelineConfig,
) -> Result<RankedEpochTable> {
    let _span = tracing::info_span!("rank", %reference, epoch_dur = cfg.epoch_dur).entered();

    let set = build_epochs_with(prepared, reference, cfg.epoch_dur, cfg.hop)?;
    let epochs = set.epochs()?;
    let analyzer = EpochAnalyzer::new(cfg, set.recording().sfreq())?;
    let labels = set.labels();

    let raw: Vec<RawEpochMetrics> = if cfg.parallel {
        epochs.par_iter().map(|e| analyzer.analyze(e, labels)).collect::<Result<_>>()?
    } else {
        epochs.iter().map(|e| analyzer.analyze(e, labels)).collect::<Result<_>>()?
    };

    let table = rank(raw, reference, cfg.epoch_dur, &cfg.grading)?;
    tracing::info!(
        %reference,
        n_epochs = table.len(),
        clean = table.rows.iter().filter(|r| r.n_bad == 0).count(),
        "ranking complete"
    );
    Ok(table)
}

/// Tables for one recording, computed on first request per
/// `(reference, duration)`.
///
/// Preprocessing runs once and is shared by every entry.
#[derive(Debug)]
pub struct RankingCache<'r> {
    recording: &'r Recording,
    config: PipelineConfig,
    prepared: Option<Recording>,
    tables: HashMap<(ReferenceId, u32), RankedEpochTable>,
}

impl<'r> RankingCache<'r> {
    /// `config.epoch_dur` is ignored; the duration comes with each request.
    pub fn new(recording: &'r Recording, config: PipelineConfig) -> Self {
        Self { recording, config, prepared: None, tables: HashMap::new() }
    }

    pub fn get_or_run(&mut self, reference: ReferenceId, duration: f32) -> Result<&RankedEpochTable> {
        let key = (reference, duration.to_bits());
        if !self.tables.contains_key(&key) {
            let cfg = PipelineConfig { epoch_dur: duration, ..self.config.clone() };
            cfg.validate()?;
            if self.prepared.is_none() {
                self.prepared = Some(preprocess(self.recording, &cfg)?);
            }
            let prepared = self.prepared.as_ref().ok_or(QualityError::EmptyRecording)?;
            let table = rank_prepared(prepared, reference, &cfg)?;
            self.tables.insert(key, table);
        } else {
            tracing::debug!(%reference, duration, "ranking cache hit");
        }
        Ok(&self.tables[&key])
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
