//! # epochrank — EEG epoch quality and alpha-synchrony ranking
//!
//! `epochrank` slices a continuous EEG recording into overlapping epochs,
//! flags bad leads in each epoch, scores alpha-band synchrony and relative
//! alpha power on the remaining channels, and ranks the epochs so the
//! cleanest, most alpha-rich ones come first.
//!
//! ## Pipeline overview
//!
//! ```text
//! Recording [C, T] µV
//!   │
//!   ├─ resample::resample()       FFT → target_sfreq (default 256 Hz)
//!   ├─ filter (FIR HP / LP)       zero-phase, 0.5 Hz highpass
//!   ├─ reference                  linked ears / centroid / bipolar montages
//!   ├─ epoch                      10 s windows on a 1 s hop
//!   ├─ spectrum::Welch            2 s Hann segments, 50 % overlap
//!   ├─ bad_leads                  variance + PSD line-fit tests
//!   ├─ synchrony / band_power     on the good channels only
//!   └─ ranking                    bad grade ↑, alpha power ↓ (stable)
//!        │
//!        └─→ RankedEpochTable
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use epochrank::{run_pipeline, Recording, ReferenceId};
//! use ndarray::Array2;
//!
//! let labels = ["Fp1", "Fp2", "O1", "O2", "A1", "A2"].map(String::from).to_vec();
//! let data: Array2<f32> = Array2::zeros((6, 60 * 256));
//! let recording = Recording::new(data, labels, 256.0).unwrap();
//!
//! let table = run_pipeline(&recording, ReferenceId::LinkedEars, 10.0).unwrap();
//! for row in &table.rows {
//!     println!("{} {:.1}s alpha={:.3} bad={:?}", row.index, row.start_sec, row.alpha_power, row.bad_leads);
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use epochrank::bad_leads::detect_bad_channels;
//! use epochrank::spectrum::estimate_psd;
//! use epochrank::synchrony::total_sync_score;
//! use epochrank::band_power::relative_alpha_power;
//! use ndarray::Array2;
//!
//! let segment: Array2<f32> = Array2::zeros((2, 2560));
//! let labels = vec!["O1".to_string(), "O2".to_string()];
//!
//! let bad = detect_bad_channels(segment.view(), &labels, 256.0).unwrap();
//! let psd = estimate_psd(segment.view(), 256.0).unwrap();
//! let sync = total_sync_score(&psd);
//! let alpha = relative_alpha_power(&psd);
//! ```

pub mod bad_leads;
pub mod band_power;
pub mod config;
pub mod epoch;
pub mod error;
pub mod filter;
pub mod grading;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod ranking;
pub mod recording;
pub mod reference;
pub mod resample;
pub mod spectrum;
pub mod synchrony;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use bad_leads::{detect_bad_channels, BadLeadDetector, BadLeadReport, BadLeadSet};
pub use band_power::{relative_alpha_power, relative_band_power};
pub use config::{BadLeadThresholds, GradeConfig, PipelineConfig};
pub use epoch::{sliding_epochs, Epoch};
pub use error::{QualityError, Result};
pub use grading::{grade_bads, AlphaGrade};
pub use pipeline::{build_epochs, preprocess, run_pipeline, run_pipeline_with, EpochSet, RankingCache};
pub use ranking::{select_best, EpochMetrics, RankedEpochTable};
pub use recording::{ChannelKind, Recording, SubjectInfo};
pub use reference::ReferenceId;
pub use spectrum::{estimate_psd, PowerSpectrum, Welch};
pub use synchrony::total_sync_score;
