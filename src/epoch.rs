//! Sliding-window epoching.
//!
//! Carves continuous `[C, T]` data into fixed-length windows whose starts are
//! `hop_samples` apart, dropping any trailing window that cannot be filled.
//! Epochs are borrowed views into the source matrix; nothing is copied.
use ndarray::{s, Array2, ArrayView2};

use crate::error::{QualityError, Result};

/// One window of a recording.
#[derive(Debug, Clone)]
pub struct Epoch<'a> {
    /// Position in the epoch sequence, 0-based.
    pub index: usize,
    /// First sample of the window in the source recording.
    pub start_sample: usize,
    /// `start_sample / sfreq`.
    pub start_sec: f32,
    /// `[C, epoch_samples]` view.
    pub data: ArrayView2<'a, f32>,
}

impl Epoch<'_> {
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }
}

/// Number of complete windows of `epoch_samples` on a `hop_samples` stride.
///
/// ```
/// use epochrank::epoch::n_epochs;
/// // 60 s at 256 Hz, 10 s epochs, 1 s hop
/// assert_eq!(n_epochs(15360, 2560, 256), 51);
/// assert_eq!(n_epochs(100, 256, 256), 0);
/// ```
pub fn n_epochs(n_times: usize, epoch_samples: usize, hop_samples: usize) -> usize {
    if epoch_samples == 0 || hop_samples == 0 || n_times < epoch_samples {
        return 0;
    }
    (n_times - epoch_samples) / hop_samples + 1
}

/// Slide a window over `data` ([C, T]) and return the epochs as views.
///
/// Fails with a configuration error when `epoch_samples` or `hop_samples`
/// is zero or the hop exceeds the window (overlap must lie in
/// `[0, epoch_samples)`).
pub fn sliding_epochs(
    data: &Array2<f32>,
    sfreq: f32,
    epoch_samples: usize,
    hop_samples: usize,
) -> Result<Vec<Epoch<'_>>> {
    if epoch_samples == 0 || hop_samples == 0 || hop_samples > epoch_samples {
        return Err(QualityError::Configuration(format!(
            "epoch of {epoch_samples} samples with hop {hop_samples} is not a valid window"
        )));
    }
    let n = n_epochs(data.ncols(), epoch_samples, hop_samples);
    Ok((0..n)
        .map(|e| {
            let start = e * hop_samples;
            Epoch {
                index: e,
                start_sample: start,
                start_sec: start as f32 / sfreq,
                data: data.slice(s![.., start..start + epoch_samples]),
            }
        })
        .collect())
}
