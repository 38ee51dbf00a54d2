/// Synthetic recordings shared by the integration tests.
use epochrank::Recording;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SFREQ: f32 = 256.0;

/// The 19 electrodes of the 10-20 system.
pub const EEG_19: [&str; 19] = [
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T3", "C3", "Cz", "C4", "T4", "T5", "P3", "Pz",
    "P4", "T6", "O1", "O2",
];

/// Seeded uniform noise in `[-1, 1)`.
pub fn noise(seed: u64, n: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// One EEG-like channel: slowly modulated 10 Hz alpha, some 5 Hz theta and
/// low-level noise, all in µV.
pub fn eeg_row(channel: usize, n_times: usize, alpha_amp: f32) -> Vec<f32> {
    let tau = 2.0 * std::f32::consts::PI;
    let phase = channel as f32 * 0.37;
    noise(channel as u64 + 1, n_times)
        .into_iter()
        .enumerate()
        .map(|(t, n)| {
            let ts = t as f32 / SFREQ;
            let envelope = 1.0 + 0.5 * (tau * ts / 37.0 + phase).sin();
            alpha_amp * envelope * (tau * 10.0 * ts + phase).sin()
                + 4.0 * (tau * 5.0 * ts + 2.0 * phase).sin()
                + 1.5 * n
        })
        .collect()
}

/// Matrix and labels for `labels`; rows named `A1`/`A2` are zero.
#[allow(unused)]
pub fn build(labels: &[&str], seconds: usize) -> (Array2<f32>, Vec<String>) {
    let n_times = seconds * SFREQ as usize;
    let mut data = Array2::<f32>::zeros((labels.len(), n_times));
    for (c, (label, mut row)) in labels.iter().zip(data.rows_mut()).enumerate() {
        if !label.starts_with('A') {
            row.assign(&ndarray::Array1::from(eeg_row(c, n_times, 15.0)));
        }
    }
    (data, labels.iter().map(|s| s.to_string()).collect())
}

/// 19 EEG channels plus zero-valued A1/A2 at 256 Hz.
#[allow(unused)]
pub fn standard_recording(seconds: usize) -> Recording {
    let mut labels: Vec<&str> = EEG_19.to_vec();
    labels.extend(["A1", "A2"]);
    let (data, labels) = build(&labels, seconds);
    Recording::new(data, labels, SFREQ).unwrap()
}

/// `standard_recording` with `label`'s row replaced by a constant.
#[allow(unused)]
pub fn with_constant_channel(seconds: usize, label: &str, value: f32) -> Recording {
    let rec = standard_recording(seconds);
    let mut data = rec.data().clone();
    let row = rec.index_of(label).unwrap();
    data.row_mut(row).fill(value);
    Recording::new(data, rec.labels().to_vec(), SFREQ).unwrap()
}

/// Copy of `rec` without the channel `label`.
#[allow(unused)]
pub fn without_channel(rec: &Recording, label: &str) -> Recording {
    let drop = rec.index_of(label).unwrap();
    let keep: Vec<usize> = (0..rec.n_channels()).filter(|&i| i != drop).collect();
    let data = rec.data().select(ndarray::Axis(0), &keep);
    let labels = keep.iter().map(|&i| rec.labels()[i].clone()).collect();
    Recording::new(data, labels, rec.sfreq()).unwrap()
}

#[allow(unused)]
/// Maximum absolute difference between two equally shaped arrays.
pub fn max_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f32, f32::max)
}
