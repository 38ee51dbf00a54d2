//! FIR kernel design.
//!
//! For an edge at `f` Hz and sampling rate `fs`:
//!   • transition bandwidth: highpass `min(max(f/4, 2), f)`,
//!     lowpass `min(max(f/4, 2), fs/2 − f)`
//!   • length `ceil(3.3 / tb · fs)`, forced odd
//!   • Hamming-windowed sinc placed at the middle of the transition band;
//!     highpass kernels are the spectral inverse of a lowpass
use std::f64::consts::PI;

/// Which side of the edge frequency passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    High,
    Low,
}

/// Automatic transition bandwidth in Hz.
pub fn trans_bandwidth(edge: f32, sfreq: f32, pass: Pass) -> f32 {
    let tb = (0.25 * edge).max(2.0);
    match pass {
        Pass::High => tb.min(edge),
        Pass::Low => tb.min(sfreq / 2.0 - edge),
    }
}

/// Odd number of taps for a transition bandwidth of `tb` Hz.
pub fn filter_length(tb: f32, sfreq: f32) -> usize {
    let n = (3.3 / tb * sfreq).ceil() as usize;
    n | 1
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n).map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos()).collect()
}

/// Lowpass windowed sinc with `n` (odd) taps, cutoff `cutoff_hz`, unit DC gain.
pub fn windowed_sinc(n: usize, cutoff_hz: f32, sfreq: f32) -> Vec<f64> {
    let centre = (n / 2) as f64;
    let fc = 2.0 * cutoff_hz as f64 / sfreq as f64;
    let mut h: Vec<f64> = hamming(n)
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let x = i as f64 - centre;
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * w
        })
        .collect();
    let dc: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= dc);
    h
}

fn design(edge: f32, sfreq: f32, pass: Pass) -> Vec<f32> {
    let tb = trans_bandwidth(edge, sfreq, pass);
    let n = filter_length(tb, sfreq);
    let lp = match pass {
        Pass::High => windowed_sinc(n, edge - tb / 2.0, sfreq),
        Pass::Low => windowed_sinc(n, edge + tb / 2.0, sfreq),
    };
    match pass {
        Pass::Low => lp.into_iter().map(|v| v as f32).collect(),
        Pass::High => lp
            .into_iter()
            .enumerate()
            .map(|(i, v)| if i == n / 2 { (1.0 - v) as f32 } else { -v as f32 })
            .collect(),
    }
}

/// Zero-phase highpass kernel with passband edge `l_freq` Hz.
pub fn design_highpass(l_freq: f32, sfreq: f32) -> Vec<f32> {
    design(l_freq, sfreq, Pass::High)
}

/// Zero-phase lowpass kernel with passband edge `h_freq` Hz.
pub fn design_lowpass(h_freq: f32, sfreq: f32) -> Vec<f32> {
    design(h_freq, sfreq, Pass::Low)
}
