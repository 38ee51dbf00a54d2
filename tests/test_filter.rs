mod common;
use common::standard_recording;
use epochrank::filter::{apply_fir_zero_phase, design_highpass, design_lowpass};
use ndarray::Array2;

#[test]
fn highpass_coeffs_sum_near_zero() {
    let h = design_highpass(0.5, 256.0);
    let s: f32 = h.iter().sum();
    assert!(s.abs() < 1e-5, "sum(h) = {s:.2e}, expected ≈ 0 for highpass");
}

#[test]
fn lowpass_coeffs_sum_to_one() {
    let h = design_lowpass(40.0, 256.0);
    let s: f32 = h.iter().sum();
    approx::assert_abs_diff_eq!(s, 1.0, epsilon = 1e-5);
}

#[test]
fn coeffs_symmetric() {
    for h in [design_highpass(0.5, 256.0), design_lowpass(30.0, 256.0)] {
        let n = h.len();
        assert_eq!(n % 2, 1);
        for i in 0..n / 2 {
            let diff = (h[i] - h[n - 1 - i]).abs();
            assert!(diff < 1e-7, "h[{i}]={} ≠ h[{}]={}", h[i], n - 1 - i, h[n - 1 - i]);
        }
    }
}

#[test]
fn highpass_removes_sub_hz_drift() {
    let sfreq = 256.0_f32;
    let n = 60 * 256;
    let tau = 2.0 * std::f32::consts::PI;
    let row: Vec<f32> = (0..n)
        .map(|i| {
            let t = i as f32 / sfreq;
            (tau * 0.1 * t).sin() + (tau * 10.0 * t).sin()
        })
        .collect();
    let mut data = Array2::from_shape_vec((1, n), row).unwrap();
    let h = design_highpass(0.5, sfreq);
    apply_fir_zero_phase(&mut data, &h).unwrap();

    let guard = h.len();
    let interior: Vec<f32> = data.row(0).iter().skip(guard).take(n - 2 * guard).copied().collect();
    let rms = (interior.iter().map(|v| v * v).sum::<f32>() / interior.len() as f32).sqrt();
    // A unit 10 Hz sine has RMS 1/√2.
    assert!(rms > 0.6, "RMS too low ({rms:.3}), pass band attenuated?");
    assert!(rms < 0.85, "RMS too high ({rms:.3}), drift not removed?");
}

#[test]
fn filtering_keeps_alpha_recording_shape() {
    let rec = standard_recording(12);
    let mut data = rec.data().clone();
    apply_fir_zero_phase(&mut data, &design_highpass(0.5, 256.0)).unwrap();
    assert_eq!(data.dim(), rec.data().dim());
    assert!(data.iter().all(|v| v.is_finite()));
}
