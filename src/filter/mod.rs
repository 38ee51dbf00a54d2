//! Zero-phase FIR filtering applied before referencing.
//!
//! - [`design`]: Hamming-windowed sinc highpass / lowpass kernels with
//!   automatic transition bandwidth and length.
//! - [`apply`]: reflect-padded FFT convolution, shifted by `(N-1)/2` so
//!   the output has no phase delay.

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d};
pub use design::{design_highpass, design_lowpass, filter_length, hamming, trans_bandwidth, windowed_sinc};
