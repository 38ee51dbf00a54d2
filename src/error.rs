//! Error taxonomy for the ranking pipeline.
//!
//! Structural failures (too-short signal, bad shapes, unknown configuration)
//! are variants here and propagate to the caller unchanged.  Numeric edge
//! cases inside per-channel math are absorbed where they occur: a failed
//! offset/slope fit only ever shows up as [`QualityError::DegenerateFit`]
//! inside the bad-lead detector and never leaves it.

/// Error type for every fallible operation in the crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityError {
    /// The segment is shorter than one spectral analysis window.
    #[error("insufficient samples: need at least {required}, got {available}")]
    InsufficientSamples {
        /// Samples needed for one Welch segment.
        required: usize,
        /// Samples actually present.
        available: usize,
    },

    /// The offset/slope line fit of a channel's PSD is numerically undefined.
    #[error("degenerate PSD fit on channel {channel}")]
    DegenerateFit {
        /// Row index of the channel within the analysed matrix.
        channel: usize,
    },

    /// Invalid run configuration (epoch duration, reference id, thresholds).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Sample rate must be finite and positive.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The recording holds no channels or no samples.
    #[error("recording is empty")]
    EmptyRecording,

    /// Channel labels must be unique.
    #[error("duplicate channel label: {0}")]
    DuplicateChannel(String),

    /// A reference transform needs electrodes the recording does not have.
    #[error("missing channels for {reference}: {missing:?}")]
    MissingChannels {
        /// Reference scheme that was requested.
        reference: String,
        /// Normalised labels that could not be found.
        missing: Vec<String>,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QualityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_samples_message() {
        let err = QualityError::InsufficientSamples { required: 512, available: 100 };
        assert_eq!(err.to_string(), "insufficient samples: need at least 512, got 100");
    }

    #[test]
    fn configuration_message() {
        let err = QualityError::Configuration("epoch duration 2 s outside [3, 30]".into());
        assert_eq!(err.to_string(), "configuration error: epoch duration 2 s outside [3, 30]");
    }

    #[test]
    fn missing_channels_message() {
        let err = QualityError::MissingChannels {
            reference: "linked-ears".into(),
            missing: vec!["a1".into()],
        };
        assert_eq!(err.to_string(), "missing channels for linked-ears: [\"a1\"]");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<QualityError>();
    }
}
