//! # speech_pitch
//!
//! F0 (pitch) contour extraction from speech recordings, reduced to four
//! scalar descriptors and returned as JSON through a C-callable boundary.
//!
//! # Pipeline
//!
//! 1. **AudioSource**: decode a PCM WAV file to `f64` samples
//! 2. **PitchContour**: allocate one F0 value and one time stamp per frame
//! 3. **F0Estimator**: fill the contour in place
//! 4. **Features**: compute pitch1..pitch4 over the contour, in parallel
//! 5. **AnalysisResult**: status code, comment and the four values
//!
//! # Quick Start
//!
//! ```no_run
//! use speech_pitch::Analyzer;
//!
//! let result = Analyzer::new().analyze("speech.wav");
//! if result.is_success() {
//!     println!("mean pitch: {:?}", result.pitch1);
//! } else {
//!     eprintln!("{} {}", result.status, result.comment);
//! }
//! ```
//!
//! # Features
//!
//! | Key    | Value |
//! |--------|-------|
//! | pitch1 | sum of voiced F0 / number of frames |
//! | pitch2 | standard deviation of F0, unvoiced frames included |
//! | pitch3 | mean F0 of the second half - mean F0 of the first half |
//! | pitch4 | last frame / 5 - mean F0 before the last five frames |
//!
//! # C ABI
//!
//! With the default `ffi` feature the `cdylib` exports `PitchAnalyzer`,
//! `PitchAnalyzer2` and `PitchAnalyzerFree`; see `include/speech_pitch.h`.

pub mod analysis;
mod buffer;
pub mod config;
pub mod contour;
pub mod error;
pub mod estimator;
pub mod features;
pub mod result;
pub mod sound;

// C entry points (enabled with "ffi" feature)
#[cfg(feature = "ffi")]
pub mod ffi;

/// Error types and status codes.
pub use error::{Error, Result, StatusCode};

/// The analysis pipeline and its stages.
pub use analysis::{Analyzer, Stage};

/// Analyzer settings.
pub use config::AnalysisConfig;

/// Per-frame F0 values and time stamps.
pub use contour::PitchContour;

/// F0 estimation.
///
/// - `F0Estimator`: sizing and fill functions of an F0 algorithm
/// - `AutocorrelationEstimator`: the built-in estimator
/// - `EstimatorOptions`: its parameters
pub use estimator::{AutocorrelationEstimator, EstimatorOptions, F0Estimator};

/// Pitch features.
pub use features::{pitch1, pitch2, pitch3, pitch4, Feature, FeatureSet};

/// The serialized result record.
pub use result::AnalysisResult;

/// Decoded input audio.
pub use sound::AudioSource;
