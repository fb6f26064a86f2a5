//! Analyzer - The file-to-features pipeline.
//!
//! One analysis walks these stages in order:
//!
//! ```text
//! Init → FileCheck → Decode → SizeQuery → Extract → FeatureCompute → Done
//! ```
//!
//! Any stage may fail; the pipeline then stops immediately and the error's
//! status code becomes the result. Buffers allocated so far are released
//! on return in every case.

use std::fmt;
use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::contour::PitchContour;
use crate::error::{Error, Result};
use crate::estimator::{AutocorrelationEstimator, F0Estimator};
use crate::features::FeatureSet;
use crate::result::AnalysisResult;
use crate::sound::AudioSource;

/// Pipeline stage, used to tag log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    FileCheck,
    Decode,
    SizeQuery,
    Extract,
    FeatureCompute,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::FileCheck => "file-check",
            Stage::Decode => "decode",
            Stage::SizeQuery => "size-query",
            Stage::Extract => "extract",
            Stage::FeatureCompute => "feature-compute",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs the analysis pipeline with a given F0 estimator.
///
/// An `Analyzer` holds no per-call state and can serve concurrent calls.
///
/// # Example
///
/// ```no_run
/// use speech_pitch::Analyzer;
///
/// let result = Analyzer::new().analyze("speech.wav");
/// println!("{}", result.to_json().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer<E = AutocorrelationEstimator> {
    estimator: E,
    parallel_features: bool,
}

impl Analyzer<AutocorrelationEstimator> {
    /// An analyzer with [`AnalysisConfig::default`].
    pub fn new() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }

    /// Build an analyzer using the autocorrelation estimator.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            estimator: AutocorrelationEstimator::new(config.estimator.clone()),
            parallel_features: config.parallel_features,
        }
    }
}

impl Default for Analyzer<AutocorrelationEstimator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: F0Estimator> Analyzer<E> {
    /// Build an analyzer around any estimator.
    pub fn with_estimator(estimator: E) -> Self {
        Self {
            estimator,
            parallel_features: true,
        }
    }

    /// Compute features sequentially instead of as parallel tasks.
    pub fn sequential(mut self) -> Self {
        self.parallel_features = false;
        self
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Analyze a file, reporting failures as data.
    ///
    /// Never panics on bad input; every failure becomes a result with the
    /// matching status code and comment.
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> AnalysisResult {
        let path = path.as_ref();
        match self.run(path) {
            Ok(features) => AnalysisResult::success(features),
            Err(err) => {
                let status = err.status();
                warn!(path = %path.display(), code = status.code(), "{}: {}", status.message(), err);
                AnalysisResult::failure(&err)
            }
        }
    }

    /// Analyze a file, returning the features or the first error.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<FeatureSet> {
        let path = path.as_ref();
        debug!(stage = %Stage::Init, path = %path.display(), "starting analysis");

        debug!(stage = %Stage::FileCheck, "opening file");
        File::open(path).map_err(|source| Error::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(stage = %Stage::Decode, "decoding audio");
        let source = AudioSource::open(path)?;

        self.run_source(&source)
    }

    /// Run the pipeline from the size query on, over decoded audio.
    pub fn run_source(&self, source: &AudioSource) -> Result<FeatureSet> {
        let n_frames = self
            .estimator
            .n_frames(source.sample_rate(), source.n_samples());
        debug!(
            stage = %Stage::SizeQuery,
            sample_rate = source.sample_rate(),
            n_samples = source.n_samples(),
            frame_period = self.estimator.frame_period(),
            n_frames,
            "sizing contour"
        );
        let mut contour = PitchContour::zeroed(n_frames)?;

        debug!(stage = %Stage::Extract, n_frames, "estimating f0");
        {
            let (timestamps, frequencies) = contour.views_mut();
            self.estimator.estimate(
                source.samples().view(),
                source.sample_rate(),
                timestamps,
                frequencies,
            )?;
        }

        let n_voiced = contour.n_voiced();
        if n_voiced == 0 {
            return Err(Error::NoSpeechDetected { n_frames });
        }

        debug!(
            stage = %Stage::FeatureCompute,
            n_voiced,
            parallel = self.parallel_features,
            "computing features"
        );
        let features = FeatureSet::compute(contour.frequencies().view(), self.parallel_features)?;

        debug!(stage = %Stage::Done, ?features, "analysis complete");
        Ok(features)
    }
}
