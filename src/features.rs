//! Pitch features - Scalar statistics over an F0 contour.
//!
//! Four independent features are computed from the per-frame F0 values:
//!
//! | Name   | Feature | Definition |
//! |--------|---------|------------|
//! | pitch1 | [`Feature::Mean`] | sum of non-zero F0 / total frame count |
//! | pitch2 | [`Feature::Deviation`] | population standard deviation, zeros included |
//! | pitch3 | [`Feature::HalfDelta`] | mean of second half - mean of first half |
//! | pitch4 | [`Feature::TailDelta`] | last frame / 5 - mean of all but the last 5 frames |
//!
//! The raw functions ([`pitch1`] .. [`pitch4`]) are total: they never index
//! out of bounds, but return non-finite values for contours too short to
//! fill their index ranges. [`Feature::compute`] guards against those
//! contours and reports them as errors.
//!
//! Note the asymmetries, which are part of the reported values:
//! - pitch1 skips unvoiced frames in the sum but not in the divisor.
//! - pitch3 divides both halves by `n / 2`, even when the second half
//!   holds one more frame.
//! - pitch4 uses only the last frame for its tail term, not the sum of the
//!   last five.

use std::fmt;

use ndarray::{s, ArrayView1};

use crate::error::{Error, Result, StatusCode};

/// Number of trailing frames in the pitch4 tail window.
pub const TAIL_FRAMES: usize = 5;

/// Mean F0 with unvoiced frames excluded from the sum only.
pub fn pitch1(f0: ArrayView1<f64>) -> f64 {
    let sum: f64 = f0.iter().filter(|&&v| v != 0.0).sum();
    sum / f0.len() as f64
}

/// Population standard deviation of all frames, unvoiced included.
pub fn pitch2(f0: ArrayView1<f64>) -> f64 {
    let n = f0.len() as f64;
    let mean = f0.sum() / n;
    let var = f0.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Mean of the second half minus mean of the first half.
pub fn pitch3(f0: ArrayView1<f64>) -> f64 {
    let half = f0.len() / 2;
    let first = f0.slice(s![..half]).sum() / half as f64;
    let second = f0.slice(s![half..]).sum() / half as f64;
    second - first
}

/// Tail term minus mean of the body.
///
/// The body is every frame before the last [`TAIL_FRAMES`]; the tail term
/// is the last frame divided by [`TAIL_FRAMES`].
pub fn pitch4(f0: ArrayView1<f64>) -> f64 {
    let n = f0.len();
    let body_len = n as i64 - TAIL_FRAMES as i64;
    let body = f0.slice(s![..n.saturating_sub(TAIL_FRAMES)]).sum() / body_len as f64;

    let mut tail = 0.0;
    for &v in f0.slice(s![n.saturating_sub(TAIL_FRAMES)..]).iter() {
        tail = v;
    }
    tail /= TAIL_FRAMES as f64;

    tail - body
}

/// One of the four pitch features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// pitch1
    Mean,
    /// pitch2
    Deviation,
    /// pitch3
    HalfDelta,
    /// pitch4
    TailDelta,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Mean,
        Feature::Deviation,
        Feature::HalfDelta,
        Feature::TailDelta,
    ];

    /// 1-based feature number, as in `pitch1` .. `pitch4`.
    pub fn index(self) -> usize {
        match self {
            Feature::Mean => 1,
            Feature::Deviation => 2,
            Feature::HalfDelta => 3,
            Feature::TailDelta => 4,
        }
    }

    /// Shortest contour for which the feature is defined.
    pub fn min_frames(self) -> usize {
        match self {
            Feature::Mean | Feature::Deviation => 1,
            Feature::HalfDelta => 2,
            Feature::TailDelta => TAIL_FRAMES + 1,
        }
    }

    /// Status code reported when the feature cannot be computed.
    pub fn failure_status(self) -> StatusCode {
        match self {
            Feature::Mean => StatusCode::Pitch1Failed,
            Feature::Deviation => StatusCode::Pitch2Failed,
            Feature::HalfDelta => StatusCode::Pitch3Failed,
            Feature::TailDelta => StatusCode::Pitch4Failed,
        }
    }

    /// Evaluate the raw feature function.
    pub fn eval(self, f0: ArrayView1<f64>) -> f64 {
        match self {
            Feature::Mean => pitch1(f0),
            Feature::Deviation => pitch2(f0),
            Feature::HalfDelta => pitch3(f0),
            Feature::TailDelta => pitch4(f0),
        }
    }

    /// Evaluate the feature, rejecting short contours and non-finite values.
    ///
    /// # Errors
    ///
    /// `Error::Feature` with this feature when the contour has fewer than
    /// [`Feature::min_frames`] frames or the value is NaN or infinite.
    pub fn compute(self, f0: ArrayView1<f64>) -> Result<f64> {
        if f0.len() < self.min_frames() {
            return Err(Error::Feature {
                feature: self,
                reason: format!(
                    "needs at least {} frames, got {}",
                    self.min_frames(),
                    f0.len()
                ),
            });
        }

        let value = self.eval(f0);
        if !value.is_finite() {
            return Err(Error::Feature {
                feature: self,
                reason: format!("value is not finite ({})", value),
            });
        }
        Ok(value)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pitch {}", self.index())
    }
}

/// The four feature values of one contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSet {
    pub pitch1: f64,
    pub pitch2: f64,
    pub pitch3: f64,
    pub pitch4: f64,
}

impl FeatureSet {
    /// Compute all four features.
    ///
    /// With `parallel` set, each feature runs as its own rayon task over
    /// the shared read-only contour; all four are joined before returning.
    /// When several features fail, the lowest-numbered one is reported.
    pub fn compute(f0: ArrayView1<f64>, parallel: bool) -> Result<Self> {
        let (r1, r2, r3, r4) = if parallel {
            let ((r1, r2), (r3, r4)) = rayon::join(
                || {
                    rayon::join(
                        || Feature::Mean.compute(f0),
                        || Feature::Deviation.compute(f0),
                    )
                },
                || {
                    rayon::join(
                        || Feature::HalfDelta.compute(f0),
                        || Feature::TailDelta.compute(f0),
                    )
                },
            );
            (r1, r2, r3, r4)
        } else {
            (
                Feature::Mean.compute(f0),
                Feature::Deviation.compute(f0),
                Feature::HalfDelta.compute(f0),
                Feature::TailDelta.compute(f0),
            )
        };

        Ok(Self {
            pitch1: r1?,
            pitch2: r2?,
            pitch3: r3?,
            pitch4: r4?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_pitch1_divides_by_all_frames() {
        let f0 = array![100.0, 0.0, 200.0, 0.0];
        // (100 + 200) / 4, not / 2
        assert_eq!(pitch1(f0.view()), 75.0);
    }

    #[test]
    fn test_pitch2_constant_is_zero() {
        let f0 = Array1::from_elem(12, 150.0);
        assert_eq!(pitch2(f0.view()), 0.0);
    }

    #[test]
    fn test_pitch2_includes_zeros() {
        // mean 100, deviations +-100
        let f0 = array![0.0, 200.0, 0.0, 200.0];
        assert_eq!(pitch2(f0.view()), 100.0);
    }

    #[test]
    fn test_pitch2_non_negative() {
        let f0 = array![110.0, 0.0, 95.5, 230.0, 0.0, 180.25, 99.0];
        assert!(pitch2(f0.view()) >= 0.0);
    }

    #[test]
    fn test_all_zero_contour() {
        let f0 = Array1::<f64>::zeros(20);
        assert_eq!(pitch1(f0.view()), 0.0);
        assert_eq!(pitch2(f0.view()), 0.0);
        assert_eq!(pitch3(f0.view()), 0.0);
    }

    #[test]
    fn test_pitch3_even() {
        let f0 = array![100.0, 100.0, 140.0, 160.0];
        // second half mean 150, first half mean 100
        assert_eq!(pitch3(f0.view()), 50.0);
    }

    #[test]
    fn test_pitch3_odd_uses_half_divisor() {
        let f0 = array![100.0, 100.0, 100.0, 100.0, 100.0];
        // half = 2: first = 200 / 2, second = 300 / 2
        assert_eq!(pitch3(f0.view()), 50.0);
    }

    #[test]
    fn test_pitch4_keeps_last_tail_value() {
        let f0 = array![100.0, 100.0, 100.0, 100.0, 1.0, 2.0, 3.0, 4.0, 500.0];
        // body = 4 frames of 100, tail = 500 / 5
        assert_eq!(pitch4(f0.view()), 0.0);

        let f0 = array![100.0, 120.0, 0.0, 0.0, 0.0, 0.0, 250.0];
        // body mean 110, tail 250 / 5 = 50
        assert_eq!(pitch4(f0.view()), -60.0);
    }

    #[test]
    fn test_short_contours_stay_in_bounds() {
        for n in 0..=TAIL_FRAMES {
            let f0 = Array1::from_elem(n, 120.0);
            // Values may be non-finite, but evaluation must not panic
            for feature in Feature::ALL {
                let _ = feature.eval(f0.view());
            }
        }
    }

    #[test]
    fn test_compute_rejects_short_contours() {
        let f0 = Array1::from_elem(5, 120.0);
        let err = Feature::TailDelta.compute(f0.view()).unwrap_err();
        assert_eq!(err.status(), StatusCode::Pitch4Failed);

        let f0 = Array1::from_elem(1, 120.0);
        let err = Feature::HalfDelta.compute(f0.view()).unwrap_err();
        assert_eq!(err.status(), StatusCode::Pitch3Failed);
        assert_eq!(Feature::Mean.compute(f0.view()).unwrap(), 120.0);

        let f0 = Array1::<f64>::zeros(0);
        let err = Feature::Mean.compute(f0.view()).unwrap_err();
        assert_eq!(err.status(), StatusCode::Pitch1Failed);
    }

    #[test]
    fn test_compute_rejects_non_finite() {
        let f0 = array![f64::INFINITY, 100.0];
        let err = Feature::Deviation.compute(f0.view()).unwrap_err();
        assert_eq!(err.status(), StatusCode::Pitch2Failed);
    }

    #[test]
    fn test_feature_set_parallel_matches_sequential() {
        let f0: Array1<f64> = (0..40)
            .map(|i| if i % 3 == 0 { 0.0 } else { 100.0 + i as f64 })
            .collect();
        let parallel = FeatureSet::compute(f0.view(), true).unwrap();
        let sequential = FeatureSet::compute(f0.view(), false).unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.pitch1, pitch1(f0.view()));
        assert_eq!(parallel.pitch4, pitch4(f0.view()));
    }

    #[test]
    fn test_feature_set_reports_first_failure() {
        let f0 = Array1::from_elem(1, 100.0);
        let err = FeatureSet::compute(f0.view(), true).unwrap_err();
        assert_eq!(err.status(), StatusCode::Pitch3Failed);
    }

    #[test]
    fn test_display() {
        assert_eq!(Feature::TailDelta.to_string(), "pitch 4");
    }
}
