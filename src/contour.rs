//! PitchContour - Per-frame F0 values and their time stamps.

use ndarray::{Array1, ArrayViewMut1};

use crate::buffer::try_filled;
use crate::error::Result;

/// F0 contour produced by an [`F0Estimator`](crate::estimator::F0Estimator).
///
/// Both arrays are allocated together, zero-initialized, and always have
/// the same length. They are filled in place by the estimator.
#[derive(Debug, Clone)]
pub struct PitchContour {
    /// F0 per frame in Hz (0 = unvoiced).
    frequencies: Array1<f64>,
    /// Frame centre times in seconds.
    timestamps: Array1<f64>,
}

impl PitchContour {
    /// Allocate a zeroed contour of `n_frames` frames.
    ///
    /// # Errors
    ///
    /// `Error::Allocation` if either array cannot be allocated.
    pub fn zeroed(n_frames: usize) -> Result<Self> {
        Ok(Self {
            frequencies: zeroed_array(n_frames, "f0 array")?,
            timestamps: zeroed_array(n_frames, "time stamp array")?,
        })
    }

    /// Number of frames.
    #[inline]
    pub fn n_frames(&self) -> usize {
        self.frequencies.len()
    }

    /// F0 values (0 for unvoiced).
    #[inline]
    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    /// Frame times in seconds.
    #[inline]
    pub fn timestamps(&self) -> &Array1<f64> {
        &self.timestamps
    }

    /// Mutable views of `(timestamps, frequencies)` for in-place filling.
    pub fn views_mut(&mut self) -> (ArrayViewMut1<'_, f64>, ArrayViewMut1<'_, f64>) {
        (self.timestamps.view_mut(), self.frequencies.view_mut())
    }

    /// Number of frames with a non-zero F0.
    pub fn n_voiced(&self) -> usize {
        self.frequencies.iter().filter(|&&f| f != 0.0).count()
    }
}

fn zeroed_array(len: usize, what: &'static str) -> Result<Array1<f64>> {
    try_filled(len, 0.0, what).map(Array1::from_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;

    #[test]
    fn test_zeroed() {
        let contour = PitchContour::zeroed(7).unwrap();
        assert_eq!(contour.n_frames(), 7);
        assert_eq!(contour.timestamps().len(), 7);
        assert!(contour.frequencies().iter().all(|&f| f == 0.0));
        assert_eq!(contour.n_voiced(), 0);
    }

    #[test]
    fn test_empty() {
        let contour = PitchContour::zeroed(0).unwrap();
        assert_eq!(contour.n_frames(), 0);
    }

    #[test]
    fn test_fill_in_place() {
        let mut contour = PitchContour::zeroed(3).unwrap();
        {
            let (mut times, mut f0) = contour.views_mut();
            times[2] = 0.01;
            f0[1] = 120.0;
        }
        assert_eq!(contour.frequencies().to_vec(), vec![0.0, 120.0, 0.0]);
        assert_eq!(contour.timestamps()[2], 0.01);
        assert_eq!(contour.n_voiced(), 1);
    }

    #[test]
    fn test_allocation_failure() {
        let err = PitchContour::zeroed(usize::MAX).unwrap_err();
        assert_eq!(err.status(), StatusCode::AllocationFailure);
    }
}
