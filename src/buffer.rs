//! Fallible buffer allocation.
//!
//! Every buffer whose length comes from the input file goes through these
//! helpers, so an oversized request becomes [`Error::Allocation`] (status
//! 3000) instead of aborting the process.

use crate::error::{Error, Result};

/// A vector of `len` copies of `value`.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut buffer = try_with_capacity(len, what)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// An empty vector with room for exactly `len` values.
pub(crate) fn try_with_capacity<T>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| Error::Allocation { what, len, source })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;

    #[test]
    fn test_filled() {
        let buffer = try_filled(4, 0.5f64, "test buffer").unwrap();
        assert_eq!(buffer, vec![0.5; 4]);
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_sample_sized_request_too_large() {
        let err = try_filled(usize::MAX, 0.0f64, "sample buffer").unwrap_err();
        assert_eq!(err.status(), StatusCode::AllocationFailure);
        assert_eq!(
            err.to_string().split(" (").next(),
            Some("failed to allocate sample buffer")
        );
    }

    #[test]
    fn test_capacity_request_too_large() {
        let err = try_with_capacity::<Vec<u8>>(usize::MAX / 2, "candidate frames").unwrap_err();
        assert_eq!(err.status(), StatusCode::AllocationFailure);
    }
}
