//! Error types and status codes for speech_pitch.
//!
//! Every failure in the analysis pipeline is an [`Error`]. Each error maps
//! to exactly one numeric [`StatusCode`], which is what foreign callers see
//! through the C ABI together with the code's fixed message.
//!
//! # Status Code Table
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | success |
//! | 1000 | file not found / cannot be opened |
//! | 1001 | file cannot be read |
//! | 1002 | file is not in the expected format |
//! | 2000 | no speech detected |
//! | 2001-2004 | a pitch feature could not be computed |
//! | 3000 | memory allocation failure |

use std::collections::TryReserveError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::features::Feature;

/// Result type alias using speech_pitch's Error type.
///
/// # Example
///
/// ```no_run
/// use speech_pitch::{AudioSource, Result};
///
/// fn sample_rate_of(path: &str) -> Result<u32> {
///     let source = AudioSource::open(path)?;
///     Ok(source.sample_rate())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric outcome of one analysis call.
///
/// The discriminants are the values written into the `status` field of
/// the serialized result and returned by `PitchAnalyzer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    Success = 0,
    FileNotFound = 1000,
    FileCannotBeRead = 1001,
    InvalidFormat = 1002,
    NoSpeechDetected = 2000,
    Pitch1Failed = 2001,
    Pitch2Failed = 2002,
    Pitch3Failed = 2003,
    Pitch4Failed = 2004,
    AllocationFailure = 3000,
}

impl StatusCode {
    /// Every status code, in ascending numeric order.
    pub const ALL: [StatusCode; 10] = [
        StatusCode::Success,
        StatusCode::FileNotFound,
        StatusCode::FileCannotBeRead,
        StatusCode::InvalidFormat,
        StatusCode::NoSpeechDetected,
        StatusCode::Pitch1Failed,
        StatusCode::Pitch2Failed,
        StatusCode::Pitch3Failed,
        StatusCode::Pitch4Failed,
        StatusCode::AllocationFailure,
    ];

    /// The integer value of this code.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// The fixed human-readable message for this code.
    ///
    /// This is the exact text placed in the `comment` field of the result.
    pub fn message(self) -> &'static str {
        match self {
            StatusCode::Success => "success",
            StatusCode::FileNotFound => "Error : file not found",
            StatusCode::FileCannotBeRead => "Error : file cannot be read",
            StatusCode::InvalidFormat => "Error : file is not on correct format",
            StatusCode::NoSpeechDetected => "Error : no speech detected",
            StatusCode::Pitch1Failed => "Error : cannot calculate pitch 1. Reason : ...",
            StatusCode::Pitch2Failed => "Error : cannot calculate pitch 2. Reason : ...",
            StatusCode::Pitch3Failed => "Error : cannot calculate pitch 3. Reason : ...",
            StatusCode::Pitch4Failed => "Error : cannot calculate pitch 4. Reason : ...",
            StatusCode::AllocationFailure => "Error : Memory Allocation Error",
        }
    }

    /// Look up a status code by its integer value.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.message())
    }
}

/// Errors that can occur during pitch analysis.
///
/// Variants carry context for logging; the caller-visible outcome is
/// always the variant's [`StatusCode`] (see [`Error::status`]).
#[derive(Error, Debug)]
pub enum Error {
    /// The input file does not exist or cannot be opened for reading.
    #[error("cannot open {path}: {source}")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file opened and its header parsed, but the sample data could
    /// not be read (truncated or unreadable payload).
    #[error("cannot read samples from {path}: {reason}")]
    FileCannotBeRead { path: PathBuf, reason: String },

    /// The file is not a decodable PCM WAV file, or decodes to zero samples.
    #[error("unsupported audio format: {0}")]
    InvalidFormat(String),

    /// The extracted contour contains no voiced frame.
    #[error("no voiced frame in {n_frames} frames")]
    NoSpeechDetected { n_frames: usize },

    /// One of the four pitch features could not be computed.
    #[error("cannot calculate {feature}: {reason}")]
    Feature { feature: Feature, reason: String },

    /// A sample or contour buffer could not be allocated.
    #[error("failed to allocate {what} ({len} values): {source}")]
    Allocation {
        what: &'static str,
        len: usize,
        #[source]
        source: TryReserveError,
    },
}

impl Error {
    /// The status code reported to callers for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::FileNotFound { .. } => StatusCode::FileNotFound,
            Error::FileCannotBeRead { .. } => StatusCode::FileCannotBeRead,
            Error::InvalidFormat(_) => StatusCode::InvalidFormat,
            Error::NoSpeechDetected { .. } => StatusCode::NoSpeechDetected,
            Error::Feature { feature, .. } => feature.failure_status(),
            Error::Allocation { .. } => StatusCode::AllocationFailure,
        }
    }
}
