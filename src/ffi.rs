//! C ABI for speech_pitch.
//!
//! Two entry points run the same analysis and differ only in who owns the
//! output buffer:
//!
//! ```c
//! // Caller-owned buffer; returns the status code.
//! int   PitchAnalyzer(const char *file_name, char *dst);
//!
//! // Library-owned buffer; release it with PitchAnalyzerFree.
//! char *PitchAnalyzer2(const char *file_name);
//! void  PitchAnalyzerFree(char *json);
//! ```
//!
//! Both write the JSON form of [`AnalysisResult`] and never unwind into
//! the caller: every failure is reported in the `status` and `comment`
//! fields, and a panic inside the analysis is caught and reported as
//! status 3000. Each call builds its own result, so concurrent calls from
//! different threads are independent.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

use tracing::{error, warn};

use crate::analysis::Analyzer;
use crate::error::StatusCode;
use crate::result::AnalysisResult;

/// Status reported when the analysis panics.
const PANIC_STATUS: StatusCode = StatusCode::AllocationFailure;

/// Run one analysis for a C path and serialize the result.
///
/// Returns the status and the JSON text, or `None` for the text if the
/// result could not be serialized.
///
/// # Safety
///
/// `file_name` must be null or point to a NUL-terminated string.
unsafe fn analyze_c_path(file_name: *const c_char) -> (c_int, Option<String>) {
    let path = c_path(file_name);
    let result = contain_panic(|| match path {
        Some(path) => Analyzer::new().analyze(path),
        None => {
            warn!("rejected null or non-UTF-8 file name");
            AnalysisResult::from_status(StatusCode::FileNotFound)
        }
    });

    let json = match result.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            error!(status = result.status, "cannot serialize result: {}", e);
            None
        }
    };
    (result.status as c_int, json)
}

/// Run `analysis`, turning a panic into a [`PANIC_STATUS`] result.
fn contain_panic<F: FnOnce() -> AnalysisResult>(analysis: F) -> AnalysisResult {
    panic::catch_unwind(AssertUnwindSafe(analysis)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        error!(code = PANIC_STATUS.code(), "analysis panicked: {}", reason);
        AnalysisResult::from_status(PANIC_STATUS)
    })
}

/// # Safety
///
/// `file_name` must be null or point to a NUL-terminated string.
unsafe fn c_path(file_name: *const c_char) -> Option<PathBuf> {
    if file_name.is_null() {
        return None;
    }
    bytes_to_path(CStr::from_ptr(file_name).to_bytes())
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Option<PathBuf> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(bytes).ok().map(PathBuf::from)
}

/// Analyze a WAV file and write the JSON result into `dst`.
///
/// Returns 0 on success, otherwise the non-zero status code. The result
/// text is written even on failure. A null `dst` skips the write; if the
/// result cannot be serialized an empty string is written.
///
/// # Safety
///
/// - `file_name` must be null or point to a NUL-terminated string.
/// - `dst` must be null or point to a writable buffer large enough for the
///   JSON text plus its NUL terminator. 256 bytes always suffice.
#[no_mangle]
pub unsafe extern "C" fn PitchAnalyzer(file_name: *const c_char, dst: *mut c_char) -> c_int {
    let (status, json) = analyze_c_path(file_name);

    if !dst.is_null() {
        let bytes = json.as_deref().unwrap_or("").as_bytes();
        ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, dst, bytes.len());
        *dst.add(bytes.len()) = 0;
    }

    status
}

/// Analyze a WAV file and return the JSON result in a new buffer.
///
/// Ownership of the returned buffer passes to the caller, who must release
/// it with [`PitchAnalyzerFree`]. Returns null only if the result cannot
/// be serialized or converted to a C string.
///
/// # Safety
///
/// `file_name` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn PitchAnalyzer2(file_name: *const c_char) -> *mut c_char {
    let Some(json) = analyze_c_path(file_name).1 else {
        return ptr::null_mut();
    };
    match CString::new(json) {
        Ok(text) => text.into_raw(),
        Err(e) => {
            warn!("result text contains an interior NUL: {}", e);
            ptr::null_mut()
        }
    }
}

/// Release a buffer returned by [`PitchAnalyzer2`]. Null is ignored.
///
/// # Safety
///
/// `json` must be null or a pointer returned by `PitchAnalyzer2` that has
/// not been released yet.
#[no_mangle]
pub unsafe extern "C" fn PitchAnalyzerFree(json: *mut c_char) {
    if !json.is_null() {
        drop(CString::from_raw(json));
    }
}
