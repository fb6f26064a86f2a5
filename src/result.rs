//! AnalysisResult - The record returned for every analysis call.
//!
//! Serialized as a JSON object with a fixed key set:
//!
//! ```json
//! {"status":0,"comment":"success","pitch1":..,"pitch2":..,"pitch3":..,"pitch4":..}
//! ```
//!
//! The four pitch keys are only present when `status` is 0. Doubles are
//! written in shortest round-trip form, so parsing the text back yields
//! bit-identical values.

use serde::{Deserialize, Serialize};

use crate::error::{Error, StatusCode};
use crate::features::FeatureSet;

/// Outcome of one analysis call.
///
/// A fresh value is built per call; nothing is shared between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0 on success, otherwise a [`StatusCode`] value.
    pub status: i32,
    /// Fixed message of `status`.
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch4: Option<f64>,
}

impl AnalysisResult {
    /// A successful result carrying the four feature values.
    pub fn success(features: FeatureSet) -> Self {
        Self {
            status: StatusCode::Success.code(),
            comment: StatusCode::Success.message().to_string(),
            pitch1: Some(features.pitch1),
            pitch2: Some(features.pitch2),
            pitch3: Some(features.pitch3),
            pitch4: Some(features.pitch4),
        }
    }

    /// A result with the given status and no feature values.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status: status.code(),
            comment: status.message().to_string(),
            pitch1: None,
            pitch2: None,
            pitch3: None,
            pitch4: None,
        }
    }

    /// A failed result for `err`.
    pub fn failure(err: &Error) -> Self {
        Self::from_status(err.status())
    }

    /// The status as a [`StatusCode`], if it is a known code.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_code(self.status)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::Success.code()
    }

    /// The feature values, present only on success.
    pub fn features(&self) -> Option<FeatureSet> {
        if !self.is_success() {
            return None;
        }
        Some(FeatureSet {
            pitch1: self.pitch1?,
            pitch2: self.pitch2?,
            pitch3: self.pitch3?,
            pitch4: self.pitch4?,
        })
    }

    /// Serialize to compact JSON.
    ///
    /// Non-finite pitch values are written as `null`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a result from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl From<&Error> for AnalysisResult {
    fn from(err: &Error) -> Self {
        Self::failure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureSet {
        FeatureSet {
            pitch1: 123.456789012345,
            pitch2: 0.1 + 0.2,
            pitch3: -7.25e-3,
            pitch4: 1.0 / 3.0,
        }
    }

    #[test]
    fn test_success_round_trip_is_exact() {
        let result = AnalysisResult::success(features());
        let parsed = AnalysisResult::from_json(&result.to_json().unwrap()).unwrap();
        assert_eq!(parsed.status, 0);
        assert_eq!(parsed.comment, "success");
        assert_eq!(parsed.features(), Some(features()));
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_key_order() {
        let json = AnalysisResult::success(features()).to_json().unwrap();
        let keys = ["\"status\"", "\"comment\"", "\"pitch1\"", "\"pitch2\"", "\"pitch3\"", "\"pitch4\""];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
    }

    #[test]
    fn test_failure_omits_pitches() {
        let result = AnalysisResult::from_status(StatusCode::FileNotFound);
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"status":1000,"comment":"Error : file not found"}"#
        );
        assert_eq!(result.status_code(), Some(StatusCode::FileNotFound));
        assert_eq!(result.features(), None);
    }

    #[test]
    fn test_failure_from_error() {
        let err = Error::InvalidFormat("zero length".into());
        let result = AnalysisResult::from(&err);
        assert_eq!(result.status, 1002);
        assert_eq!(result.comment, "Error : file is not on correct format");
        assert!(!result.is_success());
    }

    #[test]
    fn test_pretty_parses_back() {
        let result = AnalysisResult::success(features());
        let parsed = AnalysisResult::from_json(&result.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_non_finite_value_serializes_as_null() {
        let result = AnalysisResult::success(FeatureSet {
            pitch4: f64::NAN,
            ..features()
        });
        let json = result.to_json().unwrap();
        assert!(json.ends_with(r#""pitch4":null}"#), "{}", json);
    }
}
