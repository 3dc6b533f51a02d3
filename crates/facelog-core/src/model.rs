//! Detection domain model
//!
//! A [`DetectionSubmission`] is what callers send; a [`DetectionRecord`] is what
//! passed validation and may be written to the store. The only path from one to
//! the other is [`DetectionSubmission::validate`], and stored documents are
//! decoded back through the same rules.

use crate::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of components in a face embedding
pub const EMBEDDING_DIMENSION: usize = 128;

/// Half-width of the temporal neighborhood searched around a base time
pub fn neighborhood() -> Duration {
    Duration::hours(1)
}

/// Unix seconds of `0001-01-01T00:00:00Z`, the zero time some clients send for
/// an unset timestamp
const ZERO_INSTANT_UNIX_SECS: i64 = -62_135_596_800;

// ============================================================================
// Embedding
// ============================================================================

/// Face feature vector of exactly [`EMBEDDING_DIMENSION`] components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Embedding(Vec<f64>);

impl Embedding {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl TryFrom<Vec<f64>> for Embedding {
    type Error = ValidationError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.len() != EMBEDDING_DIMENSION {
            return Err(ValidationError::EmbeddingDimension {
                expected: EMBEDDING_DIMENSION,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }
}

impl From<Embedding> for Vec<f64> {
    fn from(embedding: Embedding) -> Self {
        embedding.0
    }
}

// ============================================================================
// Detection records
// ============================================================================

/// Unvalidated detection event as received from a camera client
///
/// Every field is defaulted so that a partially filled body still reaches
/// validation and is rejected with the rule it breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSubmission {
    pub name: String,
    pub camera_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub embedding: Vec<f64>,
    pub image_path: String,
    pub confidence: f64,
}

impl DetectionSubmission {
    /// Check the submission rules in order and build a [`DetectionRecord`]
    ///
    /// 1. `name`, `camera_id` and `image_path` are non-empty
    /// 2. the embedding has exactly 128 components
    /// 3. the timestamp is set
    /// 4. `0.0 <= confidence <= 1.0`
    pub fn validate(self) -> Result<DetectionRecord, ValidationError> {
        if self.name.is_empty() || self.camera_id.is_empty() || self.image_path.is_empty() {
            return Err(ValidationError::EmptyField);
        }

        let embedding = Embedding::try_from(self.embedding)?;

        let timestamp = match self.timestamp {
            Some(ts) if !is_zero_instant(&ts) => ts,
            _ => return Err(ValidationError::MissingTimestamp),
        };

        // NaN fails `contains` as well
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }

        Ok(DetectionRecord {
            name: self.name,
            camera_id: self.camera_id,
            timestamp,
            embedding,
            image_path: self.image_path,
            confidence: self.confidence,
        })
    }
}

fn is_zero_instant(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_INSTANT_UNIX_SECS && ts.timestamp_subsec_nanos() == 0
}

/// A validated face-recognition event
///
/// Immutable once built. Deserialization re-runs the submission rules, so a
/// stored document that breaks them fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectionSubmission")]
pub struct DetectionRecord {
    name: String,
    camera_id: String,
    timestamp: DateTime<Utc>,
    embedding: Embedding,
    image_path: String,
    confidence: f64,
}

impl TryFrom<DetectionSubmission> for DetectionRecord {
    type Error = ValidationError;

    fn try_from(submission: DetectionSubmission) -> Result<Self, Self::Error> {
        submission.validate()
    }
}

impl DetectionRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

// ============================================================================
// Time windows
// ============================================================================

/// Half-open interval `[start, end)` over detection timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The ±1 hour neighborhood around `base`
    pub fn around(base: DateTime<Utc>) -> Self {
        Self {
            start: base - neighborhood(),
            end: base + neighborhood(),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Time restriction applied to a by-name lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    /// Every record for the subject
    Unbounded,
    /// Records inside the neighborhood of the given base time
    Around(DateTime<Utc>),
}

impl TimeFilter {
    /// Build a filter from the optional base time and the "All" flag
    ///
    /// `is_all` wins over a base time; no base time also means no filter.
    pub fn from_parts(base_time: Option<DateTime<Utc>>, is_all: bool) -> Self {
        match base_time {
            Some(base) if !is_all => Self::Around(base),
            _ => Self::Unbounded,
        }
    }

    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            Self::Unbounded => None,
            Self::Around(base) => Some(TimeWindow::around(*base)),
        }
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// One image file received for snapshot storage
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// File name as sent by the client, used only for its extension
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Extension of the original file name including the dot, or empty
    ///
    /// Anything that is not plain ASCII alphanumerics is dropped.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn valid_submission() -> DetectionSubmission {
        DetectionSubmission {
            name: "alice".to_string(),
            camera_id: "cam1".to_string(),
            timestamp: Some(base_time()),
            embedding: vec![0.5; EMBEDDING_DIMENSION],
            image_path: "snapshots/face_cam1_1.jpg".to_string(),
            confidence: 0.95,
        }
    }

    #[test]
    fn test_valid_submission_passes() {
        let record = valid_submission().validate().unwrap();
        assert_eq!(record.name(), "alice");
        assert_eq!(record.camera_id(), "cam1");
        assert_eq!(record.timestamp(), base_time());
        assert_eq!(record.embedding().as_slice().len(), 128);
    }

    #[test]
    fn test_empty_fields_rejected() {
        for field in ["name", "camera_id", "image_path"] {
            let mut s = valid_submission();
            match field {
                "name" => s.name.clear(),
                "camera_id" => s.camera_id.clear(),
                _ => s.image_path.clear(),
            }
            assert_eq!(s.validate(), Err(ValidationError::EmptyField), "{field}");
        }
    }

    #[test]
    fn test_rules_checked_in_order() {
        // Every rule broken at once: the first one wins
        let s = DetectionSubmission {
            confidence: 2.0,
            ..Default::default()
        };
        assert_eq!(s.validate(), Err(ValidationError::EmptyField));

        let s = DetectionSubmission {
            embedding: vec![],
            timestamp: None,
            confidence: 2.0,
            ..valid_submission()
        };
        assert!(matches!(
            s.validate(),
            Err(ValidationError::EmbeddingDimension { actual: 0, .. })
        ));

        let s = DetectionSubmission {
            timestamp: None,
            confidence: 2.0,
            ..valid_submission()
        };
        assert_eq!(s.validate(), Err(ValidationError::MissingTimestamp));
    }

    #[test]
    fn test_zero_instant_is_unset() {
        let zero = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        let s = DetectionSubmission {
            timestamp: Some(zero),
            ..valid_submission()
        };
        assert_eq!(s.validate(), Err(ValidationError::MissingTimestamp));
    }

    #[test]
    fn test_confidence_boundaries() {
        for ok in [0.0, 1.0] {
            let s = DetectionSubmission {
                confidence: ok,
                ..valid_submission()
            };
            assert!(s.validate().is_ok(), "{ok} should pass");
        }
        for bad in [-0.01, 1.01, f64::NAN] {
            let s = DetectionSubmission {
                confidence: bad,
                ..valid_submission()
            };
            assert!(
                matches!(s.validate(), Err(ValidationError::ConfidenceOutOfRange(_))),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn test_missing_json_fields_default() {
        let s: DetectionSubmission =
            serde_json::from_str(r#"{"name":"bob","camera_id":"cam2"}"#).unwrap();
        assert_eq!(s.confidence, 0.0);
        assert!(s.timestamp.is_none());
        assert_eq!(s.validate(), Err(ValidationError::EmptyField));
    }

    #[test]
    fn test_record_decode_enforces_rules() {
        let mut doc = serde_json::to_value(valid_submission().validate().unwrap()).unwrap();
        assert_eq!(doc["camera_id"], "cam1");

        let decoded: DetectionRecord = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(decoded.name(), "alice");

        doc["embedding"] = serde_json::json!([1.0, 2.0]);
        assert!(serde_json::from_value::<DetectionRecord>(doc).is_err());
    }

    #[test]
    fn test_time_window_bounds() {
        let window = TimeWindow::around(base_time());
        assert!(window.contains(base_time() - Duration::hours(1)));
        assert!(window.contains(base_time()));
        assert!(!window.contains(base_time() + Duration::hours(1)));
        assert!(!window.contains(base_time() - Duration::hours(1) - Duration::nanoseconds(1)));
    }

    #[test]
    fn test_time_filter_from_parts() {
        let t = base_time();
        assert_eq!(TimeFilter::from_parts(None, true), TimeFilter::Unbounded);
        assert_eq!(TimeFilter::from_parts(Some(t), true), TimeFilter::Unbounded);
        assert_eq!(TimeFilter::from_parts(None, false), TimeFilter::Unbounded);
        assert_eq!(TimeFilter::from_parts(Some(t), false), TimeFilter::Around(t));
        assert_eq!(
            TimeFilter::Around(t).window(),
            Some(TimeWindow::around(t))
        );
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(UploadedImage::new("face.jpg", vec![]).extension(), ".jpg");
        assert_eq!(UploadedImage::new("a/b/face.PNG", vec![]).extension(), ".PNG");
        assert_eq!(UploadedImage::new("face", vec![]).extension(), "");
        assert_eq!(UploadedImage::new("face.j/pg", vec![]).extension(), "");
        assert_eq!(UploadedImage::new("x.%00", vec![]).extension(), "");
    }

    proptest! {
        #[test]
        fn prop_wrong_dimension_rejected(len in 0usize..300) {
            prop_assume!(len != EMBEDDING_DIMENSION);
            let s = DetectionSubmission {
                embedding: vec![0.1; len],
                ..valid_submission()
            };
            let rejected = matches!(
                s.validate(),
                Err(ValidationError::EmbeddingDimension { .. })
            );
            prop_assert!(rejected);
        }

        #[test]
        fn prop_confidence_in_range_accepted(confidence in 0.0f64..=1.0) {
            let s = DetectionSubmission {
                confidence,
                ..valid_submission()
            };
            prop_assert!(s.validate().is_ok());
        }
    }
}
