use serde::Serialize;

use crate::device::LeafAnalysisResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    High,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::High => "High",
        }
    }
}

/// Classifier output normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafDiagnosis {
    pub disease: String,
    /// Percent, 0..=100.
    pub confidence: f64,
    pub healthy: bool,
    pub severity: Severity,
    pub affected_area: &'static str,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagnosisError {
    #[error("confidence {0} is outside 0..=1")]
    ConfidenceOutOfRange(f64),
    #[error("prediction label is empty")]
    EmptyLabel,
}

impl LeafDiagnosis {
    pub fn from_response(response: LeafAnalysisResponse) -> Result<Self, DiagnosisError> {
        if !(0.0..=1.0).contains(&response.confidence) {
            return Err(DiagnosisError::ConfidenceOutOfRange(response.confidence));
        }
        let disease = response.prediction_label.trim().to_string();
        if disease.is_empty() {
            return Err(DiagnosisError::EmptyLabel);
        }

        let (severity, affected_area) = if response.healthy {
            (Severity::None, "0%")
        } else {
            (Severity::High, "Detected")
        };

        Ok(Self {
            disease,
            confidence: response.confidence * 100.0,
            healthy: response.healthy,
            severity,
            affected_area,
        })
    }

    /// One-line banner, e.g. `Healthy - Healthy (98.1%)`.
    pub fn banner(&self) -> String {
        let verdict = if self.healthy { "Healthy" } else { "Unhealthy" };
        format!("{verdict} - {} ({:.1}%)", self.disease, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(label: &str, confidence: f64, healthy: bool) -> LeafAnalysisResponse {
        LeafAnalysisResponse {
            prediction_label: label.to_string(),
            confidence,
            healthy,
        }
    }

    #[test]
    fn normalizes_bacterial_spot_to_percent() {
        let diagnosis =
            LeafDiagnosis::from_response(response("Bacterial Spot", 0.87, false)).unwrap();

        assert_eq!(diagnosis.disease, "Bacterial Spot");
        assert_eq!(diagnosis.confidence, 87.0);
        assert!(!diagnosis.healthy);
        assert_eq!(diagnosis.severity, Severity::High);
        assert_eq!(diagnosis.affected_area, "Detected");
        assert_eq!(diagnosis.banner(), "Unhealthy - Bacterial Spot (87.0%)");
    }

    #[test]
    fn healthy_leaf_has_no_severity() {
        let diagnosis = LeafDiagnosis::from_response(response("Healthy", 0.5, true)).unwrap();
        assert_eq!(diagnosis.severity, Severity::None);
        assert_eq!(diagnosis.affected_area, "0%");
    }

    #[test]
    fn rejects_out_of_range_confidence_and_blank_label() {
        assert_eq!(
            LeafDiagnosis::from_response(response("Leaf Mold", 1.5, false)).unwrap_err(),
            DiagnosisError::ConfidenceOutOfRange(1.5)
        );
        assert_eq!(
            LeafDiagnosis::from_response(response("  ", 0.5, false)).unwrap_err(),
            DiagnosisError::EmptyLabel
        );
        assert!(LeafDiagnosis::from_response(response("x", f64::NAN, false)).is_err());
    }
}
