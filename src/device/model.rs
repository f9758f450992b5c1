use serde::{Deserialize, Serialize};

use super::error::{DeviceError, DeviceResult};

/// Rain reading that means "currently raining". Every other value is treated as dry weather.
pub const RAIN_SENTINEL: &str = "rain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilState {
    Dry,
    Wet,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofStatus {
    Open,
    Closed,
    Partial,
    Moving,
    #[serde(other)]
    Unknown,
}

impl RoofStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Partial => "partial",
            Self::Moving => "moving",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpStatus {
    On,
    Off,
}

/// Snapshot returned by `GET /status`.
///
/// The device reports a different subset of fields depending on which subsystem
/// answered, so every field is optional. Snapshots are always replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil: Option<SoilState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roof_status: Option<RoofStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_moving: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ControlMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump_status: Option<PumpStatus>,
}

impl DeviceStatus {
    pub fn is_raining(&self) -> bool {
        self.rain.as_deref() == Some(RAIN_SENTINEL)
    }

    pub fn require_soil(&self) -> DeviceResult<SoilState> {
        self.soil.ok_or(DeviceError::MissingField { field: "soil" })
    }

    pub fn require_roof_status(&self) -> DeviceResult<RoofStatus> {
        self.roof_status
            .ok_or(DeviceError::MissingField { field: "roof_status" })
    }

    pub fn require_mode(&self) -> DeviceResult<ControlMode> {
        self.mode.ok_or(DeviceError::MissingField { field: "mode" })
    }

    pub fn require_pump_status(&self) -> DeviceResult<PumpStatus> {
        self.pump_status
            .ok_or(DeviceError::MissingField { field: "pump_status" })
    }
}

/// Body returned by the rain override endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RoofUpdate {
    pub roof_status: RoofStatus,
}

/// Raw classifier output from `/upload-analyze` and `/capture-analyze`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeafAnalysisResponse {
    #[serde(alias = "disease")]
    pub prediction_label: String,
    pub confidence: f64,
    pub healthy: bool,
}

/// File name the device expects on every multipart upload.
pub const UPLOAD_FILE_NAME: &str = "leaf.jpg";

/// Encoded still submitted as the multipart `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl ImageUpload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: UPLOAD_FILE_NAME.to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_decodes_exact_sensor_record() {
        let status: DeviceStatus = serde_json::from_str(
            r#"{"soil":"dry","rain":"clear","temperature":26,"humidity":60}"#,
        )
        .unwrap();

        assert_eq!(
            status,
            DeviceStatus {
                rain: Some("clear".to_string()),
                soil: Some(SoilState::Dry),
                temperature: Some(26.0),
                humidity: Some(60.0),
                ..DeviceStatus::default()
            }
        );
        assert!(!status.is_raining());
        assert!(status.require_roof_status().is_err());
    }

    #[test]
    fn status_tolerates_null_and_unknown_enum_values() {
        let status: DeviceStatus = serde_json::from_str(
            r#"{"soil":"muddy","rain":"rain","temperature":null,"roof_status":"jammed","is_moving":true,"mode":"manual","pump_status":"on"}"#,
        )
        .unwrap();

        assert_eq!(status.soil, Some(SoilState::Unknown));
        assert_eq!(status.roof_status, Some(RoofStatus::Unknown));
        assert!(status.temperature.is_none());
        assert!(status.is_raining());
        assert_eq!(status.require_mode().unwrap(), ControlMode::Manual);
        assert_eq!(status.require_pump_status().unwrap(), PumpStatus::On);
    }

    #[test]
    fn require_accessors_name_the_missing_field() {
        let err = DeviceStatus::default().require_soil().unwrap_err();
        assert!(matches!(err, DeviceError::MissingField { field: "soil" }));
    }

    #[test]
    fn analysis_response_accepts_disease_alias() {
        let response: LeafAnalysisResponse =
            serde_json::from_str(r#"{"disease":"Leaf Mold","confidence":0.5,"healthy":false}"#)
                .unwrap();
        assert_eq!(response.prediction_label, "Leaf Mold");
    }
}
