//! Request and response schemas for the JSON API.
//!
//! Requests deserialize with every field optional and are then checked by
//! `validate()`, which produces the per-field message map rendered by the
//! validation-error envelope. Responses always carry the `Success` flag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use c2ng_core::manager::{SessionGrant, SessionRequest};
use c2ng_core::session::Segment;
use c2ng_core::telemetry::FvcPacket;

use crate::error::{ApiFailure, ValidationErrors};

/// Decode a JSON request body; failures surface as a validation envelope.
pub fn decode_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiFailure> {
    serde_json::from_slice(body).map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.insert("Request".to_string(), vec![e.to_string()]);
        ApiFailure::validation(errors)
    })
}

/// `POST /session` body.
#[derive(Debug, Default, Deserialize)]
pub struct AerialConnectionSessionRequest {
    #[serde(rename = "ReferenceTime")]
    pub reference_time: Option<f64>,
    #[serde(rename = "UasID")]
    pub uasid: Option<String>,
    #[serde(rename = "Segment")]
    pub segment: Option<String>,
    #[serde(rename = "IMSI")]
    pub imsi: Option<String>,
    #[serde(rename = "Metadata")]
    pub metadata: Option<Value>,
}

/// Validated session request, ready for the session manager.
#[derive(Debug)]
pub struct ValidSessionRequest {
    pub segment: Segment,
    pub request: SessionRequest,
}

impl AerialConnectionSessionRequest {
    pub fn validate(self) -> Result<ValidSessionRequest, ApiFailure> {
        let mut errors = ValidationErrors::new();

        if self.reference_time.is_none() {
            field_error(&mut errors, "ReferenceTime", "Missing data for required field.");
        }

        let uasid = match &self.uasid {
            Some(uasid) if !uasid.is_empty() => Some(uasid.clone()),
            _ => {
                field_error(&mut errors, "UasID", "Missing data for required field.");
                None
            }
        };

        let segment = match self.segment.as_deref() {
            Some(raw) => match Segment::parse(raw) {
                Some(segment) => Some(segment),
                None => {
                    field_error(&mut errors, "Segment", "Must be one of: ua, adx.");
                    None
                }
            },
            None => {
                field_error(&mut errors, "Segment", "Missing data for required field.");
                None
            }
        };

        if let Some(imsi) = &self.imsi {
            if !is_valid_imsi(imsi) {
                field_error(&mut errors, "IMSI", "String does not match expected pattern.");
            }
        }

        if !errors.is_empty() {
            return Err(ApiFailure::validation(errors));
        }

        Ok(ValidSessionRequest {
            segment: segment.unwrap(),
            request: SessionRequest {
                uasid: uasid.unwrap(),
                imsi: self.imsi,
                metadata: self.metadata,
            },
        })
    }
}

/// 3GPP IMSI: 14 or 15 decimal digits.
fn is_valid_imsi(value: &str) -> bool {
    (14..=15).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

fn field_error(errors: &mut ValidationErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[derive(Debug, Serialize)]
pub struct AerialConnectionSessionResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "GatewayIP")]
    pub gateway_ip: String,
    #[serde(rename = "KID")]
    pub kid: String,
    #[serde(rename = "EncryptedPrivateKey")]
    pub encrypted_private_key: String,
}

impl From<SessionGrant> for AerialConnectionSessionResponse {
    fn from(grant: SessionGrant) -> Self {
        Self {
            success: true,
            ip: grant.ip,
            gateway_ip: grant.gateway_ip,
            kid: grant.kid,
            encrypted_private_key: grant.encrypted_private_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CertificateRequestResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "KID")]
    pub kid: String,
    #[serde(rename = "Certificate")]
    pub certificate: String,
}

#[derive(Debug, Serialize)]
pub struct AddressRequestResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Address")]
    pub address: String,
}

/// `POST /signal/{uasid}` body: a wrapped measurement packet.
#[derive(Debug, Deserialize)]
pub struct SignalStatsReportRequest {
    #[serde(rename = "Packet")]
    pub packet: Option<Value>,
}

impl SignalStatsReportRequest {
    pub fn validate(self) -> Result<FvcPacket, ApiFailure> {
        let mut errors = ValidationErrors::new();

        let Some(packet) = self.packet else {
            field_error(&mut errors, "Packet", "Missing data for required field.");
            return Err(ApiFailure::validation(errors));
        };

        serde_json::from_value(packet).map_err(|e| {
            field_error(&mut errors, "Packet", &e.to_string());
            ApiFailure::validation(errors)
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SignalRequestResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Stats")]
    pub stats: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct WsAuthResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Ticket")]
    pub ticket: String,
}

#[derive(Debug, Serialize)]
pub struct DidJwtResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "JWT")]
    pub jwt: String,
}

#[derive(Debug, Serialize)]
pub struct DidConfigResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Config")]
    pub config: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> AerialConnectionSessionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_a_complete_aerial_request() {
        let valid = request(json!({
            "ReferenceTime": 1700000000.0,
            "UasID": "drone-1",
            "Segment": "ua",
            "IMSI": "123456789012345",
        }))
        .validate()
        .unwrap();

        assert_eq!(valid.segment, Segment::Ua);
        assert_eq!(valid.request.uasid, "drone-1");
        assert_eq!(valid.request.imsi.as_deref(), Some("123456789012345"));
    }

    #[test]
    fn rejects_bad_imsi() {
        let result = request(json!({
            "ReferenceTime": 1700000000.0,
            "UasID": "drone-1",
            "Segment": "ua",
            "IMSI": "12345",
        }))
        .validate();

        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_segment() {
        let result = request(json!({
            "ReferenceTime": 1700000000.0,
            "UasID": "drone-1",
            "Segment": "tail",
        }))
        .validate();

        assert!(result.is_err());
    }

    #[test]
    fn imsi_shape() {
        assert!(is_valid_imsi("12345678901234"));
        assert!(is_valid_imsi("123456789012345"));
        assert!(!is_valid_imsi("1234567890123"));
        assert!(!is_valid_imsi("1234567890123456"));
        assert!(!is_valid_imsi("12345678901234x"));
    }

    #[test]
    fn signal_report_requires_a_packet() {
        let report: SignalStatsReportRequest = serde_json::from_value(json!({})).unwrap();
        assert!(report.validate().is_err());

        let report: SignalStatsReportRequest = serde_json::from_value(json!({
            "Packet": {
                "timestamp": {"unix": 1700000000.0},
                "signal": {"radio": "4G", "RSRP": -95},
            }
        }))
        .unwrap();
        let packet = report.validate().unwrap();
        assert_eq!(packet.signal.unwrap().rsrp, Some(-95));
    }
}
