//! Link-quality telemetry: the measurement packet model and the signal
//! store seam.
//!
//! Each ingested packet is exploded into one tagged, timestamped point;
//! absent optional values are dropped rather than stored as nulls. Reads
//! return the raw samples of one field over a recent window; aggregation is
//! a mean over that window.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Window used by the statistics endpoints, in minutes.
pub const ESTIMATION_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketTime {
    pub unix: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baro: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attitude {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Speeds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnorth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdown: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vair: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attitude: Option<Attitude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speeds: Option<Speeds>,
}

/// Current radio mode of the serving cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Radio {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "4G")]
    FourG,
    #[serde(rename = "5GNSA")]
    FiveGNsa,
    #[serde(rename = "5GSA")]
    FiveGSa,
}

impl Radio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Radio::Unknown => "UNKNOWN",
            Radio::FourG => "4G",
            Radio::FiveGNsa => "5GNSA",
            Radio::FiveGSa => "5GSA",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReading {
    pub radio: Radio,
    #[serde(rename = "RSRP", skip_serializing_if = "Option::is_none")]
    pub rsrp: Option<i64>,
    #[serde(rename = "RSRQ", skip_serializing_if = "Option::is_none")]
    pub rsrq: Option<i64>,
    #[serde(rename = "RSRP_4G", skip_serializing_if = "Option::is_none")]
    pub rsrp_4g: Option<i64>,
    #[serde(rename = "RSRQ_4G", skip_serializing_if = "Option::is_none")]
    pub rsrq_4g: Option<i64>,
    #[serde(rename = "RSRP_5G", skip_serializing_if = "Option::is_none")]
    pub rsrp_5g: Option<i64>,
    #[serde(rename = "RSRQ_5G", skip_serializing_if = "Option::is_none")]
    pub rsrq_5g: Option<i64>,
    #[serde(rename = "RSSI", skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i64>,
    #[serde(rename = "SINR", skip_serializing_if = "Option::is_none")]
    pub sinr: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_loss: Option<bool>,
    #[serde(rename = "RTT", skip_serializing_if = "Option::is_none")]
    pub rtt: Option<f64>,
}

/// A measurement sample reported by an aircraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FvcPacket {
    pub timestamp: PacketTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perf: Option<PerfReading>,
}

impl FvcPacket {
    /// Flatten the packet into `(field, value)` pairs, dropping absent
    /// values.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = Vec::new();

        if let Some(signal) = &self.signal {
            push_int(&mut fields, "RSRP", signal.rsrp);
            push_int(&mut fields, "RSRQ", signal.rsrq);
            push_int(&mut fields, "RSRP_4G", signal.rsrp_4g);
            push_int(&mut fields, "RSRQ_4G", signal.rsrq_4g);
            push_int(&mut fields, "RSRP_5G", signal.rsrp_5g);
            push_int(&mut fields, "RSRQ_5G", signal.rsrq_5g);
            push_int(&mut fields, "RSSI", signal.rssi);
            push_int(&mut fields, "SINR", signal.sinr);
        }

        if let Some(position) = &self.position {
            fields.push(("latitude", position.location.lat));
            fields.push(("longitude", position.location.lon));
            push_float(&mut fields, "altitude", position.location.alt);
            push_float(&mut fields, "baro", position.location.baro);

            if let Some(attitude) = &position.attitude {
                push_int(&mut fields, "roll", attitude.roll);
                push_int(&mut fields, "pitch", attitude.pitch);
                push_int(&mut fields, "yaw", attitude.yaw);
                push_float(&mut fields, "heading", attitude.heading);
            }

            if let Some(speeds) = &position.speeds {
                push_float(&mut fields, "vnorth", speeds.vnorth);
                push_float(&mut fields, "veast", speeds.veast);
                push_float(&mut fields, "vdown", speeds.vdown);
                push_float(&mut fields, "vair", speeds.vair);
            }
        }

        if let Some(perf) = &self.perf {
            push_float(&mut fields, "heartbeat_loss", perf.heartbeat_loss.map(u8::from).map(f64::from));
            push_float(&mut fields, "RTT", perf.rtt);
        }

        fields
    }
}

fn push_int(fields: &mut Vec<(&'static str, f64)>, name: &'static str, value: Option<i64>) {
    if let Some(value) = value {
        fields.push((name, value as f64));
    }
}

fn push_float(fields: &mut Vec<(&'static str, f64)>, name: &'static str, value: Option<f64>) {
    if let Some(value) = value {
        fields.push((name, value));
    }
}

/// Narrow interface to the telemetry time-series store.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn write_signal(&self, uasid: &str, packet: &FvcPacket) -> Result<(), StoreError>;

    /// Raw samples of one field for a UAS over the trailing window.
    async fn read_field(
        &self,
        uasid: &str,
        field: &str,
        window_minutes: i64,
    ) -> Result<Vec<f64>, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredPoint {
    at: DateTime<Utc>,
    #[allow(dead_code)]
    radio: Option<&'static str>,
    fields: Vec<(&'static str, f64)>,
}

/// In-process signal store.
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    points: DashMap<String, Vec<StoredPoint>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, uasid: &str, point: StoredPoint) {
        self.points.entry(uasid.to_string()).or_default().push(point);
    }

    #[cfg(test)]
    fn push_at(&self, uasid: &str, at: DateTime<Utc>, field: &'static str, value: f64) {
        self.push(
            uasid,
            StoredPoint {
                at,
                radio: None,
                fields: vec![(field, value)],
            },
        );
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn write_signal(&self, uasid: &str, packet: &FvcPacket) -> Result<(), StoreError> {
        let point = StoredPoint {
            at: Utc::now(),
            radio: packet.signal.as_ref().map(|s| s.radio.as_str()),
            fields: packet.fields(),
        };
        tracing::debug!(uasid, fields = point.fields.len(), "Writing signal point");
        self.push(uasid, point);
        Ok(())
    }

    async fn read_field(
        &self,
        uasid: &str,
        field: &str,
        window_minutes: i64,
    ) -> Result<Vec<f64>, StoreError> {
        let horizon = Utc::now() - Duration::minutes(window_minutes);

        let samples = self
            .points
            .get(uasid)
            .map(|points| {
                points
                    .iter()
                    .filter(|point| point.at >= horizon)
                    .flat_map(|point| {
                        point
                            .fields
                            .iter()
                            .filter(|(name, _)| *name == field)
                            .map(|(_, value)| *value)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(samples)
    }
}

/// Mean of the samples, if any.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(rsrp: i64, rtt: Option<f64>) -> FvcPacket {
        FvcPacket {
            timestamp: PacketTime { unix: 1_700_000_000.0 },
            position: Some(Position {
                location: Location {
                    lat: 35.0,
                    lon: 35.0,
                    alt: Some(100.0),
                    baro: None,
                },
                attitude: None,
                speeds: None,
            }),
            signal: Some(SignalReading {
                radio: Radio::FiveGNsa,
                rsrp: Some(rsrp),
                rsrq: Some(-12),
                rsrp_4g: None,
                rsrq_4g: None,
                rsrp_5g: None,
                rsrq_5g: None,
                rssi: None,
                sinr: None,
                cell: None,
                band: None,
            }),
            perf: Some(PerfReading {
                heartbeat_loss: Some(false),
                rtt,
            }),
        }
    }

    #[test]
    fn packet_flattening_drops_absent_fields() {
        let fields = packet(-95, None).fields();
        assert!(fields.contains(&("RSRP", -95.0)));
        assert!(fields.contains(&("heartbeat_loss", 0.0)));
        assert!(!fields.iter().any(|(name, _)| *name == "RTT"));
        assert!(!fields.iter().any(|(name, _)| *name == "baro"));
    }

    #[test]
    fn packet_wire_names() {
        let json = serde_json::to_value(packet(-95, Some(2.0))).unwrap();
        assert_eq!(json["signal"]["RSRP"], -95);
        assert_eq!(json["signal"]["radio"], "5GNSA");
        assert_eq!(json["perf"]["RTT"], 2.0);
        assert_eq!(json["position"]["location"]["lat"], 35.0);
    }

    #[tokio::test]
    async fn written_samples_are_readable() {
        let store = MemorySignalStore::new();
        store.write_signal("drone-1", &packet(-95, Some(2.0))).await.unwrap();
        store.write_signal("drone-1", &packet(-97, None)).await.unwrap();

        let rsrp = store
            .read_field("drone-1", "RSRP", ESTIMATION_WINDOW_MINUTES)
            .await
            .unwrap();
        assert_eq!(rsrp, vec![-95.0, -97.0]);

        let rtt = store
            .read_field("drone-1", "RTT", ESTIMATION_WINDOW_MINUTES)
            .await
            .unwrap();
        assert_eq!(rtt, vec![2.0]);
    }

    #[tokio::test]
    async fn read_honors_the_window() {
        let store = MemorySignalStore::new();
        store.push_at(
            "drone-1",
            Utc::now() - Duration::minutes(45),
            "RSRP",
            -80.0,
        );
        store.push_at("drone-1", Utc::now(), "RSRP", -95.0);

        let samples = store
            .read_field("drone-1", "RSRP", ESTIMATION_WINDOW_MINUTES)
            .await
            .unwrap();
        assert_eq!(samples, vec![-95.0]);
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&[-90.0, -100.0]), Some(-95.0));
        assert_eq!(mean(&[]), None);
    }
}
