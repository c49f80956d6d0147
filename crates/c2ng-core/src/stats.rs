//! Statistics manager: joins session documents with windowed telemetry
//! aggregates for the signal endpoint and the dashboard.

use std::sync::Arc;

use serde::Serialize;

use crate::error::StoreError;
use crate::session::{Segment, SessionStore};
use crate::telemetry::{mean, SignalStore, ESTIMATION_WINDOW_MINUTES};

/// One dashboard row.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    #[serde(rename = "UasID")]
    pub uasid: String,
    #[serde(rename = "UAConnected")]
    pub ua_connected: bool,
    #[serde(rename = "ADXConnected")]
    pub adx_connected: bool,
    #[serde(rename = "AvgSignal")]
    pub avg_signal: Option<f64>,
    #[serde(rename = "AvgRTT")]
    pub avg_rtt: Option<f64>,
}

pub struct StatsManager {
    store: Arc<dyn SessionStore>,
    signals: Arc<dyn SignalStore>,
}

impl StatsManager {
    pub fn new(store: Arc<dyn SessionStore>, signals: Arc<dyn SignalStore>) -> Self {
        Self { store, signals }
    }

    /// Recent RSRP samples for one UAS.
    pub async fn get_signal_stats(&self, uasid: &str) -> Result<Vec<i64>, StoreError> {
        let samples = self
            .signals
            .read_field(uasid, "RSRP", ESTIMATION_WINDOW_MINUTES)
            .await?;
        Ok(samples.into_iter().map(|v| v as i64).collect())
    }

    /// All sessions joined with their 30-minute signal and RTT means.
    pub async fn list_sessions(&self) -> Result<Vec<SessionStats>, StoreError> {
        let mut rows = Vec::new();

        for session in self.store.list().await? {
            let rsrp = self
                .signals
                .read_field(&session.uasid, "RSRP", ESTIMATION_WINDOW_MINUTES)
                .await?;
            let rtt = self
                .signals
                .read_field(&session.uasid, "RTT", ESTIMATION_WINDOW_MINUTES)
                .await?;

            rows.push(SessionStats {
                ua_connected: session.endpoint(Segment::Ua).is_some(),
                adx_connected: session.endpoint(Segment::Adx).is_some(),
                avg_signal: mean(&rsrp),
                avg_rtt: mean(&rtt),
                uasid: session.uasid,
            });
        }

        Ok(rows)
    }
}

/// Dashboard style class for a mean RSRP value (dBm).
pub fn signal_class(avg_rsrp: Option<f64>) -> &'static str {
    match avg_rsrp {
        Some(v) if v >= -80.0 => "excellent",
        Some(v) if v >= -90.0 => "good",
        Some(v) if v >= -100.0 => "fair",
        Some(v) if v >= -110.0 => "poor",
        _ => "none",
    }
}

/// Dashboard style class for a mean RTT value (ms).
pub fn rtt_class(avg_rtt: Option<f64>) -> &'static str {
    match avg_rtt {
        Some(v) if v <= 40.0 => "excellent",
        Some(v) if v <= 100.0 => "good",
        Some(v) if v <= 200.0 => "fair",
        _ => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Endpoint, MemorySessionStore, Session};
    use crate::telemetry::{
        FvcPacket, Location, MemorySignalStore, PacketTime, PerfReading, Position, Radio,
        SignalReading,
    };

    fn packet(rsrp: i64, rtt: f64) -> FvcPacket {
        FvcPacket {
            timestamp: PacketTime {
                unix: 1_700_000_000.0,
            },
            position: Some(Position {
                location: Location {
                    lat: 35.0,
                    lon: 35.0,
                    alt: None,
                    baro: None,
                },
                attitude: None,
                speeds: None,
            }),
            signal: Some(SignalReading {
                radio: Radio::FourG,
                rsrp: Some(rsrp),
                rsrq: None,
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
                heartbeat_loss: None,
                rtt: Some(rtt),
            }),
        }
    }

    #[tokio::test]
    async fn joins_sessions_with_aggregates() {
        let store = Arc::new(MemorySessionStore::new());
        let signals = Arc::new(MemorySignalStore::new());

        let mut session = Session::new("drone-1");
        session.set_endpoint(
            Segment::Ua,
            Endpoint {
                ip: "10.0.0.2".to_string(),
                gateway_ip: "10.0.0.1".to_string(),
                kid: "kid".to_string(),
                certificate: "PEM".to_string(),
            },
        );
        store.put(session).await.unwrap();

        signals.write_signal("drone-1", &packet(-90, 30.0)).await.unwrap();
        signals.write_signal("drone-1", &packet(-100, 50.0)).await.unwrap();

        let stats = StatsManager::new(store, signals);
        let rows = stats.list_sessions().await.unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.uasid, "drone-1");
        assert!(row.ua_connected);
        assert!(!row.adx_connected);
        assert_eq!(row.avg_signal, Some(-95.0));
        assert_eq!(row.avg_rtt, Some(40.0));
    }

    #[tokio::test]
    async fn signal_stats_are_integer_samples() {
        let store = Arc::new(MemorySessionStore::new());
        let signals = Arc::new(MemorySignalStore::new());
        signals.write_signal("drone-1", &packet(-95, 2.0)).await.unwrap();

        let stats = StatsManager::new(store, signals);
        assert_eq!(stats.get_signal_stats("drone-1").await.unwrap(), vec![-95]);
    }

    #[test]
    fn class_thresholds() {
        assert_eq!(signal_class(Some(-75.0)), "excellent");
        assert_eq!(signal_class(Some(-85.0)), "good");
        assert_eq!(signal_class(Some(-95.0)), "fair");
        assert_eq!(signal_class(Some(-105.0)), "poor");
        assert_eq!(signal_class(Some(-120.0)), "none");
        assert_eq!(signal_class(None), "none");

        assert_eq!(rtt_class(Some(30.0)), "excellent");
        assert_eq!(rtt_class(Some(90.0)), "good");
        assert_eq!(rtt_class(Some(150.0)), "fair");
        assert_eq!(rtt_class(Some(500.0)), "none");
        assert_eq!(rtt_class(None), "none");
    }
}
