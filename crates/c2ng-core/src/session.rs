//! Session documents and the session store seam.
//!
//! A session is a single document keyed by the UAS logical identifier. It
//! holds up to two endpoint records, one per segment; a record exists iff
//! that segment currently holds a connectivity session.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Endpoint role within one UAS session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Airborne segment (the aircraft itself).
    Ua,
    /// Ground segment (remote pilot station or services).
    Adx,
}

impl Segment {
    /// Parse the lowercase wire form used in URLs and requests.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ua" => Some(Segment::Ua),
            "adx" => Some(Segment::Adx),
            _ => None,
        }
    }

    /// Lowercase wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Ua => "ua",
            Segment::Adx => "adx",
        }
    }

    /// Uppercase form used in session documents and certificate names.
    pub fn designator(&self) -> &'static str {
        match self {
            Segment::Ua => "UA",
            Segment::Adx => "ADX",
        }
    }

    /// The opposite endpoint of the session.
    pub fn peer(&self) -> Segment {
        match self {
            Segment::Ua => Segment::Adx,
            Segment::Adx => Segment::Ua,
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity state of one segment: slice addressing plus the current
/// client certificate. The KID always identifies the most recently issued
/// credential for this endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "GatewayIP")]
    pub gateway_ip: String,
    #[serde(rename = "KID")]
    pub kid: String,
    #[serde(rename = "Certificate")]
    pub certificate: String,
}

/// Per-UasID session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "UasID")]
    pub uasid: String,
    #[serde(rename = "UA", skip_serializing_if = "Option::is_none")]
    pub ua: Option<Endpoint>,
    #[serde(rename = "ADX", skip_serializing_if = "Option::is_none")]
    pub adx: Option<Endpoint>,
}

impl Session {
    pub fn new(uasid: impl Into<String>) -> Self {
        Self {
            uasid: uasid.into(),
            ua: None,
            adx: None,
        }
    }

    pub fn endpoint(&self, segment: Segment) -> Option<&Endpoint> {
        match segment {
            Segment::Ua => self.ua.as_ref(),
            Segment::Adx => self.adx.as_ref(),
        }
    }

    pub fn set_endpoint(&mut self, segment: Segment, endpoint: Endpoint) {
        match segment {
            Segment::Ua => self.ua = Some(endpoint),
            Segment::Adx => self.adx = Some(endpoint),
        }
    }
}

/// Narrow interface to the session document store.
///
/// `put` is a whole-document upsert; the store guarantees read-your-writes
/// for a single UasID.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, uasid: &str) -> Result<Option<Session>, StoreError>;
    async fn put(&self, session: Session) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<Session>, StoreError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, uasid: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(uasid).map(|entry| entry.value().clone()))
    }

    async fn put(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.insert(session.uasid.clone(), session);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}
