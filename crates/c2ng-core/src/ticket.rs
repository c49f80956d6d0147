//! WebSocket upgrade tickets.
//!
//! A ticket is an opaque envelope binding a `(UasID, Segment)` pair, signed
//! with HMAC-SHA-256 under a process-wide secret. Tickets are self-contained:
//! the keeper only remembers the last ticket issued per slot so the slot can
//! be released when the socket closes.

use dashmap::DashMap;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::secrets;
use crate::session::Segment;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("malformed ticket")]
    Malformed,
    #[error("ticket signature mismatch")]
    BadSignature,
}

/// Identity carried by a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClaims {
    #[serde(rename = "UasID")]
    pub uasid: String,
    #[serde(rename = "Segment")]
    pub segment: Segment,
}

/// Mints and validates WebSocket tickets.
pub struct TicketKeeper {
    secret: Vec<u8>,
    slots: DashMap<String, String>,
}

impl TicketKeeper {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            slots: DashMap::new(),
        }
    }

    /// Build a keeper with the secret from `C2NG_WS_AUTH_SECRET`.
    pub fn from_env() -> Result<Self, secrets::MissingSecret> {
        Ok(Self::new(secrets::require(secrets::WS_AUTH_SECRET)?))
    }

    fn slot_key(uasid: &str, segment: Segment) -> String {
        format!("{uasid}/{segment}")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Issue a ticket for the pair and remember it in the slot table.
    pub fn issue(&self, uasid: &str, segment: Segment) -> String {
        let claims = TicketClaims {
            uasid: uasid.to_string(),
            segment,
        };

        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims serialize"));
        let ticket = format!("{payload}.{}", self.sign(&payload));

        self.slots
            .insert(Self::slot_key(uasid, segment), ticket.clone());
        ticket
    }

    /// Validate a ticket and recover the identity it binds.
    pub fn decode(&self, ticket: &str) -> Result<TicketClaims, TicketError> {
        let (payload, signature) = ticket.split_once('.').ok_or(TicketError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TicketError::Malformed)?;
        mac.verify_slice(&signature)
            .map_err(|_| TicketError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TicketError::Malformed)?;
        Ok(claims)
    }

    /// Release the slot held for the pair, if any.
    pub fn release(&self, uasid: &str, segment: Segment) {
        self.slots.remove(&Self::slot_key(uasid, segment));
    }

    /// Whether a ticket is currently held for the pair.
    pub fn is_held(&self, uasid: &str, segment: Segment) -> bool {
        self.slots.contains_key(&Self::slot_key(uasid, segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_decode_round_trip() {
        let keeper = TicketKeeper::new("ws-secret");
        let ticket = keeper.issue("drone-1", Segment::Adx);

        let claims = keeper.decode(&ticket).unwrap();
        assert_eq!(claims.uasid, "drone-1");
        assert_eq!(claims.segment, Segment::Adx);
        assert!(keeper.is_held("drone-1", Segment::Adx));
    }

    #[test]
    fn tampered_ticket_is_rejected() {
        let keeper = TicketKeeper::new("ws-secret");
        let ticket = keeper.issue("drone-1", Segment::Ua);

        let mut forged = ticket.clone();
        forged.replace_range(0..1, "x");
        assert!(keeper.decode(&forged).is_err());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuing = TicketKeeper::new("ws-secret");
        let other = TicketKeeper::new("another-secret");

        let ticket = issuing.issue("drone-1", Segment::Ua);
        assert!(matches!(
            other.decode(&ticket),
            Err(TicketError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let keeper = TicketKeeper::new("ws-secret");
        assert!(matches!(
            keeper.decode("not-a-ticket"),
            Err(TicketError::Malformed)
        ));
    }

    #[test]
    fn release_frees_the_slot() {
        let keeper = TicketKeeper::new("ws-secret");
        keeper.issue("drone-1", Segment::Ua);
        keeper.release("drone-1", Segment::Ua);
        assert!(!keeper.is_held("drone-1", Segment::Ua));
    }
}
