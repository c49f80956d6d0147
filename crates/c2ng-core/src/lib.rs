//! Domain core of the C2NG service: session brokering between an airborne
//! unmanned aircraft and its ground-side aviation data exchange peer.
//!
//! The crate owns the session documents and their store seam, the session
//! manager that orchestrates USSP approval, slice addressing, credential
//! issuance and peer notification, the telemetry pipeline, the WebSocket
//! ticket keeper and the subscriber registry. The HTTP/WebSocket frontend
//! lives in `c2ng-api`.

pub mod config;
pub mod credentials;
pub mod did;
pub mod error;
pub mod manager;
pub mod notify;
pub mod secrets;
pub mod session;
pub mod slice;
pub mod stats;
pub mod telemetry;
pub mod ticket;
pub mod uss;
