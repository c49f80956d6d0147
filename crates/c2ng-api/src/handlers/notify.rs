//! WebSocket notification channel.
//!
//! Phase 1: `POST /notifications/auth/{uasid}/{segment}` (bearer
//! authenticated) hands out a ticket. Phase 2: the client opens
//! `GET /notifications/websocket` and sends `{Ticket, Action: "subscribe"}`;
//! the first valid subscribe binds the socket to the ticket's identity and
//! registers its channel with the subscriber registry. Server-pushed frames
//! flow through that channel until the socket closes, which releases both
//! the subscription and the ticket slot.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use c2ng_core::notify::{FrameError, NotificationSender, OutboundFrame, SubscriberRegistry};
use c2ng_core::session::Segment;
use c2ng_core::ticket::{TicketClaims, TicketKeeper};

use crate::auth::AuthUser;
use crate::error::{ApiFailure, ApiResult};
use crate::models::WsAuthResponse;
use crate::state::AppState;

const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// `POST /notifications/auth/{uasid}/{segment}` - mint a WebSocket ticket.
pub async fn ws_auth(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path((uasid, segment)): Path<(String, String)>,
) -> ApiResult<Json<WsAuthResponse>> {
    let mut errors = Map::new();

    if uasid.is_empty() {
        errors.insert("UasID".to_string(), json!("not_found"));
    }

    let segment = match Segment::parse(&segment) {
        Some(segment) => Some(segment),
        None => {
            errors.insert("Segment".to_string(), json!("bad_segment"));
            None
        }
    };

    if !errors.is_empty() {
        return Err(ApiFailure::domain(Value::Object(errors)));
    }

    let ticket = state.tickets.issue(&uasid, segment.unwrap());
    Ok(Json(WsAuthResponse {
        success: true,
        ticket,
    }))
}

/// `GET /notifications/websocket` - upgrade and serve the notification
/// socket.
pub async fn ws_notifications(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

/// Client-to-server frames, dispatched on the `Action` field.
#[derive(Debug, Deserialize)]
struct IncomingFrame {
    #[serde(rename = "Ticket")]
    ticket: Option<String>,
    #[serde(rename = "Action")]
    action: Option<String>,
}

async fn serve_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let mut identity: Option<TicketClaims> = None;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                // The loop owns a sender, so the channel never closes here.
                let Some(frame) = outbound else { break };

                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("Failed to serialize outbound frame: {e}");
                        let _ = socket
                            .send(Message::Close(Some(CloseFrame {
                                code: CLOSE_INTERNAL_ERROR,
                                reason: "Internal error".into(),
                            })))
                            .await;
                        break;
                    }
                };

                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state.tickets, &state.registry, &mut identity, &text, &tx);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary
                }
            }
        }
    }

    if let Some(claims) = identity {
        tracing::debug!(uasid = claims.uasid, segment = %claims.segment, "Socket closed");
        state
            .registry
            .unsubscribe(&claims.uasid, claims.segment.as_str());
        state.tickets.release(&claims.uasid, claims.segment);
    }
}

/// React to one client frame. Replies travel through the socket's own
/// channel so there is a single writer.
fn handle_frame(
    tickets: &TicketKeeper,
    registry: &SubscriberRegistry,
    identity: &mut Option<TicketClaims>,
    text: &str,
    tx: &NotificationSender,
) {
    let reject = |error: FrameError, message: String| {
        tracing::warn!(message, "Bad websocket message");
        let _ = tx.send(OutboundFrame::Error { error, message });
    };

    let frame: IncomingFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            reject(FrameError::BadRequest, format!("Invalid payload: {e}"));
            return;
        }
    };

    let Some(ticket) = frame.ticket else {
        reject(FrameError::BadRequest, "Ticket field missing".to_string());
        return;
    };

    let claims = match tickets.decode(&ticket) {
        Ok(claims) => claims,
        Err(e) => {
            reject(FrameError::AccessDenied, e.to_string());
            return;
        }
    };

    // The first valid subscribe binds the socket; a ticket for a different
    // identity on the same socket is refused.
    if let Some(bound) = identity {
        if *bound != claims {
            reject(
                FrameError::BadRequest,
                "Socket is bound to another identity".to_string(),
            );
            return;
        }
    }

    let Some(action) = frame.action else {
        reject(FrameError::BadRequest, "Action field missing".to_string());
        return;
    };

    match action.as_str() {
        "subscribe" => {
            registry.subscribe(&claims.uasid, claims.segment.as_str(), tx.clone());
            *identity = Some(claims);
        }
        "unsubscribe" => {
            registry.unsubscribe(&claims.uasid, claims.segment.as_str());
        }
        other => {
            reject(FrameError::BadRequest, format!("Unknown action: {other}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c2ng_core::notify::Event;

    fn fixture() -> (TicketKeeper, SubscriberRegistry) {
        (TicketKeeper::new("ws-secret"), SubscriberRegistry::new())
    }

    #[tokio::test]
    async fn subscribe_binds_and_acknowledges() {
        let (tickets, registry) = fixture();
        let ticket = tickets.issue("drone-1", Segment::Adx);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        let frame = json!({"Ticket": ticket, "Action": "subscribe"}).to_string();
        handle_frame(&tickets, &registry, &mut identity, &frame, &tx);

        assert_eq!(rx.recv().await, Some(OutboundFrame::Subscribed));
        assert_eq!(identity.as_ref().unwrap().uasid, "drone-1");

        registry.notify("drone-1", "adx", Event::PeerAddressChanged);
        assert_eq!(
            rx.recv().await,
            Some(OutboundFrame::Notification {
                event: Event::PeerAddressChanged
            })
        );
    }

    #[tokio::test]
    async fn missing_ticket_is_bad_request() {
        let (tickets, registry) = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Action": "subscribe"}).to_string(),
            &tx,
        );

        match rx.recv().await {
            Some(OutboundFrame::Error { error, .. }) => assert_eq!(error, FrameError::BadRequest),
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn undecodable_ticket_is_access_denied() {
        let (tickets, registry) = fixture();
        let foreign = TicketKeeper::new("other-secret").issue("drone-1", Segment::Ua);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Ticket": foreign, "Action": "subscribe"}).to_string(),
            &tx,
        );

        match rx.recv().await {
            Some(OutboundFrame::Error { error, .. }) => {
                assert_eq!(error, FrameError::AccessDenied)
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (tickets, registry) = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        handle_frame(&tickets, &registry, &mut identity, "{not json", &tx);

        assert!(matches!(
            rx.recv().await,
            Some(OutboundFrame::Error {
                error: FrameError::BadRequest,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn second_identity_on_the_same_socket_is_refused() {
        let (tickets, registry) = fixture();
        let first = tickets.issue("drone-1", Segment::Ua);
        let second = tickets.issue("drone-2", Segment::Ua);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Ticket": first, "Action": "subscribe"}).to_string(),
            &tx,
        );
        rx.recv().await;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Ticket": second, "Action": "subscribe"}).to_string(),
            &tx,
        );

        assert!(matches!(
            rx.recv().await,
            Some(OutboundFrame::Error {
                error: FrameError::BadRequest,
                ..
            })
        ));
        assert_eq!(identity.as_ref().unwrap().uasid, "drone-1");
    }

    #[tokio::test]
    async fn unsubscribe_releases_the_registration() {
        let (tickets, registry) = fixture();
        let ticket = tickets.issue("drone-1", Segment::Adx);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut identity = None;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Ticket": ticket, "Action": "subscribe"}).to_string(),
            &tx,
        );
        rx.recv().await;

        handle_frame(
            &tickets,
            &registry,
            &mut identity,
            &json!({"Ticket": ticket, "Action": "unsubscribe"}).to_string(),
            &tx,
        );

        registry.notify("drone-1", "adx", Event::PeerAddressChanged);
        assert!(rx.try_recv().is_err());
    }
}
