//! `/admin-live` WebSocket: pushes every admin event to the dashboard.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::middleware::RequireAuth;
use crate::models::CurrentAdmin;
use crate::services::AdminEvent;
use crate::state::AppState;

/// Build the realtime router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin-live", get(admin_live))
}

/// Upgrade to a WebSocket. The session is checked before the upgrade, so an
/// anonymous client gets a plain 401.
pub async fn admin_live(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let events = state.events().subscribe();
    ws.on_upgrade(move |socket| relay(socket, events, actor))
}

async fn relay(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<AdminEvent>,
    actor: CurrentAdmin,
) {
    info!(user_id = %actor.id, username = %actor.username, "Live socket connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_json().into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %actor.id, skipped, "Live socket lagged, skipping events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(user_id = %actor.id, "Live socket closed");
}
