//! The persistent accept loop.
//!
//! The listener binds once and holds the port for the life of the process.
//! Clients cache the listener's identity and fail to reconnect after a
//! rebind, so the socket is never reopened between sessions. One client is
//! served at a time; the next accept happens only after the current
//! session has fully torn down.

use std::sync::Arc;

use realmgate_protocol::conn::is_unexpected_eof;
use realmgate_protocol::Listener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::resolver::RealmsClient;
use crate::session;
use crate::state::{GameState, Status};

pub async fn run(
    listener: Listener,
    invite: String,
    realms: RealmsClient,
    state: Arc<GameState>,
    cancel: CancellationToken,
) {
    loop {
        state.set_status(Status::WaitingForClient);

        let accepted = tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => accepted,
        };

        let (client, remote) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {e:#}");
                continue;
            }
        };

        info!(%remote, "client connected");

        if let Err(e) = session::run(client, &invite, &realms, &state, &cancel).await {
            if is_unexpected_eof(&e) {
                info!("session ended at EOF");
            } else {
                warn!("session ended with error: {e:#}");
            }
        }

        // The session clears these on its own path; a failed handshake
        // never set them. Clearing again keeps every exit uniform.
        state.clear_connections();
        state.clear_identity();
        state.set_status(Status::Disconnected);

        if cancel.is_cancelled() {
            return;
        }
    }
}
