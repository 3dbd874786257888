//! One proxied session, from an accepted client to Disconnected.
//!
//! The engine resolves and dials the upstream, aligns both connections on
//! the same game data, then runs three workers: a relay per direction and
//! the keepalive. Teardown is ordered: the keepalive is stopped first so it
//! never writes to a closed connection, the handles in the session model
//! are cleared before the connections close, and the relays unwind on their
//! own once the streams are gone.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use realmgate_protocol::conn::is_unexpected_eof;
use realmgate_protocol::packets::{Login, PlayerAuthInput};
use realmgate_protocol::types::{InputFlags, InputMode, InteractionModel, PlayMode, Vec3};
use realmgate_protocol::{Connection, PROTOCOL_VERSION};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::interceptor;
use crate::resolver::RealmsClient;
use crate::state::{GameState, Status};

/// The cadence of synthetic authoritative input. The upstream's timeout
/// detector keys off this packet kind; an idle client sends nothing, and
/// without the synthetic ticks the upstream drops the session after about
/// thirty seconds.
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Direction {
    Serverbound,
    Clientbound,
}

/// Runs exactly one session over an accepted client connection.
pub async fn run(
    client: Connection,
    invite: &str,
    realms: &RealmsClient,
    state: &Arc<GameState>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let info = tokio::select! {
        _ = cancel.cancelled() => {
            client.close();
            anyhow::bail!("cancelled while waiting for the client login");
        }
        info = client.accept_login() => info.context("client login never completed")?,
    };

    info!(player = %info.display_name, "client logged in");

    state.set_status(Status::ConnectingToRealm);

    let endpoint = match realms.resolve(invite, cancel).await {
        Ok(endpoint) => endpoint,
        Err(e) => {
            client.close();
            return Err(e).context("failed to resolve realm address");
        }
    };

    info!(%endpoint, "dialing realm");

    let dialed = tokio::select! {
        _ = cancel.cancelled() => {
            client.close();
            anyhow::bail!("cancelled while dialing the realm");
        }
        dialed = dial_upstream(&endpoint, &info.display_name, &info.user_id) => dialed,
    };

    let upstream = match dialed {
        Ok(conn) => conn,
        Err(e) => {
            client.close();
            return Err(e);
        }
    };

    let game_data = upstream
        .game_data()
        .cloned()
        .context("upstream produced no game data")?;

    // Align both legs concurrently: replay the game data to the local
    // client while completing the spawn exchange upstream.
    let handshake = tokio::select! {
        _ = cancel.cancelled() => {
            client.close();
            upstream.close();
            anyhow::bail!("cancelled during the handshake pair");
        }
        pair = async { tokio::join!(client.start_game(&game_data), upstream.do_spawn()) } => pair,
    };

    if let Err(e) = handshake.0.and(handshake.1) {
        client.close();
        upstream.close();
        return Err(e).context("handshake pair failed");
    }

    let upstream = Arc::new(upstream);
    let local = Arc::new(client);

    state.set_connections(upstream.clone(), local.clone());
    state.set_identity(&info.display_name, &info.user_id, game_data.entity_runtime_id);
    state.init_from_game_data(&game_data);
    state.set_status(Status::Connected);

    info!(
        player = %info.display_name,
        runtime_id = game_data.entity_runtime_id,
        world = %game_data.world_name,
        "session established"
    );

    let session_cancel = cancel.child_token();

    let keepalive = tokio::spawn(run_keepalive(
        upstream.clone(),
        state.clone(),
        session_cancel.clone(),
    ));

    let (done_send, done_recv) = flume::bounded::<Direction>(1);

    tokio::spawn(run_relay(
        local.clone(),
        upstream.clone(),
        Direction::Serverbound,
        state.clone(),
        done_send.clone(),
    ));
    tokio::spawn(run_relay(
        upstream.clone(),
        local.clone(),
        Direction::Clientbound,
        state.clone(),
        done_send,
    ));

    // Wait for a disconnect in either direction, or for shutdown.
    tokio::select! {
        direction = done_recv.recv_async() => {
            debug!(?direction, "relay finished");
        }
        _ = cancel.cancelled() => {
            debug!("session cancelled");
        }
    }

    // Teardown order matters: keepalive first, then the model's borrowed
    // handles, then the connections themselves.
    session_cancel.cancel();
    let _ = keepalive.await;

    state.clear_connections();
    state.clear_identity();

    upstream.close();
    local.close();

    state.set_status(Status::Disconnected);
    info!("session ended");

    Ok(())
}

async fn dial_upstream(
    endpoint: &str,
    display_name: &str,
    user_id: &str,
) -> anyhow::Result<Connection> {
    let addr = tokio::net::lookup_host(endpoint)
        .await
        .with_context(|| format!("failed to resolve {endpoint}"))?
        .next()
        .with_context(|| format!("{endpoint} resolved to no addresses"))?;

    Connection::dial(
        addr,
        Login {
            protocol_version: PROTOCOL_VERSION,
            display_name: display_name.to_owned(),
            user_id: user_id.to_owned(),
        },
    )
    .await
    .context("failed to dial upstream")
}

/// Forwards frames in one direction, inspecting each before the write.
/// The first read or write error ends the worker, which signals the
/// engine through the completion channel.
async fn run_relay(
    from: Arc<Connection>,
    to: Arc<Connection>,
    direction: Direction,
    state: Arc<GameState>,
    done: flume::Sender<Direction>,
) {
    loop {
        let frame = match from.recv().await {
            Ok(frame) => frame,
            Err(e) => {
                if !is_unexpected_eof(&e) {
                    debug!(?direction, "relay read ended: {e:#}");
                }
                break;
            }
        };

        // Inspection happens before the forward, so state observed after a
        // packet was relayed already reflects it.
        match direction {
            Direction::Serverbound => interceptor::on_client_packet(&frame, &state),
            Direction::Clientbound => interceptor::on_server_packet(&frame, &state),
        }

        if let Err(e) = to.write_frame(&frame) {
            debug!(?direction, "relay write ended: {e:#}");
            break;
        }
    }

    let _ = done.try_send(direction);
}

/// Emits a synthetic authoritative-input packet upstream every tick so the
/// proxied player looks continuously present even when the local client is
/// idle in a menu or loading screen.
async fn run_keepalive(
    upstream: Arc<Connection>,
    state: Arc<GameState>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        // Frozen at the handshake values until a client packet moves us.
        let pos = state.position();

        tick += 1;

        let pkt = PlayerAuthInput {
            position: Vec3::new(pos.x, pos.y, pos.z),
            pitch: pos.pitch,
            yaw: pos.yaw,
            head_yaw: pos.yaw,
            flags: InputFlags::EMPTY,
            input_mode: InputMode::Mouse,
            play_mode: PlayMode::Normal,
            interaction_model: InteractionModel::Crosshair,
            tick,
        };

        if let Err(e) = upstream.write_packet(&pkt) {
            // The relay sees the same failure and drives teardown.
            warn!("keepalive write failed: {e:#}");
        }
    }
}
