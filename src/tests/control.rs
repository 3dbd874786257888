use std::io::Write as _;
use std::sync::Arc;

use realmgate_protocol::packets::Text;
use realmgate_protocol::types::TextKind;
use realmgate_protocol::{CompressionThreshold, Connection, Listener};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::control::{ControlError, ControlSurface};
use crate::state::{GameState, Status};

/// A loopback pair standing in for the upstream: the near side is stored
/// in the session model, the far side observes what the actions wrote.
async fn connected_surface() -> (ControlSurface, Arc<GameState>, Connection) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

    let stream = TcpStream::connect(addr).await.unwrap();
    let near = Connection::wrap(stream, CompressionThreshold::DEFAULT).unwrap();
    let far = accept.await.unwrap();

    let state = Arc::new(GameState::new());
    state.set_identity("Steve", "2535400000000000", 42);

    let near = Arc::new(near);
    state.set_connections(near.clone(), near);
    state.set_status(Status::Connected);

    (ControlSurface::new(state.clone()), state, far)
}

fn kind_of(err: &ControlError) -> &'static str {
    match err {
        ControlError::NotConnected => "NotConnected",
        ControlError::ConnectionUnavailable => "ConnectionUnavailable",
        ControlError::WriteFailed(_) => "WriteFailed",
        ControlError::InvalidArgument(_) => "InvalidArgument",
        ControlError::UpstreamUnreachable(_) => "UpstreamUnreachable",
        ControlError::Cancelled(_) => "Cancelled",
    }
}

#[test]
fn status_query_answers_in_every_status() {
    let state = Arc::new(GameState::new());
    let surface = ControlSurface::new(state.clone());

    for status in [
        Status::Starting,
        Status::WaitingForClient,
        Status::ConnectingToRealm,
        Status::Connected,
        Status::Disconnected,
    ] {
        state.set_status(status);
        assert_eq!(surface.get_status()["status"], status.as_str());
    }
}

#[test]
fn queries_require_a_live_session() {
    let state = Arc::new(GameState::new());
    state.set_status(Status::WaitingForClient);
    let surface = ControlSurface::new(state);

    assert_eq!(kind_of(&surface.get_position().unwrap_err()), "NotConnected");
    assert_eq!(kind_of(&surface.get_inventory().unwrap_err()), "NotConnected");
    assert_eq!(kind_of(&surface.get_players().unwrap_err()), "NotConnected");
    assert_eq!(
        kind_of(&surface.get_chat_history(5).unwrap_err()),
        "NotConnected"
    );
    assert_eq!(
        kind_of(&surface.get_world_info().unwrap_err()),
        "NotConnected"
    );
}

#[test]
fn actions_fail_without_an_upstream_handle() {
    // Connected status but a cleared handle is the mid-teardown window.
    let state = Arc::new(GameState::new());
    state.set_status(Status::Connected);
    let surface = ControlSurface::new(state);

    assert_eq!(
        kind_of(&surface.chat("hello").unwrap_err()),
        "ConnectionUnavailable"
    );
}

#[test]
fn error_messages_carry_their_kind_prefix() {
    assert!(ControlError::NotConnected.to_string().starts_with("NotConnected:"));
    assert!(ControlError::ConnectionUnavailable
        .to_string()
        .contains("server connection not available"));
    assert!(ControlError::InvalidArgument("x".to_owned())
        .to_string()
        .starts_with("InvalidArgument:"));
}

#[tokio::test]
async fn chat_writes_the_identity_and_message() {
    let (surface, _state, far) = connected_surface().await;

    surface.chat("hello world").unwrap();

    let pkt: Text = far.expect().await.unwrap();
    assert_eq!(pkt.kind, TextKind::Chat);
    assert_eq!(pkt.source, "Steve");
    assert_eq!(pkt.xuid, "2535400000000000");
    assert_eq!(pkt.message, "hello world");
}

#[tokio::test]
async fn commands_travel_the_chat_path() {
    let (surface, _state, far) = connected_surface().await;

    surface.command("/time set day").unwrap();
    surface.command("weather clear").unwrap();

    let pkt: Text = far.expect().await.unwrap();
    assert_eq!(pkt.kind, TextKind::Chat);
    assert_eq!(pkt.message, "/time set day");

    let pkt: Text = far.expect().await.unwrap();
    assert_eq!(pkt.message, "/weather clear");
}

#[tokio::test]
async fn teleport_emits_a_tp_command() {
    let (surface, _state, far) = connected_surface().await;

    surface.teleport(100.0, 65.5, -200.0).unwrap();

    let pkt: Text = far.expect().await.unwrap();
    assert_eq!(pkt.message, "/tp @s 100 65.5 -200");
}

#[tokio::test]
async fn upload_rejects_empty_files() {
    let (surface, _state, _far) = connected_surface().await;
    let cancel = CancellationToken::new();

    let empty = tempfile::NamedTempFile::new().unwrap();
    let err = surface
        .upload_structure(empty.path().to_str().unwrap(), 0, &cancel)
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), "InvalidArgument");

    let blank = {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "   \n\t\n").unwrap();
        f
    };
    let err = surface
        .upload_structure(blank.path().to_str().unwrap(), 0, &cancel)
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), "InvalidArgument");

    let err = surface
        .upload_structure("/nonexistent/structure.txt", 0, &cancel)
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), "InvalidArgument");
}

#[tokio::test]
async fn upload_sends_each_chunk_line() {
    let (surface, _state, far) = connected_surface().await;
    let cancel = CancellationToken::new();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "AAAA").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "  BBBB  ").unwrap();
    writeln!(file, "CCCC").unwrap();

    let message = surface
        .upload_structure(file.path().to_str().unwrap(), 1, &cancel)
        .await
        .unwrap();
    assert!(message.contains("3 chunks"));

    for expected in ["!chunk AAAA", "!chunk BBBB", "!chunk CCCC"] {
        let pkt: Text = far.expect().await.unwrap();
        assert_eq!(pkt.message, expected);
    }
}

#[tokio::test]
async fn upload_cancellation_names_the_index_reached() {
    let (surface, _state, far) = connected_surface().await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    for chunk in ["AAAA", "BBBB", "CCCC"] {
        writeln!(file, "{chunk}").unwrap();
    }

    // A long delay keeps the sleep branch pending, so the pre-cancelled
    // token aborts right after the first chunk.
    let err = surface
        .upload_structure(file.path().to_str().unwrap(), 60_000, &cancel)
        .await
        .unwrap_err();

    match &err {
        ControlError::Cancelled(msg) => assert_eq!(msg, "sent 1 of 3 chunks"),
        other => panic!("expected Cancelled, got {other}"),
    }

    let pkt: Text = far.expect().await.unwrap();
    assert_eq!(pkt.message, "!chunk AAAA");
}

#[test]
fn toggling_packet_logging_twice_restores_the_flag() {
    let state = Arc::new(GameState::new());
    let surface = ControlSurface::new(state.clone());

    assert!(!state.verbose());
    surface.toggle_packet_logging(true);
    assert!(state.verbose());
    surface.toggle_packet_logging(false);
    assert!(!state.verbose());
}

#[test]
fn empty_chat_and_command_are_rejected() {
    let state = Arc::new(GameState::new());
    state.set_status(Status::Connected);
    let surface = ControlSurface::new(state);

    assert_eq!(kind_of(&surface.chat("").unwrap_err()), "InvalidArgument");
    assert_eq!(kind_of(&surface.command("/").unwrap_err()), "InvalidArgument");
}
