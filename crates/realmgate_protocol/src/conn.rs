//! Connection plumbing shared by both legs of the proxy.
//!
//! Each connection runs two background tasks: a reader that splits the
//! stream into frames, and a writer that drains an outgoing channel. All
//! writes funnel through that channel, so any number of tasks may hold the
//! connection and write concurrently without interleaving frames.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::decode::{PacketDecoder, PacketFrame};
use crate::encode::PacketEncoder;
use crate::packets::{Login, PlayStatus, SetLocalPlayerInitialized, StartGame};
use crate::types::GameData;
use crate::{CompressionThreshold, Decode, Encode, Packet, PROTOCOL_VERSION};

const READ_BUF_SIZE: usize = 4096;

const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// The identity fields a login carries.
#[derive(Clone, PartialEq, Debug)]
pub struct LoginInfo {
    pub display_name: String,
    pub user_id: String,
    pub protocol_version: i32,
}

/// One leg of the proxy: a framed, compression-aware packet stream.
pub struct Connection {
    peer: SocketAddr,
    frames: flume::Receiver<PacketFrame>,
    outgoing: flume::Sender<BytesMut>,
    threshold: CompressionThreshold,
    game_data: Option<GameData>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl Connection {
    /// Wraps an established stream, spawning the reader and writer tasks.
    pub fn wrap(stream: TcpStream, threshold: CompressionThreshold) -> anyhow::Result<Self> {
        let peer = stream.peer_addr()?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {e}");
        }

        let (mut reader, mut writer) = stream.into_split();

        let (frame_send, frame_recv) = flume::unbounded();

        let reader_task = tokio::spawn(async move {
            let mut dec = PacketDecoder::new();
            dec.set_compression(threshold);

            loop {
                match dec.try_next_packet() {
                    Ok(Some(frame)) => {
                        if frame_send.send(frame).is_err() {
                            // Connection dropped on our side.
                            break;
                        }
                    }
                    Ok(None) => {
                        dec.reserve(READ_BUF_SIZE);
                        let mut buf = dec.take_capacity();

                        match reader.read_buf(&mut buf).await {
                            Ok(0) => break, // EOF.
                            Ok(_) => {}
                            Err(e) => {
                                debug!("error reading from {peer}: {e}");
                                break;
                            }
                        }

                        dec.queue_bytes(buf);
                    }
                    Err(e) => {
                        warn!("error decoding frame from {peer}: {e:#}");
                        break;
                    }
                }
            }
        });

        let (byte_send, byte_recv) = flume::unbounded::<BytesMut>();

        let writer_task = tokio::spawn(async move {
            while let Ok(bytes) = byte_recv.recv_async().await {
                if let Err(e) = writer.write_all(&bytes).await {
                    debug!("error writing to {peer}: {e}");
                    break;
                }
            }
        });

        Ok(Self {
            peer,
            frames: frame_recv,
            outgoing: byte_send,
            threshold,
            game_data: None,
            reader_task,
            writer_task,
        })
    }

    /// Dials the upstream and runs the login exchange, capturing the
    /// game-data snapshot the upstream hands out.
    pub async fn dial(addr: SocketAddr, login: Login) -> anyhow::Result<Self> {
        let stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr))
            .await
            .context("timed out dialing upstream")??;

        let mut conn = Self::wrap(stream, CompressionThreshold::DEFAULT)?;

        conn.write_packet(&login)?;

        let status: PlayStatus = conn.expect().await?;
        ensure!(
            status.status == PlayStatus::LOGIN_SUCCESS,
            "upstream rejected login with status {}",
            status.status
        );

        let start: StartGame = conn.expect().await?;
        conn.game_data = Some(start.game_data);

        Ok(conn)
    }

    /// Runs the server half of the login exchange. Any client is accepted;
    /// its identity is echoed back into the session.
    pub async fn accept_login(&self) -> anyhow::Result<LoginInfo> {
        let login: Login = self.expect().await?;

        if login.protocol_version != PROTOCOL_VERSION {
            debug!(
                client = login.protocol_version,
                ours = PROTOCOL_VERSION,
                "client protocol version differs; relaying anyway"
            );
        }

        self.write_packet(&PlayStatus {
            status: PlayStatus::LOGIN_SUCCESS,
        })?;

        Ok(LoginInfo {
            display_name: login.display_name,
            user_id: login.user_id,
            protocol_version: login.protocol_version,
        })
    }

    /// Propagates the upstream's game data to the local client and walks it
    /// through spawning: start-game, wait for the client to initialize,
    /// confirm the spawn.
    pub async fn start_game(&self, game_data: &GameData) -> anyhow::Result<()> {
        self.write_packet(&StartGame {
            game_data: game_data.clone(),
        })?;

        let _: SetLocalPlayerInitialized = self.expect().await?;

        self.write_packet(&PlayStatus {
            status: PlayStatus::PLAYER_SPAWN,
        })
    }

    /// Completes the spawn exchange on a dialed connection.
    pub async fn do_spawn(&self) -> anyhow::Result<()> {
        let Some(game_data) = &self.game_data else {
            bail!("spawn requested before game data was received");
        };

        self.write_packet(&SetLocalPlayerInitialized {
            runtime_id: game_data.entity_runtime_id,
        })?;

        let status: PlayStatus = self.expect().await?;
        ensure!(
            status.status == PlayStatus::PLAYER_SPAWN,
            "unexpected spawn status {}",
            status.status
        );

        Ok(())
    }

    /// Receives the next frame. Only one task may read from a connection.
    pub async fn recv(&self) -> anyhow::Result<PacketFrame> {
        self.frames
            .recv_async()
            .await
            .map_err(|_| anyhow::anyhow!("connection to {} closed", self.peer))
    }

    /// Receives frames until one decodes as `P`, discarding others. Used
    /// during the handshakes, where unrelated packets may interleave.
    pub async fn expect<P>(&self) -> anyhow::Result<P>
    where
        P: Packet + Decode,
    {
        loop {
            let frame = self.recv().await?;
            if frame.id == P::ID {
                return frame.decode::<P>();
            }
            trace!(id = frame.id, waiting_for = P::NAME, "skipping frame");
        }
    }

    /// Encodes and enqueues one packet. Writes from any number of tasks are
    /// serialized by the writer task.
    pub fn write_packet<P>(&self, pkt: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        let mut enc = PacketEncoder::with_compression(self.threshold);
        enc.append_packet(pkt)?;
        self.send_bytes(enc.take())
    }

    /// Enqueues an already-decoded frame unchanged. The relay path.
    pub fn write_frame(&self, frame: &PacketFrame) -> anyhow::Result<()> {
        let mut enc = PacketEncoder::with_compression(self.threshold);
        enc.append_frame(frame)?;
        self.send_bytes(enc.take())
    }

    fn send_bytes(&self, bytes: BytesMut) -> anyhow::Result<()> {
        if self.outgoing.send(bytes).is_err() {
            bail!("connection to {} closed", self.peer);
        }
        Ok(())
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The game data captured during [`dial`](Self::dial). Absent on
    /// accepted connections.
    pub fn game_data(&self) -> Option<&GameData> {
        self.game_data.as_ref()
    }

    /// Tears the connection down. Subsequent writes and reads fail.
    pub fn close(&self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// The persistent local listener. Bound once; the port is held across
/// session boundaries because clients cache the endpoint identity.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let inner = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))?;

        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts one client connection.
    pub async fn accept(&self) -> anyhow::Result<(Connection, SocketAddr)> {
        let (stream, remote) = self.inner.accept().await?;
        let conn = Connection::wrap(stream, CompressionThreshold::DEFAULT)?;
        Ok((conn, remote))
    }
}

/// Distinguishes wire EOF from other failures, for quieter logs when a
/// client simply goes away.
pub fn is_unexpected_eof(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == ErrorKind::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::SetTime;

    #[tokio::test]
    async fn loopback_packet_exchange() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let conn = Connection::wrap(stream, CompressionThreshold::DEFAULT).unwrap();
            conn.write_packet(&SetTime { time: 4321 }).unwrap();
            // Keep the connection alive until the server has read.
            let _: SetTime = conn.expect().await.unwrap();
        });

        let (server, _) = listener.accept().await.unwrap();
        let pkt: SetTime = server.expect().await.unwrap();
        assert_eq!(pkt.time, 4321);
        server.write_packet(&SetTime { time: 4321 }).unwrap();

        client.await.unwrap();
    }

    #[tokio::test]
    async fn login_exchange_round_trip() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (conn, _) = listener.accept().await.unwrap();
            let info = conn.accept_login().await.unwrap();
            assert_eq!(info.display_name, "Steve");

            conn.start_game(&GameData {
                world_name: "Realm".to_owned(),
                entity_runtime_id: 42,
                ..GameData::default()
            })
            .await
            .unwrap();
        });

        let conn = Connection::dial(
            addr,
            Login {
                protocol_version: PROTOCOL_VERSION,
                display_name: "Steve".to_owned(),
                user_id: "2535400000000000".to_owned(),
            },
        )
        .await
        .unwrap();

        assert_eq!(conn.game_data().unwrap().entity_runtime_id, 42);
        assert_eq!(conn.game_data().unwrap().world_name, "Realm");

        conn.do_spawn().await.unwrap();

        server.await.unwrap();
    }

    #[test]
    fn eof_detection() {
        let err = anyhow::Error::from(std::io::Error::from(ErrorKind::UnexpectedEof));
        assert!(is_unexpected_eof(&err));

        let err = anyhow::anyhow!("something else");
        assert!(!is_unexpected_eof(&err));
    }
}
