//! Turns a Realm invite code into a dialable `host:port`.
//!
//! The lookup is two-stage: the invite resolves to realm metadata, then the
//! join endpoint hands out a transient endpoint. A realm that is powering
//! on answers the join call with 503 for the first several seconds, and a
//! realm that only advertises the WebRTC transport returns an address that
//! is not a `host:port` pair at all; both cases are retried within a
//! bounded budget.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const REALMS_BASE_URL: &str = "https://pocket.realms.minecraft.net";

/// How many times the join endpoint is asked before giving up on the
/// realm ever producing a dialable address.
const JOIN_ATTEMPTS: u32 = 10;

/// The pause between join attempts.
const JOIN_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Backoff inside a single join call while the realm reports 503.
const JOIN_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// An opaque supplier of bearer tokens for the Realms endpoints. Token
/// acquisition and refresh live behind this seam.
pub trait TokenSource: Send + Sync {
    fn bearer(&self) -> anyhow::Result<String>;
}

/// Why an invite failed to resolve. Callers match on the prefix of the
/// rendered message.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("InviteInvalid: {0}")]
    InviteInvalid(String),

    #[error("AuthExpired: {0}")]
    AuthExpired(String),

    #[error("TransientUpstream: {0}")]
    TransientUpstream(String),

    #[error("UnsupportedTransport: {0}")]
    UnsupportedTransport(String),

    #[error("Cancelled: resolve aborted")]
    Cancelled,
}

#[derive(Deserialize, Debug)]
struct RealmInfo {
    id: i64,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JoinInfo {
    address: String,
    #[serde(default)]
    pending_update: bool,
}

/// A thin client over the Realms REST surface.
pub struct RealmsClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl RealmsClient {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
        }
    }

    /// Resolves an invite code to a `host:port` endpoint.
    pub async fn resolve(
        &self,
        invite: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ResolveError> {
        let realm = self.lookup_realm(invite).await?;
        info!(realm = realm.id, name = %realm.name, "resolved invite");

        for attempt in 1..=JOIN_ATTEMPTS {
            match self.join(realm.id, cancel).await {
                Ok(join) => {
                    if join.pending_update {
                        debug!("realm reports a pending update");
                    }

                    if parse_host_port(&join.address).is_some() {
                        return Ok(join.address);
                    }

                    // Typically a UUID naming the alternate WebRTC
                    // transport.
                    warn!(
                        attempt,
                        address = %join.address,
                        "join address is not host:port; waiting for failover"
                    );
                }
                // Transient failures stay inside the attempt budget.
                Err(ResolveError::TransientUpstream(msg)) => {
                    warn!(attempt, "join attempt failed: {msg}");
                }
                Err(e) => return Err(e),
            }

            if attempt < JOIN_ATTEMPTS {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                    _ = tokio::time::sleep(JOIN_RETRY_DELAY) => {}
                }
            }
        }

        Err(ResolveError::UnsupportedTransport(
            "address never resolved to host:port; realm may only support the alternate transport"
                .to_owned(),
        ))
    }

    async fn lookup_realm(&self, invite: &str) -> Result<RealmInfo, ResolveError> {
        let url = format!("{REALMS_BASE_URL}/worlds/v1/link/{invite}");
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::OK => response
                .json::<RealmInfo>()
                .await
                .map_err(|e| ResolveError::InviteInvalid(format!("malformed realm payload: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ResolveError::AuthExpired(
                format!("realm lookup rejected with {}", response.status()),
            )),
            status => Err(ResolveError::InviteInvalid(format!(
                "invite lookup failed with {status}"
            ))),
        }
    }

    /// One join attempt, retrying 503 internally with a short backoff.
    async fn join(&self, realm_id: i64, cancel: &CancellationToken) -> Result<JoinInfo, ResolveError> {
        let url = format!("{REALMS_BASE_URL}/worlds/{realm_id}/join");

        let mut backoff = JOIN_BACKOFF.iter();

        loop {
            let response = self.get(&url).await?;

            match response.status() {
                StatusCode::OK => {
                    return response.json::<JoinInfo>().await.map_err(|e| {
                        ResolveError::TransientUpstream(format!("malformed join payload: {e}"))
                    });
                }
                StatusCode::SERVICE_UNAVAILABLE => {
                    let Some(delay) = backoff.next() else {
                        return Err(ResolveError::TransientUpstream(
                            "realm still starting up".to_owned(),
                        ));
                    };

                    debug!(realm = realm_id, ?delay, "realm not ready; backing off");

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                        _ = tokio::time::sleep(*delay) => {}
                    }
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(ResolveError::AuthExpired(format!(
                        "join rejected with {}",
                        response.status()
                    )));
                }
                status => {
                    return Err(ResolveError::InviteInvalid(format!(
                        "join failed with {status}"
                    )));
                }
            }
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ResolveError> {
        let token = self
            .tokens
            .bearer()
            .map_err(|e| ResolveError::AuthExpired(format!("no usable token: {e}")))?;

        self.http
            .get(url)
            .bearer_auth(token)
            .header("Client-Version", realmgate_protocol::GAME_VERSION)
            .send()
            .await
            .map_err(|e| ResolveError::TransientUpstream(format!("request failed: {e}")))
    }
}

/// Validates that an address is a `host:port` pair for the datagram
/// transport. The alternate transport advertises a bare UUID here, which
/// must not be mistaken for a hostname.
pub fn parse_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;

    if host.is_empty() {
        return None;
    }

    let port = port.parse::<u16>().ok()?;
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_accepts_ip_and_hostname() {
        assert_eq!(
            parse_host_port("192.168.1.10:19132"),
            Some(("192.168.1.10", 19132))
        );
        assert_eq!(
            parse_host_port("realm-7.hosting.example:25565"),
            Some(("realm-7.hosting.example", 25565))
        );
    }

    #[test]
    fn host_port_rejects_webrtc_session_ids() {
        assert_eq!(parse_host_port("8f9c2f60-35d5-47ed-8459-3657e2f3cc30"), None);
        assert_eq!(parse_host_port(""), None);
        assert_eq!(parse_host_port(":19132"), None);
        assert_eq!(parse_host_port("host:notaport"), None);
        assert_eq!(parse_host_port("host:99999"), None);
    }

    #[test]
    fn error_kinds_render_with_prefix() {
        let err = ResolveError::UnsupportedTransport("x".to_owned());
        assert!(err.to_string().starts_with("UnsupportedTransport:"));

        let err = ResolveError::AuthExpired("y".to_owned());
        assert!(err.to_string().starts_with("AuthExpired:"));
    }
}
