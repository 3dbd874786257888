//! Startup configuration: listen address, invite discovery, and the cached
//! credential file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::resolver::TokenSource;

/// Where the refresh token lives between runs.
pub const TOKEN_PATH: &str = ".realm-token";

/// The invite-code file searched next to the process.
pub const INVITE_PATH: &str = ".realm-invite";

/// The environment variable consulted for the invite code.
pub const INVITE_ENV: &str = "REALM_INVITE";

/// The log file, truncated at startup.
pub const LOG_PATH: &str = "proxy.log";

/// The name the local listener presents to clients.
pub const FRIENDLY_NAME: &str = "Realmgate";

/// Parses a listen address, accepting the bare `:port` shorthand.
pub fn parse_listen_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_owned()
    };

    full.parse()
        .with_context(|| format!("invalid listen address '{addr}'"))
}

/// Locates the invite code: CLI override, then `$REALM_INVITE`, then a
/// `.realm-invite` file in the working directory or one directory above
/// the executable.
pub fn find_invite(cli_override: Option<&str>) -> anyhow::Result<String> {
    if let Some(invite) = cli_override {
        return Ok(invite.trim().to_owned());
    }

    if let Ok(invite) = std::env::var(INVITE_ENV) {
        let invite = invite.trim().to_owned();
        if !invite.is_empty() {
            return Ok(invite);
        }
    }

    for dir in invite_search_dirs() {
        let path = dir.join(INVITE_PATH);
        if let Ok(contents) = std::fs::read_to_string(&path) {
            let invite = contents.trim().to_owned();
            if !invite.is_empty() {
                return Ok(invite);
            }
        }
    }

    bail!(
        "no realm invite found: pass --invite, set ${INVITE_ENV}, or create a {INVITE_PATH} file"
    )
}

fn invite_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];

    if let Ok(exe) = std::env::current_exe() {
        if let Some(above) = exe.parent().and_then(Path::parent) {
            dirs.push(above.to_owned());
        }
    }

    dirs
}

/// The persisted OAuth2 material. Acquiring and refreshing it is the
/// companion sign-in tool's job; the proxy only consumes the cache.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// A [`TokenSource`] backed by the credential cache file.
pub struct FileTokenSource {
    credentials: StoredCredentials,
}

impl FileTokenSource {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).with_context(|| {
            format!(
                "no cached credentials at {}: complete the browser sign-in first",
                path.display()
            )
        })?;

        let credentials: StoredCredentials = serde_json::from_str(&contents)
            .with_context(|| format!("malformed credential cache at {}", path.display()))?;

        Ok(Self { credentials })
    }

    /// Writes the cache with owner-only permissions.
    pub fn save(path: impl AsRef<Path>, credentials: &StoredCredentials) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(credentials)?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl TokenSource for FileTokenSource {
    fn bearer(&self) -> anyhow::Result<String> {
        Ok(self.credentials.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_shorthand() {
        assert_eq!(
            parse_listen_addr(":19132").unwrap(),
            "0.0.0.0:19132".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:19133").unwrap(),
            "127.0.0.1:19133".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_addr("not an address").is_err());
    }

    #[test]
    fn cli_invite_wins() {
        assert_eq!(
            find_invite(Some(" ABC123 ")).unwrap(),
            "ABC123"
        );
    }

    #[test]
    fn credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_PATH);

        let creds = StoredCredentials {
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
        };

        FileTokenSource::save(&path, &creds).unwrap();

        let source = FileTokenSource::load(&path).unwrap();
        assert_eq!(source.bearer().unwrap(), "access");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn missing_credentials_is_an_error() {
        assert!(FileTokenSource::load("/nonexistent/.realm-token").is_err());
    }
}
