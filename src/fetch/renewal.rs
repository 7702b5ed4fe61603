//! Tor identity renewal over the control port.
//!
//! Speaks just enough of the Tor control protocol to authenticate (password,
//! null or cookie auth) and send `SIGNAL NEWNYM`. Renewal is best-effort: a
//! failure is logged and the caller carries on with the current identity.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

/// Requests a fresh network identity. Never fails from the caller's view.
pub trait IdentityRenewer: Send + Sync {
    fn renew(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("control port i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("control port did not answer within {0:?}")]
    Timeout(Duration),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("unexpected control reply {code}: {message}")]
    Protocol { code: String, message: String },
}

/// Client for the Tor control port.
#[derive(Clone)]
pub struct TorControl {
    address: String,
    password: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for TorControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorControl")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TorControl {
    /// # Arguments
    ///
    /// * `address` - Control port as `host:port`
    /// * `password` - `HashedControlPassword` secret; empty means none
    pub fn new(address: impl Into<String>, password: Option<String>) -> Self {
        Self {
            address: address.into(),
            password: password.filter(|p| !p.is_empty()),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Authenticate and send `SIGNAL NEWNYM`, surfacing any failure.
    ///
    /// With a password, `AUTHENTICATE "<password>"` is sent directly.
    /// Without one, `PROTOCOLINFO` decides between null auth and the hex
    /// encoded cookie file.
    ///
    /// # Errors
    ///
    /// - [`RenewalError::Io`] if the control port is unreachable or closes
    ///   the connection mid-reply
    /// - [`RenewalError::Timeout`] if the whole exchange exceeds the timeout
    /// - [`RenewalError::Auth`] if authentication is rejected or no usable
    ///   method is offered
    /// - [`RenewalError::Protocol`] if Tor answers `SIGNAL NEWNYM` with a
    ///   non-250 reply
    #[instrument(level = "debug", skip_all, fields(address = %self.address))]
    pub async fn try_renew(&self) -> Result<(), RenewalError> {
        timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| RenewalError::Timeout(self.timeout))?
    }

    async fn exchange(&self) -> Result<(), RenewalError> {
        let stream = TcpStream::connect(&self.address).await?;
        let mut session = ControlSession {
            stream: BufStream::new(stream),
        };
        session.authenticate(self.password.as_deref()).await?;
        session.command("SIGNAL NEWNYM").await?;
        // Tor closes the connection after QUIT; its reply is irrelevant.
        let _ = session.command("QUIT").await;
        Ok(())
    }
}

impl IdentityRenewer for TorControl {
    async fn renew(&self) {
        match self.try_renew().await {
            Ok(()) => info!(address = %self.address, "Requested new Tor identity"),
            Err(e) => error!(address = %self.address, error = %e, "Tor identity renewal failed"),
        }
    }
}

struct ControlSession {
    stream: BufStream<TcpStream>,
}

impl ControlSession {
    /// Send one command and collect its reply lines (status code stripped).
    async fn command(&mut self, line: &str) -> Result<Vec<String>, RenewalError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Vec<String>, RenewalError> {
        let mut lines = Vec::new();
        loop {
            let mut raw = String::new();
            if self.stream.read_line(&mut raw).await? == 0 {
                return Err(RenewalError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "control connection closed mid-reply",
                )));
            }
            let line = raw.trim_end_matches(['\r', '\n']);
            if line.len() < 4 || !line.is_char_boundary(3) || !line.is_char_boundary(4) {
                return Err(RenewalError::Protocol {
                    code: String::new(),
                    message: line.to_string(),
                });
            }
            let (code, rest) = line.split_at(3);
            let (sep, text) = rest.split_at(1);
            if code != "250" {
                return Err(RenewalError::Protocol {
                    code: code.to_string(),
                    message: text.to_string(),
                });
            }
            lines.push(text.to_string());
            if sep == " " {
                return Ok(lines);
            }
        }
    }

    async fn authenticate(&mut self, password: Option<&str>) -> Result<(), RenewalError> {
        let command = match password {
            Some(password) => format!("AUTHENTICATE {}", quote(password)),
            None => self.cookie_or_null_auth().await?,
        };
        self.command(&command).await.map(|_| ()).map_err(|e| match e {
            RenewalError::Protocol { code, message } => RenewalError::Auth(format!("{code} {message}")),
            other => other,
        })
    }

    /// Pick the auth command advertised by `PROTOCOLINFO`.
    async fn cookie_or_null_auth(&mut self) -> Result<String, RenewalError> {
        let info = self.command("PROTOCOLINFO 1").await?;
        let auth = info
            .iter()
            .find_map(|l| l.strip_prefix("AUTH "))
            .ok_or_else(|| RenewalError::Auth("PROTOCOLINFO did not list auth methods".to_string()))?;
        let methods: Vec<&str> = auth
            .split_whitespace()
            .find_map(|kv| kv.strip_prefix("METHODS="))
            .map(|m| m.split(',').collect())
            .unwrap_or_default();
        debug!(?methods, "Control port auth methods");

        if methods.contains(&"NULL") {
            return Ok("AUTHENTICATE".to_string());
        }
        if methods.contains(&"COOKIE") {
            if let Some(path) = cookie_file(auth) {
                let cookie = tokio::fs::read(&path).await?;
                let hex: String = cookie.iter().map(|b| format!("{b:02x}")).collect();
                return Ok(format!("AUTHENTICATE {hex}"));
            }
        }
        Err(RenewalError::Auth(format!(
            "no usable auth method among {methods:?}; configure a control password"
        )))
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Value of `COOKIEFILE="..."` in a PROTOCOLINFO auth line.
fn cookie_file(auth_line: &str) -> Option<PathBuf> {
    let start = auth_line.find("COOKIEFILE=\"")? + "COOKIEFILE=\"".len();
    let mut path = String::new();
    let mut chars = auth_line[start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => path.push(chars.next()?),
            '"' => return Some(PathBuf::from(path)),
            c => path.push(c),
        }
    }
    None
}
