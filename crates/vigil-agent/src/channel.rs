// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session channel: the TLS transport to the alerting server.
//!
//! Owns handshake and read/write primitives. Messages on the wire are
//! newline-delimited JSON objects carrying a `message` discriminator:
//! `authenticate` for the credential exchange, `ping`/`pong` for
//! heartbeats, anything else is domain traffic the supervisor treats as
//! proof of liveness.
//!
//! The [`SessionTransport`] / [`SessionLink`] traits are the seam the
//! Connection Supervisor drives; [`TlsTransport`] is the production
//! implementation.

use std::io::BufReader as StdBufReader;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls_pki_types::ServerName;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use vigil_config::model::{ClientCertConfig, ConnectionConfig, CredentialsConfig, ServerConfig};
use vigil_core::VigilError;

/// One frame of server traffic, as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Heartbeat reply.
    Pong,
    /// Authentication accepted.
    AuthOk,
    /// Authentication rejected, with the server's reason.
    AuthRejected(String),
    /// Any other server message; counts as liveness.
    Traffic(serde_json::Value),
}

/// Messages this client sends.
#[derive(Debug, Serialize)]
#[serde(tag = "message", rename_all = "lowercase")]
enum ClientMessage<'a> {
    Authenticate { username: &'a str, password: &'a str },
    Ping,
}

/// Parse one newline-delimited JSON frame from the server.
fn parse_frame(line: &str) -> Result<Frame, VigilError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| VigilError::connection("invalid frame", e))?;
    let message = value.get("message").and_then(|m| m.as_str()).unwrap_or("");

    match message {
        "pong" => Ok(Frame::Pong),
        "authenticate" => {
            let result = value.get("result").and_then(|r| r.as_str()).unwrap_or("");
            if result == "ok" {
                Ok(Frame::AuthOk)
            } else {
                let reason = value
                    .get("error")
                    .and_then(|e| e.as_str())
                    .unwrap_or("credentials rejected")
                    .to_string();
                Ok(Frame::AuthRejected(reason))
            }
        }
        "" => Err(VigilError::Connection {
            message: "frame missing message discriminator".to_string(),
            source: None,
        }),
        _ => Ok(Frame::Traffic(value)),
    }
}

/// Opens authenticated session links for the supervisor.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    /// Open the transport and complete the TLS handshake.
    async fn establish(&self) -> Result<Box<dyn SessionLink>, VigilError>;
}

/// An established (but not yet authenticated) link to the server.
#[async_trait]
pub trait SessionLink: Send {
    /// Run the credential exchange. A rejection is [`VigilError::Auth`].
    async fn authenticate(&mut self) -> Result<(), VigilError>;

    /// Send a heartbeat ping.
    async fn ping(&mut self) -> Result<(), VigilError>;

    /// Read the next frame, waiting at most `deadline`.
    ///
    /// An elapsed deadline is [`VigilError::Timeout`]; a closed or broken
    /// stream is [`VigilError::Connection`].
    async fn read_frame(&mut self, deadline: Duration) -> Result<Frame, VigilError>;

    /// Close the link cleanly. Errors during close are swallowed by
    /// callers; the link is unusable afterwards either way.
    async fn close(&mut self);
}

/// Production TLS transport, configured from the client context.
pub struct TlsTransport {
    host: String,
    port: u16,
    handshake_timeout: Duration,
    connector: TlsConnector,
    /// Presenting a client certificate makes a handshake rejection an
    /// authentication failure rather than a transient error.
    client_auth: bool,
    username: String,
    password: SecretString,
}

impl TlsTransport {
    /// Build the transport from the configuration sections it needs.
    ///
    /// Certificate and key files are read here, once, at startup; an
    /// unreadable file is a fatal configuration error.
    pub fn new(
        server: &ServerConfig,
        client: &ClientCertConfig,
        credentials: &CredentialsConfig,
        connection: &ConnectionConfig,
    ) -> Result<Self, VigilError> {
        let roots = load_root_store(server.ca_file.as_deref())?;

        let builder = rustls::ClientConfig::builder().with_root_certificates(roots);
        let config = if client.certificate_required {
            let (cert_file, key_file) = match (&client.cert_file, &client.key_file) {
                (Some(c), Some(k)) => (c.as_str(), k.as_str()),
                _ => {
                    return Err(VigilError::Config(
                        "client certificate required but cert_file/key_file missing".to_string(),
                    ))
                }
            };
            let certs = load_certs(cert_file)?;
            let key = load_private_key(key_file)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| VigilError::Config(format!("client certificate rejected: {e}")))?
        } else {
            builder.with_no_client_auth()
        };

        Ok(Self {
            host: server.host.clone(),
            port: server.port,
            handshake_timeout: Duration::from_secs(connection.handshake_timeout_secs),
            connector: TlsConnector::from(Arc::new(config)),
            client_auth: client.certificate_required,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }
}

#[async_trait]
impl SessionTransport for TlsTransport {
    async fn establish(&self) -> Result<Box<dyn SessionLink>, VigilError> {
        let server_name = ServerName::try_from(self.host.clone()).map_err(|e| {
            VigilError::Config(format!("server.host `{}` is not a valid name: {e}", self.host))
        })?;

        let addr = (self.host.as_str(), self.port);
        let handshake = async {
            let tcp = TcpStream::connect(addr)
                .await
                .map_err(|e| VigilError::connection("tcp connect failed", e))?;
            tcp.set_nodelay(true)
                .map_err(|e| VigilError::connection("set_nodelay failed", e))?;
            self.connector.connect(server_name, tcp).await.map_err(|e| {
                if self.client_auth {
                    // The server hung up on our certificate.
                    VigilError::Auth {
                        message: format!("tls handshake rejected: {e}"),
                    }
                } else {
                    VigilError::connection("tls handshake failed", e)
                }
            })
        };

        let stream = tokio::time::timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| VigilError::Timeout {
                duration: self.handshake_timeout,
            })??;

        debug!(host = %self.host, port = self.port, "tls session established");

        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Box::new(TlsLink {
            reader: BufReader::new(read_half),
            writer: write_half,
            username: self.username.clone(),
            password: self.password.clone(),
        }))
    }
}

/// An established TLS link speaking newline-delimited JSON.
struct TlsLink {
    reader: BufReader<ReadHalf<TlsStream<TcpStream>>>,
    writer: WriteHalf<TlsStream<TcpStream>>,
    username: String,
    password: SecretString,
}

impl TlsLink {
    async fn send(&mut self, msg: &ClientMessage<'_>) -> Result<(), VigilError> {
        let mut line = serde_json::to_string(msg)
            .map_err(|e| VigilError::connection("frame serialization failed", e))?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| VigilError::connection("write failed", e))?;
        self.writer
            .flush()
            .await
            .map_err(|e| VigilError::connection("flush failed", e))
    }

    async fn read_line(&mut self) -> Result<String, VigilError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| VigilError::connection("read failed", e))?;
        if n == 0 {
            return Err(VigilError::Connection {
                message: "server closed the connection".to_string(),
                source: None,
            });
        }
        Ok(line)
    }
}

#[async_trait]
impl SessionLink for TlsLink {
    async fn authenticate(&mut self) -> Result<(), VigilError> {
        let username = self.username.clone();
        let password = self.password.clone();
        let msg = ClientMessage::Authenticate {
            username: &username,
            password: password.expose_secret(),
        };
        self.send(&msg).await?;

        let reply = self.read_line().await?;
        match parse_frame(reply.trim())? {
            Frame::AuthOk => Ok(()),
            Frame::AuthRejected(reason) => Err(VigilError::Auth { message: reason }),
            other => Err(VigilError::Connection {
                message: format!("unexpected reply to authenticate: {other:?}"),
                source: None,
            }),
        }
    }

    async fn ping(&mut self) -> Result<(), VigilError> {
        self.send(&ClientMessage::Ping).await
    }

    async fn read_frame(&mut self, deadline: Duration) -> Result<Frame, VigilError> {
        let line = tokio::time::timeout(deadline, self.read_line())
            .await
            .map_err(|_| VigilError::Timeout { duration: deadline })??;
        parse_frame(line.trim())
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// Build the root store from a CA file, or fall back to the webpki roots.
fn load_root_store(ca_file: Option<&str>) -> Result<rustls::RootCertStore, VigilError> {
    let mut roots = rustls::RootCertStore::empty();
    match ca_file {
        Some(path) => {
            let certs = load_certs(path)?;
            let (added, _ignored) = roots.add_parsable_certificates(certs);
            if added == 0 {
                return Err(VigilError::Config(format!(
                    "no usable CA certificates in `{path}`"
                )));
            }
        }
        None => {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
    }
    Ok(roots)
}

/// Read a PEM certificate chain.
fn load_certs(path: &str) -> Result<Vec<rustls_pki_types::CertificateDer<'static>>, VigilError> {
    let file = std::fs::File::open(path)
        .map_err(|e| VigilError::Config(format!("cannot open certificate file `{path}`: {e}")))?;
    let mut reader = StdBufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| VigilError::Config(format!("cannot parse certificate file `{path}`: {e}")))
}

/// Read a PEM private key.
fn load_private_key(path: &str) -> Result<rustls_pki_types::PrivateKeyDer<'static>, VigilError> {
    let file = std::fs::File::open(path)
        .map_err(|e| VigilError::Config(format!("cannot open key file `{path}`: {e}")))?;
    let mut reader = StdBufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| VigilError::Config(format!("cannot parse key file `{path}`: {e}")))?
        .ok_or_else(|| VigilError::Config(format!("no private key found in `{path}`")))
}
