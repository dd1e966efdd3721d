//! TCP port forwarding, optionally terminating TLS on the inbound side

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::router::Router;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);
const RETRY_DELAY: Duration = Duration::from_millis(500);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens on one address and relays every connection to a fixed target
pub struct Forwarder {
    name: String,
    bind: String,
    target: String,
    retries: u32,
    tls: Option<TlsAcceptor>,
    handshake_timeout: Duration,
    verbose: bool,
}

impl Forwarder {
    pub fn new(name: impl Into<String>, bind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind: bind.into(),
            target: target.into(),
            retries: 0,
            tls: None,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            verbose: false,
        }
    }

    /// Extra dial attempts per connection
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Terminate TLS on accepted connections
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    /// Drop TLS clients that have not finished the handshake in time
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Log every connection at info level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    async fn handle(&self, inbound: TcpStream, peer: SocketAddr) -> Result<()> {
        match &self.tls {
            Some(acceptor) => {
                let stream = tokio::time::timeout(self.handshake_timeout, acceptor.accept(inbound))
                    .await
                    .map_err(|_| RelayError::Tls(format!("handshake with {} timed out", peer)))??;
                self.relay(stream, peer).await
            }
            None => self.relay(inbound, peer).await,
        }
    }

    async fn relay<S>(&self, mut inbound: S, peer: SocketAddr) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut outbound = self.dial().await?;
        if self.verbose {
            info!("[{}] {} <-> {}", self.name, peer, self.target);
        } else {
            debug!("[{}] {} <-> {}", self.name, peer, self.target);
        }

        let (sent, received) = copy_bidirectional(&mut inbound, &mut outbound).await?;
        if self.verbose {
            info!("[{}] {} >-< {} ({} bytes out, {} bytes in)", self.name, peer, self.target, sent, received);
        } else {
            debug!("[{}] {} >-< {} ({} bytes out, {} bytes in)", self.name, peer, self.target, sent, received);
        }
        Ok(())
    }

    async fn dial(&self) -> Result<TcpStream> {
        let mut attempt = 0;
        loop {
            match TcpStream::connect(&self.target).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!("[{}] dial {} failed ({}), retry {}/{}", self.name, self.target, e, attempt, self.retries);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Router for Forwarder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(self: Box<Self>) -> Result<()> {
        let listener = TcpListener::bind(&self.bind)
            .await
            .map_err(|e| RelayError::Activation(format!("failed to bind {}: {}", self.bind, e)))?;

        let scheme = if self.tls.is_some() { "tls" } else { "tcp" };
        info!("{} forwarder on {} -> {}", scheme, self.bind, self.target);

        let this: Arc<Self> = Arc::from(self);
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("[{}] accept error: {}", this.name, e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let this = this.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle(stream, peer).await {
                    warn!("[{}] {}: {}", this.name, peer, e);
                }
            });
        }
    }
}
