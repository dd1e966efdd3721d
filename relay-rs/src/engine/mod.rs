//! Built-in relay engine
//!
//! A minimal [`RouterFactory`] that serves routes directly, without a
//! forwarding chain:
//!
//! - `tcp://[host]:port/target:port` forwards plain TCP
//! - `tls://[host]:port/target:port` terminates TLS, then forwards plain TCP
//!
//! TLS nodes use the process-wide default identity unless they carry
//! `?cert=...&key=...`. Unknown schemes are skipped, so a route made only of
//! them expands to nothing.

pub mod forward;
pub mod node;

use std::path::Path;
use tracing::warn;

use crate::error::{RelayError, Result};
use crate::route::Route;
use crate::router::{Router, RouterFactory};
use crate::tls::{self, TlsIdentity};

pub use forward::Forwarder;
pub use node::Node;

/// Factory producing one [`Forwarder`] per serve node
#[derive(Debug, Clone, Default)]
pub struct ForwardFactory {
    verbose: bool,
}

impl ForwardFactory {
    /// `verbose` raises per-connection logging to info
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn forwarder(&self, node: &Node, route: &Route) -> Result<Option<Forwarder>> {
        let tls = match (node.protocol.as_str(), node.transport.as_str()) {
            ("tcp", "tcp") => false,
            ("tcp", "tls") | ("tls", "tls") => true,
            _ => {
                warn!("Unsupported node {}, skipping", node);
                return Ok(None);
            }
        };

        let target = node
            .remote
            .as_deref()
            .ok_or_else(|| RelayError::Config(format!("node {} has no target address", node)))?;
        if node.user.is_some() {
            warn!("Credentials on {} are ignored", node);
        }

        let mut forwarder = Forwarder::new(node.as_str(), node.addr(), target)
            .with_retries(route.retries)
            .verbose(self.verbose);

        if tls {
            forwarder = forwarder.with_tls(acceptor_for(node)?);
        }
        Ok(Some(forwarder))
    }
}

impl RouterFactory for ForwardFactory {
    fn expand(&self, route: &Route) -> Result<Vec<Box<dyn Router>>> {
        if !route.chain_nodes.is_empty() {
            return Err(RelayError::Config(format!(
                "route {} has a forwarding chain, which the built-in engine does not support",
                route
            )));
        }

        let mut routers: Vec<Box<dyn Router>> = Vec::with_capacity(route.serve_nodes.len());
        for raw in &route.serve_nodes {
            let node = Node::parse(raw)?;
            if let Some(forwarder) = self.forwarder(&node, route)? {
                routers.push(Box::new(forwarder));
            }
        }
        Ok(routers)
    }
}

fn acceptor_for(node: &Node) -> Result<tokio_rustls::TlsAcceptor> {
    match (node.param("cert"), node.param("key")) {
        (Some(cert), Some(key)) => TlsIdentity::load(Path::new(cert), Path::new(key))
            .and_then(|identity| identity.acceptor())
            .map_err(|e| RelayError::Config(format!("node {}: {}", node, e))),
        _ => tls::default_acceptor()
            .ok_or_else(|| RelayError::Config(format!("node {}: no default TLS identity", node))),
    }
}
