//! Route model
//!
//! A route is the declarative forwarding unit: an optional chain of
//! outbound hops plus one or more serve (listen) nodes. Node strings are
//! opaque here; only the router factory interprets them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{RelayError, Result};
use crate::router::{Router, RouterFactory};

/// A forwarding unit: chain hops and listen endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Route {
    /// Listen endpoints; the first entry is the route identity
    #[serde(
        rename = "ServeNodes",
        alias = "serveNodes",
        alias = "servenodes",
        alias = "serve_nodes",
        default,
        deserialize_with = "nodes_or_empty"
    )]
    pub serve_nodes: Vec<String>,
    /// Outbound hops, empty for direct serving
    #[serde(
        rename = "ChainNodes",
        alias = "chainNodes",
        alias = "chainnodes",
        alias = "chain_nodes",
        default,
        deserialize_with = "nodes_or_empty"
    )]
    pub chain_nodes: Vec<String>,
    /// Extra dial attempts per outbound connection
    #[serde(rename = "Retries", alias = "retries", default, skip_serializing_if = "is_zero")]
    pub retries: u32,
}

pub(crate) fn is_zero(n: &u32) -> bool {
    *n == 0
}

// Node lists written as `null` read back as empty.
pub(crate) fn nodes_or_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Route {
    /// Create a direct route with the given serve nodes
    pub fn new<I, S>(serve_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            serve_nodes: serve_nodes.into_iter().map(Into::into).collect(),
            chain_nodes: Vec::new(),
            retries: 0,
        }
    }

    /// Add chain nodes to the route
    pub fn with_chain<I, S>(mut self, chain_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain_nodes = chain_nodes.into_iter().map(Into::into).collect();
        self
    }

    /// The route identity: its first serve node
    pub fn identity(&self) -> Result<&str> {
        self.serve_nodes
            .first()
            .map(String::as_str)
            .ok_or_else(|| RelayError::Config("route has no serve nodes".to_string()))
    }

    /// True if both routes share the same identity
    pub fn same_identity(&self, other: &Route) -> bool {
        matches!((self.identity(), other.identity()), (Ok(a), Ok(b)) if a == b)
    }

    /// True if the route carries neither serve nor chain nodes
    pub fn is_empty(&self) -> bool {
        self.serve_nodes.is_empty() && self.chain_nodes.is_empty()
    }

    /// Expand the route into routers, rejecting an empty expansion
    pub fn expand(&self, factory: &dyn RouterFactory) -> Result<Vec<Box<dyn Router>>> {
        let routers = factory.expand(self)?;
        if routers.is_empty() {
            return Err(RelayError::Config(format!("route {} yields no routers", self)));
        }
        Ok(routers)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.serve_nodes.join(", "))?;
        if !self.chain_nodes.is_empty() {
            write!(f, " via [{}]", self.chain_nodes.join(" -> "))?;
        }
        Ok(())
    }
}
