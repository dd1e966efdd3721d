//! Node syntax
//!
//! `scheme://[user[:pass]@][host]:port[/remote][?key=value&...]`
//!
//! A scheme of the form `a+b` names a protocol and a transport; a single
//! name is used for both. Without `scheme://` the node is plain `tcp`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{RelayError, Result};

/// A parsed serve or chain node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub protocol: String,
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub remote: Option<String>,
    pub params: HashMap<String, String>,
    raw: String,
}

impl Node {
    /// Parse a node string
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(raw, "empty node"));
        }

        let (scheme, rest) = raw.split_once("://").unwrap_or(("tcp", raw));
        let scheme = scheme.to_ascii_lowercase();
        let (protocol, transport) = match scheme.split_once('+') {
            Some((protocol, transport)) => (protocol.to_string(), transport.to_string()),
            None => (scheme.clone(), scheme.clone()),
        };
        if protocol.is_empty() || transport.is_empty() {
            return Err(invalid(raw, "empty scheme"));
        }

        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, remote) = match rest.split_once('/') {
            Some((authority, remote)) if !remote.is_empty() => (authority, Some(remote.to_string())),
            Some((authority, _)) => (authority, None),
            None => (rest, None),
        };

        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };
        let (user, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(info.to_string()), None),
            },
            None => (None, None),
        };

        let (host, port) = hostport
            .rsplit_once(':')
            .ok_or_else(|| invalid(raw, "missing port"))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid(raw, "invalid port"))?;

        let params = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        Ok(Self {
            protocol,
            transport,
            host: host.to_string(),
            port,
            user,
            password,
            remote,
            params,
            raw: raw.to_string(),
        })
    }

    /// Address to bind or dial; an empty host means all interfaces
    pub fn addr(&self) -> String {
        if self.host.is_empty() {
            format!("0.0.0.0:{}", self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Look up a query parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The node as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Node {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(raw: &str, reason: &str) -> RelayError {
    RelayError::Config(format!("invalid node '{}': {}", raw, reason))
}
