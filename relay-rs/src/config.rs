//! Configuration for relay-rs
//!
//! [`BaseConfig`] is the persisted inventory: a default route, the extra
//! routes added at runtime and the debug flag. [`ConfigStore`] owns the
//! live copy and serializes every mutation together with its write-back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::route::{is_zero, nodes_or_empty, Route};

/// Process-wide relay configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "ConfigFile", into = "ConfigFile")]
pub struct BaseConfig {
    /// Engine verbosity
    pub debug: bool,
    /// Route assembled from the command line (may be empty)
    pub route: Route,
    /// Additional routes, unique by identity
    pub routes: Vec<Route>,
}

/// On-disk layout: the default route's fields sit at the top level
#[derive(Deserialize, Serialize)]
struct ConfigFile {
    #[serde(
        rename = "ServeNodes",
        alias = "serveNodes",
        alias = "servenodes",
        alias = "serve_nodes",
        default,
        deserialize_with = "nodes_or_empty"
    )]
    serve_nodes: Vec<String>,
    #[serde(
        rename = "ChainNodes",
        alias = "chainNodes",
        alias = "chainnodes",
        alias = "chain_nodes",
        default,
        deserialize_with = "nodes_or_empty"
    )]
    chain_nodes: Vec<String>,
    #[serde(rename = "Retries", alias = "retries", default, skip_serializing_if = "is_zero")]
    retries: u32,
    #[serde(rename = "Routes", alias = "routes", default)]
    routes: Option<Vec<Route>>,
    #[serde(rename = "Debug", alias = "debug", default)]
    debug: bool,
}

impl From<ConfigFile> for BaseConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            debug: file.debug,
            route: Route {
                serve_nodes: file.serve_nodes,
                chain_nodes: file.chain_nodes,
                retries: file.retries,
            },
            routes: file.routes.unwrap_or_default(),
        }
    }
}

impl From<BaseConfig> for ConfigFile {
    fn from(config: BaseConfig) -> Self {
        Self {
            serve_nodes: config.route.serve_nodes,
            chain_nodes: config.route.chain_nodes,
            retries: config.route.retries,
            routes: Some(config.routes),
            debug: config.debug,
        }
    }
}

impl BaseConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            RelayError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Write the configuration back, overwriting the file in place
    pub async fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {}", path.display());
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// The default route followed by every configured route, skipping an
    /// empty default route
    pub fn all_routes(&self) -> Vec<Route> {
        let mut routes = Vec::with_capacity(self.routes.len() + 1);
        if !self.route.is_empty() {
            routes.push(self.route.clone());
        }
        routes.extend(self.routes.iter().cloned());
        routes
    }
}

/// Outcome of [`ConfigStore::add_route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Success,
    Duplicate,
}

/// Outcome of [`ConfigStore::delete_route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Success,
    NotFound,
}

impl AddOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddOutcome::Success => "success",
            AddOutcome::Duplicate => "duplicate",
        }
    }
}

impl DeleteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteOutcome::Success => "success",
            DeleteOutcome::NotFound => "not-found",
        }
    }
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of the live configuration and its backing file
///
/// All mutations take the same lock and keep it across the file write, so
/// concurrent add/delete requests are applied and persisted one at a time.
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Mutex<BaseConfig>,
}

impl ConfigStore {
    /// Create a store; without a path, mutations stay in memory
    pub fn new(config: BaseConfig, path: Option<PathBuf>) -> Self {
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    /// Copy of the current configuration
    pub async fn snapshot(&self) -> BaseConfig {
        self.config.lock().await.clone()
    }

    /// Copy of the current route list
    pub async fn routes(&self) -> Vec<Route> {
        self.config.lock().await.routes.clone()
    }

    /// Append a route unless one with the same identity exists
    pub async fn add_route(&self, route: Route) -> Result<AddOutcome> {
        let identity = route.identity()?.to_string();
        let mut config = self.config.lock().await;

        if config.routes.iter().any(|r| r.same_identity(&route)) {
            debug!("Route {} already configured", identity);
            return Ok(AddOutcome::Duplicate);
        }

        config.routes.push(route);
        if let Err(e) = self.persist(&config).await {
            config.routes.pop();
            return Err(e);
        }

        info!("Added route {}", identity);
        Ok(AddOutcome::Success)
    }

    /// Remove the first route matching the probe's identity
    pub async fn delete_route(&self, probe: &Route) -> Result<DeleteOutcome> {
        let identity = probe.identity()?;
        let mut config = self.config.lock().await;

        let Some(index) = config.routes.iter().position(|r| r.same_identity(probe)) else {
            debug!("Route {} not configured", identity);
            return Ok(DeleteOutcome::NotFound);
        };

        let removed = config.routes.remove(index);
        if let Err(e) = self.persist(&config).await {
            config.routes.insert(index, removed);
            return Err(e);
        }

        info!("Deleted route {}", identity);
        Ok(DeleteOutcome::Success)
    }

    async fn persist(&self, config: &BaseConfig) -> Result<()> {
        match &self.path {
            Some(path) => config.save(path).await.map_err(|e| {
                warn!("Failed to persist configuration to {}: {}", path.display(), e);
                e
            }),
            None => {
                debug!("No configuration file, keeping changes in memory");
                Ok(())
            }
        }
    }
}
