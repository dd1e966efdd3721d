//! Router lifecycle
//!
//! Every router gets its own task running its serve loop. Tasks are never
//! stopped individually; the only way out is the shared shutdown token,
//! cancelled when the process exits.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{RelayError, Result};
use crate::route::Route;
use crate::router::{Router, RouterFactory};

/// Starts routers produced by a factory
pub struct RouterManager {
    factory: Arc<dyn RouterFactory>,
    shutdown: CancellationToken,
}

impl RouterManager {
    /// Create a manager over the given factory
    pub fn new(factory: Arc<dyn RouterFactory>) -> Self {
        Self {
            factory,
            shutdown: CancellationToken::new(),
        }
    }

    /// Expand all routes and start every resulting router
    ///
    /// Fails if any expansion fails or if nothing at all is left to serve.
    pub fn activate(&self, routes: &[Route]) -> Result<usize> {
        let mut routers = Vec::new();
        for route in routes {
            routers.extend(self.factory.expand(route)?);
        }

        if routers.is_empty() {
            return Err(RelayError::Activation("no routers to serve".to_string()));
        }

        let count = routers.len();
        self.launch(routers);
        Ok(count)
    }

    /// Start the routers of a single route, logging any failure
    pub fn activate_one(&self, route: &Route) {
        match route.expand(self.factory.as_ref()) {
            Ok(routers) => {
                info!("Activating {} router(s) for {}", routers.len(), route);
                self.launch(routers);
            }
            Err(e) => error!("Failed to activate {}: {}", route, e),
        }
    }

    /// Stop every running router
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn launch(&self, routers: Vec<Box<dyn Router>>) {
        for router in routers {
            let name = router.name().to_string();
            let token = self.shutdown.child_token();
            debug!("Starting router {}", name);

            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Router {} shutting down", name);
                    }
                    result = router.serve() => match result {
                        Ok(()) => info!("Router {} stopped", name),
                        Err(e) => error!("Router {} failed: {}", name, e),
                    }
                }
            });
        }
    }
}
