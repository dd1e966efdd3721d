//! Router abstraction
//!
//! The relay engine is consumed through two traits: a [`RouterFactory`]
//! turns a [`Route`] into live [`Router`]s, and each router runs its own
//! serve loop. The control plane never looks behind them.

use async_trait::async_trait;

use crate::error::Result;
use crate::route::Route;

/// A runnable listener produced from one route
#[async_trait]
pub trait Router: Send {
    /// Short label used in logs (usually the serve node)
    fn name(&self) -> &str;

    /// Run the serve loop. Only returns on fatal error or cancellation.
    async fn serve(self: Box<Self>) -> Result<()>;
}

/// Converts routes into routers
pub trait RouterFactory: Send + Sync {
    /// Expand a route into zero or more routers
    fn expand(&self, route: &Route) -> Result<Vec<Box<dyn Router>>>;
}
