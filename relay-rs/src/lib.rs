//! relay-rs: control plane for a proxy/relay process
//!
//! Turns declarative routes (a forwarding chain plus listen endpoints) into
//! live listeners, keeps the route inventory in a JSON file and lets routes
//! be added or removed at runtime over HTTP.
//!
//! # Features
//!
//! - Route inventory persisted on every change
//! - One task per router, started at boot or on `POST /add`
//! - Process-wide TLS identity, loaded from files or self-signed
//! - Pluggable engine behind the [`RouterFactory`] trait
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "ServeNodes": ["tcp://:8080/127.0.0.1:80"],
//!   "ChainNodes": [],
//!   "Routes": [
//!     { "ServeNodes": ["tls://:8443/127.0.0.1:80"], "ChainNodes": [] }
//!   ],
//!   "Debug": false
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod route;
pub mod router;
pub mod tls;

pub use api::ControlApi;
pub use config::{AddOutcome, BaseConfig, ConfigStore, DeleteOutcome};
pub use error::{RelayError, Result};
pub use lifecycle::RouterManager;
pub use route::Route;
pub use router::{Router, RouterFactory};
pub use tls::TlsIdentity;
