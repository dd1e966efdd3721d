//! TLS identity bootstrap
//!
//! The process holds one default identity, loaded from PEM files or
//! generated as a self-signed certificate, which every TLS-capable router
//! picks up implicitly.

use rustls::{Certificate, PrivateKey, ServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use crate::error::{RelayError, Result};

/// Default certificate file, relative to the working directory
pub const DEFAULT_CERT_FILE: &str = "cert.pem";
/// Default private key file, relative to the working directory
pub const DEFAULT_KEY_FILE: &str = "key.pem";

static DEFAULT_TLS_CONFIG: OnceLock<Arc<ServerConfig>> = OnceLock::new();

/// Where an identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Loaded from certificate and key files
    Files,
    /// Generated in memory
    SelfSigned,
}

/// Certificate chain plus private key
#[derive(Debug, Clone)]
pub struct TlsIdentity {
    certs: Vec<Certificate>,
    key: PrivateKey,
    source: IdentitySource,
}

impl TlsIdentity {
    /// Load certificates and key from PEM files
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_pem = std::fs::read(cert_path)
            .map_err(|e| RelayError::Tls(format!("Failed to open certificate file: {}", e)))?;
        let certs_der = certs(&mut cert_pem.as_slice())
            .map_err(|e| RelayError::Tls(format!("Failed to read certificates: {}", e)))?;

        if certs_der.is_empty() {
            return Err(RelayError::Tls("No certificates found in file".to_string()));
        }

        let key_pem = std::fs::read(key_path)
            .map_err(|e| RelayError::Tls(format!("Failed to open key file: {}", e)))?;
        let key = read_private_key(&key_pem)?;

        let identity = Self {
            certs: certs_der.into_iter().map(Certificate).collect(),
            key,
            source: IdentitySource::Files,
        };
        // rustls rejects keys it cannot use
        identity.server_config()?;
        Ok(identity)
    }

    /// Generate a self-signed certificate for the given names
    pub fn self_signed(names: Vec<String>) -> Result<Self> {
        let cert = rcgen::generate_simple_self_signed(names)
            .map_err(|e| RelayError::Bootstrap(format!("Failed to generate self-signed cert: {}", e)))?;

        Ok(Self {
            certs: vec![Certificate(cert.cert.der().to_vec())],
            key: PrivateKey(cert.key_pair.serialize_der()),
            source: IdentitySource::SelfSigned,
        })
    }

    /// Load from files, falling back to a fresh self-signed certificate
    ///
    /// Only a failure to generate the fallback is an error.
    pub fn resolve(cert_path: &Path, key_path: &Path) -> Result<Self> {
        match Self::load(cert_path, key_path) {
            Ok(identity) => {
                info!(
                    "Loaded TLS certificate from {} and {}",
                    cert_path.display(),
                    key_path.display()
                );
                Ok(identity)
            }
            Err(e) => {
                warn!("{}, generating self-signed certificate", e);
                Self::self_signed(vec!["localhost".to_string()])
            }
        }
    }

    /// Where this identity came from
    pub fn source(&self) -> IdentitySource {
        self.source
    }

    /// Build a rustls server config
    pub fn server_config(&self) -> Result<ServerConfig> {
        ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(self.certs.clone(), self.key.clone())
            .map_err(|e| RelayError::Tls(format!("TLS config error: {}", e)))
    }

    /// Build a TLS acceptor
    pub fn acceptor(&self) -> Result<TlsAcceptor> {
        Ok(TlsAcceptor::from(Arc::new(self.server_config()?)))
    }

    /// Install as the process-wide default. The first install wins.
    pub fn install_default(&self) -> Result<()> {
        let config = Arc::new(self.server_config()?);
        if DEFAULT_TLS_CONFIG.set(config).is_err() {
            warn!("Default TLS identity already installed, keeping the existing one");
        }
        Ok(())
    }
}

/// Acceptor for the process-wide default identity, if one was installed
pub fn default_acceptor() -> Option<TlsAcceptor> {
    DEFAULT_TLS_CONFIG.get().cloned().map(TlsAcceptor::from)
}

/// PKCS#8 first, then RSA
fn read_private_key(pem: &[u8]) -> Result<PrivateKey> {
    let keys = pkcs8_private_keys(&mut &pem[..])
        .map_err(|e| RelayError::Tls(format!("Failed to read PKCS8 keys: {}", e)))?;
    if let Some(key) = keys.into_iter().next() {
        return Ok(PrivateKey(key));
    }

    let keys = rsa_private_keys(&mut &pem[..])
        .map_err(|e| RelayError::Tls(format!("Failed to read RSA keys: {}", e)))?;
    keys.into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| RelayError::Tls("No private key found in file".to_string()))
}
