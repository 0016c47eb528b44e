//! Server-side TLS setup.
use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use {rustls::ServerConfig, tracing::debug};

use crate::error::{Context, Error, Result};

/// Load a PEM certificate chain and private key into a rustls server config.
///
/// Without `key_path` the key is read from `cert_path`, which then holds
/// both as one combined PEM file.
pub fn server_config(cert_path: &Path, key_path: Option<&Path>) -> Result<Arc<ServerConfig>> {
    // Ensure a crypto provider is installed (ring via feature flag).
    let _ = rustls::crypto::ring::default_provider().install_default();
    let key_path = key_path.unwrap_or(cert_path);

    let cert_file = File::open(cert_path)
        .with_context(|| format!("open certificate {}", cert_path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("parse certificates in {}", cert_path.display()))?;
    if certs.is_empty() {
        return Err(Error::missing_pem("certificate", cert_path));
    }

    let key_file = File::open(key_path)
        .with_context(|| format!("open private key {}", key_path.display()))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .with_context(|| format!("parse private key in {}", key_path.display()))?
        .ok_or_else(|| Error::missing_pem("private key", key_path))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    debug!(cert = %cert_path.display(), key = %key_path.display(), "loaded TLS certificate");
    Ok(Arc::new(config))
}
