//! Client-side TLS setup.
use std::{io::BufReader, path::Path, sync::Arc};

use {
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
    tokio::net::TcpStream,
    tokio_rustls::{TlsConnector, client::TlsStream},
    tracing::{debug, warn},
};

use crate::error::{Context, Result};

/// Build a client config trusting the system roots, plus the PEM
/// certificates in `extra_ca` if given.
pub fn client_config(extra_ca: Option<&Path>) -> Result<Arc<ClientConfig>> {
    // Ensure a crypto provider is installed (ring via feature flag).
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!(error = %e, "could not load some system root certificates");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded system root certificates");

    if let Some(path) = extra_ca {
        let pem = std::fs::read(path)
            .with_context(|| format!("read CA certificate {}", path.display()))?;
        for cert in rustls_pemfile::certs(&mut BufReader::new(pem.as_slice())) {
            roots.add(cert.context("parse CA certificate")?)?;
        }
        debug!(path = %path.display(), "loaded extra CA certificate");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Run the TLS handshake over an established TCP stream.
pub async fn connect(
    tcp: TcpStream,
    host: &str,
    config: Arc<ClientConfig>,
) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())?;
    let stream = TlsConnector::from(config).connect(server_name, tcp).await?;
    Ok(stream)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_file_is_reported() {
        let err = client_config(Some(Path::new("/nonexistent/ca.pem"))).unwrap_err();
        assert!(err.to_string().contains("ca.pem"), "{err}");
    }
}
