//! TLS configuration from in-memory PEM material.
//!
//! Certificate and key arrive as strings through the configuration object
//! (they are distributed by the deployment's secret store, not the
//! filesystem), so everything here parses PEM out of byte slices and never
//! touches a path.

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::TlsMaterial;

/// TLS-related errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Failed to parse certificate: {0}")]
    CertificateParseFailed(String),

    #[error("Failed to parse private key: {0}")]
    PrivateKeyParseFailed(String),

    #[error("No certificates found in PEM material")]
    NoCertificatesFound,

    #[error("No private keys found in PEM material")]
    NoPrivateKeysFound,

    #[error("Multiple private keys found, expected one")]
    MultiplePrivateKeysFound,

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

/// Build a rustls server config from the supplied material.
pub fn build_server_config(
    material: &TlsMaterial,
) -> Result<ServerConfig, TlsError> {
    let cert_chain = parse_certificates(material.cert_pem.as_bytes())?;
    let private_key = parse_private_key(material.key_pem.as_bytes())?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    // Configure ALPN for HTTP/2 and HTTP/1.1
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

/// Acceptor configuration shared by every shard listener.
pub fn create_tls_acceptor(
    material: &TlsMaterial,
) -> Result<RustlsConfig, TlsError> {
    Ok(RustlsConfig::from_config(Arc::new(build_server_config(
        material,
    )?)))
}

fn parse_certificates(
    mut pem: &[u8],
) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateParseFailed(e.to_string()))?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificatesFound);
    }

    Ok(certs)
}

fn parse_private_key(
    pem: &[u8],
) -> Result<PrivateKeyDer<'static>, TlsError> {
    // Try PKCS#8 first.
    let mut reader = pem;
    let keys = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::PrivateKeyParseFailed(e.to_string()))?;

    if keys.len() > 1 {
        return Err(TlsError::MultiplePrivateKeysFound);
    }
    if let Some(key) = keys.into_iter().next() {
        return Ok(PrivateKeyDer::from(key));
    }

    // Fall back to the RSA private key format.
    let mut reader = pem;
    let keys = rustls_pemfile::rsa_private_keys(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::PrivateKeyParseFailed(e.to_string()))?;

    if keys.is_empty() {
        return Err(TlsError::NoPrivateKeysFound);
    }
    if keys.len() > 1 {
        return Err(TlsError::MultiplePrivateKeysFound);
    }

    Ok(PrivateKeyDer::from(
        keys.into_iter().next().expect("len checked above"),
    ))
}
