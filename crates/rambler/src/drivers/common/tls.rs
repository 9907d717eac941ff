//! Unified TLS configuration shared by every driver.
//!
//! Trust material is loaded once, while the driver factory runs, so that an
//! unreadable or malformed CA file is reported as a configuration error before
//! any connection is attempted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use rustls::ClientConfig;
use tracing::{info, warn};

use crate::config::Environment;
use crate::error::{MigrateError, Result};

/// SSL verification modes.
///
/// These modes match PostgreSQL's standard `sslmode` parameter and are mapped
/// onto the closest equivalent of each driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    #[default]
    Disable,
    /// Use SSL but don't verify server certificate.
    /// **Security Warning**: Vulnerable to man-in-the-middle attacks.
    Require,
    /// Verify server certificate against CA.
    /// Note: rustls and Tiberius always check the hostname as well, so for
    /// postgres and mssql this is the same behavior as `VerifyFull` in this
    /// implementation. Only mysql skips the hostname check.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" | "verify_identity" => Ok(SslMode::VerifyFull),
            other => Err(MigrateError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode requires TLS.
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Check if this mode verifies the server certificate.
    pub fn verifies_certificate(&self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }
}

/// Builder for driver TLS settings.
pub struct TlsBuilder {
    ssl_mode: SslMode,
    ca_cert: Option<PathBuf>,
}

impl TlsBuilder {
    /// Create a new TLS builder with the given SSL mode.
    pub fn new(ssl_mode: SslMode) -> Self {
        Self {
            ssl_mode,
            ca_cert: None,
        }
    }

    /// Create a TLS builder from a resolved environment.
    ///
    /// A configured CA file is read and parsed here, whatever the mode.
    pub fn from_env(env: &Environment) -> Result<Self> {
        let builder = Self::new(SslMode::parse(&env.ssl_mode)?);
        let builder = match &env.ca_cert {
            Some(path) => builder.with_ca_cert(path),
            None => builder,
        };
        builder.load_ca_pem()?;
        Ok(builder)
    }

    /// Trust the certificate authorities in the given PEM file.
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    pub fn ca_cert(&self) -> Option<&Path> {
        self.ca_cert.as_deref()
    }

    /// Read and validate the configured CA file.
    ///
    /// Returns the raw PEM content, or `None` when no CA is configured.
    pub fn load_ca_pem(&self) -> Result<Option<Vec<u8>>> {
        match &self.ca_cert {
            Some(path) => {
                let pem = read_pem(path)?;
                parse_certificates(path, &pem)?;
                Ok(Some(pem))
            }
            None => Ok(None),
        }
    }

    /// Build a rustls client configuration.
    ///
    /// The configured CA replaces the webpki roots when present.
    pub fn build_client_config(&self) -> Result<ClientConfig> {
        let config = match self.ssl_mode {
            SslMode::Disable => {
                return Err(MigrateError::Config(
                    "Cannot build TLS config for ssl_mode=disable".into(),
                ));
            }
            SslMode::Require => {
                warn!(
                    "SECURITY WARNING: ssl_mode=require enables TLS but does NOT verify the \
                     server certificate. This is vulnerable to man-in-the-middle attacks."
                );
                config_builder()?
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier))
                    .with_no_client_auth()
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                let roots = self.root_store()?;
                info!(
                    "ssl_mode={:?}: certificate and hostname verification enabled",
                    self.ssl_mode
                );
                config_builder()?
                    .with_root_certificates(roots)
                    .with_no_client_auth()
            }
        };

        Ok(config)
    }

    /// Build a connector for tokio-postgres. Returns None if TLS is disabled.
    #[cfg(feature = "postgres")]
    pub fn build_postgres(&self) -> Result<Option<tokio_postgres_rustls::MakeRustlsConnect>> {
        if !self.ssl_mode.requires_tls() {
            return Ok(None);
        }
        let config = self.build_client_config()?;
        Ok(Some(tokio_postgres_rustls::MakeRustlsConnect::new(config)))
    }

    fn root_store(&self) -> Result<rustls::RootCertStore> {
        let mut root_store = rustls::RootCertStore::empty();
        match &self.ca_cert {
            Some(path) => {
                let pem = read_pem(path)?;
                for cert in parse_certificates(path, &pem)? {
                    root_store.add(cert).map_err(|e| {
                        MigrateError::Tls(format!("rejected certificate in {}: {}", path.display(), e))
                    })?;
                }
            }
            None => {
                #[cfg(feature = "postgres")]
                root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }
        }
        Ok(root_store)
    }
}

/// Client config builder pinned to the ring provider.
fn config_builder() -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| MigrateError::Tls(format!("unsupported protocol versions: {}", e)))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        MigrateError::Tls(format!("cannot read CA certificate {}: {}", path.display(), e))
    })
}

fn parse_certificates(path: &Path, pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            MigrateError::Tls(format!("malformed PEM in {}: {}", path.display(), e))
        })?;
    if certs.is_empty() {
        return Err(MigrateError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Custom certificate verifier that accepts any certificate.
///
/// **SECURITY WARNING**: This bypasses all certificate validation.
/// Only use for `ssl_mode=require` where TLS encryption is desired
/// but certificate validation is not required.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
