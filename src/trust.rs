//! Server certificate trust policies.
//!
//! A policy is consulted from inside the TLS handshake through an openssl
//! verify callback, so a rejected chain aborts the handshake before any
//! FTP command is sent over it.

use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVerifyMode};
use openssl::x509::X509StoreContextRef;
use std::fmt;
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::cert::{Certificate, CertificateLoader};
use super::event::{EventKind, SessionEventSink};
use super::types::{FtpError, Result};

/// Decides whether a presented server certificate chain is acceptable.
#[derive(Debug, Clone)]
pub enum TrustPolicy {
    /// Accept any chain. TLS still encrypts, but the server is not
    /// authenticated.
    AcceptAll,
    /// Accept only chains containing this exact certificate.
    PinnedCertificate(Certificate),
}

/// Outcome of evaluating a chain against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Accept,
    Reject(String),
}

/// Which kind of policy is in force, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustMode {
    AcceptAll,
    Pinned,
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TrustMode::AcceptAll => f.write_str("(Default Trust)"),
            TrustMode::Pinned => f.write_str("(Custom Certificate)"),
        }
    }
}

impl Default for TrustPolicy {
    fn default() -> TrustPolicy {
        TrustPolicy::AcceptAll
    }
}

impl TrustPolicy {
    /// Builds a pinned policy from a certificate file.
    pub fn pinned<P: AsRef<Path>>(path: P) -> ::std::result::Result<TrustPolicy, super::cert::CertError> {
        CertificateLoader::load(path).map(TrustPolicy::PinnedCertificate)
    }

    /// Builds the policy for a user-supplied certificate path. No path (or
    /// an empty one) means accept-all. A certificate that cannot be loaded
    /// also falls back to accept-all, and the sink is told why.
    pub fn from_certificate_path(path: Option<&Path>, sink: &dyn SessionEventSink) -> TrustPolicy {
        let path = match path {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return TrustPolicy::AcceptAll,
        };
        match TrustPolicy::pinned(path) {
            Ok(policy) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                sink.emit(EventKind::Info, format!("using custom certificate: {}", name));
                policy
            }
            Err(err) => {
                warn!("falling back to accept-all trust: {}", err);
                sink.emit(
                    EventKind::Error,
                    format!("certificate error: {} - falling back to accept-all trust", err),
                );
                TrustPolicy::AcceptAll
            }
        }
    }

    pub fn mode(&self) -> TrustMode {
        match *self {
            TrustPolicy::AcceptAll => TrustMode::AcceptAll,
            TrustPolicy::PinnedCertificate(_) => TrustMode::Pinned,
        }
    }

    /// Evaluates a presented chain, leaf first.
    pub fn evaluate(&self, presented_chain: &[Certificate]) -> TrustDecision {
        match *self {
            TrustPolicy::AcceptAll => TrustDecision::Accept,
            TrustPolicy::PinnedCertificate(ref pinned) => {
                if presented_chain.iter().any(|cert| cert == pinned) {
                    TrustDecision::Accept
                } else {
                    TrustDecision::Reject("server certificate not trusted".to_owned())
                }
            }
        }
    }

    /// Runs a TLS client handshake over `stream`, with this policy as the
    /// only certificate verifier. Hostname checks are off: a pinned policy
    /// already names the exact certificate, and accept-all accepts anything.
    pub(crate) fn handshake(&self, domain: &str, stream: TcpStream) -> Result<SslStream<TcpStream>> {
        let rejection: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|err| FtpError::SecureError(err.to_string()))?;
        let policy = self.clone();
        let slot = Arc::clone(&rejection);
        builder.set_verify_callback(SslVerifyMode::PEER, move |_preverified, ctx| {
            match policy.evaluate(&presented_chain(ctx)) {
                TrustDecision::Accept => true,
                TrustDecision::Reject(reason) => {
                    if let Ok(mut slot) = slot.lock() {
                        slot.get_or_insert(reason);
                    }
                    false
                }
            }
        });
        let connector = builder.build();

        let config = connector
            .configure()
            .map_err(|err| FtpError::SecureError(err.to_string()))?
            .verify_hostname(false);
        config.connect(domain, stream).map_err(|err| {
            match rejection.lock().ok().and_then(|mut slot| slot.take()) {
                Some(reason) => FtpError::CertificateRejected(reason),
                None => FtpError::SecureError(err.to_string()),
            }
        })
    }
}

/// The chain openssl assembled from what the server sent.
fn presented_chain(ctx: &X509StoreContextRef) -> Vec<Certificate> {
    match ctx.chain() {
        Some(chain) => chain.iter().filter_map(|cert| Certificate::from_x509(cert).ok()).collect(),
        None => ctx
            .current_cert()
            .and_then(|cert| Certificate::from_x509(cert).ok())
            .into_iter()
            .collect(),
    }
}
