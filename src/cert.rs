//! Loading the certificate a pinned trust policy compares against.

use openssl::nid::Nid;
use openssl::x509::{X509, X509Ref};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// An immutable X.509 certificate. Two certificates are equal when their
/// DER encodings are byte-for-byte identical.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
}

impl Certificate {
    /// Parses a single DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Certificate, CertError> {
        let x509 = X509::from_der(der).map_err(|err| CertError::CertParseError(err.to_string()))?;
        Certificate::from_x509(&x509).map_err(|err| CertError::CertParseError(err.to_string()))
    }

    /// Parses a PEM document holding exactly one certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Certificate, CertError> {
        let mut stack = X509::stack_from_pem(pem).map_err(|err| CertError::CertParseError(err.to_string()))?;
        match stack.len() {
            0 => Err(CertError::CertParseError("no certificate found in PEM data".to_owned())),
            1 => {
                let x509 = stack.remove(0);
                Certificate::from_x509(&x509).map_err(|err| CertError::CertParseError(err.to_string()))
            }
            n => Err(CertError::CertParseError(format!("expected a single certificate, found {}", n))),
        }
    }

    pub(crate) fn from_x509(x509: &X509Ref) -> Result<Certificate, openssl::error::ErrorStack> {
        Ok(Certificate {
            der: x509.to_der()?,
            subject: subject_of(x509),
        })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// The subject common name, or an empty string when there is none.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("der_len", &self.der.len())
            .finish()
    }
}

fn subject_of(x509: &X509Ref) -> String {
    x509.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|cn| cn.to_string())
        .unwrap_or_default()
}

/// Reads certificate files in PEM or DER form, whatever their extension.
pub struct CertificateLoader;

impl CertificateLoader {
    /// Loads the single certificate stored at `path`. Never logs; the caller
    /// decides how a failure is surfaced.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Certificate, CertError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CertError::CertNotFound(
                path.to_path_buf(),
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            ));
        }
        let bytes = fs::read(path).map_err(|err| CertError::CertNotFound(path.to_path_buf(), err))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(CertError::CertParseError(format!("{} is empty", path.display())));
        }

        if contains(&bytes, PEM_MARKER) {
            Certificate::from_pem(&bytes)
        } else {
            Certificate::from_der(&bytes)
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Why a certificate file could not be turned into a `Certificate`.
#[derive(Debug)]
pub enum CertError {
    /// The path is missing, not a regular file, or unreadable.
    CertNotFound(PathBuf, io::Error),
    /// The content is not a single X.509 certificate.
    CertParseError(String),
}

impl fmt::Display for CertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CertError::CertNotFound(ref path, ref err) => {
                write!(f, "certificate file not found: {} ({})", path.display(), err)
            }
            CertError::CertParseError(ref desc) => write!(f, "certificate could not be parsed: {}", desc),
        }
    }
}

impl Error for CertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            CertError::CertNotFound(_, ref err) => Some(err),
            CertError::CertParseError(_) => None,
        }
    }
}
