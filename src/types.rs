//! The set of valid values for FTP commands, plus the shared error type.

use std::error::Error;
use std::fmt;
use std::io;
use std::net::AddrParseError;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` describes what went wrong on the wire. The session layer
/// classifies it into the typed connect/list/transfer errors.
#[derive(Debug)]
pub enum FtpError {
    /// The control connection failed. The session cannot continue.
    ConnectionError(io::Error),
    /// The data connection could not be opened or broke mid-transfer.
    DataConnectionError(io::Error),
    /// TLS setup or handshake failed for a reason other than trust.
    SecureError(String),
    /// The trust policy refused the server's certificate chain.
    CertificateRejected(String),
    /// The server sent something that is not a well-formed reply.
    InvalidResponse(String),
    /// The server answered with a reply code the command does not accept.
    UnexpectedReply(Line),
    InvalidAddress(AddrParseError),
}

impl FtpError {
    /// The reply code behind an `UnexpectedReply`.
    pub fn reply_code(&self) -> Option<u32> {
        match *self {
            FtpError::UnexpectedReply(Line(code, _)) => Some(code),
            _ => None,
        }
    }

    /// True when the control connection is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(*self, FtpError::ConnectionError(_))
    }
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FtpError::ConnectionError(ref ioerr) => write!(f, "connection error: {}", ioerr),
            FtpError::DataConnectionError(ref ioerr) => write!(f, "data connection error: {}", ioerr),
            FtpError::SecureError(ref desc) => write!(f, "TLS error: {}", desc),
            FtpError::CertificateRejected(ref desc) => write!(f, "{}", desc),
            FtpError::InvalidResponse(ref desc) => write!(f, "invalid response: {}", desc),
            FtpError::UnexpectedReply(ref line) => write!(f, "{}", line),
            FtpError::InvalidAddress(ref perr) => write!(f, "invalid address: {}", perr),
        }
    }
}

impl Error for FtpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            FtpError::ConnectionError(ref err) | FtpError::DataConnectionError(ref err) => Some(err),
            FtpError::InvalidAddress(ref err) => Some(err),
            _ => None,
        }
    }
}

/// `Line` contains a reply code and the final line of the reply text,
/// without the trailing CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub u32, pub String);

impl Line {
    /// The reply text with the leading code stripped.
    pub fn text(&self) -> &str {
        self.1.get(4..).unwrap_or("").trim()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.1.trim_end())
    }
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// ASCII text, non-print format control
    Ascii,
    /// Image (binary)
    Binary,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FileType::Ascii => f.write_str("A N"),
            FileType::Binary => f.write_str("I"),
        }
    }
}

/// Data channel protection level used in the `PROT` command (RFC 4217).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionLevel {
    Clear,
    Private,
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProtectionLevel::Clear => f.write_str("C"),
            ProtectionLevel::Private => f.write_str("P"),
        }
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEntry {
    pub name: String,
    pub is_directory: bool,
}

impl RemoteEntry {
    pub fn file<S: Into<String>>(name: S) -> RemoteEntry {
        RemoteEntry { name: name.into(), is_directory: false }
    }

    pub fn directory<S: Into<String>>(name: S) -> RemoteEntry {
        RemoteEntry { name: name.into(), is_directory: true }
    }

    /// The name as a front-end shows it: directories carry a trailing `/`.
    pub fn display_name(&self) -> String {
        if self.is_directory {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}
