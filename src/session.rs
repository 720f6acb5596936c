//! The transfer session: one control connection, driven through
//! connect, login, passive mode and (for FTPS) data channel protection,
//! then used for listing and file transfers until disconnect.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

use super::event::{EventKind, SessionEventSink};
use super::ftp::FtpStream;
use super::listing;
use super::trust::{TrustMode, TrustPolicy};
use super::types::{FileType, FtpError, ProtectionLevel, RemoteEntry};

/// I/O bound applied to every socket operation unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Everything needed to open one session. Immutable once the session uses it.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    password: String,
    pub use_tls: bool,
    pub trust_policy: TrustPolicy,
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new<H, U, P>(host: H, port: u16, username: U, password: P) -> ConnectionConfig
    where
        H: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        ConnectionConfig {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            use_tls: false,
            trust_policy: TrustPolicy::AcceptAll,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> ConnectionConfig {
        self.use_tls = use_tls;
        self
    }

    pub fn with_trust_policy(mut self, trust_policy: TrustPolicy) -> ConnectionConfig {
        self.trust_policy = trust_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> ConnectionConfig {
        self.timeout = timeout;
        self
    }

    /// The port a front-end suggests: 21 for plain FTP, 990 for FTPS.
    pub fn default_port(use_tls: bool) -> u16 {
        if use_tls {
            990
        } else {
            21
        }
    }

    fn validate(&self) -> Result<(), ConnectError> {
        if self.host.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("host must not be empty".to_owned()));
        }
        if self.port == 0 {
            return Err(ConnectError::InvalidConfig("port must be between 1 and 65535".to_owned()));
        }
        if self.timeout == Duration::from_secs(0) {
            return Err(ConnectError::InvalidConfig("timeout must not be zero".to_owned()));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"****")
            .field("use_tls", &self.use_tls)
            .field("trust_policy", &self.trust_policy.mode())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    SecuringDataChannel,
    PlainReady,
    SecureReady,
    Listing,
    Transferring,
}

impl SessionState {
    pub fn is_ready(self) -> bool {
        matches!(self, SessionState::PlainReady | SessionState::SecureReady)
    }
}

/// What a caller shows once a session is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub trust: TrustMode,
    pub tls_version: Option<String>,
    pub greeting: String,
    pub connected_at: DateTime<Utc>,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.secure {
            write!(
                f,
                "SECURE CONNECTION - Encrypted ({}) {}",
                self.tls_version.as_deref().unwrap_or("TLS"),
                self.trust
            )
        } else {
            f.write_str("INSECURE CONNECTION - Plain FTP (NOT ENCRYPTED)")
        }
    }
}

/// A plain or FTPS session. Operations run on the calling thread and must
/// not overlap; `SessionWorker` provides the serialized, off-thread form.
pub struct TransferSession {
    sink: Arc<dyn SessionEventSink>,
    stream: Option<FtpStream>,
    status: Option<SessionStatus>,
    state: SessionState,
}

impl TransferSession {
    pub fn new(sink: Arc<dyn SessionEventSink>) -> TransferSession {
        TransferSession {
            sink,
            stream: None,
            status: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The status of the current session, if one is established.
    pub fn status(&self) -> Option<&SessionStatus> {
        self.status.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Establishes a new session, tearing down any existing one first.
    pub fn connect(&mut self, config: ConnectionConfig) -> Result<SessionStatus, ConnectError> {
        if self.stream.is_some() {
            self.disconnect();
        }
        if let Err(err) = config.validate() {
            return Err(self.abort_connect(None, err));
        }

        self.state = SessionState::Connecting;
        info!("connecting to {}:{} (tls: {})", config.host, config.port, config.use_tls);
        self.sink.emit(EventKind::Info, format!("connecting to {}", config.host));
        if config.use_tls {
            self.sink.emit(EventKind::Secure, "AUTH TLS - initiating secure handshake".to_owned());
        } else {
            self.sink.emit(EventKind::Insecure, "plain FTP - no encryption".to_owned());
        }

        let stream = match FtpStream::connect(&config.host, config.port, config.timeout) {
            Ok(stream) => stream,
            Err(FtpError::UnexpectedReply(line)) => {
                return Err(self.abort_connect(None, ConnectError::ProtocolRejected(line.to_string())))
            }
            Err(err) => return Err(self.abort_connect(None, ConnectError::NetworkUnreachable(err.to_string()))),
        };
        let greeting = stream.greeting().text().to_owned();
        self.sink.emit(
            EventKind::Info,
            format!(
                "connected to {}:{} ({}): {}",
                config.host,
                config.port,
                if config.use_tls { "FTPS" } else { "Plain FTP" },
                greeting
            ),
        );

        let mut stream = if config.use_tls {
            match stream.into_secure(&config.trust_policy, &config.host) {
                Ok(stream) => stream,
                Err(err) => {
                    let err = match err {
                        FtpError::UnexpectedReply(line) => {
                            ConnectError::ProtocolRejected(format!("AUTH TLS refused: {}", line))
                        }
                        FtpError::CertificateRejected(reason) => ConnectError::TlsRejected(reason),
                        FtpError::SecureError(desc) => ConnectError::TlsRejected(desc),
                        other => ConnectError::NetworkUnreachable(other.to_string()),
                    };
                    return Err(self.abort_connect(None, err));
                }
            }
        } else {
            stream
        };
        if config.use_tls {
            let version = stream.tls_version().unwrap_or("TLS");
            match config.trust_policy {
                TrustPolicy::PinnedCertificate(ref cert) => self.sink.emit(
                    EventKind::Secure,
                    format!("TLS handshake complete ({}) - server certificate matches pinned {}", version, cert.subject()),
                ),
                TrustPolicy::AcceptAll => self.sink.emit(
                    EventKind::Insecure,
                    format!("TLS handshake complete ({}) - server certificate NOT verified (accept-all)", version),
                ),
            }
        }

        self.state = SessionState::Authenticating;
        if let Err(err) = stream.login(&config.username, &config.password) {
            let err = match err {
                FtpError::UnexpectedReply(line) => ConnectError::LoginFailed(line.to_string()),
                other => ConnectError::NetworkUnreachable(other.to_string()),
            };
            return Err(self.abort_connect(Some(stream), err));
        }
        self.sink.emit(EventKind::Info, "login successful".to_owned());

        match stream.transfer_type(FileType::Binary) {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                return Err(self.abort_connect(Some(stream), ConnectError::NetworkUnreachable(err.to_string())))
            }
            Err(err) => self.sink.emit(EventKind::Error, format!("TYPE I refused: {}", err)),
        }

        self.sink.emit(EventKind::Info, "PASV - entering passive mode".to_owned());
        if let Err(err) = stream.pasv() {
            let err = if err.is_fatal() {
                ConnectError::NetworkUnreachable(err.to_string())
            } else {
                ConnectError::PassiveModeFailed(err.to_string())
            };
            return Err(self.abort_connect(Some(stream), err));
        }

        if config.use_tls {
            self.state = SessionState::SecuringDataChannel;
            let negotiated = stream
                .pbsz(0)
                .map(|_| self.sink.emit(EventKind::Secure, "PBSZ 0 - setting up secure data channel".to_owned()))
                .and_then(|_| stream.prot(ProtectionLevel::Private))
                .map(|_| self.sink.emit(EventKind::Secure, "PROT P - data channel encryption enabled".to_owned()));
            if let Err(err) = negotiated {
                let err = if err.is_fatal() {
                    ConnectError::NetworkUnreachable(err.to_string())
                } else {
                    ConnectError::ProtectionNegotiationFailed(err.to_string())
                };
                return Err(self.abort_connect(Some(stream), err));
            }
        }

        let status = SessionStatus {
            host: config.host.clone(),
            port: config.port,
            secure: config.use_tls,
            trust: config.trust_policy.mode(),
            tls_version: stream.tls_version().map(str::to_owned),
            greeting,
            connected_at: Utc::now(),
        };
        if status.secure {
            self.state = SessionState::SecureReady;
            self.sink.emit(EventKind::Secure, format!("session ready - encrypted {}", status.trust));
        } else {
            self.state = SessionState::PlainReady;
            self.sink.emit(EventKind::Insecure, "session ready - NOT encrypted".to_owned());
        }
        self.stream = Some(stream);
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Logs out and closes the connection. Never fails; problems on the way
    /// out are reported as events only.
    pub fn disconnect(&mut self) {
        self.status = None;
        self.state = SessionState::Disconnected;
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.quit() {
                self.sink.emit(EventKind::Error, format!("disconnect error: {}", err));
            }
            stream.close();
            info!("session closed");
            self.sink.emit(EventKind::Info, "disconnected".to_owned());
        }
    }

    /// Lists the current remote directory. LIST is tried first; if it fails,
    /// NLST names are returned as plain files.
    pub fn list(&mut self) -> Result<Vec<RemoteEntry>, ListError> {
        let ready = match self.ready_state() {
            Some(state) => state,
            None => {
                self.sink.emit(EventKind::Error, format!("list failed: {}", ListError::NotConnected));
                return Err(ListError::NotConnected);
            }
        };
        self.state = SessionState::Listing;

        let detailed = match self.stream.as_mut() {
            Some(stream) => stream.list(None),
            None => return Err(ListError::NotConnected),
        };
        let result = match detailed {
            Ok(lines) => {
                let entries = listing::parse_listing(&lines);
                self.sink.emit(EventKind::Info, format!("LIST - retrieved {} entries", entries.len()));
                Ok(entries)
            }
            Err(err) if err.is_fatal() => Err(ListError::ConnectionLost(err.to_string())),
            Err(err) => {
                warn!("LIST failed, falling back to NLST: {}", err);
                self.sink.emit(EventKind::Error, format!("LIST failed, trying NLST: {}", err));
                let names = match self.stream.as_mut() {
                    Some(stream) => stream.nlst(None),
                    None => return Err(ListError::NotConnected),
                };
                match names {
                    Ok(names) => {
                        self.sink.emit(EventKind::Info, format!("NLST - retrieved {} names", names.len()));
                        Ok(names.into_iter().map(|name| RemoteEntry::file(name.trim())).collect())
                    }
                    Err(err) if err.is_fatal() => Err(ListError::ConnectionLost(err.to_string())),
                    Err(err) => Err(ListError::ListingFailed(err.to_string())),
                }
            }
        };

        match result {
            Ok(entries) => {
                self.state = ready;
                Ok(entries)
            }
            Err(err) => {
                self.sink.emit(EventKind::Error, format!("list failed: {}", err));
                if let ListError::ConnectionLost(_) = err {
                    self.teardown();
                } else {
                    self.state = ready;
                }
                Err(err)
            }
        }
    }

    /// Stores the local file at `local_path` on the server as `remote_name`.
    /// Only regular files are sent.
    pub fn upload<P: AsRef<Path>>(&mut self, local_path: P, remote_name: &str) -> Result<u64, TransferError> {
        let ready = match self.ready_state() {
            Some(state) => state,
            None => return Err(self.transfer_failed("upload", None, TransferError::NotConnected)),
        };
        match open_regular_file(local_path.as_ref()) {
            Ok(file) => self.upload_from(file, remote_name),
            Err(err) => Err(self.transfer_failed("upload", Some(ready), TransferError::LocalReadError(err))),
        }
    }

    /// Stores everything `reader` yields on the server as `remote_name`.
    ///
    /// The first chunk is read before `STOR` is sent, so a source that
    /// cannot be read at all never touches the remote file. A read error
    /// later on resets the data connection, and the server discards the
    /// partial upload instead of committing it.
    pub fn upload_from<R: Read>(&mut self, mut reader: R, remote_name: &str) -> Result<u64, TransferError> {
        let ready = match self.ready_state() {
            Some(state) => state,
            None => return Err(self.transfer_failed("upload", None, TransferError::NotConnected)),
        };
        let mut head = [0u8; COPY_BUFFER_SIZE];
        let head_len = match read_chunk(&mut reader, &mut head) {
            Ok(n) => n,
            Err(err) => return Err(self.transfer_failed("upload", Some(ready), TransferError::LocalReadError(err))),
        };

        self.state = SessionState::Transferring;
        self.sink.emit(EventKind::Info, format!("STOR {} - uploading", remote_name));
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(self.transfer_failed("upload", None, TransferError::NotConnected)),
        };

        let result = match stream.put_with_stream(remote_name) {
            Ok(mut data) => {
                let copied = data
                    .write_all(&head[..head_len])
                    .map_err(CopyError::Write)
                    .and_then(|_| copy_tracked(&mut reader, &mut data));
                match copied {
                    Ok(bytes) => stream
                        .finalize_put_stream(data)
                        .map(|_| bytes + head_len as u64)
                        .map_err(TransferError::from),
                    Err(err) => {
                        let err = match err {
                            CopyError::Read(err) => TransferError::LocalReadError(err),
                            CopyError::Write(err) => TransferError::DataChannel(err.to_string()),
                        };
                        match stream.abort_put_stream(data) {
                            Err(lost) if lost.is_fatal() => Err(TransferError::from(lost)),
                            Err(other) => {
                                debug!("no reply to the aborted upload: {}", other);
                                Err(err)
                            }
                            Ok(reply) => {
                                debug!("aborted upload answered with: {}", reply);
                                Err(err)
                            }
                        }
                    }
                }
            }
            Err(err) => Err(TransferError::from(err)),
        };

        match result {
            Ok(bytes) => {
                self.state = ready;
                self.sink.emit(EventKind::Info, format!("upload completed: {} ({} bytes)", remote_name, bytes));
                Ok(bytes)
            }
            Err(err) => Err(self.transfer_failed("upload", Some(ready), err)),
        }
    }

    /// Retrieves `remote_name` into the local file at `local_path`.
    ///
    /// The data is written to a temporary file next to `local_path`, which
    /// replaces the target only once the server has confirmed the transfer.
    /// A failed download leaves any existing local file untouched.
    pub fn download<P: AsRef<Path>>(&mut self, remote_name: &str, local_path: P) -> Result<u64, TransferError> {
        let ready = match self.ready_state() {
            Some(state) => state,
            None => return Err(self.transfer_failed("download", None, TransferError::NotConnected)),
        };
        if remote_name.ends_with('/') {
            let err = TransferError::RemoteRejected(format!("{} is a directory", remote_name));
            return Err(self.transfer_failed("download", Some(ready), err));
        }
        let local_path = local_path.as_ref();
        let mut partial = match partial_file_for(local_path) {
            Ok(file) => file,
            Err(err) => return Err(self.transfer_failed("download", Some(ready), TransferError::LocalWriteError(err))),
        };

        self.state = SessionState::Transferring;
        self.sink.emit(EventKind::Info, format!("RETR {} - downloading", remote_name));
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(self.transfer_failed("download", None, TransferError::NotConnected)),
        };

        let result = match stream.retr_as_stream(remote_name) {
            Ok(mut data) => match copy_tracked(&mut data, partial.as_file_mut()) {
                Ok(bytes) => stream.finalize_retr_stream(data).map(|_| bytes).map_err(TransferError::from),
                Err(err) => {
                    let err = match err {
                        CopyError::Read(err) => TransferError::DataChannel(err.to_string()),
                        CopyError::Write(err) => TransferError::LocalWriteError(err),
                    };
                    match stream.finalize_retr_stream(data) {
                        Err(lost) if lost.is_fatal() => Err(TransferError::from(lost)),
                        _ => Err(err),
                    }
                }
            },
            Err(err) => Err(TransferError::from(err)),
        };
        // Dropping `partial` on any error path removes the temporary file.
        let result = result.and_then(|bytes| {
            partial.as_file_mut().flush().map_err(TransferError::LocalWriteError)?;
            partial
                .persist(local_path)
                .map(|_| bytes)
                .map_err(|err| TransferError::LocalWriteError(err.error))
        });

        match result {
            Ok(bytes) => {
                self.state = ready;
                self.sink.emit(EventKind::Info, format!("download completed: {} ({} bytes)", remote_name, bytes));
                Ok(bytes)
            }
            Err(err) => Err(self.transfer_failed("download", Some(ready), err)),
        }
    }

    fn ready_state(&self) -> Option<SessionState> {
        match self.stream {
            Some(_) if self.state.is_ready() => Some(self.state),
            _ => None,
        }
    }

    /// Reports a failed connect, closes whatever was opened and resets the
    /// session.
    fn abort_connect(&mut self, stream: Option<FtpStream>, err: ConnectError) -> ConnectError {
        if let Some(stream) = stream {
            stream.close();
        }
        self.teardown();
        warn!("connect failed: {}", err);
        self.sink.emit(EventKind::Error, format!("connect failed: {}", err));
        err
    }

    /// Reports a failed transfer. A lost control connection ends the
    /// session; anything else leaves it in `ready` (when there was one).
    fn transfer_failed(&mut self, op: &str, ready: Option<SessionState>, err: TransferError) -> TransferError {
        self.sink.emit(EventKind::Error, format!("{} failed: {}", op, err));
        match (ready, &err) {
            (_, TransferError::ConnectionLost(_)) => self.teardown(),
            (Some(state), _) => self.state = state,
            (None, _) => {}
        }
        err
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        self.status = None;
        self.state = SessionState::Disconnected;
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Opens `path` for reading, refusing directories and other non-files.
fn open_regular_file(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(file)
}

/// A temporary file in the same directory as `target`, so it can be
/// renamed over it.
fn partial_file_for(target: &Path) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tempfile::Builder::new().prefix(".ftps-partial-").tempfile_in(dir)
}

/// Reads once into `buf`, retrying on interruption.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// `io::copy`, but remembering which side failed.
fn copy_tracked<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64, CopyError> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyError::Read(err)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
    }
}

/// Why `connect` failed. The session is `Disconnected` afterwards.
#[derive(Debug)]
pub enum ConnectError {
    /// The host, port or timeout is unusable.
    InvalidConfig(String),
    /// The transport could not be opened, or stalled past the timeout.
    NetworkUnreachable(String),
    /// The server's greeting (or its answer to AUTH TLS) was negative.
    ProtocolRejected(String),
    /// The TLS handshake failed, typically because the trust policy
    /// refused the server certificate.
    TlsRejected(String),
    LoginFailed(String),
    PassiveModeFailed(String),
    ProtectionNegotiationFailed(String),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConnectError::InvalidConfig(ref desc) => write!(f, "invalid configuration: {}", desc),
            ConnectError::NetworkUnreachable(ref desc) => write!(f, "network unreachable: {}", desc),
            ConnectError::ProtocolRejected(ref desc) => write!(f, "server rejected the connection: {}", desc),
            ConnectError::TlsRejected(ref desc) => write!(f, "TLS rejected: {}", desc),
            ConnectError::LoginFailed(ref desc) => write!(f, "login failed: {}", desc),
            ConnectError::PassiveModeFailed(ref desc) => write!(f, "passive mode failed: {}", desc),
            ConnectError::ProtectionNegotiationFailed(ref desc) => {
                write!(f, "protection negotiation failed: {}", desc)
            }
        }
    }
}

impl Error for ConnectError {}

#[derive(Debug)]
pub enum ListError {
    NotConnected,
    /// Both LIST and the NLST fallback were refused.
    ListingFailed(String),
    /// The control connection broke; the session has been closed.
    ConnectionLost(String),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ListError::NotConnected => f.write_str("not connected"),
            ListError::ListingFailed(ref desc) => write!(f, "listing failed: {}", desc),
            ListError::ConnectionLost(ref desc) => write!(f, "connection lost: {}", desc),
        }
    }
}

impl Error for ListError {}

#[derive(Debug)]
pub enum TransferError {
    NotConnected,
    LocalReadError(io::Error),
    LocalWriteError(io::Error),
    /// The server refused the STOR or RETR.
    RemoteRejected(String),
    /// The data connection could not be opened or broke mid-transfer.
    DataChannel(String),
    /// The control connection broke; the session has been closed.
    ConnectionLost(String),
}

impl From<FtpError> for TransferError {
    fn from(err: FtpError) -> TransferError {
        match err {
            FtpError::UnexpectedReply(line) => TransferError::RemoteRejected(line.to_string()),
            FtpError::ConnectionError(err) => TransferError::ConnectionLost(err.to_string()),
            other => TransferError::DataChannel(other.to_string()),
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransferError::NotConnected => f.write_str("not connected"),
            TransferError::LocalReadError(ref err) => write!(f, "cannot read local file: {}", err),
            TransferError::LocalWriteError(ref err) => write!(f, "cannot write local file: {}", err),
            TransferError::RemoteRejected(ref desc) => write!(f, "server refused the transfer: {}", desc),
            TransferError::DataChannel(ref desc) => write!(f, "data channel error: {}", desc),
            TransferError::ConnectionLost(ref desc) => write!(f, "connection lost: {}", desc),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TransferError::LocalReadError(ref err) | TransferError::LocalWriteError(ref err) => Some(err),
            _ => None,
        }
    }
}
