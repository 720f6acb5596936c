//! FTP module: the control connection and the commands the session uses.

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;

use super::data_stream::DataStream;
use super::status;
use super::trust::TrustPolicy;
use super::types::{FileType, FtpError, Line, ProtectionLevel, Result};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();
}

/// TLS settings remembered after `AUTH TLS`, reused for every protected
/// data connection.
#[derive(Debug, Clone)]
struct SecureContext {
    policy: TrustPolicy,
    domain: String,
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
#[derive(Debug)]
pub struct FtpStream {
    reader: BufReader<DataStream>,
    greeting: Line,
    timeout: Duration,
    secure: Option<SecureContext>,
    data_protection: ProtectionLevel,
}

impl FtpStream {
    /// Opens the control connection and reads the server greeting. Any 2xx
    /// greeting is accepted; anything else is an `UnexpectedReply`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<FtpStream> {
        let stream = connect_timeout((host, port), timeout).map_err(FtpError::ConnectionError)?;
        let mut ftp_stream = FtpStream {
            reader: BufReader::new(DataStream::Tcp(stream)),
            greeting: Line(0, String::new()),
            timeout,
            secure: None,
            data_protection: ProtectionLevel::Clear,
        };
        let greeting = ftp_stream.read_reply()?;
        if !status::is_positive_completion(greeting.0) {
            return Err(FtpError::UnexpectedReply(greeting));
        }
        ftp_stream.greeting = greeting;
        Ok(ftp_stream)
    }

    /// The reply the server greeted us with.
    pub fn greeting(&self) -> &Line {
        &self.greeting
    }

    /// Test if the control connection is secured
    pub fn is_secure(&self) -> bool {
        self.reader.get_ref().is_ssl()
    }

    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref().get_ref()
    }

    /// Switch the control connection to TLS with `AUTH TLS`, verifying the
    /// server with `policy`. On failure the connection is dropped.
    pub fn into_secure(mut self, policy: &TrustPolicy, domain: &str) -> Result<FtpStream> {
        if self.is_secure() {
            return Ok(self);
        }
        // Ask the server to start securing data.
        self.write_str("AUTH TLS\r\n")?;
        self.read_response(status::AUTH_OK)?;

        let FtpStream { reader, greeting, timeout, .. } = self;
        let tcp = match reader.into_inner() {
            DataStream::Tcp(stream) => stream,
            DataStream::Ssl(_) => return Err(FtpError::SecureError("connection is already secured".to_owned())),
        };
        let stream = policy.handshake(domain, tcp)?;
        debug!("control connection secured with {}", stream.ssl().version_str());

        Ok(FtpStream {
            reader: BufReader::new(DataStream::Ssl(Box::new(stream))),
            greeting,
            timeout,
            secure: Some(SecureContext {
                policy: policy.clone(),
                domain: domain.to_owned(),
            }),
            data_protection: ProtectionLevel::Clear,
        })
    }

    /// The TLS protocol version of a secured control connection.
    pub fn tls_version(&self) -> Option<&'static str> {
        match *self.reader.get_ref() {
            DataStream::Ssl(ref stream) => Some(stream.ssl().version_str()),
            DataStream::Tcp(_) => None,
        }
    }

    /// Set protection buffer size
    pub fn pbsz(&mut self, size: usize) -> Result<()> {
        self.write_str(format!("PBSZ {}\r\n", size))?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// Change the level of data protection. `Private` requires a secured
    /// control connection.
    pub fn prot(&mut self, level: ProtectionLevel) -> Result<()> {
        if level == ProtectionLevel::Private && self.secure.is_none() {
            return Err(FtpError::SecureError("PROT P requires AUTH TLS first".to_owned()));
        }
        self.write_str(format!("PROT {}\r\n", level))?;
        self.read_response(status::COMMAND_OK)?;
        self.data_protection = level;
        Ok(())
    }

    /// Whether data connections are wrapped in TLS.
    pub fn data_protection(&self) -> ProtectionLevel {
        self.data_protection
    }

    /// Log in to the FTP server.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.write_str(format!("USER {}\r\n", user))?;
        let Line(code, _) = self.read_response_in(&[status::LOGGED_IN, status::NEED_PASSWORD])?;
        if code == status::NEED_PASSWORD {
            self.write_str(format!("PASS {}\r\n", password))?;
            self.read_response(status::LOGGED_IN)?;
        }
        Ok(())
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.write_str(format!("TYPE {}\r\n", file_type))?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// Runs the PASV command and returns the address the server listens on.
    pub fn pasv(&mut self) -> Result<SocketAddr> {
        self.write_str("PASV\r\n")?;
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let Line(_, line) = self.read_response(status::PASSIVE_MODE)?;
        parse_pasv(&line)
    }

    /// Quits the current FTP session.
    pub fn quit(&mut self) -> Result<()> {
        self.write_str("QUIT\r\n")?;
        self.read_response(status::CLOSING).map(|_| ())
    }

    /// Closes the control connection without a `QUIT`.
    pub fn close(self) {
        self.reader.into_inner().close();
    }

    /// Execute command which send data back in a separate stream.
    ///
    /// The data socket is connected before the command is sent, since some
    /// servers only answer once it is open. The TLS handshake on it waits
    /// for the preliminary reply, so a refused command never leaves the
    /// client blocked in a handshake nobody will answer.
    fn data_command(&mut self, cmd: &str) -> Result<DataStream> {
        let addr = self.pasv()?;
        let stream = connect_timeout(addr, self.timeout).map_err(FtpError::DataConnectionError)?;
        self.write_str(cmd)?;
        self.read_response_in(&[status::ABOUT_TO_SEND, status::ALREADY_OPEN])?;

        let ctx = match (self.data_protection, self.secure.as_ref()) {
            (ProtectionLevel::Private, Some(ctx)) => ctx.clone(),
            _ => return Ok(DataStream::Tcp(stream)),
        };
        match ctx.policy.handshake(&ctx.domain, stream) {
            Ok(stream) => Ok(DataStream::Ssl(Box::new(stream))),
            Err(err) => {
                // The server answers the failed transfer on the control connection.
                self.read_reply()?;
                Err(FtpError::DataConnectionError(io::Error::new(
                    io::ErrorKind::Other,
                    err.to_string(),
                )))
            }
        }
    }

    /// Send `RETR` and return the data stream to read the file from. The
    /// stream must be handed back to `finalize_retr_stream`.
    pub fn retr_as_stream(&mut self, file_name: &str) -> Result<BufReader<DataStream>> {
        let retr_command = format!("RETR {}\r\n", file_name);
        self.data_command(&retr_command).map(BufReader::new)
    }

    /// Close a `RETR` data stream and read the server's closing reply.
    pub fn finalize_retr_stream(&mut self, stream: BufReader<DataStream>) -> Result<()> {
        stream.into_inner().close();
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Send `STOR` and return the data stream to write the file to. The
    /// stream must be handed back to `finalize_put_stream` or
    /// `abort_put_stream`.
    pub fn put_with_stream(&mut self, filename: &str) -> Result<BufWriter<DataStream>> {
        let stor_command = format!("STOR {}\r\n", filename);
        self.data_command(&stor_command).map(BufWriter::new)
    }

    /// Flush and close a `STOR` data stream, then read the server's
    /// closing reply.
    pub fn finalize_put_stream(&mut self, stream: BufWriter<DataStream>) -> Result<()> {
        let flushed = stream
            .into_inner()
            .map_err(|err| FtpError::DataConnectionError(err.into_error()));
        match flushed {
            Ok(stream) => stream.close(),
            Err(err) => {
                // The server still owes a reply for the aborted transfer.
                self.read_reply()?;
                return Err(err);
            }
        }
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Reset a `STOR` data stream without sending what is still buffered,
    /// so the server sees a broken transfer rather than a complete file,
    /// then read the reply it sends for the aborted transfer.
    pub fn abort_put_stream(&mut self, stream: BufWriter<DataStream>) -> Result<Line> {
        let (stream, _unsent) = stream.into_parts();
        stream.abort();
        self.read_reply()
    }

    /// Execute a command which returns list of strings in a separate stream
    fn list_command(&mut self, cmd: Cow<'static, str>) -> Result<Vec<String>> {
        let mut data_stream = BufReader::new(self.data_command(&cmd)?);
        let mut raw = Vec::new();
        let read = data_stream.read_to_end(&mut raw);
        data_stream.into_inner().close();
        let closing = self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK]);
        read.map_err(FtpError::DataConnectionError)?;
        closing?;

        Ok(String::from_utf8_lossy(&raw)
            .lines()
            .map(|line| line.trim_end_matches('\r').to_owned())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Execute `LIST` command which returns the detailed file listing in human readable format.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn list(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST\r\n".into(), |path| format!("LIST {}\r\n", path).into());
        self.list_command(command)
    }

    /// Execute `NLST` command which returns the list of file names only.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn nlst(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("NLST\r\n".into(), |path| format!("NLST {}\r\n", path).into());
        self.list_command(command)
    }

    fn write_str<S: AsRef<str>>(&mut self, command: S) -> Result<()> {
        let command = command.as_ref();
        if command.starts_with("PASS ") {
            trace!("CMD PASS ****");
        } else {
            trace!("CMD {}", command.trim_end());
        }

        let stream = self.reader.get_mut();
        stream
            .write_all(command.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(FtpError::ConnectionError)
    }

    pub fn read_response(&mut self, expected_code: u32) -> Result<Line> {
        self.read_response_in(&[expected_code])
    }

    /// Read a reply and check its code against `expected_code`.
    pub fn read_response_in(&mut self, expected_code: &[u32]) -> Result<Line> {
        let line = self.read_reply()?;
        if expected_code.iter().any(|ec| line.0 == *ec) {
            Ok(line)
        } else {
            Err(FtpError::UnexpectedReply(line))
        }
    }

    /// Read a complete, possibly multi-line, reply whatever its code.
    fn read_reply(&mut self) -> Result<Line> {
        let mut line = self.read_line()?;
        let code_str = match line.get(0..3) {
            Some(code) => code.to_owned(),
            None => return Err(FtpError::InvalidResponse("error: could not read reply code".to_owned())),
        };
        let code: u32 = code_str
            .parse()
            .map_err(|err| FtpError::InvalidResponse(format!("error: could not parse reply code: {}", err)))?;

        // multiple line reply: "NNN-" opens it, a line starting "NNN " closes it
        if line.as_bytes().get(3) == Some(&b'-') {
            let expected = format!("{} ", code_str);
            loop {
                line = self.read_line()?;
                if line.starts_with(&expected) || line == code_str {
                    break;
                }
            }
        }

        Ok(Line(code, line))
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).map_err(FtpError::ConnectionError)?;
        if n == 0 {
            return Err(FtpError::ConnectionError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        trace!("FTP {}", line.trim_end());
        Ok(line.trim_end_matches(|c| c == '\r' || c == '\n').to_owned())
    }
}

/// Parse the address out of a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
fn parse_pasv(line: &str) -> Result<SocketAddr> {
    let caps = PORT_RE
        .captures(line)
        .ok_or_else(|| FtpError::InvalidResponse(format!("Invalid PASV response: {}", line)))?;
    let mut fields = [0u8; 6];
    for (field, cap) in fields.iter_mut().zip(caps.iter().skip(1)) {
        let cap = cap.map(|m| m.as_str()).unwrap_or("");
        *field = cap
            .parse::<u8>()
            .map_err(|_| FtpError::InvalidResponse(format!("Invalid PASV response: {}", line)))?;
    }
    let port = (u16::from(fields[4]) << 8) + u16::from(fields[5]);
    let addr = format!("{}.{}.{}.{}:{}", fields[0], fields[1], fields[2], fields[3], port);
    SocketAddr::from_str(&addr).map_err(FtpError::InvalidAddress)
}

/// Connect to the first reachable address with a bounded wait, and apply
/// the same bound to every read and write on the socket.
fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host did not resolve to any address")))
}
