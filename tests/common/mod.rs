//! A small scripted FTP/FTPS server for integration tests. It speaks just
//! enough of the protocol for the session: USER/PASS, AUTH TLS, PBSZ,
//! PROT, TYPE, PASV, LIST, NLST, STOR, RETR and QUIT, with an in-memory
//! file store.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{SslAcceptor, SslMethod, SslStream};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use socket2::SockRef;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ftps_session::status;
use ftps_session::ConnectionConfig;

pub const USER: &str = "demo";
pub const PASS: &str = "demo123";

const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// A self-signed certificate and its key.
pub struct Identity {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl Identity {
    pub fn generate(cn: &str) -> Identity {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", cn).unwrap();
        let name = name.build();

        let mut serial = BigNum::new().unwrap();
        serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        Identity { cert: builder.build(), key }
    }

    /// Writes the certificate as PEM into `dir` and returns its path.
    pub fn write_pem(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.cert.to_pem().unwrap()).unwrap();
        path
    }

    fn acceptor(&self) -> SslAcceptor {
        let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        builder.set_private_key(&self.key).unwrap();
        builder.set_certificate(&self.cert).unwrap();
        builder.check_private_key().unwrap();
        builder.set_num_tickets(0).unwrap();
        builder.build()
    }
}

/// Knobs for making the server misbehave.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub greeting_code: u32,
    pub refuse_auth: bool,
    pub refuse_pasv: bool,
    pub refuse_pbsz: bool,
    pub refuse_prot: bool,
    pub refuse_list: bool,
    pub refuse_nlst: bool,
    /// Close the control connection instead of answering a broken upload.
    pub hang_up_on_broken_stor: bool,
    /// Send half of a RETR, then reset the data connection and hang up.
    pub break_retr: bool,
}

impl Default for Behaviour {
    fn default() -> Behaviour {
        Behaviour {
            greeting_code: status::READY,
            refuse_auth: false,
            refuse_pasv: false,
            refuse_pbsz: false,
            refuse_prot: false,
            refuse_list: false,
            refuse_nlst: false,
            hang_up_on_broken_stor: false,
            break_retr: false,
        }
    }
}

struct Shared {
    behaviour: Behaviour,
    tls: Option<SslAcceptor>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    commands: Mutex<Vec<String>>,
    open: AtomicUsize,
}

pub struct TestServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl TestServer {
    pub fn plain() -> TestServer {
        TestServer::start(Behaviour::default(), None)
    }

    pub fn secure(identity: &Identity) -> TestServer {
        TestServer::start(Behaviour::default(), Some(identity))
    }

    pub fn start(behaviour: Behaviour, identity: Option<&Identity>) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            behaviour,
            tls: identity.map(Identity::acceptor),
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
            commands: Mutex::new(Vec::new()),
            open: AtomicUsize::new(0),
        });

        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let shared = Arc::clone(&accept_shared);
                shared.open.fetch_add(1, Ordering::SeqCst);
                thread::spawn(move || {
                    let _ = Connection::new(stream, &shared).run();
                    shared.open.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        TestServer { addr, shared }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// A config for this server with the demo credentials.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("127.0.0.1", self.port(), USER, PASS).with_timeout(IO_TIMEOUT)
    }

    pub fn put_file(&self, name: &str, bytes: &[u8]) {
        self.shared.files.lock().unwrap().insert(name.to_owned(), bytes.to_vec());
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.shared.files.lock().unwrap().get(name).cloned()
    }

    pub fn add_dir(&self, name: &str) {
        self.shared.dirs.lock().unwrap().insert(name.to_owned());
    }

    /// Every command received, in order, with passwords masked.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }

    pub fn open_connections(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Waits up to five seconds for the number of open control
    /// connections to settle at `expected`.
    pub fn wait_for_connections(&self, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.open_connections() == expected {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        self.open_connections() == expected
    }
}

enum Channel {
    Plain(TcpStream),
    Tls(Box<SslStream<TcpStream>>),
    Closed,
}

impl Channel {
    fn close(self) {
        match self {
            Channel::Plain(stream) => {
                let _ = stream.shutdown(Shutdown::Write);
                drain(stream);
            }
            Channel::Tls(mut stream) => {
                let _ = stream.shutdown();
                let mut buf = [0u8; 512];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                }
            }
            Channel::Closed => {}
        }
    }

    /// Drops the connection with a TCP reset.
    fn reset(self) {
        let tcp = match self {
            Channel::Plain(ref stream) => stream,
            Channel::Tls(ref stream) => stream.get_ref(),
            Channel::Closed => return,
        };
        let _ = SockRef::from(tcp).set_linger(Some(Duration::from_secs(0)));
    }
}

fn drain(mut stream: TcpStream) {
    let mut buf = [0u8; 512];
    while let Ok(n) = stream.read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Channel::Plain(ref mut stream) => stream.read(buf),
            Channel::Tls(ref mut stream) => stream.read(buf),
            Channel::Closed => Ok(0),
        }
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            Channel::Plain(ref mut stream) => stream.write(buf),
            Channel::Tls(ref mut stream) => stream.write(buf),
            Channel::Closed => Err(io::Error::new(io::ErrorKind::NotConnected, "closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Channel::Plain(ref mut stream) => stream.flush(),
            Channel::Tls(ref mut stream) => stream.flush(),
            Channel::Closed => Ok(()),
        }
    }
}

struct Connection<'a> {
    shared: &'a Shared,
    control: Channel,
    user: Option<String>,
    logged_in: bool,
    protected: bool,
    passive: Option<TcpListener>,
}

impl<'a> Connection<'a> {
    fn new(stream: TcpStream, shared: &'a Shared) -> Connection<'a> {
        stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
        stream.set_write_timeout(Some(IO_TIMEOUT)).unwrap();
        Connection {
            shared,
            control: Channel::Plain(stream),
            user: None,
            logged_in: false,
            protected: false,
            passive: None,
        }
    }

    fn run(mut self) -> io::Result<()> {
        let shared = self.shared;
        let behaviour = shared.behaviour.clone();
        self.reply(behaviour.greeting_code, "demo server ready.")?;
        if !status::is_positive_completion(behaviour.greeting_code) {
            return Ok(());
        }

        while let Some(line) = self.read_line() {
            let (cmd, arg) = match line.find(' ') {
                Some(pos) => (line[..pos].to_ascii_uppercase(), line[pos + 1..].to_owned()),
                None => (line.to_ascii_uppercase(), String::new()),
            };
            let logged = if cmd == "PASS" { "PASS ****".to_owned() } else { line.clone() };
            self.shared.commands.lock().unwrap().push(logged);

            match cmd.as_str() {
                "USER" => {
                    self.user = Some(arg);
                    self.reply(status::NEED_PASSWORD, "Username ok, send password.")?;
                }
                "PASS" => {
                    if self.user.as_deref() == Some(USER) && arg == PASS {
                        self.logged_in = true;
                        self.reply(status::LOGGED_IN, "Login successful.")?;
                    } else {
                        self.reply(status::NOT_LOGGED_IN, "Authentication failed.")?;
                    }
                }
                "AUTH" => {
                    let acceptor = match shared.tls {
                        Some(ref acceptor) if !behaviour.refuse_auth && arg.eq_ignore_ascii_case("TLS") => acceptor,
                        _ => {
                            self.reply(status::NOT_IMPLEMENTED, "AUTH not supported.")?;
                            continue;
                        }
                    };
                    self.reply(status::AUTH_OK, "AUTH TLS successful.")?;
                    let tcp = match std::mem::replace(&mut self.control, Channel::Closed) {
                        Channel::Plain(tcp) => tcp,
                        other => {
                            self.control = other;
                            continue;
                        }
                    };
                    match acceptor.accept(tcp) {
                        Ok(stream) => self.control = Channel::Tls(Box::new(stream)),
                        // The client refused our certificate.
                        Err(_) => return Ok(()),
                    }
                }
                "PBSZ" if behaviour.refuse_pbsz => self.reply(503, "PBSZ not allowed.")?,
                "PBSZ" => self.reply(status::COMMAND_OK, "PBSZ=0")?,
                "PROT" if behaviour.refuse_prot => self.reply(534, "PROT refused.")?,
                "PROT" => {
                    self.protected = arg.eq_ignore_ascii_case("P");
                    self.reply(status::COMMAND_OK, "Protection set.")?;
                }
                "TYPE" => self.reply(status::COMMAND_OK, "Type set.")?,
                "PASV" if behaviour.refuse_pasv => self.reply(status::NOT_IMPLEMENTED, "PASV disabled.")?,
                "PASV" => {
                    let listener = TcpListener::bind("127.0.0.1:0")?;
                    let port = listener.local_addr()?.port();
                    self.passive = Some(listener);
                    let text = format!("Entering Passive Mode (127,0,0,1,{},{}).", port >> 8, port & 0xff);
                    self.reply(status::PASSIVE_MODE, &text)?;
                }
                "LIST" | "NLST" | "STOR" | "RETR" if !self.logged_in => {
                    self.reply(status::NOT_LOGGED_IN, "Log in first.")?
                }
                "LIST" if behaviour.refuse_list => self.reply(status::NOT_IMPLEMENTED, "LIST disabled.")?,
                "LIST" => {
                    let listing = self.listing();
                    self.send_data(listing.as_bytes())?;
                }
                "NLST" if behaviour.refuse_nlst => self.reply(status::NOT_IMPLEMENTED, "NLST disabled.")?,
                "NLST" => {
                    let names = self.names();
                    self.send_data(names.as_bytes())?;
                }
                "STOR" if arg.starts_with("denied") => self.reply(553, "Not allowed.")?,
                "STOR" => self.receive_data(&arg, behaviour.hang_up_on_broken_stor)?,
                "RETR" => {
                    let file = self.shared.files.lock().unwrap().get(&arg).cloned();
                    match file {
                        Some(bytes) if behaviour.break_retr => return self.break_transfer(&bytes),
                        Some(bytes) => self.send_data(&bytes)?,
                        None => self.reply(status::FILE_UNAVAILABLE, "No such file.")?,
                    }
                }
                "QUIT" => {
                    self.reply(status::CLOSING, "Goodbye.")?;
                    break;
                }
                _ => self.reply(status::NOT_IMPLEMENTED, "Command not implemented.")?,
            }
        }

        std::mem::replace(&mut self.control, Channel::Closed).close();
        Ok(())
    }

    fn listing(&self) -> String {
        let mut lines = Vec::new();
        for dir in self.shared.dirs.lock().unwrap().iter() {
            lines.push(format!("drwxr-xr-x   2 demo     demo         4096 Oct 17 21:33 {}", dir));
        }
        for (name, bytes) in self.shared.files.lock().unwrap().iter() {
            lines.push(format!("-rw-r--r--   1 demo     demo     {:>8} Oct 17 21:33 {}", bytes.len(), name));
        }
        lines.iter().map(|line| format!("{}\r\n", line)).collect()
    }

    fn names(&self) -> String {
        let dirs = self.shared.dirs.lock().unwrap().clone();
        let files = self.shared.files.lock().unwrap().keys().cloned().collect::<Vec<_>>();
        dirs.into_iter().chain(files).map(|name| format!("{}\r\n", name)).collect()
    }

    fn send_data(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut data = match self.open_data()? {
            Some(data) => data,
            None => return Ok(()),
        };
        let written = data.write_all(bytes).and_then(|_| data.flush());
        data.close();
        match written {
            Ok(()) => self.reply(status::CLOSING_DATA_CONNECTION, "Transfer complete."),
            Err(_) => self.reply(426, "Transfer aborted."),
        }
    }

    /// Stores the upload only when the client ends it cleanly. A reset or
    /// truncated TLS stream is a broken transfer and leaves the store alone.
    fn receive_data(&mut self, name: &str, hang_up_when_broken: bool) -> io::Result<()> {
        let mut data = match self.open_data()? {
            Some(data) => data,
            None => return Ok(()),
        };
        let mut bytes = Vec::new();
        let mut buf = [0u8; 4096];
        let complete = loop {
            match data.read(&mut buf) {
                Ok(0) => break true,
                Ok(n) => bytes.extend_from_slice(&buf[..n]),
                Err(_) => break false,
            }
        };
        data.close();
        if complete {
            self.shared.files.lock().unwrap().insert(name.to_owned(), bytes);
            self.reply(status::CLOSING_DATA_CONNECTION, "Transfer complete.")
        } else if hang_up_when_broken {
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "hanging up after a broken upload"))
        } else {
            self.reply(426, "Connection closed; transfer aborted.")
        }
    }

    /// Sends the first half of `bytes`, resets the data connection and
    /// ends the session without a reply.
    fn break_transfer(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(mut data) = self.open_data()? {
            let _ = data.write_all(&bytes[..bytes.len() / 2]).and_then(|_| data.flush());
            data.reset();
        }
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "hanging up mid-transfer"))
    }

    fn open_data(&mut self) -> io::Result<Option<Channel>> {
        let listener = match self.passive.take() {
            Some(listener) => listener,
            None => {
                self.reply(status::CANNOT_OPEN_DATA_CONNECTION, "Use PASV first.")?;
                return Ok(None);
            }
        };
        self.reply(status::ABOUT_TO_SEND, "Opening data connection.")?;

        listener.set_nonblocking(true)?;
        let deadline = Instant::now() + IO_TIMEOUT;
        let stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => {
                    self.reply(status::CANNOT_OPEN_DATA_CONNECTION, "Data connection failed.")?;
                    return Ok(None);
                }
            }
        };
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        if !self.protected {
            return Ok(Some(Channel::Plain(stream)));
        }
        let accepted = match self.shared.tls {
            Some(ref acceptor) => acceptor.accept(stream).ok(),
            None => None,
        };
        match accepted {
            Some(stream) => Ok(Some(Channel::Tls(Box::new(stream)))),
            None => {
                self.reply(status::CANNOT_OPEN_DATA_CONNECTION, "TLS negotiation failed.")?;
                Ok(None)
            }
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.control.read(&mut byte) {
                Ok(0) | Err(_) => return None,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
            }
        }
        let line = String::from_utf8_lossy(&line).trim_end_matches('\r').to_owned();
        Some(line)
    }

    fn reply(&mut self, code: u32, text: &str) -> io::Result<()> {
        write!(self.control, "{} {}\r\n", code, text)?;
        self.control.flush()
    }
}
