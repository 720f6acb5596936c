use openssl::ssl::SslStream;
use socket2::SockRef;

use std::{
    io::{Read, Result, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

/// Data Stream used for communications, on both the control and the data
/// connection.
#[derive(Debug)]
pub enum DataStream {
    Tcp(TcpStream),
    Ssl(Box<SslStream<TcpStream>>),
}

impl DataStream {
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match *self {
            DataStream::Tcp(ref stream) => stream,
            DataStream::Ssl(ref stream) => stream.get_ref(),
        }
    }

    /// Test if the stream is secured
    pub fn is_ssl(&self) -> bool {
        matches!(*self, DataStream::Ssl(_))
    }

    /// Close the stream. A TLS stream sends close_notify first and then
    /// drains whatever the peer still has in flight, so the socket is not
    /// reset while unread records (TLS 1.3 tickets) sit in its buffer.
    /// Errors are ignored: the server's reply decides whether a transfer
    /// succeeded.
    pub fn close(self) {
        match self {
            DataStream::Tcp(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            DataStream::Ssl(mut stream) => {
                if stream.shutdown().is_ok() {
                    let mut sink = [0u8; 1024];
                    while let Ok(n) = stream.read(&mut sink) {
                        if n == 0 {
                            break;
                        }
                    }
                }
                let _ = stream.get_ref().shutdown(Shutdown::Both);
            }
        }
    }

    /// Drop the connection with a TCP reset and no TLS close_notify. A peer
    /// reading from it gets an error instead of an orderly end of stream.
    pub fn abort(self) {
        if let Err(err) = SockRef::from(self.get_ref()).set_linger(Some(Duration::from_secs(0))) {
            debug!("could not arm reset on data connection: {}", err);
        }
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.read(buf),
            DataStream::Ssl(ref mut stream) => stream.read(buf),
        }
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.write(buf),
            DataStream::Ssl(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.flush(),
            DataStream::Ssl(ref mut stream) => stream.flush(),
        }
    }
}
