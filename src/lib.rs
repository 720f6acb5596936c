#![crate_name = "ftps_session"]
#![crate_type = "lib"]

//! ftps_session manages one plain-FTP or FTPS session: it opens the control
//! connection, upgrades it with `AUTH TLS` when asked, checks the server
//! certificate against a trust policy, protects the data channel with
//! `PBSZ`/`PROT P`, and then lists, uploads and downloads files.
//!
//! Every protocol step is reported, in order, to a `SessionEventSink`, so a
//! front-end can show exactly what travels encrypted and what does not.
//!
//! ### Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ftps_session::{ConnectionConfig, EventLog, TransferSession, TrustPolicy};
//!
//! let events = Arc::new(EventLog::new());
//! let mut session = TransferSession::new(events.clone());
//!
//! let trust = TrustPolicy::from_certificate_path(Some("server.pem".as_ref()), &*events);
//! let config = ConnectionConfig::new("localhost", 2121, "demo", "demo123")
//!     .with_tls(true)
//!     .with_trust_policy(trust);
//!
//! let status = session.connect(config).unwrap_or_else(|err| panic!("{}", err));
//! println!("{}", status);
//! for entry in session.list().unwrap() {
//!     println!("{}", entry.display_name());
//! }
//! session.disconnect();
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod data_stream;
mod ftp;
pub mod cert;
pub mod event;
pub mod listing;
pub mod session;
pub mod status;
pub mod trust;
pub mod types;
pub mod worker;

pub use self::cert::{CertError, Certificate, CertificateLoader};
pub use self::data_stream::DataStream;
pub use self::event::{ChannelSink, EventKind, EventLog, ProtocolEvent, SessionEventSink};
pub use self::ftp::FtpStream;
pub use self::session::{
    ConnectError, ConnectionConfig, ListError, SessionState, SessionStatus, TransferError, TransferSession,
};
pub use self::trust::{TrustDecision, TrustMode, TrustPolicy};
pub use self::types::{FtpError, RemoteEntry};
pub use self::worker::{Pending, SessionWorker, WorkerGone};
