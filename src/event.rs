//! Protocol events: the ordered, user-facing record of what a session does.

use chrono::{DateTime, Utc};
use log::Level;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Info,
    /// A step that is protected by TLS.
    Secure,
    /// A step that exposes credentials or data in clear text, or skips
    /// server authentication.
    Insecure,
    Error,
}

impl EventKind {
    fn log_level(self) -> Level {
        match self {
            EventKind::Error => Level::Error,
            EventKind::Insecure => Level::Warn,
            EventKind::Info | EventKind::Secure => Level::Info,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolEvent {
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProtocolEvent {
    pub fn new<S: Into<String>>(kind: EventKind, message: S) -> ProtocolEvent {
        ProtocolEvent {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.timestamp.format("%H:%M:%S"), self.kind, self.message)
    }
}

/// Receives every protocol event a session emits, synchronously and in
/// order. It is called from whichever thread runs the session operation,
/// so implementations that feed a UI must marshal to their own thread.
pub trait SessionEventSink: Send + Sync {
    fn on_event(&self, event: ProtocolEvent);

    /// Builds an event, mirrors it to the `log` facade and delivers it.
    fn emit(&self, kind: EventKind, message: String) {
        log!(target: "ftps_session::event", kind.log_level(), "{}", message);
        self.on_event(ProtocolEvent::new(kind, message));
    }
}

impl<F> SessionEventSink for F
where
    F: Fn(ProtocolEvent) + Send + Sync,
{
    fn on_event(&self, event: ProtocolEvent) {
        self(event)
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ProtocolEvent>>,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    pub fn events(&self) -> Vec<ProtocolEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.message).collect()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<ProtocolEvent> {
        self.events().into_iter().filter(|event| event.kind == kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl SessionEventSink for EventLog {
    fn on_event(&self, event: ProtocolEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards events over a channel to whatever thread owns the receiver.
pub struct ChannelSink {
    tx: Mutex<Sender<ProtocolEvent>>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, Receiver<ProtocolEvent>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSink { tx: Mutex::new(tx) }, rx)
    }
}

impl SessionEventSink for ChannelSink {
    fn on_event(&self, event: ProtocolEvent) {
        if let Ok(tx) = self.tx.lock() {
            // A dropped receiver means nobody is listening any more.
            let _ = tx.send(event);
        }
    }
}
