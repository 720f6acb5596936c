//! Runs a `TransferSession` on its own thread.
//!
//! Operations are queued and executed one at a time in submission order,
//! so a front-end can fire them from its event loop without blocking and
//! without ever overlapping two operations on the same connection.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::session::{
    ConnectError, ConnectionConfig, ListError, SessionState, SessionStatus, TransferError, TransferSession,
};
use super::types::RemoteEntry;

type Job = Box<dyn FnOnce(&mut TransferSession) + Send>;

/// The worker thread exited before producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerGone;

impl fmt::Display for WorkerGone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("session worker is no longer running")
    }
}

impl Error for WorkerGone {}

/// The result of a queued operation, delivered once the worker gets to it.
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<T>,
}

impl<T> Pending<T> {
    /// Blocks until the operation has run.
    pub fn wait(self) -> Result<T, WorkerGone> {
        self.rx.recv().map_err(|_| WorkerGone)
    }

    /// Returns the result if the operation has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<T, WorkerGone>> {
        match self.rx.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(WorkerGone)),
        }
    }
}

/// Owns a session on a dedicated thread and feeds it operations in order.
/// Dropping the worker disconnects the session and joins the thread.
pub struct SessionWorker {
    jobs: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl SessionWorker {
    pub fn spawn(session: TransferSession) -> io::Result<SessionWorker> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("ftps-session".to_owned())
            .spawn(move || {
                let mut session = session;
                for job in queue {
                    job(&mut session);
                }
                debug!("session worker stopping");
                session.disconnect();
            })?;
        Ok(SessionWorker {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    /// Queues an arbitrary operation on the session.
    pub fn submit<T, F>(&self, op: F) -> Pending<T>
    where
        F: FnOnce(&mut TransferSession) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move |session| {
            // The caller may have dropped its Pending; the work still happened.
            let _ = tx.send(op(session));
        });
        if let Some(ref jobs) = self.jobs {
            if jobs.send(job).is_err() {
                warn!("session worker is gone, operation dropped");
            }
        }
        Pending { rx }
    }

    pub fn connect(&self, config: ConnectionConfig) -> Pending<Result<SessionStatus, ConnectError>> {
        self.submit(move |session| session.connect(config))
    }

    pub fn disconnect(&self) -> Pending<()> {
        self.submit(|session| session.disconnect())
    }

    pub fn list(&self) -> Pending<Result<Vec<RemoteEntry>, ListError>> {
        self.submit(|session| session.list())
    }

    pub fn upload<P: Into<PathBuf>, S: Into<String>>(
        &self,
        local_path: P,
        remote_name: S,
    ) -> Pending<Result<u64, TransferError>> {
        let (local_path, remote_name) = (local_path.into(), remote_name.into());
        self.submit(move |session| session.upload(&local_path, &remote_name))
    }

    pub fn download<S: Into<String>, P: Into<PathBuf>>(
        &self,
        remote_name: S,
        local_path: P,
    ) -> Pending<Result<u64, TransferError>> {
        let (remote_name, local_path) = (remote_name.into(), local_path.into());
        self.submit(move |session| session.download(&remote_name, &local_path))
    }

    pub fn state(&self) -> Pending<SessionState> {
        self.submit(|session| session.state())
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish what is queued and stop.
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("session worker panicked");
            }
        }
    }
}
