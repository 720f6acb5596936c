//! Connects with explicit FTPS and lists the remote directory. With a
//! certificate path the server must present exactly that certificate;
//! without one any certificate is accepted.
//!
//! cargo run --example secure -- [host] [port] [user] [password] [cert.pem]

use std::env;
use std::path::Path;
use std::sync::Arc;

use ftps_session::{ConnectionConfig, EventLog, SessionEventSink, SessionWorker, TransferSession, TrustPolicy};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let host = args.first().cloned().unwrap_or_else(|| "localhost".to_owned());
    let port = args
        .get(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| ConnectionConfig::default_port(true));
    let user = args.get(2).cloned().unwrap_or_else(|| "demo".to_owned());
    let pass = args.get(3).cloned().unwrap_or_else(|| "demo123".to_owned());
    let cert = args.get(4).map(Path::new);

    let events = Arc::new(EventLog::new());
    let trust = TrustPolicy::from_certificate_path(cert, &*events);
    let config = ConnectionConfig::new(host, port, user, pass)
        .with_tls(true)
        .with_trust_policy(trust);

    let sink: Arc<dyn SessionEventSink> = events.clone();
    let worker = match SessionWorker::spawn(TransferSession::new(sink)) {
        Ok(worker) => worker,
        Err(err) => panic!("cannot start session worker: {}", err),
    };

    let connect = worker.connect(config);
    let list = worker.list();
    let disconnect = worker.disconnect();

    match connect.wait() {
        Ok(Ok(status)) => println!("{}", status),
        Ok(Err(err)) => println!("Error: {}", err),
        Err(err) => println!("Error: {}", err),
    }
    if let Ok(Ok(entries)) = list.wait() {
        for entry in entries {
            println!("  {}", entry.display_name());
        }
    }
    let _ = disconnect.wait();

    for event in events.events() {
        println!("{}", event);
    }
}
