//! Connects over plain FTP, lists the remote directory and round-trips a
//! small file.
//!
//! cargo run --example plain -- [host] [port] [user] [password]

use std::env;
use std::error::Error;
use std::fs;
use std::sync::Arc;

use ftps_session::{ConnectionConfig, ProtocolEvent, TransferSession};

fn run(host: &str, port: u16, user: &str, pass: &str) -> Result<(), Box<dyn Error>> {
    let mut session = TransferSession::new(Arc::new(|event: ProtocolEvent| println!("{}", event)));
    let status = session.connect(ConnectionConfig::new(host, port, user, pass))?;
    println!("{}", status);

    for entry in session.list()? {
        println!("  {}", entry.display_name());
    }

    let dir = env::temp_dir();
    let local = dir.join("ftps-session-demo.txt");
    fs::write(&local, b"Some awesome file data man!!")?;
    session.upload(&local, "my_random_file.txt")?;
    session.download("my_random_file.txt", dir.join("ftps-session-demo.copy.txt"))?;

    session.disconnect();
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let host = args.first().map(String::as_str).unwrap_or("localhost");
    let port = args.get(1).and_then(|p| p.parse().ok()).unwrap_or(2121);
    let user = args.get(2).map(String::as_str).unwrap_or("demo");
    let pass = args.get(3).map(String::as_str).unwrap_or("demo123");

    run(host, port, user, pass).unwrap_or_else(|err| panic!("{}", err));
    println!("test successful")
}
