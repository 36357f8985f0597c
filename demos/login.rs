//! Log in to an L2 server and query its version
//!
//! Run with `cargo run --example login -- 192.168.1.10:5141 my-client`.
//! Set `RUST_LOG=l2server=debug` to see the session trace.

use std::env;
use std::sync::Arc;

use l2server::catalog;
use l2server::protocol::metrics_snapshot;
use l2server::{Client, Record, Sapi, SessionConfig, StreamTransport};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let addr = args
        .next()
        .unwrap_or_else(|| format!("127.0.0.1:{}", l2server::NR5G_PORT));
    let name = args.next().unwrap_or_else(|| "l2server-demo".to_owned());

    let config = SessionConfig::default().with_client_name(name);
    let transport = StreamTransport::connect(addr.as_str(), &config)?;
    let registry = Arc::new(catalog::default_registry()?);
    let mut client = Client::new(transport, registry, config)?;
    println!("Session {} connected to {addr}", client.session_id());

    client.login()?;
    println!("Logged in as {}", client.config().client_name);

    let version = client.request(Sapi::OM, catalog::VERSION_INFO, &Record::new())?;
    println!(
        "Server package: {} (AMM {})",
        version.body.get_str("PackageVersion").unwrap_or("?"),
        version.body.get_str("AmmVersion").unwrap_or("?"),
    );

    let metrics = metrics_snapshot();
    println!(
        "{} commands, {} acks, {} naks",
        metrics.commands_sent, metrics.acks_received, metrics.naks_received
    );
    Ok(())
}
