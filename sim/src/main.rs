// Arm controller simulator
// Run with: cargo run -p sim   (SIM_PORT overrides the default port 81)

use std::error::Error;
use tokio::net::TcpListener;
use tracing::info;

use sim::{serve, Simulator};

const DEFAULT_PORT: u16 = 81;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("SIM_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Point ARM_HOST at this machine (ws://<host>:{}/)", port);
    serve(listener, Simulator::new()).await
}
