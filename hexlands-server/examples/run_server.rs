//! Example to run the HEXLANDS server standalone
//!
//! Run with: cargo run -p hexlands-server --example run_server

use hexlands_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig::default().with_port(8002);

    println!("Starting HEXLANDS server on port {}", config.port);
    println!("Create a game with: curl -X POST http://localhost:{}/api/games", config.port);

    run_server(config).await
}
