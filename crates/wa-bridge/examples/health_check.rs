//! Simple health check example.
//!
//! Run with: cargo run --example health_check
//!
//! Connects to the daemon at BRIDGE_URL (default http://127.0.0.1:8080).

use wa_bridge::{BridgeClient, BridgeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = BridgeConfig::from_env();
    println!("Connecting to {}...", config.base_url);

    let client = BridgeClient::connect(config).await?;
    println!("Connected!");

    let me = client.get_self_jid().await?;
    println!("Paired account: {}", me);

    let healthy = client.health_check().await?;
    println!("Health check: {}", if healthy { "OK" } else { "FAILED" });

    Ok(())
}
