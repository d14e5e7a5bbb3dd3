//! CLI for rosbridge-client
//!
//! Subcommands:
//! - `listen`: subscribe to a topic and print every message until Ctrl-C
//! - `publish`: advertise a topic, publish one message and disconnect

use std::time::Duration;

use clap::Parser;
use rosbridge_client::{Bridge, BridgeError, ConnectionState, load_config};
use tracing::info;

#[derive(Parser)]
#[command(name = "rosbridge-client")]
struct Cli {
    /// Broker host, overriding configuration
    #[arg(long, global = true)]
    host: Option<String>,
    /// Broker port, overriding configuration
    #[arg(long, global = true)]
    port: Option<u16>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Subscribe to a topic and print incoming messages
    Listen {
        #[arg(long)]
        topic: String,
        #[arg(long = "type", default_value = "std_msgs/String")]
        message_type: String,
    },
    /// Publish a single message on a topic
    Publish {
        #[arg(long)]
        topic: String,
        #[arg(long = "type", default_value = "std_msgs/String")]
        message_type: String,
        /// JSON payload, sent as `{"data": <payload>}`
        #[arg(long)]
        data: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Client failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    if let Some(host) = cli.host {
        config.bridge.host = host;
    }
    if let Some(port) = cli.port {
        config.bridge.port = port;
    }
    if config.logging.enabled {
        rosbridge_client::utils::logging::init(&config.logging.level);
    }

    let bridge = Bridge::new(&config.bridge)?;
    let wait = config.bridge.connect_timeout() + Duration::from_secs(1);

    match cli.command {
        Command::Listen {
            topic,
            message_type,
        } => {
            bridge.connect()?;
            let printed_topic = topic.clone();
            match bridge.subscribe(&topic, &message_type, move |msg| {
                println!("[{printed_topic}] {msg}");
            }) {
                // declared to the broker once the connection opens
                Ok(()) | Err(BridgeError::NotConnected) => {}
                Err(e) => return Err(e.into()),
            }
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received. Exiting gracefully.");
        }
        Command::Publish {
            topic,
            message_type,
            data,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&data)
                .unwrap_or_else(|_| serde_json::Value::String(data.clone()));

            bridge.connect()?;
            let mut states = bridge.watch_state();
            tokio::time::timeout(wait, states.wait_for(|s| s.is_connected())).await??;

            bridge.advertise(&topic, &message_type)?;
            bridge.publish(&topic, payload)?;
            info!("Published to {topic}");
        }
    }

    bridge.disconnect();
    let mut states = bridge.watch_state();
    let _ = tokio::time::timeout(wait, states.wait_for(|s| *s == ConnectionState::Disconnected))
        .await;
    Ok(())
}
