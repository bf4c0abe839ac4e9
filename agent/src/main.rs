use agent::backoff::Backoff;
use agent::config::{AgentConfig, ServerAddress, Timing};
use agent::lifecycle::Controller;
use agent::network::UdpConnector;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated server list; the first entry is used
    #[arg(short = 's', long, env = "MC_SERVERS", default_value = "127.0.0.1:25565")]
    servers: String,

    /// Player name to join as
    #[arg(short = 'u', long, env = "MC_USERNAME", default_value = "PresenceBot")]
    username: String,

    /// Authentication mode passed to the server
    #[arg(short = 'a', long, env = "MC_AUTH", default_value = "offline")]
    auth: String,

    /// Reconnect delay added per failed attempt
    #[arg(long, default_value = "20000")]
    retry_step_ms: u64,

    /// Upper bound on the reconnect delay
    #[arg(long, default_value = "300000")]
    retry_ceiling_ms: u64,

    /// Reconnect delay after being kicked
    #[arg(long, default_value = "20000")]
    kick_delay_ms: u64,

    /// Idle motion period
    #[arg(long, default_value = "5000")]
    motion_period_ms: u64,

    /// Idle chat period
    #[arg(long, default_value = "600")]
    chat_period_secs: u64,
}

impl Args {
    fn into_config(self) -> Result<AgentConfig, Box<dyn std::error::Error>> {
        let server = ServerAddress::first_of(&self.servers)?;
        let mut config = AgentConfig::new(server, self.username);
        config.auth_mode = self.auth;
        config.timing = Timing {
            motion_period: Duration::from_millis(self.motion_period_ms),
            chat_period: Duration::from_secs(self.chat_period_secs),
            backoff: Backoff {
                step: Duration::from_millis(self.retry_step_ms),
                ceiling: Duration::from_millis(self.retry_ceiling_ms),
                kick_delay: Duration::from_millis(self.kick_delay_ms),
            },
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = Args::parse().into_config()?;

    info!("Starting presence agent...");
    info!(
        "Server: {} | identity: {} | auth: {}",
        config.server, config.identity, config.auth_mode
    );

    let mut controller = Controller::new(config, UdpConnector::new(), StdRng::from_entropy());

    tokio::select! {
        _ = controller.run() => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
