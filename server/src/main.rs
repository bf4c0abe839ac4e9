use clap::Parser;
use log::info;
use server::network::Server;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum number of concurrent players
    #[arg(short, long, default_value = "20")]
    max_clients: usize,

    /// Seconds without movement before a player is kicked
    #[arg(short, long, default_value = "300")]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting lobby server...");
    info!(
        "Max clients: {} | idle timeout: {}s",
        args.max_clients, args.idle_timeout_secs
    );

    let mut server = Server::new(
        &addr,
        args.max_clients,
        Duration::from_secs(args.idle_timeout_secs),
    )
    .await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
