use echo_server::config::{Command, Config, LogFormat};
use echo_server::{EchoClient, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    match config.command.clone() {
        Command::Serve => serve(config).await,
        Command::Echo { message } => echo(&config, &message).await,
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.host,
        port = config.port,
        reflection = config.enable_reflection,
        "Starting echo-server"
    );

    Server::new(config).run().await?;
    Ok(())
}

async fn echo(config: &Config, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = EchoClient::connect(&config.connect_addr(), config.rpc_timeout).await?;
    let reply = client.echo(message).await?;
    println!("{reply}");
    Ok(())
}
