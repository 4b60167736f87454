use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,
    /// Messages a client may have queued before it is dropped as stalled (at least 2)
    #[clap(short, long, default_value_t = server::config::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
    /// Upper bound on a single socket write, in milliseconds
    #[clap(short, long, default_value = "2000")]
    write_timeout_ms: u64,
}

/// Parses command-line arguments, binds the listener and accepts until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::new(&args.host, args.port)
        .with_queue_capacity(args.queue_capacity)
        .with_write_timeout(Duration::from_millis(args.write_timeout_ms));

    let server = Server::bind(config).await?;
    println!("Server started on {}", server.local_addr()?);

    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down gracefully...");
            }
        })
        .await;

    Ok(())
}
