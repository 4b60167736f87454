use clap::Parser;
use log::{info, warn};
use shared::codec;
use shared::mirror::RemoteWorld;
use shared::Message;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::interval;

/// Headless client that joins, walks in a circle and logs what it hears
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:12345")]
    server: String,
    /// Display name to join with
    #[clap(short, long, default_value = "bot")]
    gametag: String,
    /// Position updates to send before disconnecting
    #[clap(short, long, default_value = "100")]
    updates: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);

    let mut world = RemoteWorld::new();
    world.set_local_gametag(args.gametag.clone());
    stream
        .write_all(&codec::encode(&Message::Join {
            gametag: args.gametag.clone(),
        })?)
        .await?;

    let mut buffer = Vec::new();
    let mut chunk = [0u8; 2048];
    let mut ticker = interval(Duration::from_millis(100));
    let mut sent = 0u32;
    let mut center = None;

    while sent < args.updates {
        tokio::select! {
            read = stream.read(&mut chunk) => {
                let n = read?;
                if n == 0 {
                    warn!("Server closed the connection");
                    return Ok(());
                }
                buffer.extend_from_slice(&chunk[..n]);
                for message in codec::decode_all(&mut buffer) {
                    info!("Received {:?}", message);
                    world.apply(&message);
                    if let Message::JoinResponse { x_pos, y_pos, .. } = message {
                        center = Some((x_pos, y_pos));
                    }
                }
            }
            _ = ticker.tick() => {
                let Some((cx, cy)) = center else { continue };
                let angle = sent as f64 / 10.0;
                let update = world.move_local(cx + 40.0 * angle.cos(), cy + 40.0 * angle.sin());
                if let Some(update) = update {
                    stream.write_all(&codec::encode(&update)?).await?;
                    sent += 1;
                }
            }
        }
    }

    info!(
        "Sent {} updates, {} other players visible; disconnecting",
        sent,
        world.len()
    );
    Ok(())
}
