//! Server network layer: the TCP accept loop

use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::connection::ConnectionHandler;
use crate::coordinator::Coordinator;

/// Accepts connections and spawns one handler task for each
pub struct Server {
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            coordinator: Arc::new(Coordinator::new(&config)),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Runs the accept loop forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves
    ///
    /// Only accepting stops on shutdown. Handlers already running keep serving
    /// their connections.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Waiting for connections...");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_handler(stream, addr).await,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
            }
        }
    }

    async fn spawn_handler(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let handler = ConnectionHandler::register(self.coordinator(), addr, &self.config).await;
        tokio::spawn(async move {
            handler.run(stream).await;
        });
    }
}
