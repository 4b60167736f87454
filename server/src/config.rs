use shared::DEFAULT_PORT;
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Runtime settings for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to, `host:port`
    pub bind_addr: String,
    /// Messages a connection may have queued before it counts as stalled
    pub queue_capacity: usize,
    /// Upper bound on a single socket write
    pub write_timeout: Duration,
    /// Bytes requested per socket read
    pub read_chunk: usize,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            bind_addr: format!("{}:{}", host, port),
            ..Self::default()
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}
