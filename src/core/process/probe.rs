use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Polls a server port until it accepts a TCP connection.
#[derive(Debug, Clone)]
pub struct CrashTestProbe {
    host: String,
    port: u16,
    interval: Duration,
    attempts: u32,
}

impl CrashTestProbe {
    /// Every 3 seconds, 10 times: about 30 seconds for the server to come up.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            interval: Duration::from_secs(3),
            attempts: 10,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// `Ok` on the first accepted connection, otherwise the last error.
    pub async fn run(&self) -> Result<(), String> {
        let addr = format!("{}:{}", self.host, self.port);
        let mut last_error = String::from("no connection attempt made");

        for attempt in 1..=self.attempts {
            tokio::time::sleep(self.interval).await;
            match TcpStream::connect(&addr).await {
                Ok(_) => {
                    debug!("Crash test connected to {} on attempt {}", addr, attempt);
                    return Ok(());
                }
                Err(e) => {
                    debug!("Crash test attempt {}/{} failed: {}", attempt, self.attempts, e);
                    last_error = format!("{addr}: {e}");
                }
            }
        }
        Err(last_error)
    }
}
