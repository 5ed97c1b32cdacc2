use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::commands::{DeviceCommand, Query, Reading};
use crate::error::{DeviceError, DeviceResult};

/// SCPI control port of the receiver
pub const DEFAULT_SCPI_PORT: u16 = 37001;

/// Snapshot of the link, published by the worker for the status bar.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub address: String,
    pub connected: bool,
    pub commands_sent: u64,
    pub last_command: Option<String>,
    pub last_update: DateTime<Utc>,
}

impl LinkStatus {
    pub fn new(address: String) -> Self {
        Self {
            address,
            connected: true,
            commands_sent: 0,
            last_command: None,
            last_update: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub enum WorkerRequest {
    Command(DeviceCommand),
    Query(Query, oneshot::Sender<DeviceResult<Reading>>),
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// The session died; nothing else will be serviced
    Failed(String),
}

/// Turn an operator-typed address into something `TcpStream::connect`
/// accepts, adding the SCPI port when none is given.
pub fn resolve_address(address: &str, default_port: u16) -> DeviceResult<String> {
    let address = address.trim();
    if address.is_empty() || address.contains(char::is_whitespace) {
        return Err(DeviceError::InvalidAddress(address.to_string()));
    }

    if let Some(rest) = address.strip_prefix('[') {
        // Bracketed IPv6, with or without a port
        return match rest.split_once(']') {
            Some((_, "")) => Ok(format!("{}:{}", address, default_port)),
            Some((_, port)) if valid_port(port.strip_prefix(':')) => Ok(address.to_string()),
            _ => Err(DeviceError::InvalidAddress(address.to_string())),
        };
    }

    match address.matches(':').count() {
        0 => Ok(format!("{}:{}", address, default_port)),
        1 => {
            let (host, port) = address.split_once(':').unwrap_or((address, ""));
            if host.is_empty() || !valid_port(Some(port)) {
                Err(DeviceError::InvalidAddress(address.to_string()))
            } else {
                Ok(address.to_string())
            }
        }
        _ => Ok(format!("[{}]:{}", address, default_port)),
    }
}

fn valid_port(port: Option<&str>) -> bool {
    port.is_some_and(|p| p.parse::<u16>().is_ok())
}

#[cfg(test)]
pub mod fake {
    //! In-memory receiver answering queries from a fixed table.

    use std::collections::HashMap;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
    use tokio::sync::mpsc;

    pub struct FakeReceiver {
        pub lines: mpsc::UnboundedReceiver<String>,
    }

    impl FakeReceiver {
        /// Returns the client end of the stream and the fake.
        pub fn spawn(responses: &[(&'static str, &'static str)]) -> (DuplexStream, Self) {
            let (client, device) = tokio::io::duplex(4096);
            let responses: HashMap<_, _> = responses.iter().copied().collect();
            let (seen_tx, seen_rx) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                let (read, mut write) = tokio::io::split(device);
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(response) = responses.get(line.as_str()) {
                        let reply = format!("{}\n", response);
                        if write.write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    if seen_tx.send(line).is_err() {
                        break;
                    }
                }
            });

            (client, Self { lines: seen_rx })
        }

        pub async fn next_line(&mut self) -> Option<String> {
            self.lines.recv().await
        }

        pub fn drain(&mut self) -> Vec<String> {
            let mut seen = Vec::new();
            while let Ok(line) = self.lines.try_recv() {
                seen.push(line);
            }
            seen
        }
    }
}
