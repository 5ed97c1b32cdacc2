use clap::Parser;
use serde::Serialize;

use crate::device::DEFAULT_SCPI_PORT;
use crate::hardware::Generation;

/// Control panel for networked spectrum-analyzer receivers.
#[derive(Parser, Debug, Clone, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Hostname or IP address of the receiver; skips the connect dialog
    pub address: Option<String>,

    /// Reset the receiver right after connecting
    #[arg(long)]
    pub reset: bool,

    /// Receiver hardware generation
    #[arg(long, value_enum, env = "RECEIVER_MODEL", default_value_t = Generation::Wsa4000)]
    pub model: Generation,

    /// SCPI port used when the address carries none
    #[arg(long, env = "RECEIVER_PORT", default_value_t = DEFAULT_SCPI_PORT)]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
