//! Errors raised by the receiver link.
//!
//! Only [`DeviceError::Connection`] is recoverable: the window falls back to
//! demo mode when opening a device fails with it. Everything else is fatal.

use thiserror::Error;

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("invalid device address '{0}'")]
    InvalidAddress(String),

    #[error("unexpected response to '{query}': '{response}'")]
    Protocol { query: String, response: String },

    #[error("receiver link closed")]
    Closed,
}

impl DeviceError {
    /// Network-level failures that degrade to demo mode instead of aborting.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            DeviceError::Connection(_) | DeviceError::InvalidAddress(_)
        )
    }
}
