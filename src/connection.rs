use serde::Serialize;
use std::fmt;

/// Outcome of the most recent connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    /// No attempt has resolved yet
    #[default]
    Disconnected,
    Connected,
    Demo,
}

impl ConnectionState {
    pub fn is_resolved(self) -> bool {
        match self {
            ConnectionState::Disconnected => false,
            ConnectionState::Connected | ConnectionState::Demo => true,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected => "Connected",
            ConnectionState::Demo => "Demo",
        };
        f.write_str(label)
    }
}
