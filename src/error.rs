use std::time::Duration;
use thiserror::Error;

use crate::channel::Channel;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Message channel closed")]
    ChannelClosed,

    #[error("No reply on {channel} after {after:?}")]
    Timeout { channel: Channel, after: Duration },

    #[error("Backend rejected request: {0}")]
    Remote(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No available port found in range {0}-{1}")]
    NoAvailablePort(u16, u16),
}

pub type Result<T> = std::result::Result<T, DeckError>;
