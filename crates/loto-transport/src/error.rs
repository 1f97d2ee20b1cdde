/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel was unsubscribed or its member entry is gone.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Subscribing to a room failed.
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
