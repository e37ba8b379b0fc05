use thiserror::Error;

use crate::{document::DocumentError, protocol::TransportError, socket::LifecycleError};

/// The connection behind a socket is gone; nothing sent on it will be answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection to {address} lost: {reason}")]
pub struct ConnectionLost {
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    ConnectionLost(#[from] ConnectionLost),
    /// The handler was dropped without an answer, e.g. because its batch failed to
    /// encode and was never sent. The connection itself may be fine.
    #[error("reply handler dropped before the request was answered")]
    Abandoned,
}

impl SocketError {
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, SocketError::ConnectionLost(_))
    }
}
