use std::time::Duration;

/// Largest message a server will send, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 48_000_000;

/// Tunables applied when a [`Socket`](crate::Socket) is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Replies declaring a larger length are treated as a corrupted stream.
    pub max_message_size: usize,
    /// Initial size of the reader's document scratch buffer.
    pub scratch_capacity: usize,
    /// Disable Nagle's algorithm on connections opened by `Socket::connect`.
    pub nodelay: bool,
    /// Bound on a single blocking write. A write that times out fails the socket like
    /// any other transport error; `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            scratch_capacity: 256,
            nodelay: true,
            write_timeout: None,
        }
    }
}
