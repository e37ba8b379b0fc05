//! The pool side of a socket's lifecycle.
//!
//! A socket is always handed out by some [`PoolEntry`], usually the object representing
//! one server, and goes back to it when released. [`IdleSockets`] is the simplest such
//! entry: it caches released sockets and reuses them before opening new connections.
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::{SocketConfig, SocketError, socket::Socket};

pub trait PoolEntry: Send + Sync {
    /// Label of the server this entry connects to, used in diagnostics.
    fn address(&self) -> &str;

    /// Takes back a socket its user is finished with.
    fn recycle_socket(&self, socket: Arc<Socket>);
}

/// Cache of idle sockets to a single server.
#[derive(Debug)]
pub struct IdleSockets {
    address: String,
    config: SocketConfig,
    idle: Mutex<Vec<Arc<Socket>>>,
}

impl IdleSockets {
    pub fn new(address: impl Into<String>, config: SocketConfig) -> Arc<Self> {
        Arc::new(Self {
            address: address.into(),
            config,
            idle: Mutex::new(Vec::new()),
        })
    }

    /// Hands out a cached socket, or connects a new one if none is left.
    ///
    /// Cached sockets whose connection died while idle are discarded on the way out.
    pub fn acquire(self: &Arc<Self>) -> Result<Arc<Socket>, SocketError> {
        let pool: Arc<dyn PoolEntry> = self.clone();

        while let Some(socket) = self.pop() {
            if socket.is_closed() {
                debug!("discarding idle socket to {}, connection lost", self.address);
                continue;
            }
            socket.try_acquired(pool)?;
            return Ok(socket);
        }

        Socket::connect(self.address.as_str(), pool, &self.config)
    }

    fn pop(&self) -> Option<Arc<Socket>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    /// Number of sockets waiting to be reused.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl PoolEntry for IdleSockets {
    fn address(&self) -> &str {
        &self.address
    }

    fn recycle_socket(&self, socket: Arc<Socket>) {
        if socket.is_closed() {
            debug!("discarding closed socket to {}", self.address);
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(socket);
    }
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread, time::Duration};

    use super::*;

    fn server() -> (TcpListener, Arc<IdleSockets>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, IdleSockets::new(address, SocketConfig::default()))
    }

    #[test]
    fn released_sockets_are_reused() {
        let (listener, pool) = server();

        let socket = pool.acquire().unwrap();
        let _conn = listener.accept().unwrap();
        socket.im_done().unwrap();
        assert_eq!(pool.idle(), 1);

        let again = pool.acquire().unwrap();
        assert!(Arc::ptr_eq(&socket, &again));
        assert!(again.is_acquired());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn reserved_socket_stays_out() {
        let (listener, pool) = server();

        let socket = pool.acquire().unwrap();
        let _conn = listener.accept().unwrap();
        socket.reserve().unwrap();
        socket.im_done().unwrap();
        assert_eq!(pool.idle(), 0);

        socket.recycle().unwrap();
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn idle_socket_that_lost_its_server_is_replaced() {
        let (listener, pool) = server();

        let socket = pool.acquire().unwrap();
        let (conn, _) = listener.accept().unwrap();
        socket.im_done().unwrap();
        assert_eq!(pool.idle(), 1);

        drop(conn);
        for _ in 0..100 {
            if socket.is_closed() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(socket.is_closed());

        let fresh = pool.acquire().unwrap();
        let _conn = listener.accept().unwrap();
        assert!(!Arc::ptr_eq(&socket, &fresh));
        assert!(!fresh.is_closed());
        assert!(fresh.is_acquired());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn closed_sockets_are_discarded() {
        let (listener, pool) = server();

        let socket = pool.acquire().unwrap();
        let _conn = listener.accept().unwrap();
        socket.close();
        socket.recycle().unwrap();
        assert_eq!(pool.idle(), 0);
    }
}
