//! A single multiplexed connection to a database server.
//!
//! A [`Socket`] owns one TCP connection. Any number of threads may push batches of
//! operations through [`Socket::query`] at the same time, while one dedicated reader
//! thread parses replies and routes them to the [`ReplyHandler`] registered for their
//! request id.
//!
//! # Locking
//!
//! One mutex guards the lifecycle state, the request id counter and the map of pending
//! handlers. Encoding happens before the lock is taken; id assignment and the network
//! write happen under it, so batches never interleave mid-frame. The reader only locks
//! to take a handler out of the map, never while blocked on the network.
//!
//! A writer blocked on a full send buffer keeps the lock, so the reader stalls at its
//! next reply until the write drains. A server that stops reading while its own replies
//! back up would hang both sides; [`SocketConfig::write_timeout`] bounds that wait and
//! turns it into a connection failure.
//!
//! # Failure
//!
//! A read error or a malformed reply tears the connection down: the socket is marked
//! closed, every pending handler gets [`ReplyHandler::lost`] and further queries fail
//! with [`SocketError::ConnectionLost`]. Nothing is retried here.
//!
//! # See Also
//!
//! - [`pool`](crate::pool): where sockets go back to when released.
mod correlator;
mod handler;
mod lifecycle;
mod reader;
#[cfg(test)]
pub(crate) mod testing;

use std::{
    io::Write,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info, trace, warn};

use crate::{
    config::SocketConfig,
    error::{ConnectionLost, SocketError},
    pool::PoolEntry,
    protocol::{
        Operation, ReplyReader, TransportError, codec::set_i32, encode, header::MESSAGE_REQUEST_ID,
    },
};

use correlator::Correlator;
use lifecycle::Lifecycle;

pub use handler::{PendingReply, Reply, ReplyCollector, ReplyHandler, collect};
pub use lifecycle::LifecycleError;

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    correlator: Correlator,
    closed: Option<ConnectionLost>,
}

pub struct Socket {
    stream: TcpStream,
    address: String,
    state: Mutex<State>,
}

impl Socket {
    /// Opens a connection to `addr` and wraps it, attached to `pool`.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        pool: Arc<dyn PoolEntry>,
        config: &SocketConfig,
    ) -> Result<Arc<Self>, SocketError> {
        let stream = TcpStream::connect(addr).map_err(TransportError::Io)?;
        stream.set_nodelay(config.nodelay).map_err(TransportError::Io)?;
        Self::new(stream, pool, config)
    }

    /// Wraps an established connection, attaches it to `pool` and starts its reader.
    pub fn new(
        stream: TcpStream,
        pool: Arc<dyn PoolEntry>,
        config: &SocketConfig,
    ) -> Result<Arc<Self>, SocketError> {
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(TransportError::Io)?;
        let reader = stream.try_clone().map_err(TransportError::Io)?;
        let address = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| pool.address().to_string());

        let socket = Arc::new(Self {
            stream,
            address,
            state: Mutex::new(State {
                lifecycle: Lifecycle::Acquired(pool),
                correlator: Correlator::default(),
                closed: None,
            }),
        });

        reader::spawn(
            Arc::downgrade(&socket),
            ReplyReader::new(reader, config),
            socket.address.clone(),
        )
        .map_err(TransportError::Io)?;

        info!("connected to {}", socket.address);
        Ok(socket)
    }

    /// Encodes `ops` and writes them to the server as one contiguous batch.
    ///
    /// Queries carrying a handler get a request id and are answered through it; the
    /// other operations are fire-and-forget. If a document fails to encode nothing is
    /// sent.
    pub fn query<I>(&self, ops: I) -> Result<(), SocketError>
    where
        I: IntoIterator,
        I::Item: Into<Operation>,
    {
        let ops = ops.into_iter().map(Into::into).collect::<Vec<Operation>>();
        let count = ops.len();

        // Encoding may be slow, keep it outside the lock.
        let mut buf = Vec::with_capacity(256);
        let requests = encode(&mut buf, ops)?;

        let mut state = self.state();
        if let Some(lost) = state.closed.clone() {
            drop(state);
            for mut request in requests {
                request.handler.lost(&lost);
            }
            return Err(lost.into());
        }

        let mut ids = Vec::with_capacity(requests.len());
        for request in requests {
            let id = state.correlator.register(request.handler);
            set_i32(&mut buf, request.position + MESSAGE_REQUEST_ID, id as i32);
            ids.push(id);
        }

        debug!(
            "sending {count} op(s) ({} bytes) to {}",
            buf.len(),
            self.address
        );

        if let Err(err) = (&self.stream).write_all(&buf) {
            let unsent = ids
                .iter()
                .filter_map(|id| state.correlator.take(*id))
                .collect::<Vec<_>>();
            drop(state);

            let lost = self.lost(format!("write failed: {err}"));
            for mut handler in unsent {
                handler.lost(&lost);
            }
            self.fail(lost.reason);
            return Err(TransportError::Io(err).into());
        }

        Ok(())
    }

    /// Tears the connection down. Pending handlers are told the connection was lost.
    pub fn close(&self) {
        self.fail("closed by client");
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed.is_some()
    }

    /// Number of requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.state().correlator.len()
    }

    /// Address of the server at the other end.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn take_handler(&self, id: u32) -> Option<Box<dyn ReplyHandler>> {
        self.state().correlator.take(id)
    }

    /// Marks the socket closed, shuts the connection down and fails every pending
    /// request. Only the first reason is kept.
    pub(crate) fn fail(&self, reason: impl Into<String>) {
        let (lost, pending, first) = {
            let mut state = self.state();
            let first = state.closed.is_none();
            let lost = state
                .closed
                .get_or_insert_with(|| self.lost(reason))
                .clone();
            (lost, state.correlator.drain(), first)
        };

        if first {
            warn!("closing connection to {}: {}", self.address, lost.reason);
            let _ = self.stream.shutdown(Shutdown::Both);
        }

        for (id, mut handler) in pending {
            trace!("failing request {id} to {}", self.address);
            handler.lost(&lost);
        }
    }

    fn lost(&self, reason: impl Into<String>) -> ConnectionLost {
        ConnectionLost {
            address: self.address.clone(),
            reason: reason.into(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("address", &self.address)
            .field("state", &*self.state())
            .finish()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let lost = state.closed.take().unwrap_or_else(|| ConnectionLost {
            address: self.address.clone(),
            reason: String::from("socket dropped"),
        });
        for (_, mut handler) in state.correlator.drain() {
            handler.lost(&lost);
        }
        debug!("dropped socket to {}", self.address);
    }
}
