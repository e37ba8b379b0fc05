use std::{
    io::Read,
    net::{TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{config::SocketConfig, pool::PoolEntry, protocol::codec::get_i32};

use super::Socket;

/// Pool entry that only counts the sockets handed back to it.
pub(crate) struct RecordingPool {
    address: String,
    recycled: AtomicUsize,
}

impl RecordingPool {
    pub fn new(address: &str) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            recycled: AtomicUsize::new(0),
        })
    }

    pub fn recycled(&self) -> usize {
        self.recycled.load(Ordering::SeqCst)
    }
}

impl PoolEntry for RecordingPool {
    fn address(&self) -> &str {
        &self.address
    }

    fn recycle_socket(&self, _socket: Arc<Socket>) {
        self.recycled.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connects a socket to a loopback listener and returns it with the server's end.
pub(crate) fn connected(pool: Arc<dyn PoolEntry>) -> (Arc<Socket>, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let socket = Socket::connect(listener.local_addr().unwrap(), pool, &SocketConfig::default())
        .unwrap();
    let (server, _) = listener.accept().unwrap();
    (socket, server)
}

/// Reads one whole message off the server's end of the connection.
pub(crate) fn read_message(server: &mut TcpStream) -> Vec<u8> {
    let mut message = vec![0; 4];
    server.read_exact(&mut message).unwrap();
    let len = get_i32(&message, 0) as usize;
    message.resize(len, 0);
    server.read_exact(&mut message[4..]).unwrap();
    message
}
