use std::sync::mpsc::{self, Receiver, Sender};

use serde::de::DeserializeOwned;

use crate::{
    document::{DocumentError, decode},
    error::{ConnectionLost, SocketError},
    protocol::ReplyHeader,
};

/// Receives the reply to one query.
///
/// `document` is called once per returned document, in order, with its zero based
/// index inside the reply; `complete` follows the last one. If the connection dies
/// first, `lost` is called instead. The handler is dropped afterwards.
pub trait ReplyHandler: Send {
    fn document(&mut self, header: &ReplyHeader, index: usize, data: &[u8]);

    fn complete(&mut self, _header: &ReplyHeader) {}

    fn lost(&mut self, _error: &ConnectionLost) {}
}

impl<F> ReplyHandler for F
where
    F: FnMut(&ReplyHeader, usize, &[u8]) + Send,
{
    fn document(&mut self, header: &ReplyHeader, index: usize, data: &[u8]) {
        self(header, index, data)
    }
}

/// A complete reply with its raw documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub header: ReplyHeader,
    pub documents: Vec<Vec<u8>>,
}

impl Reply {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, DocumentError> {
        self.documents.iter().map(|doc| decode(doc)).collect()
    }
}

/// Gathers a whole reply and hands it to a [`PendingReply`].
#[derive(Debug)]
pub struct ReplyCollector {
    documents: Vec<Vec<u8>>,
    sender: Option<Sender<Result<Reply, SocketError>>>,
}

/// The receiving side of a [`ReplyCollector`].
#[derive(Debug)]
pub struct PendingReply {
    receiver: Receiver<Result<Reply, SocketError>>,
}

/// Creates a handler for a query along with the handle to wait on its reply.
pub fn collect() -> (ReplyCollector, PendingReply) {
    let (sender, receiver) = mpsc::channel();
    (
        ReplyCollector {
            documents: Vec::new(),
            sender: Some(sender),
        },
        PendingReply { receiver },
    )
}

impl ReplyCollector {
    fn send(&mut self, result: Result<Reply, SocketError>) {
        if let Some(sender) = self.sender.take() {
            // the waiter may have given up already
            let _ = sender.send(result);
        }
    }
}

impl ReplyHandler for ReplyCollector {
    fn document(&mut self, _header: &ReplyHeader, _index: usize, data: &[u8]) {
        self.documents.push(data.to_vec());
    }

    fn complete(&mut self, header: &ReplyHeader) {
        let documents = std::mem::take(&mut self.documents);
        self.send(Ok(Reply {
            header: *header,
            documents,
        }));
    }

    fn lost(&mut self, error: &ConnectionLost) {
        self.send(Err(error.clone().into()));
    }
}

impl PendingReply {
    /// Blocks until the reply arrives or the connection is lost.
    ///
    /// Returns [`SocketError::Abandoned`] if the collector was dropped without being
    /// resolved, which happens when another operation of its batch failed to encode.
    pub fn wait(self) -> Result<Reply, SocketError> {
        self.receiver
            .recv()
            .unwrap_or(Err(SocketError::Abandoned))
    }
}
