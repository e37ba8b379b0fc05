//! Driver wire protocol.
//!
//! This module defines the binary messages exchanged between the driver and a document
//! database server: how outbound operations are encoded into frames and how inbound reply
//! frames are parsed back into headers and raw documents.
//!
//! # Overview
//!
//! Every message begins with the same 16 byte header, followed by an opcode specific body:
//!
//! - `OP_INSERT` (2002): reserved `int32`, collection name, one or more documents.
//! - `OP_QUERY` (2004): flags, collection name, skip, limit, query document and an
//!   optional field selector document.
//! - `OP_REPLY` (1, inbound only): flags, cursor id, starting index, document count and
//!   that many length-prefixed documents.
//!
//! All integers are little-endian. Collection names are zero-terminated strings of the
//! form `"database.collection"`.
//!
//! # Key Components
//!
//! - [`Operation`]: the closed set of outbound operations.
//! - [`encode`]: serializes a batch of operations into one buffer.
//! - [`ReplyHeader`]: fixed fields of a reply frame.
//! - [`ReplyReader`]: reads reply frames off a stream, validating their framing.
//!
//! # See Also
//!
//! - [`socket`](crate::socket): multiplexes encoded batches and replies over one connection.
pub mod codec;
mod request;
mod response;
mod transport;

pub use request::{InsertOp, Operation, PendingRequest, QueryOp, encode, query_flags};
pub use response::{ReplyHeader, reply_flags};
pub use transport::{ProtocolError, ReplyFrame, ReplyReader, TransportError};

#[cfg(test)]
pub(crate) use transport::build_reply;

pub const OP_REPLY: i32 = 1;
pub const OP_INSERT: i32 = 2002;
pub const OP_QUERY: i32 = 2004;

pub mod header {
    pub(crate) const HEADER_SIZE: usize = 16;

    pub(crate) const MESSAGE_LENGTH: usize = 0;
    pub(crate) const MESSAGE_REQUEST_ID: usize = 4;
    pub(crate) const MESSAGE_RESPONSE_TO: usize = 8;
    pub(crate) const MESSAGE_OPCODE: usize = 12;

    pub(crate) const REPLY_FLAGS: usize = HEADER_SIZE;
    pub(crate) const REPLY_CURSOR_ID: usize = REPLY_FLAGS + 4;
    pub(crate) const REPLY_STARTING_FROM: usize = REPLY_CURSOR_ID + 8;
    pub(crate) const REPLY_DOCUMENT_COUNT: usize = REPLY_STARTING_FROM + 4;
    pub(crate) const REPLY_PREFIX_SIZE: usize = REPLY_DOCUMENT_COUNT + 4;

    /// Bytes read ahead of every reply document: its `int32` length and first type byte.
    pub(crate) const DOCUMENT_PREFIX_SIZE: usize = 5;
}
