use std::fmt;

use crate::{
    document::{DocumentError, Marshal},
    socket::ReplyHandler,
};

use super::{
    OP_INSERT, OP_QUERY,
    codec::{add_cstring, add_document, add_header, add_i32, set_i32},
    header::MESSAGE_LENGTH,
};

/// Bits accepted in the `flags` field of a query.
pub mod query_flags {
    pub const TAILABLE_CURSOR: u32 = 1 << 1;
    pub const SLAVE_OK: u32 = 1 << 2;
    pub const OPLOG_REPLAY: u32 = 1 << 3;
    pub const NO_CURSOR_TIMEOUT: u32 = 1 << 4;
    pub const AWAIT_DATA: u32 = 1 << 5;
    pub const EXHAUST: u32 = 1 << 6;
    pub const PARTIAL: u32 = 1 << 7;
}

/// Persists documents into a collection. The server sends no reply.
pub struct InsertOp {
    /// Full collection name, `"database.collection"`.
    pub collection: String,
    pub documents: Vec<Box<dyn Marshal>>,
}

impl InsertOp {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            documents: Vec::new(),
        }
    }

    pub fn document<D: Marshal + 'static>(mut self, doc: D) -> Self {
        self.documents.push(Box::new(doc));
        self
    }
}

impl fmt::Debug for InsertOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertOp")
            .field("collection", &self.collection)
            .field("documents", &self.documents.len())
            .finish()
    }
}

/// Looks up documents in a collection. Replies are routed to `handler`; a query
/// without one is sent with request id 0 and its reply, if any, is dropped.
pub struct QueryOp {
    pub collection: String,
    pub query: Box<dyn Marshal>,
    pub selector: Option<Box<dyn Marshal>>,
    pub skip: i32,
    pub limit: i32,
    pub flags: u32,
    pub handler: Option<Box<dyn ReplyHandler>>,
}

impl QueryOp {
    pub fn new<D: Marshal + 'static>(collection: impl Into<String>, query: D) -> Self {
        Self {
            collection: collection.into(),
            query: Box::new(query),
            selector: None,
            skip: 0,
            limit: 0,
            flags: 0,
            handler: None,
        }
    }

    pub fn selector<D: Marshal + 'static>(mut self, selector: D) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn skip(mut self, skip: i32) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn reply<H: ReplyHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOp")
            .field("collection", &self.collection)
            .field("selector", &self.selector.is_some())
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .field("flags", &self.flags)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub enum Operation {
    Insert(InsertOp),
    Query(QueryOp),
}

impl From<InsertOp> for Operation {
    fn from(value: InsertOp) -> Self {
        Operation::Insert(value)
    }
}

impl From<QueryOp> for Operation {
    fn from(value: QueryOp) -> Self {
        Operation::Query(value)
    }
}

/// A message in an encoded batch that still needs a request id.
pub struct PendingRequest {
    /// Offset of the message header inside the batch buffer.
    pub position: usize,
    pub handler: Box<dyn ReplyHandler>,
}

/// Serializes `ops` into `buf` in order, patching each message's length.
///
/// Returns the messages that expect a reply; their request ids are still zero. If any
/// document fails to marshal the error is returned and the batch must not be sent.
pub fn encode(buf: &mut Vec<u8>, ops: Vec<Operation>) -> Result<Vec<PendingRequest>, DocumentError> {
    let mut pending = Vec::new();

    for op in ops {
        let start = buf.len();
        let handler = match op {
            Operation::Insert(op) => {
                add_header(buf, OP_INSERT);
                add_i32(buf, 0);
                add_cstring(buf, &op.collection);
                for doc in &op.documents {
                    add_document(buf, doc.as_ref())?;
                }
                None
            }
            Operation::Query(op) => {
                add_header(buf, OP_QUERY);
                add_i32(buf, op.flags as i32);
                add_cstring(buf, &op.collection);
                add_i32(buf, op.skip);
                add_i32(buf, op.limit);
                add_document(buf, op.query.as_ref())?;
                if let Some(selector) = &op.selector {
                    add_document(buf, selector.as_ref())?;
                }
                op.handler
            }
        };

        let len = (buf.len() - start) as i32;
        set_i32(buf, start + MESSAGE_LENGTH, len);

        if let Some(handler) = handler {
            pending.push(PendingRequest {
                position: start,
                handler,
            });
        }
    }

    Ok(pending)
}
