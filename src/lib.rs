//! Transport core of a document database driver.
//!
//! One [`Socket`] owns one TCP connection to a server. Callers on any thread hand it
//! batches of [`InsertOp`]s and [`QueryOp`]s; it encodes them into the server's binary
//! wire format, writes each batch as one contiguous block, and routes every reply back to
//! the [`ReplyHandler`] of the query it answers.
//!
//! # Example
//! ```no_run
//! use bson::{Document, doc};
//! use docwire::{IdleSockets, QueryOp, SocketConfig, collect};
//!
//! let pool = IdleSockets::new("127.0.0.1:27017", SocketConfig::default());
//! let socket = pool.acquire().unwrap();
//!
//! let (handler, reply) = collect();
//! socket
//!     .query([QueryOp::new("app.users", doc! { "name": "ada" }).limit(1).reply(handler)])
//!     .unwrap();
//! let users: Vec<Document> = reply.wait().unwrap().decode().unwrap();
//! socket.im_done().unwrap();
//! ```
pub mod config;
pub mod document;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod socket;

pub use config::SocketConfig;
pub use error::{ConnectionLost, SocketError};
pub use pool::{IdleSockets, PoolEntry};
pub use protocol::{InsertOp, Operation, QueryOp, ReplyHeader};
pub use socket::{PendingReply, Reply, ReplyCollector, ReplyHandler, Socket, collect};
