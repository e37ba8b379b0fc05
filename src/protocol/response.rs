use super::{
    codec::{get_i32, get_i64},
    header::{REPLY_CURSOR_ID, REPLY_DOCUMENT_COUNT, REPLY_FLAGS, REPLY_STARTING_FROM},
};

/// Bits the server may set in a reply's `flags` field.
pub mod reply_flags {
    pub const CURSOR_NOT_FOUND: u32 = 1;
    pub const QUERY_FAILURE: u32 = 1 << 1;
    pub const SHARD_CONFIG_STALE: u32 = 1 << 2;
    pub const AWAIT_CAPABLE: u32 = 1 << 3;
}

/// Fixed fields of an `OP_REPLY` frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyHeader {
    pub flags: u32,
    /// Server side cursor to continue from; 0 when the result is exhausted.
    pub cursor_id: i64,
    /// Position of the first returned document in the overall result.
    pub starting_from: i32,
    pub document_count: i32,
}

impl ReplyHeader {
    /// Reads the reply fields out of a 36 byte frame prefix.
    pub(crate) fn from_prefix(prefix: &[u8]) -> Self {
        Self {
            flags: get_i32(prefix, REPLY_FLAGS) as u32,
            cursor_id: get_i64(prefix, REPLY_CURSOR_ID),
            starting_from: get_i32(prefix, REPLY_STARTING_FROM),
            document_count: get_i32(prefix, REPLY_DOCUMENT_COUNT),
        }
    }

    pub fn cursor_not_found(&self) -> bool {
        self.flags & reply_flags::CURSOR_NOT_FOUND != 0
    }

    /// The single returned document describes the error.
    pub fn query_failure(&self) -> bool {
        self.flags & reply_flags::QUERY_FAILURE != 0
    }

    pub fn shard_config_stale(&self) -> bool {
        self.flags & reply_flags::SHARD_CONFIG_STALE != 0
    }

    pub fn await_capable(&self) -> bool {
        self.flags & reply_flags::AWAIT_CAPABLE != 0
    }
}
