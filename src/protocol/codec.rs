//! Little-endian byte helpers used to build and parse wire messages.
//!
//! Writers append to a growable buffer; `set_*`/`get_*` work at explicit offsets and
//! expect the caller to keep them in range.
use crate::document::{DocumentError, Marshal};

use super::header::{HEADER_SIZE, MESSAGE_OPCODE};

/// Appends a zeroed message header and stamps `opcode` into it. The message length
/// and request id are left for the caller to patch once they are known.
pub fn add_header(buf: &mut Vec<u8>, opcode: i32) {
    let start = buf.len();
    buf.resize(start + HEADER_SIZE, 0);
    set_i32(buf, start + MESSAGE_OPCODE, opcode);
}

pub fn add_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Appends `value` followed by a single zero byte. Embedded zeros are not escaped.
pub fn add_cstring(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

/// Marshals `doc` and appends the encoded bytes. On failure the buffer is untouched.
pub fn add_document(buf: &mut Vec<u8>, doc: &dyn Marshal) -> Result<(), DocumentError> {
    let data = doc.marshal()?;
    buf.extend_from_slice(&data);
    Ok(())
}

pub fn set_i32(buf: &mut [u8], pos: usize, value: i32) {
    buf[pos..pos + 4].clone_from_slice(&value.to_le_bytes());
}

pub fn get_i32(buf: &[u8], pos: usize) -> i32 {
    let mut bytes = [0; 4];
    bytes.clone_from_slice(&buf[pos..pos + 4]);
    i32::from_le_bytes(bytes)
}

pub fn get_i64(buf: &[u8], pos: usize) -> i64 {
    let mut bytes = [0; 8];
    bytes.clone_from_slice(&buf[pos..pos + 8]);
    i64::from_le_bytes(bytes)
}
