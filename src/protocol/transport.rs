use std::io::{self, Read};

use thiserror::Error;

use crate::config::SocketConfig;

use super::{
    OP_REPLY, ReplyHeader,
    codec::get_i32,
    header::{
        DOCUMENT_PREFIX_SIZE, MESSAGE_LENGTH, MESSAGE_OPCODE, MESSAGE_RESPONSE_TO,
        REPLY_PREFIX_SIZE,
    },
};

/// Malformed input on the read side. Any of these leaves the stream at an unknown
/// position, so the connection cannot be used afterwards.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("got opcode {0} where a reply was expected, corrupted stream?")]
    UnexpectedOpcode(i32),
    #[error("reply of {0} bytes is shorter than its fixed fields")]
    MessageTooShort(i32),
    #[error("reply of {length} bytes exceeds the {max} byte limit")]
    MessageTooLarge { length: i32, max: usize },
    #[error("reply declares {0} documents")]
    NegativeDocumentCount(i32),
    #[error("document of {0} bytes is shorter than an empty document")]
    DocumentTooShort(i32),
    #[error("document of {length} bytes overruns the {remaining} bytes left in the reply")]
    DocumentOverrun { length: i32, remaining: usize },
    #[error("reply declared {declared} bytes but its documents span {consumed}")]
    LengthMismatch { declared: usize, consumed: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// A reply whose fixed fields have been read; its documents are still on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyFrame {
    pub response_to: u32,
    pub header: ReplyHeader,
    length: usize,
    consumed: usize,
}

impl ReplyFrame {
    pub fn length(&self) -> usize {
        self.length
    }

    /// Checks that every declared byte of the message has been consumed.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.consumed != self.length {
            return Err(ProtocolError::LengthMismatch {
                declared: self.length,
                consumed: self.consumed,
            });
        }
        Ok(())
    }
}

/// Reads reply frames off a stream, one document at a time, through a reusable scratch
/// buffer that grows to the largest document seen.
pub struct ReplyReader<R: Read> {
    stream: R,
    scratch: Vec<u8>,
    max_message_size: usize,
}

impl<R: Read> ReplyReader<R> {
    pub fn new(stream: R, config: &SocketConfig) -> Self {
        Self {
            stream,
            scratch: Vec::with_capacity(config.scratch_capacity.max(DOCUMENT_PREFIX_SIZE)),
            max_message_size: config.max_message_size,
        }
    }

    pub fn read_frame(&mut self) -> Result<ReplyFrame, TransportError> {
        let mut prefix = [0u8; REPLY_PREFIX_SIZE];
        self.stream.read_exact(&mut prefix)?;

        let length = get_i32(&prefix, MESSAGE_LENGTH);
        let response_to = get_i32(&prefix, MESSAGE_RESPONSE_TO) as u32;
        let opcode = get_i32(&prefix, MESSAGE_OPCODE);

        if opcode != OP_REPLY {
            return Err(ProtocolError::UnexpectedOpcode(opcode).into());
        }
        if length < REPLY_PREFIX_SIZE as i32 {
            return Err(ProtocolError::MessageTooShort(length).into());
        }
        if length as usize > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                length,
                max: self.max_message_size,
            }
            .into());
        }

        let header = ReplyHeader::from_prefix(&prefix);
        if header.document_count < 0 {
            return Err(ProtocolError::NegativeDocumentCount(header.document_count).into());
        }

        Ok(ReplyFrame {
            response_to,
            header,
            length: length as usize,
            consumed: REPLY_PREFIX_SIZE,
        })
    }

    /// Reads the next document of `frame`. The returned slice is only valid until the
    /// next read.
    pub fn read_document(&mut self, frame: &mut ReplyFrame) -> Result<&[u8], TransportError> {
        let remaining = frame.length - frame.consumed;
        if remaining < DOCUMENT_PREFIX_SIZE {
            return Err(ProtocolError::DocumentOverrun {
                length: DOCUMENT_PREFIX_SIZE as i32,
                remaining,
            }
            .into());
        }

        if self.scratch.len() < DOCUMENT_PREFIX_SIZE {
            self.scratch.resize(DOCUMENT_PREFIX_SIZE, 0);
        }
        self.stream
            .read_exact(&mut self.scratch[..DOCUMENT_PREFIX_SIZE])?;

        let length = get_i32(&self.scratch, 0);
        if length < DOCUMENT_PREFIX_SIZE as i32 {
            return Err(ProtocolError::DocumentTooShort(length).into());
        }
        if length as usize > remaining {
            return Err(ProtocolError::DocumentOverrun { length, remaining }.into());
        }

        let length = length as usize;
        self.scratch.resize(length, 0);
        self.stream
            .read_exact(&mut self.scratch[DOCUMENT_PREFIX_SIZE..])?;
        frame.consumed += length;

        Ok(&self.scratch[..length])
    }
}

/// Builds a reply frame the way a server would.
#[cfg(test)]
pub(crate) fn build_reply(response_to: u32, header: ReplyHeader, docs: &[Vec<u8>]) -> Vec<u8> {
    use super::codec::{add_header, add_i32, set_i32};

    let mut buf = Vec::new();
    add_header(&mut buf, OP_REPLY);
    set_i32(&mut buf, MESSAGE_RESPONSE_TO, response_to as i32);
    add_i32(&mut buf, header.flags as i32);
    buf.extend_from_slice(&header.cursor_id.to_le_bytes());
    add_i32(&mut buf, header.starting_from);
    add_i32(&mut buf, header.document_count);
    for doc in docs {
        buf.extend_from_slice(doc);
    }
    let len = buf.len() as i32;
    set_i32(&mut buf, MESSAGE_LENGTH, len);
    buf
}
