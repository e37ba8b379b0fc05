use std::{
    io::{self, ErrorKind, Read},
    net::TcpStream,
    sync::Weak,
    thread,
};

use log::{debug, trace};

use crate::{
    error::ConnectionLost,
    protocol::{ReplyFrame, ReplyReader, TransportError},
};

use super::{ReplyHandler, Socket};

/// Starts the thread that consumes replies for `socket` until the connection fails.
///
/// The thread only holds a weak reference, so dropping the last handle to the socket
/// shuts the connection down and lets the thread exit.
pub(crate) fn spawn(
    socket: Weak<Socket>,
    mut reader: ReplyReader<TcpStream>,
    address: String,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("docwire-reader-{address}"))
        .spawn(move || {
            let err = loop {
                if let Err(err) = read_reply(&socket, &mut reader, &address) {
                    break err;
                }
            };

            match socket.upgrade() {
                Some(socket) => {
                    debug!("reader for {address} stopped: {err}");
                    socket.fail(err.to_string());
                }
                None => debug!("reader for {address} stopped, socket dropped"),
            }
        })
}

/// Reads one reply and dispatches its documents to the handler waiting on it.
fn read_reply<R: Read>(
    socket: &Weak<Socket>,
    reader: &mut ReplyReader<R>,
    address: &str,
) -> Result<(), TransportError> {
    let mut frame = reader.read_frame()?;
    debug!("got reply ({} bytes) from {address}", frame.length());

    let mut handler = match socket.upgrade() {
        Some(socket) => socket.take_handler(frame.response_to),
        None => return Err(io::Error::from(ErrorKind::NotConnected).into()),
    };
    if handler.is_none() {
        trace!("no handler waiting on request {}", frame.response_to);
    }

    let header = frame.header;
    match read_documents(reader, &mut frame, &mut handler) {
        Ok(()) => {
            if let Some(mut handler) = handler {
                handler.complete(&header);
            }
            Ok(())
        }
        Err(err) => {
            if let Some(mut handler) = handler {
                handler.lost(&ConnectionLost {
                    address: address.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(err)
        }
    }
}

fn read_documents<R: Read>(
    reader: &mut ReplyReader<R>,
    frame: &mut ReplyFrame,
    handler: &mut Option<Box<dyn ReplyHandler>>,
) -> Result<(), TransportError> {
    let header = frame.header;
    for index in 0..header.document_count as usize {
        let data = reader.read_document(frame)?;
        if let Some(handler) = handler.as_mut() {
            handler.document(&header, index, data);
        }
    }
    frame.finish()?;
    Ok(())
}
