use bytes::Bytes;

use crate::http::request::{KEEPALIVE_TOKEN, Request};

/// Byte sequence that ends every inbound request.
pub const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Returns the length of the first complete request block in `buf`,
/// terminator included, or `None` if the terminator has not arrived yet.
pub fn find_request_end(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len())
        .position(|w| w == TERMINATOR)
        .map(|pos| pos + TERMINATOR.len())
}

/// Interprets one request block.
///
/// Only ASCII-whitespace-delimited tokens matter, and they are kept
/// byte-for-byte. A lone `GET` is a keep-alive. When `GET` is followed by another
/// token (the shape of an HTTP request line), that second token is the path
/// specifier. Any other first token is the path specifier itself; an empty
/// block yields an empty one.
pub fn parse_request(block: &Bytes) -> Request {
    let mut tokens = block
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty());

    match tokens.next() {
        Some(KEEPALIVE_TOKEN) => match tokens.next() {
            Some(target) => Request::fetch(block.slice_ref(target)),
            None => Request::KeepAlive,
        },
        Some(token) => Request::fetch(block.slice_ref(token)),
        None => Request::fetch(Bytes::new()),
    }
}
