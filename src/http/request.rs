use bytes::Bytes;

/// Marker that precedes the filename inside a path specifier.
pub const GET_MARKER: &[u8] = b"/get/";

/// The keep-alive token.
pub const KEEPALIVE_TOKEN: &[u8] = b"GET";

/// A request recognized from one terminated request block.
///
/// Tokens are kept as raw bytes: nothing on the wire is assumed to be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A bare `GET`: nothing to serve, keep reading on the same connection.
    KeepAlive,
    /// A path specifier naming a file.
    Fetch {
        /// The path specifier exactly as received (e.g. `/get/report.bin`).
        token: Bytes,
        /// Bytes following `/get/`, or empty when the marker is absent.
        filename: Bytes,
    },
}

impl Request {
    /// Builds a fetch request from a path specifier token.
    ///
    /// # Example
    ///
    /// ```
    /// # use chunkd::http::request::Request;
    /// let req = Request::fetch("/get/data.bin");
    /// assert_eq!(req.filename(), Some(&b"data.bin"[..]));
    ///
    /// let req = Request::fetch("/favicon.ico");
    /// assert_eq!(req.filename(), Some(&b""[..]));
    /// ```
    pub fn fetch(token: impl Into<Bytes>) -> Self {
        let token = token.into();
        let filename = match find_marker(&token) {
            Some(idx) => token.slice(idx + GET_MARKER.len()..),
            None => Bytes::new(),
        };
        Request::Fetch { token, filename }
    }

    /// The path specifier, if this request names one.
    pub fn token(&self) -> Option<&[u8]> {
        match self {
            Request::KeepAlive => None,
            Request::Fetch { token, .. } => Some(token),
        }
    }

    pub fn filename(&self) -> Option<&[u8]> {
        match self {
            Request::KeepAlive => None,
            Request::Fetch { filename, .. } => Some(filename),
        }
    }
}

/// Returns the bytes after the first `/get/` in `token`, or an empty slice.
pub fn extract_filename(token: &[u8]) -> &[u8] {
    find_marker(token)
        .map(|idx| &token[idx + GET_MARKER.len()..])
        .unwrap_or(&[])
}

fn find_marker(token: &[u8]) -> Option<usize> {
    token
        .windows(GET_MARKER.len())
        .position(|w| w == GET_MARKER)
}
