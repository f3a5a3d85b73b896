use bytes::{BufMut, Bytes, BytesMut};

/// HTTP status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use chunkd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A response head plus an optional inline body.
///
/// File bodies are never held here; they are streamed chunk by chunk after
/// the head has been queued.
#[derive(Debug)]
pub struct Response {
    pub version: &'static str,
    pub status: StatusCode,
    /// Headers in emission order. Values are raw bytes so a filename is
    /// echoed exactly as requested.
    pub headers: Vec<(String, Bytes)>,
    pub body: Bytes,
}

/// Builder for constructing responses in a fluent style.
///
/// # Example
///
/// ```
/// # use chunkd::http::response::{ResponseBuilder, StatusCode};
/// let bytes = ResponseBuilder::new("HTTP/1.1", StatusCode::Ok)
///     .header("Content-Length", "0")
///     .build()
///     .serialize();
/// assert_eq!(&bytes[..], b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
/// ```
pub struct ResponseBuilder {
    version: &'static str,
    status: StatusCode,
    headers: Vec<(String, Bytes)>,
    body: Bytes,
}

impl ResponseBuilder {
    pub fn new(version: &'static str, status: StatusCode) -> Self {
        Self {
            version,
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header. Order is preserved on the wire.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            version: self.version,
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Head announcing a file download of `content_length` bytes.
    pub fn file_header(filename: &[u8], content_length: u64) -> Self {
        ResponseBuilder::new("HTTP/1.1", StatusCode::Ok)
            .header("Content-Description", "File Transfer")
            .header("Content-Type", "application/octet-stream")
            .header(
                "Content-Disposition",
                [&b"attachment; filename="[..], filename].concat(),
            )
            .header("Content-Transfer-Encoding", "binary")
            .header("Expires", "0")
            .header("Cache-Control", "must-revalidate")
            .header("Pragma", "public")
            .header("Content-Length", content_length.to_string())
            .build()
    }

    /// Not-found page echoing the path specifier the client sent.
    pub fn not_found(token: &[u8]) -> Self {
        let body = [
            &b"\r\n<html><head><title>Not Found</title></head><body><h1>404 Not Found "[..],
            token,
            &b"</h1></body></html>"[..],
        ]
        .concat();
        ResponseBuilder::new("HTTP/1.0", StatusCode::NotFound)
            .body(body)
            .build()
    }

    /// Renders the status line, headers, blank line and inline body.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256 + self.body.len());

        buf.put_slice(
            format!(
                "{} {} {}\r\n",
                self.version,
                self.status.as_u16(),
                self.status.reason_phrase()
            )
            .as_bytes(),
        );

        for (k, v) in &self.headers {
            buf.put_slice(k.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(v);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
        buf.put_slice(&self.body);

        buf.freeze()
    }
}
