use bytes::Bytes;
use chunkd::http::parser::{find_request_end, parse_request};
use chunkd::http::request::{Request, extract_filename};

fn parse(raw: &'static [u8]) -> Request {
    parse_request(&Bytes::from_static(raw))
}

#[test]
fn test_request_end_missing_terminator() {
    assert_eq!(find_request_end(b"/get/file.bin\r\n"), None);
    assert_eq!(find_request_end(b""), None);
}

#[test]
fn test_request_end_first_terminator_wins() {
    let buf = b"GET\r\n\r\n/get/a\r\n\r\n";
    assert_eq!(find_request_end(buf), Some(7));
}

#[test]
fn test_parse_bare_get_is_keepalive() {
    assert_eq!(parse(b"GET\r\n\r\n"), Request::KeepAlive);
    assert_eq!(parse(b"  GET  \r\n\r\n"), Request::KeepAlive);
}

#[test]
fn test_parse_path_token() {
    let req = parse(b"/get/report.bin\r\n\r\n");

    assert_eq!(req.token(), Some(&b"/get/report.bin"[..]));
    assert_eq!(req.filename(), Some(&b"report.bin"[..]));
}

#[test]
fn test_parse_http_request_line_uses_target() {
    let req = parse(b"GET /get/report.bin HTTP/1.1\r\nHost: example.com\r\n\r\n");

    assert_eq!(req.token(), Some(&b"/get/report.bin"[..]));
    assert_eq!(req.filename(), Some(&b"report.bin"[..]));
}

#[test]
fn test_parse_token_without_marker_has_empty_filename() {
    let req = parse(b"/index.html\r\n\r\n");

    assert_eq!(req.token(), Some(&b"/index.html"[..]));
    assert_eq!(req.filename(), Some(&b""[..]));
}

#[test]
fn test_parse_empty_block() {
    let req = parse(b"\r\n\r\n");

    assert_eq!(req.token(), Some(&b""[..]));
    assert_eq!(req.filename(), Some(&b""[..]));
}

#[test]
fn test_parse_get_is_case_sensitive() {
    let req = parse(b"get\r\n\r\n");
    assert_eq!(req.token(), Some(&b"get"[..]));
}

#[test]
fn test_extract_filename_after_first_marker() {
    assert_eq!(extract_filename(b"/get/a.txt"), b"a.txt");
    assert_eq!(extract_filename(b"/files/get/a.txt"), b"a.txt");
    assert_eq!(extract_filename(b"/get/sub/get/b"), b"sub/get/b");
    assert_eq!(extract_filename(b"/get/"), b"");
    assert_eq!(extract_filename(b"get/a.txt"), b"");
}

#[test]
fn test_parse_non_utf8_kept_byte_exact() {
    let req = parse(b"/get/caf\xe9.bin\r\n\r\n");

    assert_eq!(req.token(), Some(&b"/get/caf\xe9.bin"[..]));
    assert_eq!(req.filename(), Some(&b"caf\xe9.bin"[..]));

    let req = parse(b"GET /get/\xff\xfe HTTP/1.1\r\n\r\n");
    assert_eq!(req.filename(), Some(&b"\xff\xfe"[..]));
}
