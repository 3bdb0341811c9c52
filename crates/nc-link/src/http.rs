//! HTTP link to the game's local web server.
//!
//! The server answers `GET /?variable=NAME` with the value as plain text and
//! accepts `POST /?variable=NAME&value=VALUE`. One short-lived connection is
//! used per request.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{LinkError, LinkResult};
use crate::link::PlantLink;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Plant link over HTTP/1.1.
#[derive(Debug, Clone)]
pub struct HttpLink {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HttpLink {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the connect/read/write timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&self) -> LinkResult<TcpStream> {
        let addr = self.address();
        let candidates: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|source| LinkError::Connect {
                addr: addr.clone(),
                source,
            })?
            .collect();

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "host resolved to no addresses",
        );
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_err = e,
            }
        }
        Err(LinkError::Connect {
            addr,
            source: last_err,
        })
    }

    fn request(&self, method: &str, query: &str, variable: &str) -> LinkResult<String> {
        let mut stream = self.connect()?;
        let request = format!(
            "{method} /?{query} HTTP/1.1\r\nHost: {}\r\n\
             Content-Length: 0\r\nConnection: close\r\n\r\n",
            self.address()
        );
        stream.write_all(request.as_bytes())?;
        stream.flush()?;

        let raw = read_response(&mut stream)?;
        let (status, body) = parse_response(&raw)?;
        if status != 200 {
            return Err(LinkError::Status {
                variable: variable.to_string(),
                status,
                body,
            });
        }
        Ok(body)
    }
}

impl PlantLink for HttpLink {
    fn read(&mut self, variable: &str) -> LinkResult<String> {
        let query = format!("variable={}", encode_component(variable));
        let body = self.request("GET", &query, variable)?;
        tracing::trace!(variable, value = body.trim(), "read");
        Ok(body.trim().to_string())
    }

    fn write(&mut self, variable: &str, value: &str) -> LinkResult<()> {
        let query = format!(
            "variable={}&value={}",
            encode_component(variable),
            encode_component(value)
        );
        self.request("POST", &query, variable)?;
        tracing::trace!(variable, value, "write");
        Ok(())
    }
}

/// Percent-encode everything outside the unreserved URI characters.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Read one response, stopping once its body is complete.
///
/// The server may keep the connection open despite `Connection: close`, so
/// EOF is only relied on when the response declares no body length.
fn read_response(stream: &mut impl Read) -> LinkResult<Vec<u8>> {
    let mut raw = Vec::new();
    let mut buf = [0_u8; 1024];
    loop {
        if let Some(end) = complete_len(&raw) {
            raw.truncate(end);
            return Ok(raw);
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(raw);
        }
        raw.extend_from_slice(&buf[..n]);
    }
}

/// Length of the full response in `raw`, once it has all arrived.
fn complete_len(raw: &[u8]) -> Option<usize> {
    let split = header_end(raw)?;
    let start = split + 4;
    match body_framing(&String::from_utf8_lossy(&raw[..split])) {
        (_, true) => chunked_len(&raw[start..]).map(|len| start + len),
        (Some(len), false) => (raw.len() >= start + len).then_some(start + len),
        (None, false) => None,
    }
}

/// Bytes taken by a chunked body including its trailer, once complete.
///
/// A malformed chunk size counts as complete so the parser can report it.
fn chunked_len(body: &[u8]) -> Option<usize> {
    let mut pos = 0;
    loop {
        let line_end = pos + find(&body[pos..], b"\r\n")?;
        let size_text = String::from_utf8_lossy(&body[pos..line_end]);
        let size_hex = size_text.split(';').next().unwrap_or_default().trim();
        let Ok(size) = usize::from_str_radix(size_hex, 16) else {
            return Some(body.len());
        };
        pos = line_end + 2;
        if size == 0 {
            if body[pos..].starts_with(b"\r\n") {
                return Some(pos + 2);
            }
            return find(&body[pos..], b"\r\n\r\n").map(|i| pos + i + 4);
        }
        if body.len() < pos + size + 2 {
            return None;
        }
        pos += size + 2;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn header_end(raw: &[u8]) -> Option<usize> {
    find(raw, b"\r\n\r\n")
}

/// Content length and chunked flag from the header block.
fn body_framing(head: &str) -> (Option<usize>, bool) {
    let mut content_length = None;
    let mut chunked = false;
    for line in head.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name == "content-length" {
            content_length = value.parse::<usize>().ok();
        } else if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
            chunked = true;
        }
    }
    (content_length, chunked)
}

/// Split a raw HTTP/1.1 response into status code and body text.
pub fn parse_response(raw: &[u8]) -> LinkResult<(u16, String)> {
    let split = header_end(raw).ok_or_else(|| LinkError::Protocol {
        what: "response has no header terminator".to_string(),
    })?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let body = &raw[split + 4..];

    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| LinkError::Protocol {
            what: format!("bad status line {status_line:?}"),
        })?;

    let body = match body_framing(&head) {
        (_, true) => decode_chunked(body)?,
        (Some(len), false) => body
            .get(..len)
            .ok_or_else(|| LinkError::Protocol {
                what: format!("body shorter than content-length {len}"),
            })?
            .to_vec(),
        (None, false) => body.to_vec(),
    };

    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

fn decode_chunked(mut body: &[u8]) -> LinkResult<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = find(body, b"\r\n").ok_or_else(|| LinkError::Protocol {
            what: "unterminated chunk size".to_string(),
        })?;
        let size_text = String::from_utf8_lossy(&body[..line_end]);
        let size_hex = size_text.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| LinkError::Protocol {
            what: format!("bad chunk size {size_hex:?}"),
        })?;
        body = &body[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        let chunk = body.get(..size).ok_or_else(|| LinkError::Protocol {
            what: "chunk shorter than declared size".to_string(),
        })?;
        out.extend_from_slice(chunk);
        body = body.get(size + 2..).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_content_length_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 6\r\n\r\n312.75";
        let (status, body) = parse_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "312.75");
    }

    #[test]
    fn parse_chunked_body() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
            3\r\n312\r\n3\r\n,75\r\n0\r\n\r\n";
        let (_, body) = parse_response(raw).unwrap();
        assert_eq!(body, "312,75");
    }

    #[test]
    fn parse_body_until_close() {
        let raw = b"HTTP/1.1 404 Not Found\r\n\r\nno such variable";
        let (status, body) = parse_response(raw).unwrap();
        assert_eq!(status, 404);
        assert_eq!(body, "no such variable");
    }

    #[test]
    fn malformed_responses() {
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\n"),
            Err(LinkError::Protocol { .. })
        ));
        assert!(matches!(
            parse_response(b"garbage\r\n\r\n"),
            Err(LinkError::Protocol { .. })
        ));
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort"),
            Err(LinkError::Protocol { .. })
        ));
    }

    #[test]
    fn complete_len_waits_for_declared_body() {
        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\n";
        assert_eq!(complete_len(head), None);
        assert_eq!(complete_len(b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\n312"), None);
        let full = b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\n312.75";
        assert_eq!(complete_len(full), Some(full.len()));
        // no length: only EOF ends it
        assert_eq!(complete_len(b"HTTP/1.1 200 OK\r\n\r\n312.75"), None);
    }

    #[test]
    fn complete_len_finds_last_chunk() {
        let partial = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\n312\r\n";
        assert_eq!(complete_len(partial), None);
        let full = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\n312\r\n0\r\n\r\n";
        assert_eq!(complete_len(full), Some(full.len()));
    }

    #[test]
    fn read_stops_at_body_end() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n42trailing garbage";
        let raw = read_response(&mut &wire[..]).unwrap();
        assert_eq!(parse_response(&raw).unwrap(), (200, "42".to_string()));
    }

    #[test]
    fn encode_reserved_characters() {
        assert_eq!(encode_component("CORE_TEMP"), "CORE_TEMP");
        assert_eq!(encode_component("-12.5"), "-12.5");
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
    }
}
