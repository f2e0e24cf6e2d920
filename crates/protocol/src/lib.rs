//! RESP wire-protocol codec: request parsing and reply framing.
//!
//! The parser accepts the canonical RESP array-of-bulk-strings framing used
//! by real Redis clients, and falls back to a whitespace-split line when the
//! first byte isn't `*` so a human typing directly into a raw socket still
//! gets a sane command. The formatter turns a [`Reply`] into the matching
//! wire bytes.
//!
//! ## Architecture
//!
//! - [`parse_request`] turns one read's worth of bytes into a token vector.
//! - [`Reply`] models the five RESP reply types and [`Reply::encode`] frames
//!   them.
//! - [`FrameReader`] isolates the "one read per command" buffering strategy
//!   behind a trait, so a future implementation can swap in a growable,
//!   cross-read buffer without the dispatcher or store noticing.

use keyspace_domain::{KeyspaceError, KeyspaceResult};

/// Maximum number of bytes read for a single request in the default
/// [`FrameReader`] implementations. A bulk string whose declared length
/// exceeds what fits in one read is truncated rather than reassembled
/// across multiple reads; see the crate-level docs.
pub const MAX_REQUEST_BYTES: usize = 1024;

/// Parse one buffered read's worth of bytes into a token vector.
///
/// If the input starts with `*`, it is parsed as the canonical RESP array
/// of bulk strings. Otherwise the entire input is split on ASCII whitespace
/// and each non-empty run becomes a token.
///
/// Returns a protocol error for a malformed canonical frame (bad length
/// prefixes, declared array/bulk lengths that run past the buffer).
pub fn parse_request(buf: &[u8]) -> KeyspaceResult<Vec<Vec<u8>>> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }
    if buf[0] == b'*' {
        parse_resp_array(buf)
    } else {
        Ok(buf
            .split(|b| b.is_ascii_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.to_vec())
            .collect())
    }
}

fn parse_resp_array(buf: &[u8]) -> KeyspaceResult<Vec<Vec<u8>>> {
    let mut lines = CrlfSplitter::new(buf);

    let header = lines
        .next()
        .ok_or_else(|| KeyspaceError::Protocol("empty RESP frame".into()))?;
    let count_str = header
        .strip_prefix(b"*")
        .ok_or_else(|| KeyspaceError::Protocol("expected '*' array header".into()))?;
    let count: usize = parse_ascii_usize(count_str)?;

    let mut tokens = Vec::with_capacity(count);
    for _ in 0..count {
        let len_line = lines
            .next()
            .ok_or_else(|| KeyspaceError::Protocol("truncated bulk header".into()))?;
        let len_str = len_line
            .strip_prefix(b"$")
            .ok_or_else(|| KeyspaceError::Protocol("expected '$' bulk header".into()))?;
        let len = parse_ascii_usize(len_str)?;

        let data = lines
            .next()
            .ok_or_else(|| KeyspaceError::Protocol("truncated bulk payload".into()))?;
        if data.len() != len {
            return Err(KeyspaceError::Protocol(
                "bulk payload length mismatch".into(),
            ));
        }
        tokens.push(data.to_vec());
    }
    Ok(tokens)
}

fn parse_ascii_usize(bytes: &[u8]) -> KeyspaceResult<usize> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| KeyspaceError::Protocol("expected a non-negative integer".into()))
}

/// Splits a buffer on `\r\n` (falling back to bare `\n`), yielding each line
/// without its terminator. Used only for the canonical array framing; the
/// whitespace fallback path never calls this.
struct CrlfSplitter<'a> {
    rest: &'a [u8],
}

impl<'a> CrlfSplitter<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf }
    }
}

impl<'a> Iterator for CrlfSplitter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(pos) = self.rest.windows(2).position(|w| w == b"\r\n") {
            let (line, remainder) = self.rest.split_at(pos);
            self.rest = &remainder[2..];
            Some(line)
        } else if let Some(pos) = self.rest.iter().position(|&b| b == b'\n') {
            let (line, remainder) = self.rest.split_at(pos);
            self.rest = &remainder[1..];
            Some(line)
        } else {
            let line = self.rest;
            self.rest = &[];
            Some(line)
        }
    }
}

/// A RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>\r\n`
    Simple(String),
    /// `-<text>\r\n`
    Error(String),
    /// `:<n>\r\n`
    Integer(i64),
    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for [`Reply::Nil`].
    Bulk(Vec<u8>),
    /// `$-1\r\n`
    Nil,
    /// `*<n>\r\n` followed by `n` replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// A bulk reply built from a UTF-8 string.
    pub fn bulk(s: impl Into<Vec<u8>>) -> Self {
        Reply::Bulk(s.into())
    }

    /// An error reply carrying `message` as its text.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// The conventional `+OK\r\n` reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".into())
    }

    /// Frame this reply into its RESP wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Error(s) => {
                out.push(b'-');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Integer(n) => {
                out.push(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(bytes) => {
                out.push(b'$');
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
            Reply::Nil => {
                out.extend_from_slice(b"$-1\r\n");
            }
            Reply::Array(items) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode_into(out);
                }
            }
        }
    }
}

impl From<KeyspaceError> for Reply {
    fn from(err: KeyspaceError) -> Self {
        Reply::error(err.client_message())
    }
}

/// Abstracts "get the next request's bytes" so the one-read-per-command
/// strategy used by the connection server can later be swapped for a
/// growable, cross-read buffer without touching callers.
pub trait FrameReader {
    /// Read the next request frame. `Ok(None)` means the peer closed the
    /// connection cleanly.
    fn read_frame(&mut self) -> KeyspaceResult<Option<Vec<u8>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_array() {
        let tokens = parse_request(b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n").unwrap();
        assert_eq!(tokens, vec![b"ECHO".to_vec(), b"hi".to_vec()]);
    }

    #[test]
    fn parses_whitespace_fallback() {
        let tokens = parse_request(b"SET foo bar\r\n").unwrap();
        assert_eq!(
            tokens,
            vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()]
        );
    }

    #[test]
    fn empty_input_yields_empty_tokens() {
        assert_eq!(parse_request(b"").unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn rejects_bulk_length_mismatch() {
        let err = parse_request(b"*1\r\n$5\r\nhi\r\n").unwrap_err();
        assert!(matches!(err, KeyspaceError::Protocol(_)));
    }

    #[test]
    fn encodes_simple_string() {
        assert_eq!(Reply::ok().encode(), b"+OK\r\n");
    }

    #[test]
    fn encodes_bulk_and_nil() {
        assert_eq!(Reply::bulk("bar").encode(), b"$3\r\nbar\r\n");
        assert_eq!(Reply::Nil.encode(), b"$-1\r\n");
    }

    #[test]
    fn encodes_nested_array() {
        let reply = Reply::Array(vec![Reply::bulk("a"), Reply::bulk("b")]);
        assert_eq!(reply.encode(), b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");
    }

    #[test]
    fn encodes_error() {
        assert_eq!(
            Reply::error("Error: bad").encode(),
            b"-Error: bad\r\n".to_vec()
        );
    }
}
