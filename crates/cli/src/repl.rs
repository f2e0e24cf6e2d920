//! A minimal interactive client: connect, send RESP commands, print replies.
//!
//! Grounded on the original project's `RedisClient`/`CommandHandler`/
//! `ResponseParser` trio: open a TCP socket, turn each REPL line into a
//! RESP array of bulk strings, and walk the reply byte-by-byte off the wire
//! rather than buffering a whole frame up front. This is not part of the
//! server's core — it only needs to speak the wire protocol the server
//! already guarantees it serves correctly.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

/// Split a REPL line on whitespace. No quoting support, matching the
/// original client's behavior.
pub fn split_args(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Encode `args` as a RESP array of bulk strings.
pub fn build_resp_command(args: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Read one line up to, and excluding, its trailing CRLF (or LF).
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
        line.pop();
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn invalid_length(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("bad {what} length"))
}

/// Read and render one RESP reply. Arrays render one element per line; a
/// nil bulk string or array renders as `(nil)`.
pub fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut prefix = [0u8; 1];
    if reader.read(&mut prefix)? == 0 {
        return Ok("(error) no response or connection closed".to_string());
    }
    match prefix[0] {
        b'+' => read_line(reader),
        b'-' => Ok(format!("(error) {}", read_line(reader)?)),
        b':' => read_line(reader),
        b'$' => {
            let len: i64 = read_line(reader)?
                .parse()
                .map_err(|_| invalid_length("bulk string"))?;
            if len < 0 {
                return Ok("(nil)".to_string());
            }
            let mut buf = vec![0u8; len as usize];
            reader.read_exact(&mut buf)?;
            let mut crlf = [0u8; 2];
            reader.read_exact(&mut crlf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
        b'*' => {
            let count: i64 = read_line(reader)?.parse().map_err(|_| invalid_length("array"))?;
            if count < 0 {
                return Ok("(nil)".to_string());
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_reply(reader)?);
            }
            Ok(items.join("\n"))
        }
        other => Ok(format!("(error) unknown reply type '{}'", other as char)),
    }
}

/// A connected client: the write half plus a buffered reader over a clone
/// of the same socket.
pub struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    /// Connect to `host:port`.
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }

    /// Send one command (already split into arguments) and return its
    /// rendered reply.
    pub fn execute(&mut self, args: &[String]) -> io::Result<String> {
        self.stream.write_all(&build_resp_command(args))?;
        read_reply(&mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            split_args("SET  foo   bar"),
            vec!["SET".to_string(), "foo".to_string(), "bar".to_string()]
        );
    }

    #[test]
    fn builds_resp_array_of_bulk_strings() {
        let cmd = build_resp_command(&["SET".to_string(), "k".to_string(), "v".to_string()]);
        assert_eq!(cmd, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
    }

    #[test]
    fn renders_simple_string() {
        let mut reader = Cursor::new(b"+OK\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap(), "OK");
    }

    #[test]
    fn renders_error_with_prefix() {
        let mut reader = Cursor::new(b"-Error: no such key\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap(), "(error) Error: no such key");
    }

    #[test]
    fn renders_nil_bulk_string() {
        let mut reader = Cursor::new(b"$-1\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap(), "(nil)");
    }

    #[test]
    fn renders_bulk_string() {
        let mut reader = Cursor::new(b"$5\r\nhello\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap(), "hello");
    }

    #[test]
    fn renders_array_one_item_per_line() {
        let mut reader = Cursor::new(b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap(), "foo\nbar");
    }
}
