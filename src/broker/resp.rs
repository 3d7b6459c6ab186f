//! RESP2 wire codec
//!
//! Encoding and decoding for the broker wire protocol. Requests are always
//! arrays of bulk strings; replies are any RESP2 value. Decoding works over
//! any buffered async reader so the connection can layer deadlines on top.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::{Error, Result};

/// A decoded RESP2 value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple string reply (`+OK`)
    Simple(String),
    /// Error reply (`-ERR ...`)
    Error(String),
    /// Integer reply (`:42`)
    Integer(i64),
    /// Bulk string reply (`$5\r\nhello`)
    Bulk(Vec<u8>),
    /// Array reply (`*2...`)
    Array(Vec<RespValue>),
    /// Null bulk string or null array (`$-1` / `*-1`)
    Null,
}

impl RespValue {
    /// Interpret this value as a UTF-8 string, if it carries one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::Simple(s) => Some(s),
            RespValue::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Consume this value into a UTF-8 string
    pub fn into_string(self) -> Result<String> {
        match self {
            RespValue::Simple(s) => Ok(s),
            RespValue::Bulk(b) => String::from_utf8(b)
                .map_err(|_| Error::protocol("Bulk string is not valid UTF-8")),
            other => Err(Error::protocol(format!(
                "Expected string reply, got {:?}",
                other
            ))),
        }
    }

    /// Consume this value into an integer
    pub fn into_integer(self) -> Result<i64> {
        match self {
            RespValue::Integer(n) => Ok(n),
            other => Err(Error::protocol(format!(
                "Expected integer reply, got {:?}",
                other
            ))),
        }
    }
}

/// Encode a command as a RESP2 array of bulk strings
pub fn encode_command(args: &[&[u8]], buf: &mut BytesMut) {
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

/// Read one CRLF-terminated line, without the terminator
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| Error::transport(format!("Broker read failed: {}", e)))?;
    if n == 0 {
        return Err(Error::transport("Broker closed the connection"));
    }
    if !line.ends_with(b"\r\n") {
        return Err(Error::protocol("Reply line missing CRLF terminator"));
    }
    line.truncate(line.len() - 2);
    String::from_utf8(line).map_err(|_| Error::protocol("Reply line is not valid UTF-8"))
}

/// Decode one RESP2 value from the reader
pub async fn decode_value<R: AsyncBufRead + Unpin + Send>(reader: &mut R) -> Result<RespValue> {
    let line = read_line(reader).await?;
    let (kind, rest) = match line.as_bytes().first() {
        Some(b) => (*b, &line[1..]),
        None => return Err(Error::protocol("Empty reply line")),
    };

    match kind {
        b'+' => Ok(RespValue::Simple(rest.to_string())),
        b'-' => Ok(RespValue::Error(rest.to_string())),
        b':' => rest
            .parse::<i64>()
            .map(RespValue::Integer)
            .map_err(|_| Error::protocol(format!("Invalid integer reply: {}", rest))),
        b'$' => {
            let len: i64 = rest
                .parse()
                .map_err(|_| Error::protocol(format!("Invalid bulk length: {}", rest)))?;
            if len < 0 {
                return Ok(RespValue::Null);
            }
            let mut data = vec![0u8; len as usize + 2];
            reader
                .read_exact(&mut data)
                .await
                .map_err(|e| Error::transport(format!("Broker read failed: {}", e)))?;
            if &data[len as usize..] != b"\r\n" {
                return Err(Error::protocol("Bulk string missing CRLF terminator"));
            }
            data.truncate(len as usize);
            Ok(RespValue::Bulk(data))
        }
        b'*' => {
            let len: i64 = rest
                .parse()
                .map_err(|_| Error::protocol(format!("Invalid array length: {}", rest)))?;
            if len < 0 {
                return Ok(RespValue::Null);
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(Box::pin(decode_value(reader)).await?);
            }
            Ok(RespValue::Array(items))
        }
        other => Err(Error::protocol(format!(
            "Unknown reply type marker: {}",
            other as char
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    async fn decode(bytes: &[u8]) -> Result<RespValue> {
        let mut reader = BufReader::new(Cursor::new(bytes.to_vec()));
        decode_value(&mut reader).await
    }

    #[test]
    fn test_encode_command() {
        let mut buf = BytesMut::new();
        encode_command(&[b"RPUSH", b"queue", b"payload"], &mut buf);
        assert_eq!(
            &buf[..],
            b"*3\r\n$5\r\nRPUSH\r\n$5\r\nqueue\r\n$7\r\npayload\r\n"
        );
    }

    #[tokio::test]
    async fn test_decode_simple_string() {
        assert_eq!(
            decode(b"+OK\r\n").await.unwrap(),
            RespValue::Simple("OK".to_string())
        );
    }

    #[tokio::test]
    async fn test_decode_error() {
        assert_eq!(
            decode(b"-ERR unknown command\r\n").await.unwrap(),
            RespValue::Error("ERR unknown command".to_string())
        );
    }

    #[tokio::test]
    async fn test_decode_integer() {
        assert_eq!(decode(b":42\r\n").await.unwrap(), RespValue::Integer(42));
    }

    #[tokio::test]
    async fn test_decode_bulk_string() {
        assert_eq!(
            decode(b"$5\r\nhello\r\n").await.unwrap(),
            RespValue::Bulk(b"hello".to_vec())
        );
    }

    #[tokio::test]
    async fn test_decode_null_bulk() {
        assert_eq!(decode(b"$-1\r\n").await.unwrap(), RespValue::Null);
    }

    #[tokio::test]
    async fn test_decode_array() {
        let value = decode(b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n").await.unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Bulk(b"foo".to_vec()),
                RespValue::Bulk(b"bar".to_vec()),
            ])
        );
    }

    #[tokio::test]
    async fn test_decode_null_array() {
        assert_eq!(decode(b"*-1\r\n").await.unwrap(), RespValue::Null);
    }

    #[tokio::test]
    async fn test_binary_safe_bulk() {
        // Bulk strings may contain CRLF bytes; length prefix wins
        assert_eq!(
            decode(b"$4\r\na\r\nb\r\n").await.unwrap(),
            RespValue::Bulk(b"a\r\nb".to_vec())
        );
    }

    #[tokio::test]
    async fn test_truncated_reply_is_transport_error() {
        let result = decode(b"$5\r\nhel").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
