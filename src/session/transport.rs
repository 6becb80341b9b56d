//! Content-Length framed JSON-RPC transport over byte streams.

use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Writes one framed message.
pub async fn write_message<W>(writer: &mut W, payload: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(payload)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    writer
        .write_all(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes())
        .await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

/// Reads one framed message; `None` on a clean end of stream.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((field, value)) = line.split_once(':') {
            if field.eq_ignore_ascii_case("content-length") {
                let parsed = value.trim().parse().map_err(|error| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid Content-Length: {error}"),
                    )
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let length = content_length.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length header")
    })?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_round_trip() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
        let mut buffer = Vec::new();
        write_message(&mut buffer, &payload).await.unwrap();

        let mut reader = BufReader::new(Cursor::new(buffer));
        let read = read_message(&mut reader).await.unwrap();
        assert_eq!(read, Some(payload));
        assert_eq!(read_message(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_extra_headers_are_tolerated() {
        let body = br#"{"ok":true}"#;
        let mut framed = Vec::new();
        framed.extend_from_slice(b"Content-Type: application/vscode-jsonrpc\r\n");
        framed.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        framed.extend_from_slice(body);

        let mut reader = BufReader::new(Cursor::new(framed));
        let read = read_message(&mut reader).await.unwrap();
        assert_eq!(read, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_missing_content_length_is_an_error() {
        let mut reader = BufReader::new(Cursor::new(b"Content-Type: text\r\n\r\n{}".to_vec()));
        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_end_of_stream_reports_none() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        assert_eq!(read_message(&mut reader).await.unwrap(), None);
    }
}
