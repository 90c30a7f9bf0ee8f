// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # JSON-RPC framing
//!
//! LSP messages are framed with `Content-Length` headers over a byte
//! stream. The transport is generic over the underlying reader/writer so
//! tests can run it over an in-memory duplex instead of a child process's
//! stdio.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::error::{GatewayError, GatewayResult};

/// Framed JSON-RPC transport over a byte stream pair.
pub struct Transport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> Transport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Send one message with its `Content-Length` header.
    pub async fn send(&mut self, payload: &Value) -> GatewayResult<()> {
        let content = serde_json::to_string(payload)?;
        trace!("--> {content}");
        let framed = format!("Content-Length: {}\r\n\r\n{content}", content.len());
        self.writer.write_all(framed.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one message, blocking until a full frame arrives.
    pub async fn receive(&mut self) -> GatewayResult<Value> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();

        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(GatewayError::Protocol(
                    "server closed the connection".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(value) = trimmed
                .to_ascii_lowercase()
                .strip_prefix("content-length:")
                .map(str::trim)
            {
                content_length = value.parse::<usize>().ok();
            }
        }

        let content_length = content_length
            .ok_or_else(|| GatewayError::Protocol("missing Content-Length header".to_string()))?;

        let mut content = vec![0u8; content_length];
        self.reader.read_exact(&mut content).await?;
        let text = String::from_utf8(content)
            .map_err(|e| GatewayError::Protocol(format!("invalid utf-8 payload: {e}")))?;
        trace!("<-- {text}");
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_receive_roundtrip() {
        let (client_side, server_side) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (server_read, server_write) = tokio::io::split(server_side);

        let mut client = Transport::new(client_read, client_write);
        let mut server = Transport::new(server_read, server_write);

        let message = json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" });
        client.send(&message).await.unwrap();

        let received = server.receive().await.unwrap();
        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn test_receive_skips_extra_headers() {
        let (client_side, server_side) = tokio::io::duplex(4096);
        let (_client_read, mut client_write) = tokio::io::split(client_side);
        let (server_read, server_write) = tokio::io::split(server_side);

        let body = r#"{"jsonrpc":"2.0","id":7,"result":null}"#;
        let framed = format!(
            "Content-Length: {}\r\nContent-Type: application/vscode-jsonrpc\r\n\r\n{}",
            body.len(),
            body
        );
        client_write.write_all(framed.as_bytes()).await.unwrap();
        client_write.flush().await.unwrap();

        let mut server = Transport::new(server_read, server_write);
        let received = server.receive().await.unwrap();
        assert_eq!(received["id"], 7);
    }

    #[tokio::test]
    async fn test_receive_without_length_is_protocol_error() {
        let (client_side, server_side) = tokio::io::duplex(4096);
        let (_client_read, mut client_write) = tokio::io::split(client_side);
        let (server_read, server_write) = tokio::io::split(server_side);

        client_write.write_all(b"\r\n").await.unwrap();
        client_write.flush().await.unwrap();

        let mut server = Transport::new(server_read, server_write);
        let result = server.receive().await;
        assert!(matches!(result, Err(GatewayError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_utf8_content_length_is_bytes() {
        let (client_side, server_side) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (server_read, server_write) = tokio::io::split(server_side);

        let mut client = Transport::new(client_read, client_write);
        let mut server = Transport::new(server_read, server_write);

        let message = json!({ "goal": "∀ n : nat, 0 + n = n" });
        client.send(&message).await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, message);
    }
}
