// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal clamd TCP protocol client.
//!
//! Speaks the NUL-delimited command form: `zPING\0` for liveness and
//! `zINSTREAM\0` for streaming scans. INSTREAM chunks are prefixed with a
//! 4-byte big-endian length; a zero-length chunk terminates the stream.
//! The daemon answers `stream: OK`, `stream: <signature> FOUND`, or an
//! `ERROR` line, then closes the connection.

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use vigil_core::{ByteStream, ScanVerdict, VigilError};

/// Low-level client for one clamd instance.
#[derive(Debug, Clone)]
pub struct Clamd {
    addr: String,
}

impl Clamd {
    /// Creates a client for the daemon at `addr` (`ip:port`). No
    /// connection is made until a command is issued.
    pub fn new(addr: String) -> Self {
        Self { addr }
    }

    async fn connect(&self) -> Result<TcpStream, VigilError> {
        TcpStream::connect(&self.addr)
            .await
            .map_err(|e| VigilError::Scanner {
                message: format!("cannot connect to clamd at {}", self.addr),
                source: Some(Box::new(e)),
            })
    }

    /// Checks daemon liveness with the PING command.
    pub async fn ping(&self) -> Result<(), VigilError> {
        let mut conn = self.connect().await?;
        conn.write_all(b"zPING\0")
            .await
            .map_err(|e| VigilError::Scanner {
                message: "failed to send PING".into(),
                source: Some(Box::new(e)),
            })?;

        let mut response = Vec::new();
        conn.read_to_end(&mut response)
            .await
            .map_err(|e| VigilError::Scanner {
                message: "failed to read PING response".into(),
                source: Some(Box::new(e)),
            })?;

        let text = trim_response(&response);
        if text == "PONG" {
            Ok(())
        } else {
            Err(VigilError::Scanner {
                message: format!("unexpected PING response '{text}'"),
                source: None,
            })
        }
    }

    /// Streams content chunks to the daemon and returns its verdict.
    ///
    /// Cancelling `abort` between chunks terminates the scan promptly
    /// with a scanner error; the daemon drops the half-fed stream.
    pub async fn scan_stream(
        &self,
        mut stream: ByteStream,
        abort: &CancellationToken,
    ) -> Result<ScanVerdict, VigilError> {
        let mut conn = self.connect().await?;
        conn.write_all(b"zINSTREAM\0")
            .await
            .map_err(|e| VigilError::Scanner {
                message: "failed to start INSTREAM".into(),
                source: Some(Box::new(e)),
            })?;

        loop {
            let chunk = tokio::select! {
                _ = abort.cancelled() => {
                    return Err(VigilError::Scanner {
                        message: "scan aborted".into(),
                        source: None,
                    });
                }
                chunk = stream.next() => chunk,
            };
            match chunk {
                None => break,
                Some(Ok(bytes)) => {
                    if bytes.is_empty() {
                        continue;
                    }
                    trace!(len = bytes.len(), "feeding chunk to clamd");
                    let frame_err = |e: std::io::Error| VigilError::Scanner {
                        // A write failure mid-stream usually means clamd
                        // hit its stream size limit and hung up.
                        message: "clamd closed the stream mid-scan".into(),
                        source: Some(Box::new(e)),
                    };
                    conn.write_all(&(bytes.len() as u32).to_be_bytes())
                        .await
                        .map_err(frame_err)?;
                    conn.write_all(&bytes).await.map_err(frame_err)?;
                }
                Some(Err(e)) => {
                    return Err(VigilError::Scanner {
                        message: "content stream failed".into(),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }

        conn.write_all(&0u32.to_be_bytes())
            .await
            .map_err(|e| VigilError::Scanner {
                message: "failed to terminate INSTREAM".into(),
                source: Some(Box::new(e)),
            })?;

        let mut response = Vec::new();
        conn.read_to_end(&mut response)
            .await
            .map_err(|e| VigilError::Scanner {
                message: "failed to read scan response".into(),
                source: Some(Box::new(e)),
            })?;
        parse_scan_response(&response)
    }
}

/// Strips the trailing NUL/newline and surrounding whitespace.
fn trim_response(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(['\0', '\n', ' '])
        .to_string()
}

/// Parses a clamd INSTREAM response line into a verdict.
pub(crate) fn parse_scan_response(raw: &[u8]) -> Result<ScanVerdict, VigilError> {
    let text = trim_response(raw);
    let body = text.strip_prefix("stream: ").unwrap_or(&text);

    if let Some(signature) = body.strip_suffix(" FOUND") {
        return Ok(ScanVerdict {
            infected: true,
            description: signature.to_string(),
        });
    }
    if body == "OK" {
        return Ok(ScanVerdict {
            infected: false,
            description: String::new(),
        });
    }
    Err(VigilError::Scanner {
        message: format!("clamd returned '{text}'"),
        source: None,
    })
}
