//! A tiny HTTP server with scripted misbehaviour.
//!
//! `mockito` covers status codes and headers but cannot drop connections or
//! cut a body short. [`FlakyServer`] speaks just enough HTTP/1.1 for one GET
//! per connection and can reset the first N connections, send fewer bytes than
//! it announces, or stall mid-body on some or all connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Behaviour {
    Complete,
    Truncated {
        declared_len: u64,
    },
    Stall {
        declared_len: u64,
    },
}

/// What healthy connections receive.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    body: Vec<u8>,
    behaviour: Behaviour,
    stalls: usize,
}

impl CannedResponse {
    /// `200 OK` with `body`.
    #[must_use]
    pub const fn ok(body: Vec<u8>) -> Self {
        Self {
            body,
            behaviour: Behaviour::Complete,
            stalls: 0,
        }
    }

    /// Announce `declared_len` bytes but send only `body` before closing.
    #[must_use]
    pub const fn truncated(body: Vec<u8>, declared_len: u64) -> Self {
        Self {
            body,
            behaviour: Behaviour::Truncated {
                declared_len,
            },
            stalls: 0,
        }
    }

    /// Announce `declared_len` bytes, send a few, then hang.
    #[must_use]
    pub fn stall(declared_len: u64) -> Self {
        Self {
            body: vec![0x7f; 16],
            behaviour: Behaviour::Stall {
                declared_len,
            },
            stalls: 0,
        }
    }

    /// Hang mid-body on the first `stalls` connections that are not reset,
    /// then answer normally.
    #[must_use]
    pub fn stalling_first(mut self, stalls: usize) -> Self {
        self.stalls = stalls;
        self
    }
}

/// Local server that resets its first `resets` connections.
pub struct FlakyServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FlakyServer {
    /// Bind to an ephemeral loopback port and start serving.
    pub async fn start(resets: usize, response: CannedResponse) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if seen <= resets {
                    drop(stream);
                    continue;
                }
                let response = response.clone();
                let answered = seen - resets;
                tokio::spawn(async move {
                    let _ = respond(stream, &response, answered).await;
                });
            }
        });

        Ok(Self {
            addr,
            connections,
            handle,
        })
    }

    /// URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FlakyServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `answered` is the 1-based index among connections that were not reset.
async fn respond(mut stream: TcpStream, response: &CannedResponse, answered: usize) -> std::io::Result<()> {
    read_request_head(&mut stream).await?;

    let declared_len = match response.behaviour {
        Behaviour::Complete => response.body.len() as u64,
        Behaviour::Truncated {
            declared_len,
        }
        | Behaviour::Stall {
            declared_len,
        } => declared_len,
    };

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
    );
    let stall = answered <= response.stalls || matches!(response.behaviour, Behaviour::Stall { .. });
    let body = if answered <= response.stalls {
        &response.body[..response.body.len() / 2]
    } else {
        &response.body[..]
    };

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;

    if stall {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }

    stream.shutdown().await
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        head.extend_from_slice(&buf[..read]);
    }
    Ok(())
}
