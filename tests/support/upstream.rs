use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Minimal origin server answering every request with `200 OK` and echoing
/// the request it received (head and body) as the response body.
pub struct EchoUpstream {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl EchoUpstream {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let _ = serve_one(socket).await;
                });
            }
        });
        Ok(Self { addr, handle })
    }
}

impl Drop for EchoUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Origin server that accepts connections and never answers them.
pub struct SilentUpstream {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl SilentUpstream {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Ok(Self { addr, handle })
    }
}

impl Drop for SilentUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_one(mut socket: TcpStream) -> Result<()> {
    let mut head = read_until_double_crlf(&mut socket).await?;
    let body_len = content_length(&head).unwrap_or(0);
    if body_len > 0 {
        let mut body = vec![0u8; body_len];
        socket.read_exact(&mut body).await?;
        head.push_str(&String::from_utf8_lossy(&body));
    }
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{head}",
        head.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

fn content_length(head: &str) -> Option<usize> {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

pub async fn read_until_double_crlf(stream: &mut TcpStream) -> Result<String> {
    let mut buffer = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let bytes = stream.read(&mut byte).await?;
        if bytes == 0 {
            break;
        }
        buffer.extend_from_slice(&byte);
        if buffer.ends_with(b"\r\n\r\n") {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
