use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn parse_response(raw: &str) -> Result<RawResponse> {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow!("response missing header terminator: {raw:?}"))?;
    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| anyhow!("response missing status line"))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("missing status code in response line"))?
        .parse::<u16>()
        .map_err(|err| anyhow!("invalid status code: {err}"))?;
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();
    Ok(RawResponse {
        status,
        headers,
        body: body.to_string(),
    })
}

/// Writes a raw request to the gateway and reads until it closes the connection.
pub async fn send_raw(addr: SocketAddr, request: &str) -> Result<RawResponse> {
    send_raw_bytes(addr, request.as_bytes()).await
}

pub async fn send_raw_bytes(addr: SocketAddr, request: &[u8]) -> Result<RawResponse> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut buf = Vec::new();
    timeout(StdDuration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .context("timed out waiting for response")??;
    let text = String::from_utf8(buf).context("invalid UTF-8 response")?;
    parse_response(&text)
}

pub async fn get_with_user_agent(
    addr: SocketAddr,
    path: &str,
    user_agent: Option<&str>,
) -> Result<RawResponse> {
    let mut request = format!("GET {path} HTTP/1.1\r\nHost: gateway.test\r\n");
    if let Some(user_agent) = user_agent {
        request.push_str(&format!("User-Agent: {user_agent}\r\n"));
    }
    request.push_str("\r\n");
    send_raw(addr, &request).await
}
