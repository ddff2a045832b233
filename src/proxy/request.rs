use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail, ensure};
use http::{HeaderValue, Method, Uri, Version, header::HeaderName};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::Instant;

use crate::util::timeout_with_context;

const HOP_BY_HOP: [&str; 3] = ["connection", "keep-alive", "proxy-connection"];

/// One request header. `value` keeps the bytes as received so they are
/// forwarded unchanged; `text` is the decoded form used for matching.
#[derive(Debug, Clone)]
pub struct HeaderLine {
    pub name: String,
    pub value: HeaderValue,
    lower_name: String,
    text: String,
}

impl HeaderLine {
    pub fn new(name: impl Into<String>, value: HeaderValue) -> Self {
        let name = name.into();
        let lower_name = name.to_ascii_lowercase();
        let text = decode_field_value(value.as_bytes());
        Self {
            name,
            value,
            lower_name,
            text,
        }
    }

    pub fn lower_name(&self) -> &str {
        &self.lower_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Decodes a field value as UTF-8, falling back to ISO-8859-1 when the value
/// carries obs-text bytes that are not valid UTF-8.
fn decode_field_value(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// An HTTP/1 request line and header block, as read from the client.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: Vec<HeaderLine>,
    path: String,
}

impl RequestHead {
    /// First `User-Agent` header value, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    pub fn header(&self, lower_name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.lower_name() == lower_name)
            .map(HeaderLine::text)
    }

    /// Path and query of the request target; absolute-form targets are
    /// reduced to their origin-form.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serializes the head for the upstream server. Hop-by-hop headers are
    /// dropped and replaced by `Connection: close`, so the upstream answers
    /// exactly this one admitted request.
    pub fn encode_for_upstream(&self) -> Vec<u8> {
        let connection_tokens = self.connection_tokens();
        let mut out = format!(
            "{} {} {}\r\n",
            self.method,
            self.target,
            version_str(self.version)
        )
        .into_bytes();
        for header in &self.headers {
            let name = header.lower_name();
            if HOP_BY_HOP.contains(&name) || connection_tokens.contains(name) {
                continue;
            }
            out.extend_from_slice(header.name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(header.value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"Connection: close\r\n\r\n");
        out
    }

    fn connection_tokens(&self) -> HashSet<String> {
        self.headers
            .iter()
            .filter(|header| header.lower_name() == "connection")
            .flat_map(|header| header.text().split(','))
            .map(|token| token.trim().to_ascii_lowercase())
            .filter(|token| !token.is_empty())
            .collect()
    }
}

fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else {
        "HTTP/1.1"
    }
}

/// Reads one request head within `header_timeout` and `max_header_bytes`.
///
/// Returns `Ok(None)` when the client closes the connection before sending
/// anything.
pub async fn read_request_head<S>(
    reader: &mut BufReader<S>,
    peer: SocketAddr,
    header_timeout: Duration,
    max_header_bytes: usize,
) -> Result<Option<RequestHead>>
where
    S: AsyncRead + Unpin,
{
    ensure!(
        max_header_bytes > 0,
        "header size limit must be greater than zero"
    );
    let deadline = Instant::now() + header_timeout;
    let mut budget = max_header_bytes;
    let mut line = Vec::new();

    let read = read_line_with_deadline(reader, &mut line, deadline, peer, budget).await?;
    if read == 0 {
        return Ok(None);
    }
    budget -= read;

    let request_line = std::str::from_utf8(&line)
        .map_err(|_| anyhow!("request line from {peer} contained invalid bytes"))?
        .trim_end_matches(['\r', '\n']);
    if request_line.is_empty() {
        bail!("empty request line from {peer}");
    }
    let (method, target, version) = parse_request_line(request_line)?;
    let path = origin_path(&target)?;

    let mut headers = Vec::new();
    loop {
        ensure!(budget > 0, "request headers exceed configured limit");
        let read = read_line_with_deadline(reader, &mut line, deadline, peer, budget).await?;
        if read == 0 {
            bail!("connection closed before end of headers from {peer}");
        }
        budget -= read;
        match parse_header_line(&line).with_context(|| format!("invalid header from {peer}"))? {
            Some(header) => headers.push(header),
            None => break,
        }
    }

    Ok(Some(RequestHead {
        method,
        target,
        version,
        headers,
        path,
    }))
}

fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let mut parts = line.split_whitespace();
    let method_str = parts
        .next()
        .ok_or_else(|| anyhow!("malformed request line: missing method"))?;
    let target = parts
        .next()
        .ok_or_else(|| anyhow!("malformed request line: missing target"))?;
    let version = parts
        .next()
        .ok_or_else(|| anyhow!("malformed request line: missing version"))?;
    if parts.next().is_some() {
        bail!("malformed request line: unexpected data");
    }
    let version = match version {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        other => bail!("invalid HTTP version '{other}'"),
    };
    let method = Method::from_bytes(method_str.as_bytes())
        .with_context(|| format!("invalid method '{method_str}'"))?;
    Ok((method, target.to_string(), version))
}

fn origin_path(target: &str) -> Result<String> {
    let uri: Uri = target
        .parse()
        .with_context(|| format!("invalid request target '{target}'"))?;
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/");
    Ok(path.to_string())
}

/// Parses one header line; `None` marks the blank line ending the head.
///
/// Names must be tokens. Values are checked as bytes, so obs-text (0x80-0xFF)
/// is accepted while control characters are not.
fn parse_header_line(line: &[u8]) -> Result<Option<HeaderLine>> {
    let trimmed = trim_line_ending(line);
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.starts_with(b" ") || trimmed.starts_with(b"\t") {
        bail!("obsolete header line folding is not supported");
    }
    let colon = trimmed
        .iter()
        .position(|byte| *byte == b':')
        .ok_or_else(|| anyhow!("header missing ':' separator"))?;
    let (name, value) = (&trimmed[..colon], &trimmed[colon + 1..]);
    let name = std::str::from_utf8(name)
        .ok()
        .filter(|name| HeaderName::from_bytes(name.as_bytes()).is_ok())
        .ok_or_else(|| anyhow!("invalid header name '{}'", String::from_utf8_lossy(name)))?;
    let value = HeaderValue::from_bytes(trim_ows(value))
        .map_err(|_| anyhow!("invalid value for header '{name}'"))?;
    Ok(Some(HeaderLine::new(name, value)))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// Strips optional whitespace, which HTTP limits to SP and HTAB.
fn trim_ows(value: &[u8]) -> &[u8] {
    let is_ows = |byte: &u8| matches!(byte, b' ' | b'\t');
    let start = value.iter().position(|b| !is_ows(b)).unwrap_or(value.len());
    let end = value.iter().rposition(|b| !is_ows(b)).map_or(start, |idx| idx + 1);
    &value[start..end]
}

async fn read_line_with_deadline<S>(
    reader: &mut BufReader<S>,
    buf: &mut Vec<u8>,
    deadline: Instant,
    peer: SocketAddr,
    max_len: usize,
) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    ensure!(max_len > 0, "line length limit must be greater than zero");
    buf.clear();
    let context = format!("reading request head from {peer}");

    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or_else(|| anyhow!("timed out {context}"))?;
        let available =
            timeout_with_context(remaining, reader.fill_buf(), context.as_str()).await?;

        if available.is_empty() {
            if buf.is_empty() {
                return Ok(0);
            }
            bail!("connection closed while {context}");
        }

        let newline_pos = available.iter().position(|byte| *byte == b'\n');
        let consume = newline_pos.map(|idx| idx + 1).unwrap_or(available.len());

        if buf.len() + consume > max_len {
            bail!("request head from {peer} exceeds configured limit");
        }

        buf.extend_from_slice(&available[..consume]);
        reader.consume(consume);

        if newline_pos.is_some() {
            break;
        }
    }

    Ok(buf.len())
}
