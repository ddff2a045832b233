use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use http::StatusCode;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::util::timeout_with_context;

use super::AppContext;
use super::policy_response::{BAD_GATEWAY_BODY, simple_response};
use super::request::RequestHead;

/// Hands an admitted connection to the upstream server.
///
/// The request head is replayed first, followed by any bytes the client sent
/// past the head that are still buffered; the two sockets are then relayed
/// until both sides are done or one of them stays idle past its timeout.
pub(super) async fn forward_to_upstream(
    reader: BufReader<TcpStream>,
    head: &RequestHead,
    peer: SocketAddr,
    app: &AppContext,
) -> Result<()> {
    let upstream_addr = app.settings.upstream;
    let connect = timeout_with_context(
        app.settings.upstream_connect_timeout(),
        TcpStream::connect(upstream_addr),
        format!("connecting to upstream {upstream_addr}"),
    )
    .await;
    let mut upstream = match connect {
        Ok(stream) => stream,
        Err(err) => {
            warn!(peer = %peer, upstream = %upstream_addr, error = %err, "upstream connect failed");
            let mut client = reader.into_inner();
            let response = simple_response(StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY);
            client
                .write_all(&response)
                .await
                .context("failed to write bad gateway response")?;
            client.shutdown().await.ok();
            return Err(err);
        }
    };
    if let Err(err) = upstream.set_nodelay(true) {
        debug!(upstream = %upstream_addr, error = %err, "failed to set TCP_NODELAY on upstream stream");
    }

    let client_timeout = app.settings.client_timeout();
    let upstream_timeout = app.settings.upstream_timeout();

    let mut payload = head.encode_for_upstream();
    payload.extend_from_slice(reader.buffer());
    timeout_with_context(
        upstream_timeout,
        upstream.write_all(&payload),
        format!("sending request head to upstream {upstream_addr}"),
    )
    .await?;

    let mut client = reader.into_inner();
    let (from_client, from_upstream) =
        relay_with_idle_timeouts(&mut client, &mut upstream, client_timeout, upstream_timeout)
            .await
            .with_context(|| format!("failed relaying {peer} <-> {upstream_addr}"))?;
    debug!(
        peer = %peer,
        upstream = %upstream_addr,
        bytes_in = from_client,
        bytes_out = from_upstream,
        "admitted connection finished"
    );
    Ok(())
}

/// What an idle read on one half of the relay means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadIdle {
    /// The relay fails and both connections are dropped.
    Fail,
    /// This half stops forwarding; the other half keeps its own deadline.
    Finish,
}

async fn relay_with_idle_timeouts(
    client_stream: &mut TcpStream,
    upstream_stream: &mut TcpStream,
    client_timeout: Duration,
    upstream_timeout: Duration,
) -> Result<(u64, u64)> {
    let (mut client_reader, mut client_writer) = io::split(client_stream);
    let (mut upstream_reader, mut upstream_writer) = io::split(upstream_stream);

    // An idle client only stops the client half; the upstream half still
    // bounds the exchange.
    let client_to_upstream = transfer_half(
        &mut client_reader,
        &mut upstream_writer,
        client_timeout,
        upstream_timeout,
        ReadIdle::Finish,
        "client",
        "upstream server",
    );
    let upstream_to_client = transfer_half(
        &mut upstream_reader,
        &mut client_writer,
        upstream_timeout,
        client_timeout,
        ReadIdle::Fail,
        "upstream server",
        "client",
    );

    let (client_bytes, upstream_bytes) = tokio::try_join!(client_to_upstream, upstream_to_client)?;
    Ok((client_bytes, upstream_bytes))
}

async fn transfer_half<R, W>(
    reader: &mut R,
    writer: &mut W,
    read_timeout: Duration,
    write_timeout: Duration,
    on_idle: ReadIdle,
    read_label: &str,
    write_label: &str,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut transferred = 0u64;
    let mut buffer = [0u8; 8192];
    loop {
        let read = match timeout(read_timeout, reader.read(&mut buffer)).await {
            Ok(read) => read.with_context(|| format!("failed while reading from {read_label}"))?,
            Err(_) if on_idle == ReadIdle::Finish => {
                debug!(side = read_label, "relay half idle; no longer forwarding");
                return Ok(transferred);
            }
            Err(_) => bail!("timed out reading from {read_label}"),
        };
        if read == 0 {
            timeout_with_context(
                write_timeout,
                writer.shutdown(),
                format!("shutting down {write_label}"),
            )
            .await?;
            break;
        }

        timeout_with_context(
            write_timeout,
            writer.write_all(&buffer[..read]),
            format!("forwarding to {write_label}"),
        )
        .await?;
        transferred = transferred.saturating_add(read as u64);
    }

    timeout_with_context(
        write_timeout,
        writer.flush(),
        format!("flushing {write_label}"),
    )
    .await?;

    Ok(transferred)
}
