use std::net::SocketAddr;

use anyhow::{Context, Result};
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::policy::Outcome;

use super::AppContext;
use super::forward::forward_to_upstream;
use super::policy_eval::evaluate_request;
use super::policy_response::{BAD_REQUEST_BODY, denial_response, simple_response};
use super::request::read_request_head;

pub async fn start_listener(app: AppContext) -> Result<()> {
    let bind_addr = app.settings.listen;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", bind_addr))?;
    let local_addr = listener.local_addr().unwrap_or(bind_addr);
    info!(address = %local_addr, upstream = %app.settings.upstream, "admission listener started");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                error!(error = %err, "failed to accept incoming connection");
                continue;
            }
        };
        debug!(peer = %peer_addr, "accepted connection");
        if let Err(err) = stream.set_nodelay(true) {
            debug!(peer = %peer_addr, error = %err, "failed to set TCP_NODELAY on downstream stream");
        }
        let connection_app = app.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer_addr, connection_app).await {
                debug!(peer = %peer_addr, error = %err, "connection closed with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, app: AppContext) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let head = match read_request_head(
        &mut reader,
        peer,
        app.settings.client_timeout(),
        app.settings.max_header_size,
    )
    .await
    {
        Ok(Some(head)) => head,
        Ok(None) => {
            debug!(peer = %peer, "connection closed before request line");
            return Ok(());
        }
        Err(err) => {
            let mut client = reader.into_inner();
            let response = simple_response(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
            if let Err(write_err) = write_and_close(&mut client, &response).await {
                debug!(peer = %peer, error = %write_err, "failed to send bad request response");
            }
            return Err(err);
        }
    };

    let decision = evaluate_request(app.admission.as_ref(), peer, &head);
    match decision.outcome {
        Outcome::Allow => forward_to_upstream(reader, &head, peer, &app).await,
        Outcome::Deny => {
            let response = denial_response(
                &decision,
                app.denied_redirect_target.as_deref(),
                app.settings.return_param(),
            );
            let mut client = reader.into_inner();
            write_and_close(&mut client, &response.to_http1_bytes())
                .await
                .with_context(|| format!("failed to send denial response to {peer}"))
        }
    }
}

async fn write_and_close<S>(stream: &mut S, bytes: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}
