use http::StatusCode;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::policy::Decision;

/// Characters escaped when the denied path is carried in a query parameter.
const RETURN_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const DEFAULT_DENY_BODY: &str = "request blocked by policy\r\n";
pub const BAD_REQUEST_BODY: &str = "malformed request\r\n";
pub const BAD_GATEWAY_BODY: &str = "upstream unavailable\r\n";

/// How a denied request is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialResponse {
    Forbidden,
    Redirect { location: String },
}

impl DenialResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            DenialResponse::Forbidden => StatusCode::FORBIDDEN,
            DenialResponse::Redirect { .. } => StatusCode::FOUND,
        }
    }

    pub fn to_http1_bytes(&self) -> Vec<u8> {
        let status = self.status();
        match self {
            DenialResponse::Forbidden => simple_response(status, DEFAULT_DENY_BODY),
            DenialResponse::Redirect { location } => format!(
                "HTTP/1.1 {} {}\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
            )
            .into_bytes(),
        }
    }
}

/// Picks the response for a denial: a redirect when a target is configured,
/// otherwise a plain 403.
pub fn denial_response(
    decision: &Decision,
    redirect_target: Option<&str>,
    return_param: Option<&str>,
) -> DenialResponse {
    match redirect_target {
        Some(target) => DenialResponse::Redirect {
            location: redirect_location(target, return_param, &decision.request_path),
        },
        None => DenialResponse::Forbidden,
    }
}

/// Builds the redirect `Location`, appending `return_param=<encoded path>` to
/// the target's query (ahead of any fragment) when a parameter is configured.
pub fn redirect_location(target: &str, return_param: Option<&str>, request_path: &str) -> String {
    let Some(param) = return_param else {
        return target.to_string();
    };
    let (base, fragment) = match target.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (target, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let encoded = utf8_percent_encode(request_path, RETURN_PATH_SET);
    let mut location = format!("{base}{separator}{param}={encoded}");
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

/// A complete `Connection: close` HTTP/1.1 response with a text body.
pub fn simple_response(status: StatusCode, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        body.len(),
    )
    .into_bytes()
}
