use std::net::SocketAddr;

use tracing::debug;

use crate::policy::{Admission, Decision, Outcome};
use crate::proxy::request::RequestHead;

/// Asks the admission policy about one request head and records the outcome
/// as a debug diagnostic.
pub fn evaluate_request(admission: &dyn Admission, peer: SocketAddr, head: &RequestHead) -> Decision {
    let user_agent = head.user_agent();
    let decision = admission.admit(user_agent, head.path());
    let pattern = decision.matched_pattern.as_deref();
    match decision.outcome {
        Outcome::Allow => debug!(
            peer = %peer,
            method = %head.method,
            path = %decision.request_path,
            user_agent,
            pattern,
            "admission allow decision"
        ),
        Outcome::Deny if user_agent.is_none_or(str::is_empty) => debug!(
            peer = %peer,
            method = %head.method,
            path = %decision.request_path,
            "admission deny decision; request has no user agent"
        ),
        Outcome::Deny => debug!(
            peer = %peer,
            method = %head.method,
            path = %decision.request_path,
            user_agent,
            pattern,
            "admission deny decision"
        ),
    }
    decision
}
