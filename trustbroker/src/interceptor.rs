// trustbroker/src/interceptor.rs
//
// Message Interceptor (C8) — the per-message pipeline: parse, verify
// MAC, enforce ACL, evaluate trust, re-sign, hand back to the host.

use crate::acl::AclTable;
use crate::graph::NetworkGraph;
use crate::mac::MacEngine;
use crate::token::{self, TokenError};
use crate::trust;

/// Reserved control-plane topic carrying feedback payloads.
pub const FEEDBACK_TOPIC: &str = "internal/feedback";
/// The feedback topic is rewritten to this sentinel before the event is
/// handed back, so the host's normal delivery path never re-broadcasts
/// the raw feedback topic (invariant 6).
pub const FEEDBACK_SENTINEL_TOPIC: &str = "internal/feedback/processed";

/// A message event as delivered by the host. `topic` and `payload` may
/// both be mutated in place by `process_data_message`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl MessageEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// No dynamic dispatch: the interceptor's entire outcome space is this
/// tagged variant (DESIGN NOTES §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Forward(Vec<u8>),
    Drop(DropReason),
    PassThrough,
}

/// Internal detail behind every `Drop`. The host only ever sees
/// `ACL_DENIED`; this is retained for logging and tests (§7's error
/// table distinguishes sources even though the disposition is uniform).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MalformedJson,
    MissingMac,
    MacMismatch,
    AclDenied,
    TrustDenied,
}

/// The non-feedback half of the state machine in §4.8: parse → verify
/// MAC → ACL → trust gate → sign. Feedback routing lives in
/// `BrokerContext::on_message`, since it needs the trust store to
/// persist mutations — this function only ever reads `graph`.
pub fn process_data_message(
    acl: &AclTable,
    graph: &NetworkGraph,
    mac: &MacEngine,
    self_id: &str,
    event: &mut MessageEvent,
) -> Decision {
    if !token::looks_like_json(&event.payload) {
        return Decision::PassThrough;
    }

    let at = match token::parse(&event.payload) {
        Ok(at) => at,
        Err(e) => {
            log_parse_error(&e);
            return Decision::Drop(DropReason::MalformedJson);
        }
    };

    let (unsigned, tag) = token::strip_mac(at.clone());
    let Some(tag) = tag else {
        tracing::warn!(client = %at.c, "missing_mac");
        return Decision::Drop(DropReason::MissingMac);
    };
    let canonical = token::serialize_without_mac(&unsigned);
    if !mac.verify(&canonical, &tag) {
        tracing::warn!(signer_chain = ?at.signers, "mac_mismatch");
        return Decision::Drop(DropReason::MacMismatch);
    }

    for topic in at.publish_topics.iter() {
        if !acl.permit(&at.c, topic, true) {
            tracing::info!(client = %at.c, topic, "acl_denied");
            return Decision::Drop(DropReason::AclDenied);
        }
    }
    for topic in at.subscribe_topics.iter() {
        if !acl.permit(&at.c, topic, false) {
            tracing::info!(client = %at.c, topic, "acl_denied");
            return Decision::Drop(DropReason::AclDenied);
        }
    }

    if at.b != self_id {
        match at.signers.last() {
            Some(last) if trust::decide(graph, last, self_id) => {
                let score = trust::least_trustworthy_path_score(graph, &at.b, self_id);
                tracing::debug!(path_score = score, "least-trustworthy-path computed for observability");
            }
            _ => {
                tracing::info!(signer_chain = ?at.signers, "trust_denied");
                return Decision::Drop(DropReason::TrustDenied);
            }
        }
    }

    let mut signed = unsigned;
    if !signed.signers.iter().any(|s| s == self_id) {
        signed.signers.push(self_id.to_string());
    }
    let canonical = token::serialize_without_mac(&signed);
    let new_tag = mac.compute(&canonical);
    let resealed = token::attach_mac(signed, new_tag);
    event.payload = token::serialize(&resealed);
    Decision::Forward(event.payload.clone())
}

fn log_parse_error(e: &TokenError) {
    tracing::warn!(error = %e, "malformed_json");
}
