// trustbroker/src/feedback.rs
//
// Feedback handler (C7) — applies positive/negative feedback from
// downstream subscribers to local incoming links only.

use serde::Deserialize;

use crate::graph::NetworkGraph;

/// Negative-feedback multiplier (§4.7, μ) — asymmetry punishes bad
/// behavior harder than a single positive signals good behavior.
pub const NEGATIVE_MULTIPLIER: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackMessage {
    pub source: String,
    pub target: String,
    pub feedback: FeedbackKind,
}

/// Returns `true` if the link's counters were mutated (and so the local
/// trust store should be persisted). Feedback for a non-local target, or
/// for a link whose source is not already known, is silently ignored —
/// feedback never creates new links.
pub fn apply(graph: &mut NetworkGraph, self_id: &str, msg: &FeedbackMessage) -> bool {
    if msg.target != self_id {
        tracing::debug!(target = %msg.target, self_id, "feedback target is not local, ignoring");
        return false;
    }
    let Some(link) = graph.link(&msg.source, &msg.target) else {
        tracing::debug!(source = %msg.source, "feedback for unknown source link, ignoring");
        return false;
    };
    let (r, s) = match msg.feedback {
        FeedbackKind::Positive => (link.r + 1, link.s),
        FeedbackKind::Negative => (link.r, link.s + NEGATIVE_MULTIPLIER),
    };
    graph.set_link_counters(&msg.source, &msg.target, r, s);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_link(r: u32, s: u32) -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        graph.set_link_counters("B2", "B3", r, s);
        graph
    }

    #[test]
    fn positive_feedback_increments_r() {
        let mut graph = graph_with_link(0, 0);
        let msg = FeedbackMessage {
            source: "B2".into(),
            target: "B3".into(),
            feedback: FeedbackKind::Positive,
        };
        assert!(apply(&mut graph, "B3", &msg));
        let link = graph.link("B2", "B3").unwrap();
        assert_eq!((link.r, link.s), (1, 0));
    }

    #[test]
    fn negative_feedback_adds_multiplier_to_s() {
        let mut graph = graph_with_link(0, 0);
        let msg = FeedbackMessage {
            source: "B2".into(),
            target: "B3".into(),
            feedback: FeedbackKind::Negative,
        };
        assert!(apply(&mut graph, "B3", &msg));
        let link = graph.link("B2", "B3").unwrap();
        assert_eq!((link.r, link.s), (0, NEGATIVE_MULTIPLIER));
    }

    #[test]
    fn feedback_for_non_local_target_is_ignored() {
        let mut graph = graph_with_link(0, 0);
        let msg = FeedbackMessage {
            source: "B2".into(),
            target: "B3".into(),
            feedback: FeedbackKind::Positive,
        };
        assert!(!apply(&mut graph, "B9", &msg));
        let link = graph.link("B2", "B3").unwrap();
        assert_eq!((link.r, link.s), (0, 0));
    }

    #[test]
    fn feedback_for_unknown_source_does_not_create_a_link() {
        let mut graph = NetworkGraph::new();
        let msg = FeedbackMessage {
            source: "Bghost".into(),
            target: "B3".into(),
            feedback: FeedbackKind::Positive,
        };
        assert!(!apply(&mut graph, "B3", &msg));
        assert!(graph.link("Bghost", "B3").is_none());
    }
}
