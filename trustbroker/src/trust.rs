// trustbroker/src/trust.rs
//
// Trust evaluation: point trust, direct trust, least-trustworthy-path
// score, and the interceptor's accept/drop gate.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::graph::{LinkTrust, NetworkGraph};

/// Local acceptance threshold on direct trust (§4.6, θ).
pub const THETA: f64 = 0.5;

pub fn trust(r: u32, s: u32) -> f64 {
    LinkTrust::new(r, s).trust()
}

/// `direct_trust(X, self)` — trust of the link `X -> self` if present,
/// else the neutral prior `trust(0,0) = 0.5`.
pub fn direct_trust(graph: &NetworkGraph, source: &str, target: &str) -> f64 {
    graph
        .link(source, target)
        .map(|link| link.trust())
        .unwrap_or_else(|| trust(0, 0))
}

/// Minimum, over all simple directed paths `start -> end`, of the
/// arithmetic mean of per-edge trust along that path. 1.0 if `start ==
/// end`; 0.0 if no path exists. Bounded by `MAX_NODES`, so depth-first
/// enumeration with a visited set is acceptable even in the worst case.
pub fn least_trustworthy_path_score(graph: &NetworkGraph, start: &str, end: &str) -> f64 {
    if start == end {
        return 1.0;
    }
    let (Some(start_ix), Some(end_ix)) = (graph.find_node(start), graph.find_node(end)) else {
        return 0.0;
    };

    let mut visited = HashSet::new();
    visited.insert(start_ix);
    let mut best: Option<f64> = None;
    walk(graph, start_ix, end_ix, &mut visited, 0.0, 0, &mut best);
    best.unwrap_or(0.0)
}

fn walk(
    graph: &NetworkGraph,
    current: NodeIndex,
    end: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    trust_sum: f64,
    edge_count: u32,
    best: &mut Option<f64>,
) {
    for (next, link) in graph.iter_out_edges(current) {
        if visited.contains(&next) {
            continue;
        }
        let sum = trust_sum + link.trust();
        let count = edge_count + 1;
        if next == end {
            let avg = sum / count as f64;
            *best = Some(best.map_or(avg, |b: f64| b.min(avg)));
            continue;
        }
        visited.insert(next);
        walk(graph, next, end, visited, sum, count, best);
        visited.remove(&next);
    }
}

/// The authoritative decision rule: accept iff the direct trust of the
/// immediately preceding broker meets θ. The path score is informative
/// only — it is never the gate (Open Question 1).
pub fn decide(graph: &NetworkGraph, last_signer: &str, self_id: &str) -> bool {
    direct_trust(graph, last_signer, self_id) >= THETA
}
