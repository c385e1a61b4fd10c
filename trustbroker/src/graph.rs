// trustbroker/src/graph.rs
//
// In-memory directed graph of brokers and neighbor trust links. Nodes
// are an arena of small integer indices (petgraph::NodeIndex); edges
// store the target's index, not a pointer, so the graph's cycles never
// require Rc/RefCell bookkeeping.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

pub const MAX_NODES: usize = 32;
pub const MAX_EDGES_PER_NODE: usize = 8;

/// Base-rate prior in the trust formula (§4.6, δ).
pub const DELTA: f64 = 0.5;

pub type BrokerId = String;

/// Positive/negative evidence counters for a single directed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkTrust {
    pub r: u32,
    pub s: u32,
}

impl LinkTrust {
    pub fn new(r: u32, s: u32) -> Self {
        Self { r, s }
    }

    /// `trust(r,s) = r/(r+s+2) + δ·2/(r+s+2)`.
    pub fn trust(&self) -> f64 {
        let denom = (self.r + self.s + 2) as f64;
        self.r as f64 / denom + DELTA * 2.0 / denom
    }
}

#[derive(Debug, Default)]
pub struct NetworkGraph {
    graph: DiGraph<BrokerId, LinkTrust>,
    index: HashMap<BrokerId, NodeIndex>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    fn ensure_node(&mut self, id: &str) -> Option<NodeIndex> {
        if let Some(&ix) = self.index.get(id) {
            return Some(ix);
        }
        if self.index.len() >= MAX_NODES {
            tracing::warn!(broker_id = id, "capacity_exceeded: graph full, dropping node");
            return None;
        }
        let ix = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), ix);
        Some(ix)
    }

    pub fn iter_out_edges(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, LinkTrust)> + '_ {
        self.graph.edges(node).map(|e| (e.target(), *e.weight()))
    }

    /// Overwrite the link `source -> target` with counters `(r, s)`,
    /// creating either endpoint if absent. Silently drops the write if a
    /// capacity cap would be exceeded.
    pub fn set_link_counters(&mut self, source: &str, target: &str, r: u32, s: u32) {
        let Some(src) = self.ensure_node(source) else { return };
        let Some(tgt) = self.ensure_node(target) else { return };
        if let Some(edge) = self.graph.find_edge(src, tgt) {
            self.graph[edge] = LinkTrust::new(r, s);
            return;
        }
        if self.graph.edges(src).count() >= MAX_EDGES_PER_NODE {
            tracing::warn!(source, target, "capacity_exceeded: out-edge cap reached, dropping link");
            return;
        }
        self.graph.add_edge(src, tgt, LinkTrust::new(r, s));
    }

    pub fn link(&self, source: &str, target: &str) -> Option<LinkTrust> {
        let src = self.find_node(source)?;
        let tgt = self.find_node(target)?;
        let edge = self.graph.find_edge(src, tgt)?;
        Some(self.graph[edge])
    }

    pub fn broker_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Loads the shared, externally-aggregated network map: one
    /// `source,target,static_trust` row per non-comment line. Malformed
    /// rows are skipped with a warning rather than aborting the load,
    /// since the file may be read mid-write by its external aggregator.
    pub fn load_shared_map(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut graph = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            let [source, target, static_trust] = parts[..] else {
                tracing::warn!(line = lineno + 1, content = line, "malformed network map row, skipping");
                continue;
            };
            let Ok(t) = static_trust.trim().parse::<f64>() else {
                tracing::warn!(line = lineno + 1, static_trust, "unparseable static_trust, skipping");
                continue;
            };
            if !(t > 0.0 && t < 1.0) {
                tracing::warn!(line = lineno + 1, static_trust = t, "static_trust out of range, skipping");
                continue;
            }
            let (r, s) = static_trust_to_counters(t);
            graph.set_link_counters(source.trim(), target.trim(), r, s);
        }
        Ok(graph)
    }
}

/// Inverts `LinkTrust::trust` under δ=0.5 so that a single static_trust
/// value `t ∈ (0,1)` can be loaded as equivalent `(r, s)` counters.
pub fn static_trust_to_counters(t: f64) -> (u32, u32) {
    if t > 0.5 {
        let r = ((2.0 * t - 1.0) / (1.0 - t)).round().max(0.0);
        (r as u32, 0)
    } else if t > 0.0 {
        let s = (1.0 / t - 2.0).round().max(0.0);
        (0, s as u32)
    } else {
        (0, 99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_is_half_for_unseen_link() {
        assert_eq!(LinkTrust::default().trust(), 0.5);
    }

    #[test]
    fn trust_range_and_monotonicity() {
        for r in 0..20u32 {
            for s in 0..20u32 {
                let t = LinkTrust::new(r, s).trust();
                assert!((0.0..=1.0).contains(&t));
                assert!(LinkTrust::new(r + 1, s).trust() > t);
                assert!(LinkTrust::new(r, s + 1).trust() < t);
            }
        }
    }

    #[test]
    fn capacity_caps_are_enforced() {
        let mut graph = NetworkGraph::new();
        for i in 0..40 {
            graph.set_link_counters("source", &format!("target{i}"), 1, 0);
        }
        assert!(graph.node_count() <= MAX_NODES);
    }

    #[test]
    fn out_edge_cap_is_enforced_per_node() {
        let mut graph = NetworkGraph::new();
        for i in 0..12 {
            graph.set_link_counters("hub", &format!("leaf{i}"), 1, 0);
        }
        let hub = graph.find_node("hub").unwrap();
        assert!(graph.iter_out_edges(hub).count() <= MAX_EDGES_PER_NODE);
    }

    #[test]
    fn static_trust_inversion_recovers_within_tolerance() {
        for i in 1..99 {
            let t = i as f64 / 100.0;
            let (r, s) = static_trust_to_counters(t);
            let recovered = LinkTrust::new(r, s).trust();
            assert!((recovered - t).abs() <= 0.05, "t={t} recovered={recovered}");
        }
    }

    #[test]
    fn unknown_link_has_no_entry() {
        let graph = NetworkGraph::new();
        assert!(graph.link("B1", "B2").is_none());
    }
}
