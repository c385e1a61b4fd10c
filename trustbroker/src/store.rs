// trustbroker/src/store.rs
//
// Trust Store (C5) — durable per-broker store of incoming-link (r,s)
// counters, and the periodic reload/overlay of the shared network map.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::graph::NetworkGraph;

/// Minimum cadence, in seconds, between shared-map reloads (§6).
pub const MAP_REFRESH_INTERVAL_SECS: i64 = 10;

pub struct TrustStore {
    self_id: String,
    local_path: PathBuf,
    shared_map_path: PathBuf,
    last_refresh: Option<DateTime<Utc>>,
}

impl TrustStore {
    pub fn new(
        self_id: impl Into<String>,
        local_path: impl Into<PathBuf>,
        shared_map_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            local_path: local_path.into(),
            shared_map_path: shared_map_path.into(),
            last_refresh: None,
        }
    }

    /// Builds the graph at init: shared map from scratch, overlaid with
    /// locally-authoritative rows.
    pub fn load_initial(&mut self) -> std::io::Result<NetworkGraph> {
        let mut graph = NetworkGraph::load_shared_map(&self.shared_map_path)?;
        self.overlay_local(&mut graph);
        self.last_refresh = Some(Utc::now());
        Ok(graph)
    }

    /// Rows whose source is not already a known broker are ignored, per
    /// §4.5 — local rows never introduce new nodes.
    fn overlay_local(&self, graph: &mut NetworkGraph) {
        let Ok(content) = std::fs::read_to_string(&self.local_path) else {
            return;
        };
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            let [source, r, s] = parts[..] else {
                tracing::warn!(line = lineno + 1, content = line, "malformed trust store row, skipping");
                continue;
            };
            if graph.find_node(source).is_none() {
                continue;
            }
            let (Ok(r), Ok(s)) = (r.trim().parse::<u32>(), s.trim().parse::<u32>()) else {
                tracing::warn!(line = lineno + 1, content = line, "unparseable r/s, skipping");
                continue;
            };
            graph.set_link_counters(source, &self.self_id, r, s);
        }
    }

    /// Writes the local incoming-link rows (`source,r,s`) atomically:
    /// write to a sibling `.tmp` path, then rename over the target.
    pub fn save(&self, graph: &NetworkGraph) -> std::io::Result<()> {
        let mut body = String::new();
        for source in graph.broker_ids() {
            if source == self.self_id {
                continue;
            }
            if let Some(link) = graph.link(source, &self.self_id) {
                body.push_str(&format!("{source},{},{}\n", link.r, link.s));
            }
        }
        let tmp_path = tmp_sibling(&self.local_path);
        {
            let mut f = std::fs::File::create(&tmp_path)?;
            f.write_all(body.as_bytes())?;
        }
        std::fs::rename(&tmp_path, &self.local_path)?;
        Ok(())
    }

    /// Runs on each host tick; reloads the shared map and re-overlays
    /// local rows once `MAP_REFRESH_INTERVAL_SECS` has elapsed since the
    /// last reload. Returns whether a reload happened.
    pub fn tick(&mut self, graph: &mut NetworkGraph) -> std::io::Result<bool> {
        let now = Utc::now();
        let due = self
            .last_refresh
            .map(|last| (now - last).num_seconds() >= MAP_REFRESH_INTERVAL_SECS)
            .unwrap_or(true);
        if !due {
            return Ok(false);
        }
        let mut fresh = NetworkGraph::load_shared_map(&self.shared_map_path)?;
        self.overlay_local(&mut fresh);
        *graph = fresh;
        self.last_refresh = Some(now);
        Ok(true)
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trust_store".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}
