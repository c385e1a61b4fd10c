// trustbroker/src/context.rs
//
// BrokerContext — the single opaque handle the host holds and passes to
// each callback (DESIGN NOTES §9: no global mutable state).

use crate::acl::AclTable;
use crate::config::BrokerOptions;
use crate::feedback::{self, FeedbackMessage};
use crate::graph::NetworkGraph;
use crate::interceptor::{self, Decision, MessageEvent};
use crate::mac::MacEngine;
use crate::store::TrustStore;

pub struct BrokerContext {
    self_id: String,
    acl: AclTable,
    mac: MacEngine,
    graph: NetworkGraph,
    store: TrustStore,
}

impl BrokerContext {
    /// `init(options)` — loads the ACL table, the shared network map
    /// overlaid with the local trust store, and constructs the MAC
    /// engine. I/O failures are logged at ERROR and fall back to an
    /// empty in-memory state rather than aborting (§7).
    pub fn init(options: BrokerOptions) -> Self {
        let acl = AclTable::load(&options.acl_file).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = %options.acl_file.display(), "io_error loading ACL file, starting with an empty table");
            AclTable::default()
        });

        let mut store = TrustStore::new(
            options.broker_id.clone(),
            options.trust_store_path(),
            options.network_map_file.clone(),
        );
        let graph = store.load_initial().unwrap_or_else(|e| {
            tracing::error!(error = %e, "io_error loading network graph, starting empty");
            NetworkGraph::new()
        });

        let mac = MacEngine::new(options.hmac_key.clone());

        Self {
            self_id: options.broker_id,
            acl,
            mac,
            graph,
            store,
        }
    }

    /// `on_message(event)` — routes feedback-topic events to the
    /// feedback handler (persisting the trust store on mutation), and
    /// everything else through the data-message pipeline (C8).
    pub fn on_message(&mut self, event: &mut MessageEvent) -> Decision {
        if event.topic == interceptor::FEEDBACK_TOPIC {
            self.handle_feedback(event);
            return Decision::Forward(event.payload.clone());
        }
        interceptor::process_data_message(&self.acl, &self.graph, &self.mac, &self.self_id, event)
    }

    fn handle_feedback(&mut self, event: &mut MessageEvent) {
        match serde_json::from_slice::<FeedbackMessage>(&event.payload) {
            Ok(msg) => {
                if feedback::apply(&mut self.graph, &self.self_id, &msg) {
                    if let Err(e) = self.store.save(&self.graph) {
                        tracing::error!(error = %e, "io_error persisting trust store after feedback");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "malformed feedback payload, ignoring"),
        }
        // Invariant 6: the raw feedback topic never reaches the wire.
        event.topic = interceptor::FEEDBACK_SENTINEL_TOPIC.to_string();
    }

    /// `on_tick()` — reloads the shared network map on the configured
    /// cadence.
    pub fn on_tick(&mut self) {
        match self.store.tick(&mut self.graph) {
            Ok(true) => tracing::info!("network map reloaded"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "io_error refreshing network map, retaining in-memory state"),
        }
    }

    /// `cleanup()` — flush the trust store.
    pub fn cleanup(&self) {
        if let Err(e) = self.store.save(&self.graph) {
            tracing::error!(error = %e, "io_error flushing trust store on cleanup");
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token;
    use tempfile::TempDir;

    fn options_in(dir: &std::path::Path) -> BrokerOptions {
        std::fs::write(dir.join("network_map.txt"), "B2,B3,0.5\n").unwrap();
        std::fs::write(dir.join("acl.txt"), "").unwrap();
        BrokerOptions {
            broker_id: "B3".to_string(),
            acl_file: dir.join("acl.txt"),
            hmac_key: b"shared-secret".to_vec(),
            log_file: None,
            network_map_file: dir.join("network_map.txt"),
            trust_store_template: dir.join("trust_store_%s.txt").to_string_lossy().into_owned(),
        }
    }

    // S4 — positive feedback.
    #[test]
    fn positive_feedback_updates_trust_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut ctx = BrokerContext::init(options_in(dir.path()));

        let feedback = serde_json::json!({"source": "B2", "target": "B3", "feedback": "positive"});
        let mut event = MessageEvent::new(
            interceptor::FEEDBACK_TOPIC,
            serde_json::to_vec(&feedback).unwrap(),
        );
        ctx.on_message(&mut event);

        let link = ctx.graph().link("B2", "B3").unwrap();
        assert_eq!((link.r, link.s), (1, 0));
        assert!((link.trust() - 0.667).abs() < 0.01);
        assert_eq!(event.topic, interceptor::FEEDBACK_SENTINEL_TOPIC);

        let store_path = dir.path().join("trust_store_B3.txt");
        let content = std::fs::read_to_string(store_path).unwrap();
        assert!(content.contains("B2,1,0"));
    }

    // S5 — negative feedback asymmetry.
    #[test]
    fn negative_feedback_drops_trust_below_threshold() {
        let dir = TempDir::new().unwrap();
        let mut ctx = BrokerContext::init(options_in(dir.path()));

        let feedback = serde_json::json!({"source": "B2", "target": "B3", "feedback": "negative"});
        let mut event = MessageEvent::new(
            interceptor::FEEDBACK_TOPIC,
            serde_json::to_vec(&feedback).unwrap(),
        );
        ctx.on_message(&mut event);

        let link = ctx.graph().link("B2", "B3").unwrap();
        assert_eq!((link.r, link.s), (0, 5));
        assert!((link.trust() - 0.071).abs() < 0.01);
    }

    #[test]
    fn on_tick_before_interval_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut ctx = BrokerContext::init(options_in(dir.path()));
        ctx.on_tick(); // should not panic or reload prematurely
        assert!(ctx.graph().link("B2", "B3").is_some());
    }

    #[test]
    fn cleanup_flushes_the_trust_store() {
        let dir = TempDir::new().unwrap();
        let ctx = BrokerContext::init(options_in(dir.path()));
        ctx.cleanup();
        assert!(dir.path().join("trust_store_B3.txt").exists());
    }

    #[test]
    fn end_to_end_accept_and_sign() {
        let dir = TempDir::new().unwrap();
        let mut opts = options_in(dir.path());
        std::fs::write(&opts.network_map_file, "B1,B3,0.83\n").unwrap();
        opts.hmac_key = b"shared-secret".to_vec();
        let mut ctx = BrokerContext::init(opts);

        let mac = MacEngine::new(b"shared-secret".to_vec());
        let at = token::AuthToken {
            b: "B0".into(),
            c: "client1".into(),
            signers: vec!["B0".into(), "B1".into()],
            publish_topics: vec![],
            subscribe_topics: vec![],
            msg: "hello".into(),
            msg_id: 1,
            hmac: None,
            extra: Default::default(),
        };
        let canonical = token::serialize_without_mac(&at);
        let tag = mac.compute(&canonical);
        let payload = token::serialize(&token::attach_mac(at, tag));

        let mut event = MessageEvent::new("home/bedroom", payload);
        let decision = ctx.on_message(&mut event);
        match decision {
            Decision::Forward(bytes) => {
                let out = token::parse(&bytes).unwrap();
                assert_eq!(out.signers, vec!["B0", "B1", "B3"]);
            }
            other => panic!("expected Forward, got {other:?}"),
        }
    }
}
