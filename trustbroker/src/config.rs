// trustbroker/src/config.rs
//
// Host-supplied options for BrokerContext::init (§6). Missing options
// fall back to the defaults below; theta, delta, mu, and the graph
// capacity caps remain compile-time constants (trust::THETA,
// graph::DELTA, feedback::NEGATIVE_MULTIPLIER, graph::MAX_NODES,
// graph::MAX_EDGES_PER_NODE), per §4.4/§6.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub broker_id: String,
    pub acl_file: PathBuf,
    pub hmac_key: Vec<u8>,
    pub log_file: Option<PathBuf>,
    pub network_map_file: PathBuf,
    /// `%s` is replaced with `broker_id` to derive the local store path.
    pub trust_store_template: String,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            broker_id: "B0".to_string(),
            acl_file: PathBuf::from("acl.txt"),
            hmac_key: b"changeme".to_vec(),
            log_file: None,
            network_map_file: PathBuf::from("network_map.txt"),
            trust_store_template: "trust_store_%s.txt".to_string(),
        }
    }
}

impl BrokerOptions {
    pub fn trust_store_path(&self) -> PathBuf {
        PathBuf::from(self.trust_store_template.replace("%s", &self.broker_id))
    }
}
