// trustbroker/src/acl.rs
//
// File-driven ACL filter — exact-match (client, access, topic) lookup.
// The permit-all stub seen in the original plugin's pre-check helper is
// deliberately not carried forward; this table is the only ACL path.

use std::fs;
use std::path::Path;

pub const MAX_ACL_RULES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Publish,
    Subscribe,
}

#[derive(Debug, Clone)]
struct AclRule {
    client: String,
    access: Access,
    topic: String,
}

#[derive(Debug, Clone, Default)]
pub struct AclTable {
    rules: Vec<AclRule>,
}

impl AclTable {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut table = Self::default();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if table.rules.len() >= MAX_ACL_RULES {
                tracing::warn!(line = lineno + 1, "capacity_exceeded: ACL table full, dropping rule");
                continue;
            }
            let parts: Vec<&str> = line.splitn(3, ',').collect();
            let [client, access, topic] = parts[..] else {
                tracing::warn!(line = lineno + 1, content = line, "malformed ACL rule, skipping");
                continue;
            };
            let access = match access {
                "pub" => Access::Publish,
                "sub" => Access::Subscribe,
                _ => {
                    tracing::warn!(line = lineno + 1, access, "unknown ACL access kind, skipping");
                    continue;
                }
            };
            table.rules.push(AclRule {
                client: client.to_string(),
                access,
                topic: topic.to_string(),
            });
        }
        Ok(table)
    }

    pub fn permit(&self, client: &str, topic: &str, is_publish: bool) -> bool {
        let want = if is_publish { Access::Publish } else { Access::Subscribe };
        self.rules
            .iter()
            .any(|r| r.access == want && r.client == client && r.topic == topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_acl(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn exact_match_permits() {
        let file = write_acl("client1,pub,home/bedroom\nclient1,sub,home/kitchen\n");
        let table = AclTable::load(file.path()).unwrap();
        assert!(table.permit("client1", "home/bedroom", true));
        assert!(table.permit("client1", "home/kitchen", false));
        assert!(!table.permit("client1", "home/bedroom", false));
        assert!(!table.permit("client2", "home/bedroom", true));
    }

    #[test]
    fn comments_and_blank_lines_tolerated() {
        let file = write_acl("# comment\n\nclient1,pub,home/a\n");
        let table = AclTable::load(file.path()).unwrap();
        assert!(table.permit("client1", "home/a", true));
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let file = write_acl("garbage line with no commas\nclient1,pub,home/a\n");
        let table = AclTable::load(file.path()).unwrap();
        assert!(table.permit("client1", "home/a", true));
    }
}
