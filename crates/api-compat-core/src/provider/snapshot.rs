//! 声明快照回放

use super::{DeclarationProvider, HeaderSource};
use crate::error::Result;
use crate::store::{DeclarationStore, StoreSnapshot};
use tracing::debug;

/// 从 JSON 快照 `{ "roots": [...], "exclude": [...] }` 填充存储
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotProvider;

impl SnapshotProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationProvider for SnapshotProvider {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn populate(&self, source: &HeaderSource, store: &mut DeclarationStore) -> Result<()> {
        let snapshot: StoreSnapshot = serde_json::from_str(&source.contents)?;
        debug!(
            "Replaying {} roots from snapshot {}",
            snapshot.roots.len(),
            source.path.display()
        );

        for name in snapshot.exclude {
            store.exclude(name);
        }
        for root in snapshot.roots {
            if !store.register_root(root) {
                debug!("Duplicate root skipped while replaying {}", source.label);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiCompatError;
    use crate::node::{Node, NodeKind};

    #[test]
    fn test_replays_store_snapshot() {
        let mut original = DeclarationStore::new();
        original.exclude("detail");
        original.register_root(
            Node::builder(NodeKind::Enum, "Color")
                .child(
                    Node::builder(NodeKind::Enumerator, "Color::RED")
                        .value("0")
                        .build(),
                )
                .build(),
        );
        let json = serde_json::to_string(&original.to_snapshot()).unwrap();

        let mut store = DeclarationStore::new();
        SnapshotProvider::new()
            .populate(&HeaderSource::new("colors.h", "colors.json", json), &mut store)
            .unwrap();

        assert!(store.is_excluded("detail"));
        let root = store.find_root("Color").unwrap();
        assert_eq!(root.children()[0].declaration().unwrap().value, "0");
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        let mut store = DeclarationStore::new();
        let result = SnapshotProvider::new().populate(
            &HeaderSource::new("bad.h", "bad.json", "{ \"roots\": 42 }"),
            &mut store,
        );
        assert!(matches!(result, Err(ApiCompatError::SnapshotFormat(_))));
        assert!(store.is_empty());
    }
}
