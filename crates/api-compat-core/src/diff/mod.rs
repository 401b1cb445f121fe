//! 结构化差异引擎
//!
//! 按限定名匹配新旧两棵声明树，递归比较子节点，输出带标记的差异树。
//! 匹配只看限定名的精确相等，成员顺序变化不算差异。

mod attributes;
mod entry;

#[cfg(test)]
mod tests;

pub use entry::{Attribute, DiffEntry, DiffTree, Tag, from_json, to_json};

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::node::Node;
use crate::store::DeclarationStore;
use attributes::attribute_diff;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// 差异引擎
#[derive(Clone)]
pub struct DiffEngine {
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine").finish_non_exhaustive()
    }
}

/// 子节点按限定名做多重集划分的结果
struct ChildPartition<'n> {
    removed: Vec<&'n Node>,
    added: Vec<&'n Node>,
    common: Vec<(&'n Node, &'n Node)>,
}

impl DiffEngine {
    /// 创建使用 tracing 输出诊断的引擎
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// 创建使用指定诊断接收端的引擎
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// 比较两个存储，使用各自的根列表与排除集合
    pub fn diff_stores(&self, old: &DeclarationStore, new: &DeclarationStore) -> DiffTree {
        self.diff_trees(
            old.roots(),
            new.roots(),
            old,
            new,
            old.exclusions(),
            new.exclusions(),
        )
    }

    /// 比较两组根节点
    ///
    /// 根节点与子节点一样按限定名做多重集匹配：每个旧根按顺序消耗一个同名新根，
    /// 配上的递归比较，配不上的旧根记为 `removed`，剩下的新根记为 `added`。
    /// 两侧都存在的根只要被任一侧排除，两个方向都跳过。
    pub fn diff_trees(
        &self,
        roots_old: &[Arc<Node>],
        roots_new: &[Arc<Node>],
        store_old: &DeclarationStore,
        store_new: &DeclarationStore,
        exclude_old: &HashSet<String>,
        exclude_new: &HashSet<String>,
    ) -> DiffTree {
        let mut old_candidates: Vec<&Node> = Vec::new();
        for root in roots_old {
            let name = root.qualified_name();
            if exclude_old.contains(name) {
                self.note_excluded(name, "old");
            } else if exclude_new.contains(name) && store_new.find_root(name).is_some() {
                self.note_excluded(name, "new");
            } else {
                old_candidates.push(root.as_ref());
            }
        }

        let mut new_candidates: Vec<&Node> = Vec::new();
        for root in roots_new {
            let name = root.qualified_name();
            if exclude_new.contains(name) {
                self.note_excluded(name, "new");
            } else if exclude_old.contains(name) && store_old.find_root(name).is_some() {
                self.note_excluded(name, "old");
            } else {
                new_candidates.push(root.as_ref());
            }
        }

        let matching = match_by_name(old_candidates, &new_candidates);
        let mut diffs = DiffTree::new();
        for (old_root, counterpart) in matching.pairs {
            match counterpart {
                Some(new_root) => diffs.extend(self.diff_nodes(old_root, new_root)),
                None => diffs.push(DiffEntry::tagged(old_root, Tag::Removed)),
            }
        }
        diffs.extend(
            matching
                .unmatched_new
                .into_iter()
                .map(|new_root| DiffEntry::tagged(new_root, Tag::Added)),
        );
        diffs
    }

    /// 比较两个同名节点
    ///
    /// 种类不同视为整体替换；双方都有子节点时按子节点划分递归比较，
    /// 结果包装成一个 `modified` 条目；否则直接返回节点属性差异。
    pub fn diff_nodes(&self, old: &Node, new: &Node) -> Vec<DiffEntry> {
        if old.kind() != new.kind() {
            self.sink.record(Diagnostic::warning(format!(
                "Declaration '{}' changed kind from {} to {}, reporting it as replaced",
                old.qualified_name(),
                old.kind(),
                new.kind()
            )));
            return vec![
                DiffEntry::tagged(old, Tag::Removed),
                DiffEntry::tagged(new, Tag::Added),
            ];
        }

        if !(old.has_children() && new.has_children()) {
            let entries = attribute_diff(old, new);
            if old.kind().is_callable() && !entries.is_empty() {
                return vec![DiffEntry::modified(old, entries)];
            }
            return entries;
        }

        let partition = partition_children(old.children(), new.children());
        let mut children = Vec::new();
        children.extend(
            partition
                .removed
                .iter()
                .map(|node| DiffEntry::tagged(node, Tag::Removed)),
        );
        children.extend(
            partition
                .added
                .iter()
                .map(|node| DiffEntry::tagged(node, Tag::Added)),
        );
        for (before, after) in partition.common {
            children.extend(self.diff_nodes(before, after));
        }
        children.extend(attribute_diff(old, new));

        if children.is_empty() {
            Vec::new()
        } else {
            vec![DiffEntry::modified(old, children)]
        }
    }

    fn note_excluded(&self, name: &str, side: &str) {
        self.sink.record(Diagnostic::info(format!(
            "Skipping '{name}': excluded by the {side} snapshot"
        )));
    }
}

/// 按限定名一一配对的结果，旧侧保持原顺序
struct NameMatching<'n> {
    pairs: Vec<(&'n Node, Option<&'n Node>)>,
    unmatched_new: Vec<&'n Node>,
}

/// 按限定名做多重集匹配；重名节点一一配对，先到先配
fn match_by_name<'n>(
    old: impl IntoIterator<Item = &'n Node>,
    new: &[&'n Node],
) -> NameMatching<'n> {
    let mut pending: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (index, node) in new.iter().enumerate() {
        pending
            .entry(node.qualified_name())
            .or_default()
            .push_back(index);
    }

    let mut matched = vec![false; new.len()];
    let pairs = old
        .into_iter()
        .map(|node| {
            let counterpart = pending
                .get_mut(node.qualified_name())
                .and_then(VecDeque::pop_front)
                .map(|index| {
                    matched[index] = true;
                    new[index]
                });
            (node, counterpart)
        })
        .collect();

    let unmatched_new = new
        .iter()
        .zip(matched)
        .filter(|(_, was_matched)| !was_matched)
        .map(|(node, _)| *node)
        .collect();

    NameMatching {
        pairs,
        unmatched_new,
    }
}

/// 按限定名划分子节点
fn partition_children<'n>(old: &'n [Node], new: &'n [Node]) -> ChildPartition<'n> {
    let new: Vec<&Node> = new.iter().collect();
    let matching = match_by_name(old, &new);

    let mut removed = Vec::new();
    let mut common = Vec::new();
    for (node, counterpart) in matching.pairs {
        match counterpart {
            Some(other) => common.push((node, other)),
            None => removed.push(node),
        }
    }

    ChildPartition {
        removed,
        added: matching.unmatched_new,
        common,
    }
}
