//! 声明存储
//!
//! 每个快照对应一个 [`DeclarationStore`]：按 USR 去重的节点表、按发现顺序排列的
//! 根节点列表以及不参与比较的限定名集合。由声明提供者单线程填充一次，之后只读。

use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// 去重声明存储
#[derive(Debug, Clone, Default)]
pub struct DeclarationStore {
    nodes: HashMap<String, Arc<Node>>,
    roots: Vec<Arc<Node>>,
    /// 限定名 -> 首个同名根节点在 `roots` 中的位置
    root_index: HashMap<String, usize>,
    excluded: HashSet<String>,
}

/// 声明快照的序列化格式
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub roots: Vec<Node>,
    pub exclude: Vec<String>,
}

impl DeclarationStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅当键不存在时插入；返回是否发生了插入
    pub fn insert(&mut self, key: impl Into<String>, node: Arc<Node>) -> bool {
        match self.nodes.entry(key.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    /// 插入或替换
    pub fn upsert(&mut self, key: impl Into<String>, node: Arc<Node>) {
        self.nodes.insert(key.into(), node);
    }

    pub fn lookup(&self, key: &str) -> Option<Arc<Node>> {
        self.nodes.get(key).cloned()
    }

    /// 追加根节点；`None` 时什么也不做
    pub fn add_root(&mut self, node: impl Into<Option<Arc<Node>>>) {
        let Some(node) = node.into() else {
            return;
        };
        self.root_index
            .entry(node.qualified_name().to_string())
            .or_insert(self.roots.len());
        self.roots.push(node);
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    /// 按限定名查找根作用域中的节点
    ///
    /// 先查根节点列表，再退回到以该限定名为键的表项。重名的根（如函数重载）
    /// 只返回第一个。
    pub fn find_root(&self, qualified_name: &str) -> Option<&Arc<Node>> {
        self.root_index
            .get(qualified_name)
            .map(|&index| &self.roots[index])
            .or_else(|| self.nodes.get(qualified_name))
    }

    pub fn exclude(&mut self, qualified_name: impl Into<String>) {
        self.excluded.insert(qualified_name.into());
    }

    pub fn is_excluded(&self, qualified_name: &str) -> bool {
        self.excluded.contains(qualified_name)
    }

    /// 排除集合属于配置：`clear` 保留它，`reset` 才会清空
    pub fn exclusions(&self) -> &HashSet<String> {
        &self.excluded
    }

    /// 去重表中的节点数
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 去重表与根节点列表均为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.roots.is_empty()
    }

    /// 清空节点与根列表；排除集合属于配置，保留不变
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.root_index.clear();
    }

    /// 恢复到新建时的空状态，连同排除集合
    pub fn reset(&mut self) {
        self.clear();
        self.excluded.clear();
    }

    /// 注册一个根声明：以 USR（为空时以限定名）为键插入，并追加到根列表
    ///
    /// 键已存在时返回 false，且不追加根节点。
    pub fn register_root(&mut self, node: Node) -> bool {
        let key = if node.usr().is_empty() {
            node.qualified_name().to_string()
        } else {
            node.usr().to_string()
        };
        let node = Arc::new(node);
        if !self.insert(key, Arc::clone(&node)) {
            return false;
        }
        self.add_root(node);
        true
    }

    /// 导出为可重放的快照
    pub fn to_snapshot(&self) -> StoreSnapshot {
        let exclude: BTreeSet<&String> = self.excluded.iter().collect();
        StoreSnapshot {
            roots: self.roots.iter().map(|root| Node::clone(root)).collect(),
            exclude: exclude.into_iter().cloned().collect(),
        }
    }

    /// 从快照恢复
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for name in snapshot.exclude {
            store.exclude(name);
        }
        for root in snapshot.roots {
            store.register_root(root);
        }
        store
    }
}
