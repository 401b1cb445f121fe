//! 差异树条目
//!
//! 差异树既是差异引擎的输出，也是分类器的输入和原始差异的持久化格式。
//! 读取时缺失的可选字段一律按空值处理。

use crate::error::Result;
use crate::node::{Node, NodeKind};
use serde::{Deserialize, Serialize};

/// 差异树：顶层条目序列
pub type DiffTree = Vec<DiffEntry>;

/// 条目标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Added,
    Removed,
    Modified,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Added => "added",
            Tag::Removed => "removed",
            Tag::Modified => "modified",
        }
    }
}

/// 发生变化的节点属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    DataType,
    #[serde(rename = "storageQualifier")]
    StorageClass,
    #[serde(rename = "functionCallingConvention")]
    CallingConvention,
    Inline,
    ConstQualifier,
    VirtualQualifier,
    Access,
    Value,
    Packed,
    ConditionString,
    Hash,
    IsActive,
    #[serde(other)]
    Other,
}

impl Attribute {
    /// 序列化名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::DataType => "dataType",
            Attribute::StorageClass => "storageQualifier",
            Attribute::CallingConvention => "functionCallingConvention",
            Attribute::Inline => "inline",
            Attribute::ConstQualifier => "constQualifier",
            Attribute::VirtualQualifier => "virtualQualifier",
            Attribute::Access => "access",
            Attribute::Value => "value",
            Attribute::Packed => "packed",
            Attribute::ConditionString => "conditionString",
            Attribute::Hash => "hash",
            Attribute::IsActive => "isActive",
            Attribute::Other => "attribute",
        }
    }

    /// 描述文本中使用的名称
    pub fn label(&self) -> &'static str {
        match self {
            Attribute::ConditionString => "condition",
            Attribute::Hash => "body",
            Attribute::IsActive => "active state",
            other => other.as_str(),
        }
    }
}

/// 差异树中的一个条目
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qualified_name: String,
    #[serde(default)]
    pub node_type: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DiffEntry>,
    /// 属性变化条目所描述的属性
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    /// 属性在该侧的取值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_calling_convention: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl DiffEntry {
    /// 序列化整棵子树；子节点不带标记
    pub fn from_node(node: &Node) -> Self {
        Self {
            qualified_name: node.qualified_name().to_string(),
            node_type: node.kind(),
            data_type: node.data_type().to_string(),
            children: node.children().iter().map(DiffEntry::from_node).collect(),
            ..Self::default()
        }
    }

    /// 序列化整棵子树并打上标记
    pub fn tagged(node: &Node, tag: Tag) -> Self {
        Self {
            tag: Some(tag),
            ..Self::from_node(node)
        }
    }

    /// 以 `node` 的名称与种类包装一组子差异
    pub fn modified(node: &Node, children: Vec<DiffEntry>) -> Self {
        Self {
            qualified_name: node.qualified_name().to_string(),
            node_type: node.kind(),
            tag: Some(Tag::Modified),
            children,
            ..Self::default()
        }
    }

    /// 不含子节点的单侧快照
    pub fn snapshot(node: &Node, tag: Tag) -> Self {
        Self {
            qualified_name: node.qualified_name().to_string(),
            node_type: node.kind(),
            tag: Some(tag),
            data_type: node.data_type().to_string(),
            ..Self::default()
        }
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tag == Some(tag)
    }

    /// 标记文本；无标记时为空串
    pub fn tag_str(&self) -> &'static str {
        self.tag.map(|tag| tag.as_str()).unwrap_or_default()
    }

    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    /// 是否为函数属性快照（带有存储类、调用约定或 inline 字段）
    pub fn is_function_snapshot(&self) -> bool {
        self.storage_qualifier.is_some()
            || self.function_calling_convention.is_some()
            || self.inline.is_some()
    }
}

/// 将差异树序列化为 JSON
pub fn to_json(tree: &[DiffEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tree)?)
}

/// 从 JSON 读取差异树
pub fn from_json(text: &str) -> Result<DiffTree> {
    Ok(serde_json::from_str(text)?)
}
