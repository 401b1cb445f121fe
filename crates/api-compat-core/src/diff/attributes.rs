//! 节点自身属性的比较
//!
//! 只比较两个同名同种类节点的标量属性，不涉及子节点。

use super::entry::{Attribute, DiffEntry, Tag};
use crate::node::{ConditionalBlock, Declaration, Node, NodeKind};

/// 比较 `old` 与 `new` 的节点级属性，返回描述每一处变化的条目
pub(crate) fn attribute_diff(old: &Node, new: &Node) -> Vec<DiffEntry> {
    if let (Some(before), Some(after)) = (old.conditional(), new.conditional()) {
        return conditional_diff(old, new, before, after);
    }
    match (old.declaration(), new.declaration()) {
        (Some(before), Some(after)) if old.kind().is_callable() => {
            callable_diff(old, new, before, after)
        }
        (Some(before), Some(after)) => declaration_diff(old, new, before, after),
        _ => Vec::new(),
    }
}

fn declaration_diff(old: &Node, new: &Node, a: &Declaration, b: &Declaration) -> Vec<DiffEntry> {
    let pairs = [
        (Attribute::DataType, a.data_type.as_str(), b.data_type.as_str()),
        (Attribute::StorageClass, a.storage.as_str(), b.storage.as_str()),
        (
            Attribute::CallingConvention,
            a.calling_convention.as_str(),
            b.calling_convention.as_str(),
        ),
        (Attribute::Inline, flag(a.is_inline), flag(b.is_inline)),
        (
            Attribute::ConstQualifier,
            a.const_qualifier.as_str(),
            b.const_qualifier.as_str(),
        ),
        (
            Attribute::VirtualQualifier,
            a.virtual_qualifier.as_str(),
            b.virtual_qualifier.as_str(),
        ),
        (Attribute::Access, a.access.as_str(), b.access.as_str()),
        (Attribute::Value, a.value.as_str(), b.value.as_str()),
        (Attribute::Packed, flag(a.is_packed), flag(b.is_packed)),
    ];

    pairs
        .into_iter()
        .filter_map(|(attribute, before, after)| attribute_change(old, new, attribute, before, after))
        .collect()
}

/// 函数与方法：存储类、调用约定、inline 的变化以一对函数快照表示；
/// 返回类型由 ReturnType 子节点覆盖，这里不比较函数自身的 dataType
fn callable_diff(old: &Node, new: &Node, a: &Declaration, b: &Declaration) -> Vec<DiffEntry> {
    let mut entries = Vec::new();

    if a.storage != b.storage
        || a.calling_convention != b.calling_convention
        || a.is_inline != b.is_inline
    {
        entries.push(function_snapshot(old, a, Tag::Removed));
        entries.push(function_snapshot(new, b, Tag::Added));
    }

    let pairs = [
        (
            Attribute::ConstQualifier,
            a.const_qualifier.as_str(),
            b.const_qualifier.as_str(),
        ),
        (
            Attribute::VirtualQualifier,
            a.virtual_qualifier.as_str(),
            b.virtual_qualifier.as_str(),
        ),
        (Attribute::Access, a.access.as_str(), b.access.as_str()),
    ];
    entries.extend(
        pairs
            .into_iter()
            .filter_map(|(attribute, before, after)| {
                attribute_change(old, new, attribute, before, after)
            }),
    );
    entries
}

fn conditional_diff(
    old: &Node,
    new: &Node,
    a: &ConditionalBlock,
    b: &ConditionalBlock,
) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    entries.extend(attribute_change(
        old,
        new,
        Attribute::ConditionString,
        &a.condition_string,
        &b.condition_string,
    ));
    if a.hash != b.hash {
        // 宏定义的 body 就是替换文本
        let attribute = if old.kind() == NodeKind::Define {
            Attribute::Value
        } else {
            Attribute::Hash
        };
        entries.push(paired(old, new, attribute, &a.body_string, &b.body_string));
    }
    entries.extend(attribute_change(
        old,
        new,
        Attribute::IsActive,
        flag(a.is_active),
        flag(b.is_active),
    ));
    entries
}

fn attribute_change(
    old: &Node,
    new: &Node,
    attribute: Attribute,
    before: &str,
    after: &str,
) -> Option<DiffEntry> {
    (before != after).then(|| paired(old, new, attribute, before, after))
}

/// `modified` 条目，子节点为旧侧 `removed` 与新侧 `added` 快照
fn paired(old: &Node, new: &Node, attribute: Attribute, before: &str, after: &str) -> DiffEntry {
    let side = |node: &Node, tag: Tag, value: &str| DiffEntry {
        attribute: Some(attribute),
        value: Some(value.to_string()),
        ..DiffEntry::snapshot(node, tag)
    };
    DiffEntry {
        attribute: Some(attribute),
        ..DiffEntry::modified(
            old,
            vec![
                side(old, Tag::Removed, before),
                side(new, Tag::Added, after),
            ],
        )
    }
}

fn function_snapshot(node: &Node, decl: &Declaration, tag: Tag) -> DiffEntry {
    DiffEntry {
        storage_qualifier: Some(decl.storage.as_str().to_string()),
        function_calling_convention: Some(decl.calling_convention.as_str().to_string()),
        inline: Some(decl.is_inline),
        ..DiffEntry::snapshot(node, tag)
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
