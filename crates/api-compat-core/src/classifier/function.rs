//! 被修改函数的变更合成

use super::{ChangeKind, attribute_phrase, inline_text, removed_added_pair};
use crate::diff::{Attribute, DiffEntry, Tag};
use crate::node::{NodeKind, leaf_segment};
use std::collections::BTreeMap;

type Row = (ChangeKind, String);

/// 根据 `modified` 函数条目的子条目生成变更行（原始类型与描述）
pub(super) fn function_changes(entry: &DiffEntry) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut removed_fn = None;
    let mut added_fn = None;
    let mut removed_params = Vec::new();
    let mut added_params = Vec::new();

    for child in &entry.children {
        match (child.node_type, child.tag) {
            (NodeKind::Function, Some(Tag::Removed)) => removed_fn = Some(child),
            (NodeKind::Function, Some(Tag::Added)) => added_fn = Some(child),
            (NodeKind::Function, Some(Tag::Modified)) => rows.extend(qualifier_change(child)),
            (NodeKind::Parameter | NodeKind::ReturnType, Some(Tag::Modified)) => {
                rows.extend(nested_modification(child))
            }
            (NodeKind::Parameter, Some(Tag::Added)) => added_params.push(child),
            (NodeKind::Parameter, Some(Tag::Removed)) => removed_params.push(child),
            _ => {}
        }
    }

    if removed_fn.is_some() || added_fn.is_some() {
        rows.extend(snapshot_attribute_changes(removed_fn, added_fn));
    }

    if !removed_params.is_empty() || !added_params.is_empty() {
        rows.extend(parameter_changes(&removed_params, &added_params));
    }

    rows
}

/// 比较 removed/added 两个函数快照的存储类、调用约定和 inline
fn snapshot_attribute_changes(removed: Option<&DiffEntry>, added: Option<&DiffEntry>) -> Vec<Row> {
    let pairs = [
        (
            Attribute::StorageClass,
            snapshot_field(removed, |e| e.storage_qualifier.as_ref()),
            snapshot_field(added, |e| e.storage_qualifier.as_ref()),
        ),
        (
            Attribute::CallingConvention,
            snapshot_field(removed, |e| e.function_calling_convention.as_ref()),
            snapshot_field(added, |e| e.function_calling_convention.as_ref()),
        ),
        (
            Attribute::Inline,
            inline_text(removed).to_string(),
            inline_text(added).to_string(),
        ),
    ];

    pairs
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .map(|(attribute, before, after)| {
            (
                ChangeKind::AttrChanged,
                attribute_phrase("Function attribute", attribute.as_str(), &before, &after),
            )
        })
        .collect()
}

fn snapshot_field(
    entry: Option<&DiffEntry>,
    pick: impl Fn(&DiffEntry) -> Option<&String>,
) -> String {
    entry.and_then(pick).cloned().unwrap_or_default()
}

/// 函数自身的 const/virtual/access 变化
fn qualifier_change(entry: &DiffEntry) -> Option<Row> {
    let attribute = entry.attribute?;
    let (removed, added) = removed_added_pair(entry);
    let before = removed.map(DiffEntry::value_str).unwrap_or_default();
    let after = added.map(DiffEntry::value_str).unwrap_or_default();
    (before != after).then(|| {
        (
            ChangeKind::AttrChanged,
            attribute_phrase("Function attribute", attribute.as_str(), before, after),
        )
    })
}

/// `modified` 的 Parameter/ReturnType 条目
fn nested_modification(entry: &DiffEntry) -> Option<Row> {
    let (Some(removed), Some(added)) = removed_added_pair(entry) else {
        return None;
    };

    let kind = removed.node_type;
    let leaf = leaf_segment(&removed.qualified_name);
    let detail = match entry.attribute {
        Some(attribute) if attribute != Attribute::DataType => attribute_phrase(
            &format!("{kind} '{leaf}'"),
            attribute.label(),
            removed.value_str(),
            added.value_str(),
        ),
        _ if kind == NodeKind::ReturnType => format!(
            "Return type changed from '{}' to '{}'",
            removed.data_type, added.data_type
        ),
        _ => format!(
            "{kind} '{leaf}' type changed from '{}' to '{}'",
            removed.data_type, added.data_type
        ),
    };
    Some((ChangeKind::Modified, detail))
}

/// 直接增删的参数：同类型的一删一增推断为重命名
///
/// 按数据类型分桶（桶按类型排序，桶内保持出现顺序），每个被删参数
/// 与同桶中第一个尚未配对的新增参数配对。
fn parameter_changes(removed: &[&DiffEntry], added: &[&DiffEntry]) -> Vec<Row> {
    let removed_by_type = bucket_by_type(removed);
    let added_by_type = bucket_by_type(added);

    let mut rows = Vec::new();
    let mut removed_matched: Vec<(&str, usize)> = Vec::new();
    let mut added_matched: Vec<(&str, usize)> = Vec::new();

    for (&data_type, bucket) in &removed_by_type {
        for (removed_index, old_param) in bucket.iter().enumerate() {
            let Some(candidates) = added_by_type.get(data_type) else {
                continue;
            };
            let partner = candidates.iter().enumerate().find(|(added_index, new_param)| {
                !added_matched.contains(&(data_type, *added_index))
                    && looks_like_rename(old_param, new_param)
            });
            if let Some((added_index, new_param)) = partner {
                rows.push((
                    ChangeKind::Modified,
                    format!(
                        "Parameter renamed from '{}' to '{}' (type '{data_type}')",
                        leaf_segment(&old_param.qualified_name),
                        leaf_segment(&new_param.qualified_name)
                    ),
                ));
                removed_matched.push((data_type, removed_index));
                added_matched.push((data_type, added_index));
            }
        }
    }

    for (&data_type, bucket) in &removed_by_type {
        for (index, param) in bucket.iter().enumerate() {
            if removed_matched.contains(&(data_type, index)) {
                continue;
            }
            rows.push((
                ChangeKind::Removed,
                format!(
                    "Parameter '{}' removed (type '{data_type}')",
                    leaf_segment(&param.qualified_name)
                ),
            ));
        }
    }

    for (&data_type, bucket) in &added_by_type {
        for (index, param) in bucket.iter().enumerate() {
            if added_matched.contains(&(data_type, index)) {
                continue;
            }
            rows.push((
                ChangeKind::Added,
                format!(
                    "Parameter '{}' added (type '{data_type}')",
                    leaf_segment(&param.qualified_name)
                ),
            ));
        }
    }

    rows
}

fn bucket_by_type<'e>(params: &[&'e DiffEntry]) -> BTreeMap<&'e str, Vec<&'e DiffEntry>> {
    let mut buckets: BTreeMap<&str, Vec<&DiffEntry>> = BTreeMap::new();
    for &param in params {
        buckets
            .entry(param.data_type.as_str())
            .or_default()
            .push(param);
    }
    buckets
}

fn looks_like_rename(removed: &DiffEntry, added: &DiffEntry) -> bool {
    removed.node_type == NodeKind::Parameter
        && added.node_type == NodeKind::Parameter
        && !removed.data_type.is_empty()
        && removed.data_type == added.data_type
}
