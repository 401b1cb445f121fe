use super::*;
use crate::diagnostics::{CollectingSink, DiagnosticLevel};
use crate::fixtures::{function, store_of, system_v1, system_v2, variable};
use crate::node::{NodeKind, StorageClass};
use pretty_assertions::assert_eq;

fn find<'a>(entries: &'a [DiffEntry], name: &str) -> &'a DiffEntry {
    entries
        .iter()
        .find(|entry| entry.qualified_name == name)
        .unwrap_or_else(|| panic!("no diff entry named {name}"))
}

#[test]
fn test_identical_stores_produce_empty_diff() {
    let old = store_of([system_v1(), function("open", "int", &[("path", "const char*")])]);
    let new = store_of([system_v1(), function("open", "int", &[("path", "const char*")])]);

    assert!(DiffEngine::new().diff_stores(&old, &new).is_empty());
}

#[test]
fn test_added_and_removed_roots_are_dual() {
    let empty = DeclarationStore::new();
    let populated = store_of([system_v1()]);
    let engine = DiffEngine::new();

    let added = engine.diff_stores(&empty, &populated);
    let removed = engine.diff_stores(&populated, &empty);

    assert_eq!(added.len(), 1);
    assert_eq!(removed.len(), 1);
    assert_eq!(added[0].tag, Some(Tag::Added));
    assert_eq!(removed[0].tag, Some(Tag::Removed));
    assert_eq!(added[0].children, removed[0].children);
    assert_eq!(added[0].qualified_name, "System");
    // 子节点整体序列化，不带标记
    assert!(added[0].children.iter().all(|child| child.tag.is_none()));
}

#[test]
fn test_excluded_root_is_skipped_in_both_directions() {
    let mut old = store_of([variable("internal_counter", "int", StorageClass::None)]);
    let new = store_of([variable("internal_counter", "long", StorageClass::None)]);
    old.exclude("internal_counter");

    let sink = Arc::new(CollectingSink::new());
    let engine = DiffEngine::with_sink(sink.clone());
    assert!(engine.diff_stores(&old, &new).is_empty());

    let notes = sink.take();
    assert!(!notes.is_empty());
    assert!(notes.iter().all(|note| note.level == DiagnosticLevel::Info));

    let mut new_excluding = store_of([variable("internal_counter", "long", StorageClass::None)]);
    new_excluding.exclude("internal_counter");
    let old = store_of([variable("internal_counter", "int", StorageClass::None)]);
    assert!(engine.diff_stores(&old, &new_excluding).is_empty());
}

#[test]
fn test_exclusion_of_one_side_does_not_hide_new_root() {
    let mut old = DeclarationStore::new();
    old.exclude("fresh");
    let new = store_of([variable("fresh", "int", StorageClass::None)]);

    let diff = DiffEngine::new().diff_stores(&old, &new);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].tag, Some(Tag::Added));
}

#[test]
fn test_single_attribute_change_yields_single_entry() {
    let old = store_of([variable("counter", "int", StorageClass::None)]);
    let new = store_of([variable("counter", "int", StorageClass::Static)]);

    let diff = DiffEngine::new().diff_stores(&old, &new);
    assert_eq!(diff.len(), 1);
    let entry = &diff[0];
    assert_eq!(entry.tag, Some(Tag::Modified));
    assert_eq!(entry.attribute, Some(Attribute::StorageClass));
    assert_eq!(entry.children.len(), 2);
    assert_eq!(entry.children[0].tag, Some(Tag::Removed));
    assert_eq!(entry.children[0].value_str(), "");
    assert_eq!(entry.children[1].tag, Some(Tag::Added));
    assert_eq!(entry.children[1].value_str(), "static");
}

#[test]
fn test_kind_collision_is_reported_as_replacement() {
    let old = store_of([Node::builder(NodeKind::Struct, "Handle")
        .child(Node::builder(NodeKind::Field, "Handle::fd").data_type("int").build())
        .build()]);
    let new = store_of([Node::builder(NodeKind::Typedef, "Handle")
        .data_type("int")
        .build()]);

    let sink = Arc::new(CollectingSink::new());
    let diff = DiffEngine::with_sink(sink.clone()).diff_stores(&old, &new);

    assert_eq!(diff.len(), 2);
    assert_eq!(diff[0].tag, Some(Tag::Removed));
    assert_eq!(diff[0].node_type, NodeKind::Struct);
    assert_eq!(diff[1].tag, Some(Tag::Added));
    assert_eq!(diff[1].node_type, NodeKind::Typedef);

    let warnings: Vec<_> = sink
        .take()
        .into_iter()
        .filter(|note| note.level == DiagnosticLevel::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Handle"));
}

#[test]
fn test_system_fixture_diff_shape() {
    let old = store_of([system_v1()]);
    let new = store_of([system_v2()]);

    let diff = DiffEngine::new().diff_stores(&old, &new);
    assert_eq!(diff.len(), 1);
    let system = &diff[0];
    assert_eq!(system.qualified_name, "System");
    assert_eq!(system.tag, Some(Tag::Modified));

    let name = find(&system.children, "System::systemName");
    assert_eq!(name.node_type, NodeKind::Field);
    assert_eq!(name.attribute, Some(Attribute::DataType));
    assert_eq!(name.children[0].data_type, "char[64]");
    assert_eq!(name.children[1].data_type, "char[63]");

    let details = find(&system.children, "System::systemDetails");
    let devices = find(&details.children, "System::systemDetails::devices");
    assert_eq!(devices.children[0].data_type, "Device[10]");
    assert_eq!(devices.children[1].data_type, "Device[11]");

    let status = find(&details.children, "System::systemDetails::systemStatus");
    assert_eq!(status.tag, Some(Tag::Modified));
    assert_eq!(status.children.len(), 1);
    assert_eq!(status.children[0].tag, Some(Tag::Removed));
    assert_eq!(status.children[0].node_type, NodeKind::Enumerator);
    assert_eq!(
        status.children[0].qualified_name,
        "System::systemDetails::systemStatus::STATUS_UNKNOWN"
    );

    // 未变化的成员不出现
    assert!(system.children.iter().all(|c| c.qualified_name != "System::deviceCount"));
}

#[test]
fn test_children_order_removed_added_then_common() {
    let old = Node::builder(NodeKind::Struct, "S")
        .child(Node::builder(NodeKind::Field, "S::a").data_type("int").build())
        .child(Node::builder(NodeKind::Field, "S::gone").data_type("int").build())
        .build();
    let new = Node::builder(NodeKind::Struct, "S")
        .child(Node::builder(NodeKind::Field, "S::fresh").data_type("int").build())
        .child(Node::builder(NodeKind::Field, "S::a").data_type("long").build())
        .build();

    let diff = DiffEngine::new().diff_nodes(&old, &new);
    assert_eq!(diff.len(), 1);
    let tags: Vec<_> = diff[0]
        .children
        .iter()
        .map(|child| (child.qualified_name.as_str(), child.tag))
        .collect();
    assert_eq!(
        tags,
        vec![
            ("S::gone", Some(Tag::Removed)),
            ("S::fresh", Some(Tag::Added)),
            ("S::a", Some(Tag::Modified)),
        ]
    );
}

#[test]
fn test_member_reordering_is_not_a_change() {
    let old = Node::builder(NodeKind::Struct, "S")
        .child(Node::builder(NodeKind::Field, "S::a").data_type("int").build())
        .child(Node::builder(NodeKind::Field, "S::b").data_type("char").build())
        .build();
    let new = Node::builder(NodeKind::Struct, "S")
        .child(Node::builder(NodeKind::Field, "S::b").data_type("char").build())
        .child(Node::builder(NodeKind::Field, "S::a").data_type("int").build())
        .build();

    assert!(DiffEngine::new().diff_nodes(&old, &new).is_empty());
}

#[test]
fn test_duplicate_names_are_matched_one_for_one() {
    let overload = |param_type: &str| {
        Node::builder(NodeKind::Method, "C::f")
            .child(
                Node::builder(NodeKind::Parameter, "C::f::x")
                    .data_type(param_type)
                    .build(),
            )
            .build()
    };
    let old = Node::builder(NodeKind::Class, "C")
        .child(overload("int"))
        .child(overload("double"))
        .build();
    let new = Node::builder(NodeKind::Class, "C").child(overload("int")).build();

    let diff = DiffEngine::new().diff_nodes(&old, &new);
    assert_eq!(diff.len(), 1);
    let removed: Vec<_> = diff[0]
        .children
        .iter()
        .filter(|child| child.has_tag(Tag::Removed))
        .collect();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].children[0].data_type, "double");
}

#[test]
fn test_function_storage_change_wrapped_in_modified_entry() {
    let old = Node::builder(NodeKind::Function, "helper")
        .data_type("void")
        .build();
    let new = Node::builder(NodeKind::Function, "helper")
        .data_type("void")
        .storage(StorageClass::Static)
        .inline(true)
        .build();

    let diff = DiffEngine::new().diff_nodes(&old, &new);
    assert_eq!(diff.len(), 1);
    let entry = &diff[0];
    assert_eq!(entry.tag, Some(Tag::Modified));
    assert_eq!(entry.node_type, NodeKind::Function);
    assert_eq!(entry.children.len(), 2);
    assert_eq!(entry.children[0].storage_qualifier.as_deref(), Some(""));
    assert_eq!(entry.children[1].storage_qualifier.as_deref(), Some("static"));
    assert_eq!(entry.children[1].inline, Some(true));
}

#[test]
fn test_function_return_type_change_uses_return_child() {
    let old = function("area", "int", &[("w", "int")]);
    let new = function("area", "long", &[("w", "int")]);

    let diff = DiffEngine::new().diff_nodes(&old, &new);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].children.len(), 1);
    let ret = &diff[0].children[0];
    assert_eq!(ret.node_type, NodeKind::ReturnType);
    assert_eq!(ret.qualified_name, "area::return");
}

#[test]
fn test_conditional_block_changes() {
    let old = Node::builder(NodeKind::Ifdef, "Ifdef:FEATURE_X")
        .condition("FEATURE_X")
        .body("int x;")
        .active(false)
        .build();
    let new = Node::builder(NodeKind::Ifdef, "Ifdef:FEATURE_X")
        .condition("FEATURE_X")
        .body("int y;")
        .active(true)
        .build();

    let diff = DiffEngine::new().diff_nodes(&old, &new);
    let attributes: Vec<_> = diff.iter().map(|entry| entry.attribute).collect();
    assert_eq!(
        attributes,
        vec![Some(Attribute::Hash), Some(Attribute::IsActive)]
    );
    assert_eq!(diff[0].children[1].value_str(), "int y;");
}

#[test]
fn test_diff_tree_json_round_trip_and_defensive_decode() {
    let old = store_of([system_v1()]);
    let new = store_of([system_v2()]);
    let diff = DiffEngine::new().diff_stores(&old, &new);

    let json = to_json(&diff).unwrap();
    assert!(json.contains("\"tag\": \"modified\""));
    assert_eq!(from_json(&json).unwrap(), diff);

    let sparse = from_json(r#"[{"nodeType": "Field"}, {"tag": "added", "nodeType": "Concept"}]"#)
        .unwrap();
    assert_eq!(sparse[0].qualified_name, "");
    assert_eq!(sparse[0].tag, None);
    assert!(sparse[0].children.is_empty());
    assert_eq!(sparse[1].node_type, NodeKind::Unknown);
}

/// 自由函数重载：USR 带参数类型，因此各自成为独立的根
fn overload(param: &str, data_type: &str) -> Node {
    Node::builder(NodeKind::Function, "f")
        .usr(format!("Function@f({data_type})"))
        .data_type("void")
        .child(
            Node::builder(NodeKind::Parameter, format!("f::{param}"))
                .data_type(data_type)
                .build(),
        )
        .build()
}

#[test]
fn test_overloaded_roots_are_matched_one_for_one() {
    let both = || store_of([overload("a", "int"), overload("b", "double")]);
    let engine = DiffEngine::new();
    assert_eq!(both().roots().len(), 2);

    assert!(engine.diff_stores(&both(), &both()).is_empty());

    let single = store_of([overload("a", "int")]);
    let added = engine.diff_stores(&single, &both());
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].tag, Some(Tag::Added));
    assert_eq!(added[0].children[0].data_type, "double");

    let removed = engine.diff_stores(&both(), &single);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].tag, Some(Tag::Removed));
    assert_eq!(removed[0].children[0].data_type, "double");
}

#[test]
fn test_excluded_overloads_are_skipped_together() {
    let mut old = store_of([overload("a", "int"), overload("b", "double")]);
    old.exclude("f");
    let new = store_of([overload("a", "int")]);

    assert!(DiffEngine::new().diff_stores(&old, &new).is_empty());
}
