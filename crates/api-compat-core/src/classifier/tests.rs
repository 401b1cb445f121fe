use super::*;
use crate::diff::{Attribute, DiffEngine, from_json};
use crate::fixtures::{function, store_of, system_v1, system_v2};
use crate::node::{CallingConvention, ConstQualifier, Node, NodeKind, StorageClass};
use pretty_assertions::assert_eq;

const HEADER: &str = "include/mylib.h";

fn classify_json(json: &str) -> Vec<AtomicChange> {
    ChangeClassifier::new().classify(&from_json(json).unwrap(), HEADER)
}

fn details(changes: &[AtomicChange]) -> Vec<&str> {
    changes.iter().map(|change| change.detail.as_str()).collect()
}

#[test]
fn test_system_fixture_description() {
    let diff = DiffEngine::new().diff_stores(&store_of([system_v1()]), &store_of([system_v2()]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!(change.api_name, "System");
    assert_eq!(change.headerfile, HEADER);
    assert_eq!(
        change.detail,
        [
            "Field 'System::systemName' type changed from 'char[64]' to 'char[63]'",
            "Field 'System::systemDetails::devices' type changed from 'Device[10]' to 'Device[11]'",
            "Enumerator removed: 'System::systemDetails::systemStatus::STATUS_UNKNOWN'",
        ]
        .join("\n")
    );
    assert_eq!(change.category(), ChangeCategory::CompatibilityChanged);
    assert_eq!(change.compatibility(), Compatibility::BackwardIncompatible);
}

#[test]
fn test_top_level_addition_is_compatible() {
    let changes = classify_json(
        r#"[{"qualifiedName": "Config", "nodeType": "Struct", "tag": "added",
             "children": [{"qualifiedName": "Config::size", "nodeType": "Field", "dataType": "int"}]}]"#,
    );

    assert_eq!(
        details(&changes),
        vec!["Struct added: 'Config'\nField added: 'Config::size' with type 'int'"]
    );
    assert!(changes[0].top_level);
    assert_eq!(changes[0].category(), ChangeCategory::FunctionalityChanged);
    assert_eq!(changes[0].compatibility(), Compatibility::BackwardCompatible);
}

#[test]
fn test_nested_addition_is_incompatible() {
    let changes = classify_json(
        r#"[{"qualifiedName": "Config", "nodeType": "Struct", "tag": "modified",
             "children": [{"qualifiedName": "Config::extra", "nodeType": "Field",
                           "tag": "added", "dataType": "long"}]}]"#,
    );

    assert_eq!(
        details(&changes),
        vec!["Field added: 'Config::extra' with type 'long'"]
    );
    assert!(!changes[0].top_level);
    assert_eq!(changes[0].compatibility(), Compatibility::BackwardIncompatible);
}

#[test]
fn test_removed_container_lists_children() {
    let changes = classify_json(
        r#"[{"qualifiedName": "Mode", "nodeType": "Enum", "tag": "removed", "dataType": "int",
             "children": [{"qualifiedName": "Mode::ON", "nodeType": "Enumerator"},
                          {"qualifiedName": "Mode::OFF", "nodeType": "Enumerator"}]}]"#,
    );

    assert_eq!(
        changes[0].detail,
        "Enum removed: 'Mode' with type 'int'\nEnumerator removed: 'Mode::ON'\nEnumerator removed: 'Mode::OFF'"
    );
    assert_eq!(changes[0].raw_change, ChangeKind::Removed);
}

#[test]
fn test_fallback_description_when_walk_is_empty() {
    let changes = classify_json(r#"[{"qualifiedName": "ns", "nodeType": "Namespace", "tag": "modified"}]"#);
    assert_eq!(details(&changes), vec!["Namespace modified: 'ns'"]);
}

#[test]
fn test_function_added_and_removed() {
    let changes = classify_json(
        r#"[{"qualifiedName": "open", "nodeType": "Function", "tag": "added"},
            {"qualifiedName": "close", "nodeType": "Function", "tag": "removed"}]"#,
    );

    assert_eq!(details(&changes), vec!["Function added", "Function removed"]);
    assert!(changes[0].top_level);
    assert_eq!(changes[0].compatibility(), Compatibility::BackwardCompatible);
    assert!(!changes[1].top_level);
    assert_eq!(changes[1].compatibility(), Compatibility::BackwardIncompatible);
}

#[test]
fn test_parameter_rename_inferred_from_matching_type() {
    let old = function("resize", "void", &[("count", "int")]);
    let new = function("resize", "void", &[("total", "int")]);
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec!["Parameter renamed from 'count' to 'total' (type 'int')"]
    );
    assert!(changes.iter().all(|change| !change.top_level));
}

#[test]
fn test_unmatched_parameters_reported_individually() {
    let old = function("draw", "void", &[("x", "int"), ("label", "const char*")]);
    let new = function("draw", "void", &[("x", "int"), ("scale", "double")]);
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec![
            "Parameter 'label' removed (type 'const char*')",
            "Parameter 'scale' added (type 'double')",
        ]
    );
    assert_eq!(changes[0].raw_change, ChangeKind::Removed);
    assert_eq!(changes[1].raw_change, ChangeKind::Added);
}

#[test]
fn test_rename_pairing_is_first_available_within_bucket() {
    let changes = classify_json(
        r#"[{"qualifiedName": "f", "nodeType": "Function", "tag": "modified", "children": [
              {"qualifiedName": "f::a", "nodeType": "Parameter", "tag": "removed", "dataType": "int"},
              {"qualifiedName": "f::b", "nodeType": "Parameter", "tag": "removed", "dataType": "int"},
              {"qualifiedName": "f::c", "nodeType": "Parameter", "tag": "added", "dataType": "int"},
              {"qualifiedName": "f::u", "nodeType": "Parameter", "tag": "removed", "dataType": ""},
              {"qualifiedName": "f::v", "nodeType": "Parameter", "tag": "added", "dataType": ""}
           ]}]"#,
    );

    assert_eq!(
        details(&changes),
        vec![
            "Parameter renamed from 'a' to 'c' (type 'int')",
            "Parameter 'u' removed (type '')",
            "Parameter 'b' removed (type 'int')",
            "Parameter 'v' added (type '')",
        ]
    );
}

#[test]
fn test_return_and_parameter_type_changes() {
    let old = function("area", "int", &[("w", "int")]);
    let new = function("area", "long", &[("w", "size_t")]);
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec![
            "Return type changed from 'int' to 'long'",
            "Parameter 'w' type changed from 'int' to 'size_t'",
        ]
    );
}

#[test]
fn test_function_attribute_changes() {
    let old = Node::builder(NodeKind::Function, "log_message")
        .storage(StorageClass::Static)
        .calling_convention(CallingConvention::CDecl)
        .build();
    let new = Node::builder(NodeKind::Function, "log_message")
        .calling_convention(CallingConvention::StdCall)
        .inline(true)
        .build();
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec![
            "Function attribute storageQualifier removed 'static'",
            "Function attribute functionCallingConvention changed from 'cdecl' to 'stdcall'",
            "Function attribute inline changed from 'false' to 'true'",
        ]
    );
    assert!(changes.iter().all(|c| c.raw_change == ChangeKind::AttrChanged));
}

#[test]
fn test_function_modified_fallback() {
    let changes = classify_json(
        r#"[{"qualifiedName": "f", "nodeType": "Function", "tag": "modified",
             "children": [{"qualifiedName": "f::T", "nodeType": "TemplateParam", "tag": "added"}]}]"#,
    );
    assert_eq!(details(&changes), vec!["Function modified"]);
    assert_eq!(changes[0].raw_change, ChangeKind::Modified);
}

#[test]
fn test_method_qualifier_change_inside_class() {
    let method = |qualifier: ConstQualifier| {
        Node::builder(NodeKind::Method, "Widget::size")
            .const_qualifier(qualifier)
            .child(
                Node::builder(NodeKind::ReturnType, "Widget::size::return")
                    .data_type("int")
                    .build(),
            )
            .build()
    };
    let class = |qualifier: ConstQualifier| {
        Node::builder(NodeKind::Class, "Widget")
            .child(method(qualifier))
            .build()
    };
    let diff = DiffEngine::new().diff_stores(
        &store_of([class(ConstQualifier::None)]),
        &store_of([class(ConstQualifier::Const)]),
    );
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec!["Method 'Widget::size' constQualifier added 'const'"]
    );
}

#[test]
fn test_relaxed_parameter_pairing_in_nested_entries() {
    let changes = classify_json(
        r#"[{"qualifiedName": "Ops", "nodeType": "Struct", "tag": "modified", "children": [
              {"qualifiedName": "Ops::cb", "nodeType": "Field", "tag": "modified", "children": [
                  {"qualifiedName": "Ops::cb::ctx", "nodeType": "Parameter", "tag": "removed", "dataType": "void*"},
                  {"qualifiedName": "Ops::cb::data", "nodeType": "Parameter", "tag": "added", "dataType": "const void*"},
                  {"qualifiedName": "Ops::cb::return", "nodeType": "ReturnType", "tag": "removed", "dataType": "int"},
                  {"qualifiedName": "Ops::cb::return", "nodeType": "ReturnType", "tag": "added", "dataType": "long"}
              ]}
           ]}]"#,
    );

    assert_eq!(
        changes[0].detail,
        "Parameter modified: 'Ops::cb' type changed from 'void*' to 'const void*'\n\
         ReturnType 'Ops::cb' type changed from 'int' to 'long'"
    );
}

#[test]
fn test_conditional_attribute_lines() {
    let old = Node::builder(NodeKind::Ifdef, "Ifdef:USE_SSL")
        .condition("USE_SSL")
        .body("int ssl_init(void);")
        .build();
    let new = Node::builder(NodeKind::Ifdef, "Ifdef:USE_SSL")
        .condition("USE_SSL")
        .body("int ssl_init(int flags);")
        .build();
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    assert_eq!(diff[0].attribute, Some(Attribute::Hash));

    let changes = ChangeClassifier::new().classify(&diff, HEADER);
    assert_eq!(details(&changes), vec!["Ifdef 'Ifdef:USE_SSL' body changed"]);
}

#[test]
fn test_define_replacement_text_reported_as_value() {
    let old = Node::builder(NodeKind::Define, "MAX_DEVICES").body("10").build();
    let new = Node::builder(NodeKind::Define, "MAX_DEVICES").body("11").build();
    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    assert_eq!(diff[0].attribute, Some(Attribute::Value));

    let changes = ChangeClassifier::new().classify(&diff, HEADER);
    assert_eq!(
        details(&changes),
        vec!["Define 'MAX_DEVICES' value changed from '10' to '11'"]
    );
}

#[test]
fn test_missing_qualified_name_uses_unknown() {
    let changes = classify_json(r#"[{"nodeType": "Macro", "tag": "removed"}]"#);
    assert_eq!(changes[0].api_name, "Unknown");
    assert_eq!(changes[0].detail, "Macro removed: ''");
}

#[test]
fn test_to_row_applies_compatibility_rule() {
    let change = AtomicChange {
        headerfile: HEADER.to_string(),
        api_name: "f".to_string(),
        detail: "Function added".to_string(),
        raw_change: ChangeKind::Added,
        top_level: false,
    };
    let row = change.to_row();
    assert_eq!(row.changetype, ChangeCategory::CompatibilityChanged);
    assert_eq!(row.compatibility, Compatibility::BackwardIncompatible);
    assert_eq!(
        serde_json::to_value(&row).unwrap()["changetype"],
        "Compatibility_changed"
    );
}

fn method(name: &str, params: &[(&str, &str)]) -> Node {
    let mut builder = Node::builder(NodeKind::Method, format!("C::{name}")).data_type("void");
    for (param, data_type) in params {
        builder = builder.child(
            Node::builder(NodeKind::Parameter, format!("C::{name}::{param}"))
                .data_type(*data_type)
                .build(),
        );
    }
    builder.build()
}

fn class_of(members: impl IntoIterator<Item = Node>) -> Node {
    Node::builder(NodeKind::Class, "C").children(members).build()
}

#[test]
fn test_every_removed_overload_is_described() {
    let keep = || {
        Node::builder(NodeKind::Field, "C::keep")
            .data_type("int")
            .build()
    };
    let old = class_of([
        method("g", &[("a", "int")]),
        method("g", &[("b", "double")]),
        keep(),
    ]);
    let new = class_of([keep()]);

    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].api_name, "C");
    assert_eq!(
        changes[0].detail,
        "Method removed: 'C::g' with type 'void'\nMethod removed: 'C::g' with type 'void'"
    );
}

#[test]
fn test_same_named_additions_pair_with_removals_in_order() {
    let old = class_of([method("g", &[("a", "int")])]);
    let new = class_of([method("g", &[("a", "long")]), method("g", &[("b", "double")])]);

    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        changes[0].detail,
        "Parameter 'C::g::a' type changed from 'int' to 'long'\nMethod added: 'C::g' with type 'void'"
    );
}

#[test]
fn test_method_parameter_rename_inside_class() {
    let old = class_of([method("f", &[("a", "int")])]);
    let new = class_of([method("f", &[("b", "int")])]);

    let diff = DiffEngine::new().diff_stores(&store_of([old]), &store_of([new]));
    let changes = ChangeClassifier::new().classify(&diff, HEADER);

    assert_eq!(
        details(&changes),
        vec!["Parameter renamed from 'a' to 'b' (type 'int')"]
    );
}
