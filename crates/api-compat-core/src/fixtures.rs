//! 单元测试共用的手工声明树

use crate::node::{Node, NodeKind, StorageClass};
use crate::store::DeclarationStore;

/// `System` 结构体：旧版本 `systemName[64]`、`devices[10]`，枚举含 `STATUS_UNKNOWN`
pub(crate) fn system_v1() -> Node {
    system(64, 10, true)
}

/// `System` 结构体：新版本 `systemName[63]`、`devices[11]`，删除 `STATUS_UNKNOWN`
pub(crate) fn system_v2() -> Node {
    system(63, 11, false)
}

fn system(name_len: usize, device_count: usize, with_unknown: bool) -> Node {
    let mut status = vec![
        enumerator("STATUS_OK", 0),
        enumerator("STATUS_FAIL", 1),
    ];
    if with_unknown {
        status.push(enumerator("STATUS_UNKNOWN", 2));
    }

    Node::builder(NodeKind::Struct, "System")
        .child(
            Node::builder(NodeKind::Field, "System::systemName")
                .data_type(format!("char[{name_len}]"))
                .build(),
        )
        .child(
            Node::builder(NodeKind::Field, "System::deviceCount")
                .data_type("int")
                .build(),
        )
        .child(
            Node::builder(NodeKind::Struct, "System::systemDetails")
                .child(
                    Node::builder(NodeKind::Field, "System::systemDetails::devices")
                        .data_type(format!("Device[{device_count}]"))
                        .build(),
                )
                .child(
                    Node::builder(NodeKind::Enum, "System::systemDetails::systemStatus")
                        .data_type("int")
                        .children(status)
                        .build(),
                )
                .build(),
        )
        .build()
}

fn enumerator(name: &str, value: i64) -> Node {
    Node::builder(
        NodeKind::Enumerator,
        format!("System::systemDetails::systemStatus::{name}"),
    )
    .value(value.to_string())
    .build()
}

/// 带返回类型与参数的函数
pub(crate) fn function(name: &str, return_type: &str, params: &[(&str, &str)]) -> Node {
    let mut builder = Node::builder(NodeKind::Function, name)
        .data_type(return_type)
        .child(
            Node::builder(NodeKind::ReturnType, format!("{name}::return"))
                .data_type(return_type)
                .build(),
        );
    for (param, data_type) in params {
        builder = builder.child(
            Node::builder(NodeKind::Parameter, format!("{name}::{param}"))
                .data_type(*data_type)
                .build(),
        );
    }
    builder.build()
}

/// 顶层变量
pub(crate) fn variable(name: &str, data_type: &str, storage: StorageClass) -> Node {
    Node::builder(NodeKind::Variable, name)
        .data_type(data_type)
        .storage(storage)
        .build()
}

/// 由根节点构建存储
pub(crate) fn store_of(roots: impl IntoIterator<Item = Node>) -> DeclarationStore {
    let mut store = DeclarationStore::new();
    for root in roots {
        store.register_root(root);
    }
    store
}
