//! 从 tree-sitter-cpp 语法树中抽取声明树

use super::HeaderProviderConfig;
use super::declarator::{
    DeclaratorInfo, FunctionShape, Specifiers, attribute_is_packed, normalize_type,
    parameter_info, text,
};
use super::preprocessor::{MacroTable, normalize_source, parse_integer};
use crate::node::{
    AccessSpecifier, ConstQualifier, Node, NodeBuilder, NodeKind, VirtualQualifier,
};
use crate::provider::QualifiedNameBuilder;
use tracing::debug;
use tree_sitter::Node as SyntaxNode;

/// 构建中的节点；子节点在遍历结束前仍可追加（重开的命名空间会合并进来）
#[derive(Debug)]
struct Draft {
    kind: NodeKind,
    qualified_name: String,
    builder: NodeBuilder,
    children: Vec<Draft>,
}

impl Draft {
    fn new(kind: NodeKind, qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            kind,
            builder: Node::builder(kind, qualified_name.clone()),
            qualified_name,
            children: Vec::new(),
        }
    }

    fn map(mut self, configure: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.builder = configure(self.builder);
        self
    }

    fn finish(self) -> Node {
        self.builder
            .children(self.children.into_iter().map(Draft::finish))
            .build()
    }
}

/// 当前所在的类体（如果有）及其访问级别
#[derive(Debug, Clone, Copy)]
struct Scope {
    record: Option<NodeKind>,
    access: AccessSpecifier,
}

impl Scope {
    const FILE: Scope = Scope {
        record: None,
        access: AccessSpecifier::None,
    };

    /// class 默认 private，struct 与 union 默认 public
    fn record(kind: NodeKind) -> Self {
        let access = if kind == NodeKind::Class {
            AccessSpecifier::Private
        } else {
            AccessSpecifier::Public
        };
        Self {
            record: Some(kind),
            access,
        }
    }
}

/// 枚举值计数器：能算出整数时递增整数，否则写成 `expr + k`
enum EnumCounter {
    Number(i64),
    Offset(String, i64),
}

impl EnumCounter {
    fn from_expression(expression: &str) -> Self {
        match literal_value(expression) {
            Some(value) => EnumCounter::Number(value),
            None => EnumCounter::Offset(expression.to_string(), 0),
        }
    }

    fn render(&self) -> String {
        match self {
            EnumCounter::Number(value) => value.to_string(),
            EnumCounter::Offset(base, 0) => base.clone(),
            EnumCounter::Offset(base, offset) => format!("{base} + {offset}"),
        }
    }

    fn advance(&mut self) {
        match self {
            EnumCounter::Number(value) => *value = value.wrapping_add(1),
            EnumCounter::Offset(_, offset) => *offset += 1,
        }
    }
}

pub(crate) struct Extractor<'s> {
    source: &'s str,
    names: QualifiedNameBuilder,
    macros: MacroTable,
    scope: Scope,
    /// 宏不受作用域影响，统一作为根声明
    macro_drafts: Vec<Draft>,
}

impl<'s> Extractor<'s> {
    pub(crate) fn new(source: &'s str, config: &HeaderProviderConfig) -> Self {
        Self {
            source,
            names: QualifiedNameBuilder::new(),
            macros: MacroTable::new(&config.predefined_macros),
            scope: Scope::FILE,
            macro_drafts: Vec::new(),
        }
    }

    /// 抽取整个翻译单元，返回按出现顺序排列的根声明
    pub(crate) fn extract(mut self, root: SyntaxNode<'_>) -> Vec<Node> {
        let mut items = Vec::new();
        for item in item_children(root) {
            match self.header_guard(item) {
                Some((guard, guard_define)) => {
                    debug!("Header guard '{guard}' recognized");
                    self.macros.define(guard, "");
                    for inner in item_children(item) {
                        if inner.id() != guard_define {
                            self.visit_item(inner, &mut items);
                        }
                    }
                }
                None => self.visit_item(item, &mut items),
            }
        }
        items.append(&mut self.macro_drafts);
        items.into_iter().map(Draft::finish).collect()
    }

    fn text(&self, node: SyntaxNode<'_>) -> &'s str {
        text(node, self.source)
    }

    fn member_access(&self) -> AccessSpecifier {
        if self.scope.record.is_some() {
            self.scope.access
        } else {
            AccessSpecifier::None
        }
    }

    /// `#ifndef X` 紧跟 `#define X` 且没有其他分支
    fn header_guard(&self, item: SyntaxNode<'_>) -> Option<(String, usize)> {
        if item.kind() != "preproc_ifdef" || item.child_by_field_name("alternative").is_some() {
            return None;
        }
        if item.child(0)?.kind() != "#ifndef" {
            return None;
        }
        let guard = self.text(item.child_by_field_name("name")?).trim();
        let first = *item_children(item).first()?;
        if first.kind() != "preproc_def" || first.child_by_field_name("value").is_some() {
            return None;
        }
        let defined = self.text(first.child_by_field_name("name")?).trim();
        (defined == guard).then(|| (guard.to_string(), first.id()))
    }

    fn visit_items(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        for item in item_children(node) {
            self.visit_item(item, out);
        }
    }

    fn visit_item(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        match node.kind() {
            "namespace_definition" => self.visit_namespace(node, out),
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.visit_items(body, out);
                    } else {
                        self.visit_item(body, out);
                    }
                }
            }
            "declaration" | "field_declaration" | "function_definition" => {
                self.visit_declaration(node, out)
            }
            "type_definition" => self.visit_typedef(node, out),
            "alias_declaration" => self.visit_alias(node, out),
            "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier" => {
                self.visit_specifier(node, out)
            }
            "template_declaration" => self.visit_template(node, out),
            "access_specifier" => {
                if let Some(access) = parse_access(self.text(node)) {
                    self.scope.access = access;
                }
            }
            "preproc_def" => self.visit_define(node),
            "preproc_function_def" => self.visit_function_macro(node),
            "preproc_call" => self.visit_directive(node),
            "preproc_if" | "preproc_ifdef" => self.visit_conditional(node, out),
            // 语法错误恢复后的片段里仍可能有完整声明
            "ERROR" => self.visit_items(node, out),
            _ => {}
        }
    }

    fn visit_namespace(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let Some(name) = node.child_by_field_name("name") else {
            debug!("Skipping anonymous namespace");
            return;
        };
        let segments: Vec<String> = self
            .text(name)
            .split("::")
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        let saved = std::mem::replace(&mut self.scope, Scope::FILE);
        self.open_namespace(&segments, body, out);
        self.scope = saved;
    }

    /// 逐段打开命名空间；同名命名空间合并到已有节点
    fn open_namespace(&mut self, segments: &[String], body: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let Some((first, rest)) = segments.split_first() else {
            self.visit_items(body, out);
            return;
        };

        self.names.push(first);
        let qualified_name = self.names.get();
        let index = match out.iter().position(|draft| {
            draft.kind == NodeKind::Namespace && draft.qualified_name == qualified_name
        }) {
            Some(index) => index,
            None => {
                out.push(Draft::new(NodeKind::Namespace, qualified_name));
                out.len() - 1
            }
        };

        let mut children = std::mem::take(&mut out[index].children);
        self.open_namespace(rest, body, &mut children);
        out[index].children = children;
        self.names.pop();
    }

    /// 单独出现的 `struct S { ... };` / `enum E { ... };`
    fn visit_specifier(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        if node.child_by_field_name("body").is_none() {
            return;
        }
        match type_name(node, self.source) {
            Some(name) => {
                if let Some(draft) = self.type_draft(node, &name, &Specifiers::default()) {
                    out.push(draft);
                }
            }
            None => self.anonymous_type(node, out),
        }
    }

    fn visit_declaration(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let specifiers = Specifiers::collect(node, self.source);
        let declarators = field_children(node, "declarator");

        let mut anonymous = None;
        let base = match node.child_by_field_name("type") {
            Some(type_node) if type_node.child_by_field_name("body").is_some() => {
                match type_name(type_node, self.source) {
                    Some(name) => {
                        if let Some(draft) = self.type_draft(type_node, &name, &specifiers) {
                            out.push(draft);
                        }
                        name
                    }
                    None if declarators.is_empty() => {
                        self.anonymous_type(type_node, out);
                        return;
                    }
                    None => {
                        anonymous = Some(type_node);
                        type_keyword(type_node).to_string()
                    }
                }
            }
            Some(type_node) => specifiers.base_type(self.text(type_node)),
            None => String::new(),
        };

        for declarator in declarators {
            self.visit_declarator(node, declarator, &base, &specifiers, anonymous, out);
        }
    }

    fn visit_declarator(
        &mut self,
        declaration: SyntaxNode<'_>,
        declarator: SyntaxNode<'_>,
        base: &str,
        specifiers: &Specifiers,
        anonymous: Option<SyntaxNode<'_>>,
        out: &mut Vec<Draft>,
    ) {
        let info = DeclaratorInfo::parse(declarator, self.source);
        if info.name.is_empty() {
            return;
        }
        if info.qualified {
            debug!("Skipping out-of-line definition of '{}'", info.name);
            return;
        }

        if let Some(shape) = info.function.as_ref().filter(|shape| !shape.is_pointer) {
            let draft = self.function_draft(declaration, &info, shape, base, specifiers);
            out.push(draft);
            return;
        }

        let kind = if self.scope.record.is_some() {
            NodeKind::Field
        } else {
            NodeKind::Variable
        };
        let qualified_name = self.names.qualify(&info.name);

        let mut data_type = info.full_type(base);
        if let Some(width) = find_child(declaration, "bitfield_clause") {
            let width = self.text(width).trim().trim_start_matches(':').trim();
            data_type = format!("{data_type}:{width}");
        }
        let value = info
            .default_value
            .clone()
            .or_else(|| {
                declaration
                    .child_by_field_name("default_value")
                    .map(|value| normalize_type(self.text(value)))
            })
            .unwrap_or_default();
        let calling_convention = specifiers
            .calling_convention
            .or(info.calling_convention)
            .or(info.function.as_ref().and_then(|shape| shape.calling_convention))
            .unwrap_or_default();
        let access = self.member_access();

        let mut draft = Draft::new(kind, qualified_name.clone()).map(|builder| {
            builder
                .data_type(data_type)
                .value(value)
                .storage(specifiers.storage)
                .const_qualifier(specifiers.const_qualifier)
                .calling_convention(calling_convention)
                .access(access)
                .pointer(info.is_pointer)
                .reference(info.is_reference)
                .r_value_ref(info.is_r_value_ref)
        });

        if let Some(shape) = &info.function {
            draft.children = signature(&qualified_name, Some(info.return_type(base)), shape);
        } else if let Some(anonymous) = anonymous {
            draft.children = self.anonymous_members(anonymous, &info.name);
        }
        out.push(draft);
    }

    fn function_draft(
        &self,
        declaration: SyntaxNode<'_>,
        info: &DeclaratorInfo,
        shape: &FunctionShape,
        base: &str,
        specifiers: &Specifiers,
    ) -> Draft {
        let kind = if self.scope.record.is_some() {
            NodeKind::Method
        } else {
            NodeKind::Function
        };
        let qualified_name = self.names.qualify(&info.name);
        // 构造与析构函数没有返回类型
        let return_type = (!base.is_empty()).then(|| info.return_type(base));

        let is_pure = declaration
            .child_by_field_name("default_value")
            .is_some_and(|value| self.text(value).trim() == "0");
        let virtual_qualifier = if is_pure {
            VirtualQualifier::PureVirtual
        } else if shape.is_override {
            VirtualQualifier::Override
        } else if specifiers.is_virtual {
            VirtualQualifier::Virtual
        } else {
            VirtualQualifier::None
        };
        let const_qualifier = if shape.is_const {
            ConstQualifier::Const
        } else {
            specifiers.const_qualifier
        };
        let calling_convention = specifiers
            .calling_convention
            .or(info.calling_convention)
            .or(shape.calling_convention)
            .unwrap_or_default();

        // 重载以参数类型区分
        let usr = format!(
            "{kind}@{qualified_name}({}){}",
            shape.parameter_list(),
            if shape.is_const { " const" } else { "" }
        );
        let access = self.member_access();

        let mut draft = Draft::new(kind, qualified_name.clone()).map(|builder| {
            builder
                .usr(usr)
                .data_type(return_type.clone().unwrap_or_default())
                .storage(specifiers.storage)
                .inline(specifiers.is_inline)
                .const_qualifier(const_qualifier)
                .virtual_qualifier(virtual_qualifier)
                .calling_convention(calling_convention)
                .access(access)
        });
        draft.children = signature(&qualified_name, return_type, shape);
        draft
    }

    /// 带定义体的 struct/class/union/enum
    fn type_draft(
        &mut self,
        specifier: SyntaxNode<'_>,
        name: &str,
        specifiers: &Specifiers,
    ) -> Option<Draft> {
        let body = specifier.child_by_field_name("body")?;
        if specifier.kind() == "enum_specifier" {
            return Some(self.enum_draft(specifier, body, name));
        }

        let kind = record_kind(specifier);
        let qualified_name = self.names.qualify(name);
        let packed = specifiers.is_packed
            || named_children(specifier).into_iter().any(|child| {
                child.kind() == "attribute_specifier"
                    && attribute_is_packed(self.text(child))
            });
        let access = self.member_access();

        let mut draft = Draft::new(kind, qualified_name.clone())
            .map(|builder| builder.access(access).packed(packed));
        if let Some(clause) = find_child(specifier, "base_class_clause") {
            draft.children.extend(self.base_classes(clause, &qualified_name, kind));
        }
        draft.children.extend(self.members(body, name, kind));
        Some(draft)
    }

    /// 在类体作用域内遍历成员
    fn members(&mut self, body: SyntaxNode<'_>, scope_name: &str, kind: NodeKind) -> Vec<Draft> {
        let depth = self.names.depth();
        self.names.push(scope_name);
        let saved = std::mem::replace(&mut self.scope, Scope::record(kind));

        let mut members = Vec::new();
        self.visit_items(body, &mut members);

        self.scope = saved;
        self.names.truncate(depth);
        members
    }

    fn base_classes(&self, clause: SyntaxNode<'_>, owner: &str, kind: NodeKind) -> Vec<Draft> {
        let default_access = Scope::record(kind).access;
        let mut bases = Vec::new();
        let mut access = None;
        let mut is_virtual = false;

        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "access_specifier" => access = parse_access(self.text(child)),
                "virtual" => is_virtual = true,
                "type_identifier" | "qualified_identifier" | "template_type" => {
                    let base = normalize_type(self.text(child));
                    let qualified_name = format!("{owner}::{base}");
                    let virtual_qualifier = if is_virtual {
                        VirtualQualifier::Virtual
                    } else {
                        VirtualQualifier::None
                    };
                    let base_access = access.unwrap_or(default_access);
                    bases.push(Draft::new(NodeKind::BaseClass, qualified_name).map(|builder| {
                        builder
                            .data_type(base)
                            .access(base_access)
                            .virtual_qualifier(virtual_qualifier)
                    }));
                    access = None;
                    is_virtual = false;
                }
                _ => {}
            }
        }
        bases
    }

    fn enum_draft(&self, specifier: SyntaxNode<'_>, body: SyntaxNode<'_>, name: &str) -> Draft {
        let qualified_name = self.names.qualify(name);
        let data_type = specifier
            .child_by_field_name("base")
            .or_else(|| specifier.child_by_field_name("underlying_type"))
            .map(|base| normalize_type(self.text(base)))
            .unwrap_or_else(|| "int".to_string());
        let access = self.member_access();

        let mut draft = Draft::new(NodeKind::Enum, qualified_name.clone())
            .map(|builder| builder.data_type(data_type).access(access));
        draft.children = self.enumerators(body, Some(&qualified_name));
        draft
    }

    /// 枚举项；`owner` 为空时（匿名枚举）直接挂在当前作用域
    fn enumerators(&self, body: SyntaxNode<'_>, owner: Option<&str>) -> Vec<Draft> {
        let mut drafts = Vec::new();
        let mut counter = EnumCounter::Number(0);

        for enumerator in named_children(body) {
            if enumerator.kind() != "enumerator" {
                continue;
            }
            let Some(name) = enumerator.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name).trim();
            if let Some(value) = enumerator.child_by_field_name("value") {
                counter = EnumCounter::from_expression(&normalize_type(self.text(value)));
            }
            let value = counter.render();
            counter.advance();

            let qualified_name = match owner {
                Some(owner) => format!("{owner}::{name}"),
                None => self.names.qualify(name),
            };
            drafts.push(Draft::new(NodeKind::Enumerator, qualified_name).map(|builder| builder.value(value)));
        }
        drafts
    }

    /// 没有名称也没有声明符的类型定义
    fn anonymous_type(&mut self, specifier: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let Some(body) = specifier.child_by_field_name("body") else {
            return;
        };
        if specifier.kind() == "enum_specifier" {
            out.extend(self.enumerators(body, None));
            return;
        }
        if self.scope.record.is_none() {
            debug!("Skipping anonymous {} at file scope", type_keyword(specifier));
            return;
        }

        // 匿名成员结构体/联合体：成员提升到外层类
        let kind = record_kind(specifier);
        let access = self.scope.access;
        let saved = std::mem::replace(
            &mut self.scope,
            Scope {
                record: Some(kind),
                access,
            },
        );
        self.visit_items(body, out);
        self.scope = saved;
    }

    /// 匿名类型字段的成员挂在字段名下
    fn anonymous_members(&mut self, specifier: SyntaxNode<'_>, field_name: &str) -> Vec<Draft> {
        let Some(body) = specifier.child_by_field_name("body") else {
            return Vec::new();
        };
        if specifier.kind() == "enum_specifier" {
            let owner = self.names.qualify(field_name);
            return self.enumerators(body, Some(&owner));
        }
        self.members(body, field_name, record_kind(specifier))
    }

    fn visit_typedef(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let specifiers = Specifiers::collect(node, self.source);
        let declarators: Vec<DeclaratorInfo> = field_children(node, "declarator")
            .into_iter()
            .map(|declarator| DeclaratorInfo::parse(declarator, self.source))
            .collect();

        // 匿名的 struct/enum 采用 typedef 的名称
        let mut defined = None;
        let base = if type_node.child_by_field_name("body").is_some() {
            let name = type_name(type_node, self.source).or_else(|| {
                declarators
                    .iter()
                    .find(|info| info.is_plain())
                    .map(|info| info.name.clone())
            });
            let Some(name) = name else {
                debug!("Skipping anonymous typedef without a usable name");
                return;
            };
            if let Some(draft) = self.type_draft(type_node, &name, &specifiers) {
                out.push(draft);
            }
            defined = Some(name.clone());
            name
        } else {
            specifiers.base_type(self.text(type_node))
        };

        for info in declarators {
            if info.name.is_empty()
                || (info.is_plain() && defined.as_deref() == Some(info.name.as_str()))
            {
                continue;
            }
            let qualified_name = self.names.qualify(&info.name);
            let data_type = info.full_type(&base);
            let access = self.member_access();
            let underlying = base.clone();

            let mut draft = Draft::new(NodeKind::Typedef, qualified_name.clone()).map(|builder| {
                builder
                    .type_name(underlying)
                    .data_type(data_type)
                    .access(access)
                    .pointer(info.is_pointer)
            });
            if let Some(shape) = &info.function {
                draft.children = signature(&qualified_name, Some(info.return_type(&base)), shape);
            }
            out.push(draft);
        }
    }

    fn visit_alias(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let (Some(name), Some(aliased)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("type"),
        ) else {
            return;
        };
        let qualified_name = self.names.qualify(self.text(name).trim());
        let aliased = normalize_type(self.text(aliased));
        let access = self.member_access();
        out.push(Draft::new(NodeKind::TypeAlias, qualified_name).map(|builder| {
            builder
                .type_name(aliased.clone())
                .data_type(aliased)
                .access(access)
        }));
    }

    fn visit_template(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let mut produced = Vec::new();
        for item in item_children(node) {
            self.visit_item(item, &mut produced);
        }

        if let Some(parameters) = node.child_by_field_name("parameters") {
            for draft in &mut produced {
                if matches!(
                    draft.kind,
                    NodeKind::Class
                        | NodeKind::Struct
                        | NodeKind::Union
                        | NodeKind::Function
                        | NodeKind::Method
                        | NodeKind::TypeAlias
                        | NodeKind::Variable
                ) {
                    let parameters =
                        template_parameters(parameters, &draft.qualified_name, self.source);
                    draft.children.splice(0..0, parameters);
                }
            }
        }
        out.extend(produced);
    }

    fn visit_define(&mut self, node: SyntaxNode<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name).trim().to_string();
        let value = node
            .child_by_field_name("value")
            .map(|value| normalize_source(self.text(value)))
            .unwrap_or_default();

        self.macros.define(name.clone(), value.clone());
        self.macro_drafts.push(
            Draft::new(NodeKind::Define, name).map(|builder| builder.body(value).active(true)),
        );
    }

    fn visit_function_macro(&mut self, node: SyntaxNode<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name).trim().to_string();
        let parameters = node
            .child_by_field_name("parameters")
            .map(|parameters| normalize_type(self.text(parameters)))
            .unwrap_or_default();
        let value = node
            .child_by_field_name("value")
            .map(|value| normalize_source(self.text(value)))
            .unwrap_or_default();

        self.macros.define(name.clone(), value.clone());
        self.macro_drafts.push(
            Draft::new(NodeKind::Macro, name)
                .map(|builder| builder.data_type(parameters).value(value)),
        );
    }

    /// `#undef` 在语法树中是一般的预处理指令
    fn visit_directive(&mut self, node: SyntaxNode<'_>) {
        let Some(directive) = node.child_by_field_name("directive") else {
            return;
        };
        if self.text(directive).trim() != "#undef" {
            return;
        }
        if let Some(argument) = node.child_by_field_name("argument") {
            let name = self.text(argument).trim().to_string();
            self.macros.undefine(&name);
        }
    }

    /// 条件编译链：每个分支一个条件节点，只抽取生效分支里的声明
    fn visit_conditional(&mut self, node: SyntaxNode<'_>, out: &mut Vec<Draft>) {
        let mut taken = false;
        let mut first_condition = None;
        let mut branch = Some(node);

        while let Some(current) = branch {
            let Some((kind, condition, value)) = self.branch_condition(current) else {
                break;
            };
            let first_condition = first_condition.get_or_insert_with(|| condition.clone());
            let is_active = !taken && value.unwrap_or(true);
            taken |= is_active;

            let name = if kind == NodeKind::Else {
                format!("{kind}:{first_condition}")
            } else {
                format!("{kind}:{condition}")
            };
            let body = normalize_source(self.branch_body(current));
            out.push(Draft::new(kind, self.names.qualify(&name)).map(|builder| {
                builder.condition(condition).body(body).active(is_active)
            }));

            if is_active {
                self.visit_items(current, out);
            }
            branch = current.child_by_field_name("alternative");
        }
    }

    /// 分支种类、条件文本与求值结果（`None` 表示无法确定）
    fn branch_condition(
        &self,
        branch: SyntaxNode<'_>,
    ) -> Option<(NodeKind, String, Option<bool>)> {
        match branch.kind() {
            "preproc_if" | "preproc_elif" => {
                let condition = normalize_source(self.text(branch.child_by_field_name("condition")?));
                let kind = if branch.kind() == "preproc_if" {
                    NodeKind::If
                } else {
                    NodeKind::Elif
                };
                let value = self.macros.evaluate(&condition);
                Some((kind, condition, value))
            }
            "preproc_ifdef" | "preproc_elifdef" => {
                let name = self.text(branch.child_by_field_name("name")?).trim().to_string();
                let defined = self.macros.is_defined(&name);
                let kind = match branch.child(0)?.kind() {
                    "#ifdef" => NodeKind::Ifdef,
                    "#ifndef" => NodeKind::Ifndef,
                    "#elifdef" => NodeKind::Elifdef,
                    "#elifndef" => NodeKind::Elifndef,
                    _ => return None,
                };
                let value = if matches!(kind, NodeKind::Ifdef | NodeKind::Elifdef) {
                    defined
                } else {
                    !defined
                };
                Some((kind, name, Some(value)))
            }
            "preproc_else" => Some((NodeKind::Else, String::new(), Some(true))),
            _ => None,
        }
    }

    /// 分支条件之后、下一分支或 `#endif` 之前的源码
    fn branch_body(&self, branch: SyntaxNode<'_>) -> &'s str {
        let start = branch
            .child_by_field_name("condition")
            .or_else(|| branch.child_by_field_name("name"))
            .or_else(|| branch.child(0))
            .map(|node| node.end_byte())
            .unwrap_or_else(|| branch.start_byte());
        let end = branch
            .child_by_field_name("alternative")
            .or_else(|| find_child(branch, "#endif"))
            .map(|node| node.start_byte())
            .unwrap_or_else(|| branch.end_byte());
        &self.source[start..end.max(start)]
    }
}

/// 没有字段名的具名子节点：翻译单元、声明列表与预处理分支中的条目
fn item_children(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    let mut items = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() && cursor.field_name().is_none() && child.kind() != "comment" {
                items.push(child);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    items
}

fn named_children(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn field_children<'t>(node: SyntaxNode<'t>, field: &str) -> Vec<SyntaxNode<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn find_child<'t>(node: SyntaxNode<'t>, kind: &str) -> Option<SyntaxNode<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

fn type_name(specifier: SyntaxNode<'_>, source: &str) -> Option<String> {
    specifier
        .child_by_field_name("name")
        .map(|name| normalize_type(text(name, source)))
}

fn record_kind(specifier: SyntaxNode<'_>) -> NodeKind {
    match specifier.kind() {
        "class_specifier" => NodeKind::Class,
        "union_specifier" => NodeKind::Union,
        _ => NodeKind::Struct,
    }
}

fn type_keyword(specifier: SyntaxNode<'_>) -> &'static str {
    match specifier.kind() {
        "class_specifier" => "class",
        "union_specifier" => "union",
        "enum_specifier" => "enum",
        _ => "struct",
    }
}

fn parse_access(spelling: &str) -> Option<AccessSpecifier> {
    match spelling.trim().trim_end_matches(':').trim() {
        "public" => Some(AccessSpecifier::Public),
        "protected" => Some(AccessSpecifier::Protected),
        "private" => Some(AccessSpecifier::Private),
        _ => None,
    }
}

/// 只接受（可带负号的）整数字面量
fn literal_value(expression: &str) -> Option<i64> {
    let expression = expression.trim();
    match expression.strip_prefix('-') {
        Some(rest) => parse_integer(rest.trim()).map(i64::wrapping_neg),
        None => parse_integer(expression),
    }
}

/// 函数签名子节点：`<fn>::return` 与 `<fn>::<param>`
fn signature(qualified_name: &str, return_type: Option<String>, shape: &FunctionShape) -> Vec<Draft> {
    let mut children = Vec::new();
    if let Some(return_type) = return_type {
        children.push(
            Draft::new(NodeKind::ReturnType, format!("{qualified_name}::return"))
                .map(|builder| builder.data_type(return_type)),
        );
    }
    for parameter in &shape.parameters {
        children.push(
            Draft::new(
                NodeKind::Parameter,
                format!("{qualified_name}::{}", parameter.name),
            )
            .map(|builder| {
                builder
                    .data_type(parameter.data_type.clone())
                    .value(parameter.default_value.clone())
                    .pointer(parameter.is_pointer)
                    .reference(parameter.is_reference)
                    .r_value_ref(parameter.is_r_value_ref)
            }),
        );
    }
    if shape.is_variadic {
        children.push(
            Draft::new(NodeKind::Parameter, format!("{qualified_name}::..."))
                .map(|builder| builder.data_type("...")),
        );
    }
    children
}

fn template_parameters(list: SyntaxNode<'_>, owner: &str, source: &str) -> Vec<Draft> {
    let mut drafts = Vec::new();
    for (index, parameter) in named_children(list)
        .into_iter()
        .filter(|parameter| parameter.kind() != "comment")
        .enumerate()
    {
        let (name, data_type, default_value) = match parameter.kind() {
            "type_parameter_declaration"
            | "optional_type_parameter_declaration"
            | "variadic_type_parameter_declaration" => {
                let name = parameter
                    .child_by_field_name("name")
                    .or_else(|| find_child(parameter, "type_identifier"))
                    .map(|name| text(name, source).trim().to_string())
                    .unwrap_or_else(|| format!("arg{index}"));
                let keyword = parameter
                    .child(0)
                    .map(|keyword| text(keyword, source).trim())
                    .unwrap_or("typename");
                let data_type = if parameter.kind() == "variadic_type_parameter_declaration" {
                    format!("{keyword}...")
                } else {
                    keyword.to_string()
                };
                let default_value = parameter
                    .child_by_field_name("default_type")
                    .map(|default| normalize_type(text(default, source)))
                    .unwrap_or_default();
                (name, data_type, default_value)
            }
            "parameter_declaration"
            | "optional_parameter_declaration"
            | "variadic_parameter_declaration" => {
                let info = parameter_info(parameter, source, index, "");
                (info.name, info.data_type, info.default_value)
            }
            _ => (
                format!("arg{index}"),
                normalize_type(text(parameter, source)),
                String::new(),
            ),
        };
        drafts.push(
            Draft::new(NodeKind::TemplateParam, format!("{owner}::{name}")).map(|builder| {
                builder.data_type(data_type).value(default_value)
            }),
        );
    }
    drafts
}
