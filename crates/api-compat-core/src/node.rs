//! 规范化声明树模型
//!
//! 所有声明（命名空间、类、函数、字段、宏、条件编译块等）共享同一个节点骨架：
//! `kind`、`qualified_name` 与 `children`。各类声明特有的属性放在
//! [`NodeBody`] 的不同变体中。节点构建完成后不可变。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 作用域分隔符
pub const SCOPE_SEPARATOR: &str = "::";

/// 声明种类
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum NodeKind {
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Function,
    Method,
    Field,
    Typedef,
    TypeAlias,
    Parameter,
    TemplateParam,
    BaseClass,
    Variable,
    ReturnType,
    FunctionPointer,
    Enumerator,
    Macro,
    If,
    Elif,
    Ifdef,
    Ifndef,
    Elifndef,
    Else,
    Endif,
    Elifdef,
    Define,
    ConditionalCompilation,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// 序列化名称
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Namespace => "Namespace",
            NodeKind::Class => "Class",
            NodeKind::Struct => "Struct",
            NodeKind::Union => "Union",
            NodeKind::Enum => "Enum",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::Field => "Field",
            NodeKind::Typedef => "Typedef",
            NodeKind::TypeAlias => "TypeAlias",
            NodeKind::Parameter => "Parameter",
            NodeKind::TemplateParam => "TemplateParam",
            NodeKind::BaseClass => "BaseClass",
            NodeKind::Variable => "Variable",
            NodeKind::ReturnType => "ReturnType",
            NodeKind::FunctionPointer => "FunctionPointer",
            NodeKind::Enumerator => "Enumerator",
            NodeKind::Macro => "Macro",
            NodeKind::If => "If",
            NodeKind::Elif => "Elif",
            NodeKind::Ifdef => "Ifdef",
            NodeKind::Ifndef => "Ifndef",
            NodeKind::Elifndef => "Elifndef",
            NodeKind::Else => "Else",
            NodeKind::Endif => "Endif",
            NodeKind::Elifdef => "Elifdef",
            NodeKind::Define => "Define",
            NodeKind::ConditionalCompilation => "ConditionalCompilation",
            NodeKind::Unknown => "Unknown",
        }
    }

    /// 预处理条件编译相关的种类
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::Elif
                | NodeKind::Ifdef
                | NodeKind::Ifndef
                | NodeKind::Elifndef
                | NodeKind::Else
                | NodeKind::Endif
                | NodeKind::Elifdef
                | NodeKind::Define
                | NodeKind::ConditionalCompilation
        )
    }

    /// 函数与方法
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }

    /// 天然拥有子节点的种类（即使子节点列表为空）
    pub fn is_container_kind(&self) -> bool {
        matches!(
            self,
            NodeKind::Namespace
                | NodeKind::Class
                | NodeKind::Struct
                | NodeKind::Union
                | NodeKind::Enum
                | NodeKind::Function
                | NodeKind::Method
                | NodeKind::FunctionPointer
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 访问控制说明符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
    #[default]
    None,
}

impl AccessSpecifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessSpecifier::Public => "public",
            AccessSpecifier::Protected => "protected",
            AccessSpecifier::Private => "private",
            AccessSpecifier::None => "",
        }
    }
}

/// 存储类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageClass {
    #[default]
    None,
    Static,
    Extern,
    Register,
    Auto,
}

impl StorageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::None => "",
            StorageClass::Static => "static",
            StorageClass::Extern => "extern",
            StorageClass::Register => "register",
            StorageClass::Auto => "auto",
        }
    }

    /// 根据 C/C++ 关键字解析
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "static" => Some(StorageClass::Static),
            "extern" => Some(StorageClass::Extern),
            "register" => Some(StorageClass::Register),
            "auto" => Some(StorageClass::Auto),
            _ => None,
        }
    }
}

/// const 限定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConstQualifier {
    #[default]
    None,
    Const,
    ConstExpr,
}

impl ConstQualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstQualifier::None => "",
            ConstQualifier::Const => "const",
            ConstQualifier::ConstExpr => "constexpr",
        }
    }
}

/// virtual 限定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VirtualQualifier {
    #[default]
    None,
    Virtual,
    PureVirtual,
    Override,
}

impl VirtualQualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualQualifier::None => "",
            VirtualQualifier::Virtual => "virtual",
            VirtualQualifier::PureVirtual => "pure virtual",
            VirtualQualifier::Override => "override",
        }
    }
}

/// 函数调用约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallingConvention {
    CDecl,
    StdCall,
    FastCall,
    ThisCall,
    VectorCall,
    Pascal,
    Win64,
    SysV,
    RegCall,
    #[serde(rename = "AAPCS")]
    Aapcs,
    #[serde(rename = "AAPCS_VFP")]
    AapcsVfp,
    IntelOclBicc,
    SpirFunction,
    #[serde(rename = "OpenCLKernel")]
    OpenClKernel,
    Swift,
    SwiftAsync,
    PreserveMost,
    PreserveAll,
    AArch64VectorCall,
    #[default]
    None,
}

impl CallingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallingConvention::CDecl => "cdecl",
            CallingConvention::StdCall => "stdcall",
            CallingConvention::FastCall => "fastcall",
            CallingConvention::ThisCall => "thiscall",
            CallingConvention::VectorCall => "vectorcall",
            CallingConvention::Pascal => "pascal",
            CallingConvention::Win64 => "ms_abi",
            CallingConvention::SysV => "sysv_abi",
            CallingConvention::RegCall => "regcall",
            CallingConvention::Aapcs => "pcs(\"aapcs\")",
            CallingConvention::AapcsVfp => "pcs(\"aapcs-vfp\")",
            CallingConvention::IntelOclBicc => "intel_ocl_bicc",
            CallingConvention::SpirFunction => "spir_function",
            CallingConvention::OpenClKernel => "opencl_kernel",
            CallingConvention::Swift => "swiftcall",
            CallingConvention::SwiftAsync => "swiftasynccall",
            CallingConvention::PreserveMost => "preserve_most",
            CallingConvention::PreserveAll => "preserve_all",
            CallingConvention::AArch64VectorCall => "aarch64_vector_pcs",
            CallingConvention::None => "",
        }
    }

    /// 根据 MSVC 关键字或 GNU 属性名解析调用约定
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        let trimmed = spelling.trim().trim_matches('_');
        let convention = match trimmed {
            "cdecl" => CallingConvention::CDecl,
            "stdcall" => CallingConvention::StdCall,
            "fastcall" => CallingConvention::FastCall,
            "thiscall" => CallingConvention::ThisCall,
            "vectorcall" => CallingConvention::VectorCall,
            "pascal" => CallingConvention::Pascal,
            "ms_abi" => CallingConvention::Win64,
            "sysv_abi" => CallingConvention::SysV,
            "regcall" => CallingConvention::RegCall,
            "intel_ocl_bicc" => CallingConvention::IntelOclBicc,
            "swiftcall" => CallingConvention::Swift,
            "swiftasynccall" => CallingConvention::SwiftAsync,
            "preserve_most" => CallingConvention::PreserveMost,
            "preserve_all" => CallingConvention::PreserveAll,
            "aarch64_vector_pcs" => CallingConvention::AArch64VectorCall,
            _ if trimmed.starts_with("pcs") && trimmed.contains("aapcs-vfp") => {
                CallingConvention::AapcsVfp
            }
            _ if trimmed.starts_with("pcs") && trimmed.contains("aapcs") => {
                CallingConvention::Aapcs
            }
            _ => return None,
        };
        Some(convention)
    }
}

/// 普通声明的标量属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Declaration {
    /// typedef 所指向的类型名等
    pub type_name: String,
    /// 底层数据类型；函数为返回类型签名
    pub data_type: String,
    /// 枚举值、宏替换文本、参数默认值等
    pub value: String,
    pub access: AccessSpecifier,
    pub storage: StorageClass,
    pub const_qualifier: ConstQualifier,
    pub virtual_qualifier: VirtualQualifier,
    pub calling_convention: CallingConvention,
    pub is_inline: bool,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_r_value_ref: bool,
    pub is_packed: bool,
}

/// 条件编译块
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionalBlock {
    pub condition_string: String,
    pub body_string: String,
    /// 受保护区域内容的哈希，用于快速比较
    pub hash: String,
    /// 解析时该分支是否生效
    pub is_active: bool,
}

/// 节点主体：按声明族区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "camelCase")]
pub enum NodeBody {
    Container {
        #[serde(default)]
        decl: Declaration,
        #[serde(default)]
        children: Vec<Node>,
    },
    Leaf {
        #[serde(default)]
        decl: Declaration,
    },
    Conditional {
        #[serde(default)]
        block: ConditionalBlock,
    },
}

/// 声明树节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    kind: NodeKind,
    #[serde(default)]
    qualified_name: String,
    #[serde(default, rename = "USR")]
    usr: String,
    body: NodeBody,
}

impl Node {
    /// 创建节点构建器
    pub fn builder(kind: NodeKind, qualified_name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(kind, qualified_name)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn usr(&self) -> &str {
        &self.usr
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// 限定名最后一段
    pub fn leaf_name(&self) -> &str {
        leaf_segment(&self.qualified_name)
    }

    /// 子节点；叶子与条件编译节点返回空切片
    pub fn children(&self) -> &[Node] {
        match &self.body {
            NodeBody::Container { children, .. } => children,
            NodeBody::Leaf { .. } | NodeBody::Conditional { .. } => &[],
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        match &self.body {
            NodeBody::Container { decl, .. } | NodeBody::Leaf { decl } => Some(decl),
            NodeBody::Conditional { .. } => None,
        }
    }

    pub fn conditional(&self) -> Option<&ConditionalBlock> {
        match &self.body {
            NodeBody::Conditional { block } => Some(block),
            _ => None,
        }
    }

    pub fn data_type(&self) -> &str {
        self.declaration()
            .map(|decl| decl.data_type.as_str())
            .unwrap_or_default()
    }

    /// 子树中的节点总数（包含自身）
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// 节点构建器
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    qualified_name: String,
    usr: Option<String>,
    decl: Declaration,
    block: ConditionalBlock,
    children: Vec<Node>,
}

impl NodeBuilder {
    pub fn new(kind: NodeKind, qualified_name: impl Into<String>) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            usr: None,
            decl: Declaration::default(),
            block: ConditionalBlock::default(),
            children: Vec::new(),
        }
    }

    pub fn usr(mut self, usr: impl Into<String>) -> Self {
        self.usr = Some(usr.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.decl.type_name = type_name.into();
        self
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.decl.data_type = data_type.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.decl.value = value.into();
        self
    }

    pub fn access(mut self, access: AccessSpecifier) -> Self {
        self.decl.access = access;
        self
    }

    pub fn storage(mut self, storage: StorageClass) -> Self {
        self.decl.storage = storage;
        self
    }

    pub fn const_qualifier(mut self, qualifier: ConstQualifier) -> Self {
        self.decl.const_qualifier = qualifier;
        self
    }

    pub fn virtual_qualifier(mut self, qualifier: VirtualQualifier) -> Self {
        self.decl.virtual_qualifier = qualifier;
        self
    }

    pub fn calling_convention(mut self, convention: CallingConvention) -> Self {
        self.decl.calling_convention = convention;
        self
    }

    pub fn inline(mut self, is_inline: bool) -> Self {
        self.decl.is_inline = is_inline;
        self
    }

    pub fn pointer(mut self, is_pointer: bool) -> Self {
        self.decl.is_pointer = is_pointer;
        self
    }

    pub fn reference(mut self, is_reference: bool) -> Self {
        self.decl.is_reference = is_reference;
        self
    }

    pub fn r_value_ref(mut self, is_r_value_ref: bool) -> Self {
        self.decl.is_r_value_ref = is_r_value_ref;
        self
    }

    pub fn packed(mut self, is_packed: bool) -> Self {
        self.decl.is_packed = is_packed;
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.block.condition_string = condition.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.block.body_string = body.into();
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.block.hash = hash.into();
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.block.is_active = is_active;
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// 完成构建
    ///
    /// 条件编译种类生成 `Conditional` 主体（未显式给出哈希时按 body 计算，
    /// 不持有子节点）；容器种类或带有子节点的声明生成 `Container`；
    /// 其余生成 `Leaf`。
    pub fn build(self) -> Node {
        let usr = self
            .usr
            .unwrap_or_else(|| format!("{}@{}", self.kind, self.qualified_name));

        let body = if self.kind.is_conditional() {
            let mut block = self.block;
            if block.hash.is_empty() {
                block.hash = content_hash(&block.body_string);
            }
            NodeBody::Conditional { block }
        } else if self.kind.is_container_kind() || !self.children.is_empty() {
            NodeBody::Container {
                decl: self.decl,
                children: self.children,
            }
        } else {
            NodeBody::Leaf { decl: self.decl }
        };

        Node {
            kind: self.kind,
            qualified_name: self.qualified_name,
            usr,
            body,
        }
    }
}

/// 计算文本内容的 SHA-256 十六进制摘要
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// 限定名最后一段
pub fn leaf_segment(qualified_name: &str) -> &str {
    qualified_name
        .rfind(SCOPE_SEPARATOR)
        .map(|pos| &qualified_name[pos + SCOPE_SEPARATOR.len()..])
        .unwrap_or(qualified_name)
}

/// 限定名去掉最后一段后的部分；没有分隔符时返回原字符串
pub fn scope_stem(qualified_name: &str) -> &str {
    qualified_name
        .rfind(SCOPE_SEPARATOR)
        .map(|pos| &qualified_name[..pos])
        .unwrap_or(qualified_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_selects_body_family() {
        let field = Node::builder(NodeKind::Field, "S::x").data_type("int").build();
        assert!(matches!(field.body(), NodeBody::Leaf { .. }));
        assert!(!field.has_children());

        let empty_struct = Node::builder(NodeKind::Struct, "Empty").build();
        assert!(matches!(empty_struct.body(), NodeBody::Container { .. }));
        assert!(empty_struct.children().is_empty());

        let fn_ptr_field = Node::builder(NodeKind::Field, "S::cb")
            .child(Node::builder(NodeKind::ReturnType, "S::cb::return").build())
            .build();
        assert!(matches!(fn_ptr_field.body(), NodeBody::Container { .. }));

        let ifdef = Node::builder(NodeKind::Ifdef, "Ifdef:FOO")
            .condition("FOO")
            .body("int x;")
            .active(true)
            .build();
        let block = ifdef.conditional().expect("conditional block");
        assert_eq!(block.hash, content_hash("int x;"));
        assert!(ifdef.declaration().is_none());
    }

    #[test]
    fn test_default_usr_and_names() {
        let node = Node::builder(NodeKind::Function, "ns::open").build();
        assert_eq!(node.usr(), "Function@ns::open");
        assert_eq!(node.leaf_name(), "open");
        assert_eq!(scope_stem("ns::open::return"), "ns::open");
        assert_eq!(scope_stem("plain"), "plain");
        assert_eq!(leaf_segment("plain"), "plain");
    }

    #[test]
    fn test_unknown_kind_decodes_to_unknown() {
        let kind: NodeKind = serde_json::from_str("\"Concept\"").unwrap();
        assert_eq!(kind, NodeKind::Unknown);
        let kind: NodeKind = serde_json::from_str("\"Enumerator\"").unwrap();
        assert_eq!(kind, NodeKind::Enumerator);
    }

    #[test]
    fn test_calling_convention_spellings() {
        assert_eq!(
            CallingConvention::from_spelling("__stdcall"),
            Some(CallingConvention::StdCall)
        );
        assert_eq!(
            CallingConvention::from_spelling("pcs(\"aapcs-vfp\")"),
            Some(CallingConvention::AapcsVfp)
        );
        assert_eq!(CallingConvention::from_spelling("noreturn"), None);
    }

    #[test]
    fn test_subtree_len_counts_descendants() {
        let node = Node::builder(NodeKind::Struct, "S")
            .child(Node::builder(NodeKind::Field, "S::a").build())
            .child(
                Node::builder(NodeKind::Enum, "S::E")
                    .child(Node::builder(NodeKind::Enumerator, "S::E::A").build())
                    .build(),
            )
            .build();
        assert_eq!(node.subtree_len(), 4);
    }
}
