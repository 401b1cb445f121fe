//! 声明符与声明说明符
//!
//! C/C++ 的类型被拆在两处：声明说明符给出基础类型（`const char`），
//! 声明符给出名称和修饰（`*name[4]`）。这里把两者拼回完整的类型字符串。

use crate::node::{CallingConvention, ConstQualifier, StorageClass};
use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Node as SyntaxNode;

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("space pattern is valid"));

/// 这些符号前不留空格
static SPACE_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([*&\[\],)>])").expect("space-before pattern is valid"));

/// 这些符号后不留空格
static SPACE_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([(\[<])\s+").expect("space-after pattern is valid"));

/// 逗号后保留一个空格
static COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\S)").expect("comma pattern is valid"));

/// `__attribute__((...))` 中的属性名，可带一个字符串参数
static ATTRIBUTE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[A-Za-z_][A-Za-z0-9_]*(?:\s*\(\s*"[^"]*"\s*\))?"#)
        .expect("attribute pattern is valid")
});

/// 节点对应的源码文本
pub(crate) fn text<'s>(node: SyntaxNode, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 规范化类型字符串：`const char *` -> `const char*`，`char [ 64 ]` -> `char[64]`
pub(crate) fn normalize_type(text: &str) -> String {
    let collapsed = SPACE_RUN.replace_all(text.trim(), " ");
    let tight = SPACE_BEFORE.replace_all(&collapsed, "$1");
    let tight = SPACE_AFTER.replace_all(&tight, "$1");
    COMMA.replace_all(&tight, ", $1").into_owned()
}

/// 从属性说明文本中识别调用约定
pub(crate) fn attribute_calling_convention(attribute: &str) -> Option<CallingConvention> {
    ATTRIBUTE_WORD
        .find_iter(attribute)
        .find_map(|word| CallingConvention::from_spelling(word.as_str()))
}

/// 属性说明中是否包含 `packed`
pub(crate) fn attribute_is_packed(attribute: &str) -> bool {
    ATTRIBUTE_WORD
        .find_iter(attribute)
        .any(|word| word.as_str().trim_matches('_') == "packed")
}

/// 声明上的说明符：存储类、inline、virtual、cv 限定与调用约定
#[derive(Debug, Clone, Default)]
pub(crate) struct Specifiers {
    pub storage: StorageClass,
    pub is_inline: bool,
    pub is_virtual: bool,
    pub const_qualifier: ConstQualifier,
    /// 写在基础类型前的 `const` / `volatile`
    pub type_prefix: String,
    pub calling_convention: Option<CallingConvention>,
    pub is_packed: bool,
}

impl Specifiers {
    pub(crate) fn collect(declaration: SyntaxNode, source: &str) -> Self {
        let mut specifiers = Self::default();
        let mut cursor = declaration.walk();
        for child in declaration.children(&mut cursor) {
            let spelling = text(child, source).trim();
            match child.kind() {
                "storage_class_specifier" => match spelling {
                    "inline" | "__inline" | "__inline__" | "__forceinline" => {
                        specifiers.is_inline = true
                    }
                    keyword => {
                        if let Some(storage) = StorageClass::from_keyword(keyword) {
                            specifiers.storage = storage;
                        }
                    }
                },
                "virtual" => specifiers.is_virtual = true,
                "type_qualifier" => match spelling {
                    "constexpr" => specifiers.const_qualifier = ConstQualifier::ConstExpr,
                    "const" | "volatile" => {
                        specifiers.type_prefix.push_str(spelling);
                        specifiers.type_prefix.push(' ');
                    }
                    _ => {}
                },
                "ms_call_modifier" => {
                    specifiers.calling_convention = CallingConvention::from_spelling(spelling)
                }
                "attribute_specifier" | "attribute_declaration" => {
                    specifiers.is_packed |= attribute_is_packed(spelling);
                    if let Some(convention) = attribute_calling_convention(spelling) {
                        specifiers.calling_convention = Some(convention);
                    }
                }
                _ if spelling == "constexpr" => {
                    specifiers.const_qualifier = ConstQualifier::ConstExpr
                }
                _ => {}
            }
        }
        specifiers
    }

    /// 带 cv 前缀的基础类型
    pub(crate) fn base_type(&self, type_text: &str) -> String {
        normalize_type(&format!("{}{type_text}", self.type_prefix))
    }
}

/// 一个函数参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParameterInfo {
    pub name: String,
    pub data_type: String,
    pub default_value: String,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_r_value_ref: bool,
}

/// 函数声明符的形状
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionShape {
    pub parameters: Vec<ParameterInfo>,
    pub is_variadic: bool,
    /// 方法上的 `const`
    pub is_const: bool,
    pub is_override: bool,
    /// 函数指针（声明符被括号包裹）
    pub is_pointer: bool,
    /// 函数指针自身的修饰：`*`、`*[4]`
    pub pointer_suffix: String,
    pub calling_convention: Option<CallingConvention>,
}

impl FunctionShape {
    fn parse(declarator: SyntaxNode, source: &str) -> Self {
        let mut shape = Self::default();
        if let Some(parameters) = declarator.child_by_field_name("parameters") {
            shape.parse_parameters(parameters, source);
        }

        let mut cursor = declarator.walk();
        for child in declarator.children(&mut cursor) {
            let spelling = text(child, source).trim();
            match child.kind() {
                "type_qualifier" if spelling == "const" => shape.is_const = true,
                "virtual_specifier" if spelling == "override" => shape.is_override = true,
                "attribute_specifier" => {
                    shape.calling_convention = attribute_calling_convention(spelling)
                }
                _ => {}
            }
        }
        shape
    }

    fn parse_parameters(&mut self, list: SyntaxNode, source: &str) {
        let mut cursor = list.walk();
        for parameter in list.children(&mut cursor) {
            match parameter.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let info = parameter_info(parameter, source, self.parameters.len(), "");
                    self.parameters.push(info);
                }
                "variadic_parameter_declaration" => {
                    let info = parameter_info(parameter, source, self.parameters.len(), "...");
                    self.parameters.push(info);
                }
                "variadic_parameter" | "..." => self.is_variadic = true,
                _ => {}
            }
        }

        // `(void)` 表示没有参数
        let is_void = matches!(
            self.parameters.as_slice(),
            [only] if only.data_type == "void" && only.name == "arg0"
        );
        if is_void {
            self.parameters.clear();
        }
    }

    /// 参数类型列表，如 `int, const char*`
    pub(crate) fn parameter_list(&self) -> String {
        let mut types: Vec<&str> = self
            .parameters
            .iter()
            .map(|parameter| parameter.data_type.as_str())
            .collect();
        if self.is_variadic {
            types.push("...");
        }
        types.join(", ")
    }
}

/// 解析一个参数声明；没有名称时命名为 `arg<N>`
pub(crate) fn parameter_info(
    parameter: SyntaxNode,
    source: &str,
    index: usize,
    suffix: &str,
) -> ParameterInfo {
    let specifiers = Specifiers::collect(parameter, source);
    let base = parameter
        .child_by_field_name("type")
        .map(|node| specifiers.base_type(text(node, source)))
        .unwrap_or_default();
    let default_value = parameter
        .child_by_field_name("default_value")
        .map(|node| normalize_type(text(node, source)))
        .unwrap_or_default();

    let declarator = parameter
        .child_by_field_name("declarator")
        .map(|node| DeclaratorInfo::parse(node, source))
        .unwrap_or_default();
    let name = if declarator.name.is_empty() {
        format!("arg{index}")
    } else {
        declarator.name.clone()
    };

    ParameterInfo {
        name,
        data_type: format!("{}{suffix}", declarator.full_type(&base)),
        default_value,
        is_pointer: declarator.is_pointer,
        is_reference: declarator.is_reference,
        is_r_value_ref: declarator.is_r_value_ref,
    }
}

/// 解开后的声明符
#[derive(Debug, Clone, Default)]
pub(crate) struct DeclaratorInfo {
    pub name: String,
    /// 名称带作用域（类外定义等）
    pub qualified: bool,
    /// 作用于基础类型的指针与引用修饰
    pub indirection: String,
    pub array_suffix: String,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_r_value_ref: bool,
    pub function: Option<FunctionShape>,
    pub default_value: Option<String>,
    pub calling_convention: Option<CallingConvention>,
}

impl DeclaratorInfo {
    pub(crate) fn parse(declarator: SyntaxNode, source: &str) -> Self {
        let mut info = Self::default();
        info.unwrap(declarator, source);
        info
    }

    /// 只有名称，没有任何修饰
    pub(crate) fn is_plain(&self) -> bool {
        self.indirection.is_empty() && self.array_suffix.is_empty() && self.function.is_none()
    }

    /// 作为函数时的返回类型
    pub(crate) fn return_type(&self, base: &str) -> String {
        normalize_type(&format!("{base}{}", self.indirection))
    }

    /// 声明的完整类型
    pub(crate) fn full_type(&self, base: &str) -> String {
        match &self.function {
            Some(shape) if shape.is_pointer => format!(
                "{} ({})({})",
                self.return_type(base),
                normalize_type(&shape.pointer_suffix),
                shape.parameter_list()
            ),
            Some(shape) => format!("{} ({})", self.return_type(base), shape.parameter_list()),
            None => normalize_type(&format!("{base}{}{}", self.indirection, self.array_suffix)),
        }
    }

    fn in_function_pointer(&mut self) -> Option<&mut FunctionShape> {
        self.function.as_mut().filter(|shape| shape.is_pointer)
    }

    fn push_indirection(&mut self, marker: &str) {
        match self.in_function_pointer() {
            Some(shape) => shape.pointer_suffix.push_str(marker),
            None => self.indirection.push_str(marker),
        }
    }

    /// 外层数组维度先出现，需要前插
    fn push_array(&mut self, dimension: &str) {
        match self.in_function_pointer() {
            Some(shape) => shape.pointer_suffix.push_str(dimension),
            None => self.array_suffix.insert_str(0, dimension),
        }
    }

    fn unwrap(&mut self, node: SyntaxNode, source: &str) {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" | "template_function" | "primitive_type" => {
                self.name = text(node, source).trim().to_string();
            }
            "qualified_identifier" => {
                self.name = normalize_type(text(node, source));
                self.qualified = true;
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let mut marker = String::from("*");
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "type_qualifier" {
                        marker.push(' ');
                        marker.push_str(text(child, source).trim());
                    }
                }
                self.push_indirection(&marker);
                self.is_pointer = true;
                if let Some(inner) = node.child_by_field_name("declarator") {
                    self.unwrap(inner, source);
                }
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                let is_r_value = node.child(0).is_some_and(|token| token.kind() == "&&");
                if is_r_value {
                    self.push_indirection("&&");
                    self.is_r_value_ref = true;
                } else {
                    self.push_indirection("&");
                    self.is_reference = true;
                }
                let inner = node.named_child(node.named_child_count().saturating_sub(1));
                if let Some(inner) = inner {
                    self.unwrap(inner, source);
                }
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|size| normalize_type(text(size, source)))
                    .unwrap_or_default();
                self.push_array(&format!("[{size}]"));
                if let Some(inner) = node.child_by_field_name("declarator") {
                    self.unwrap(inner, source);
                }
            }
            "function_declarator" | "abstract_function_declarator" => {
                if self.function.is_none() {
                    self.function = Some(FunctionShape::parse(node, source));
                }
                if let Some(inner) = node.child_by_field_name("declarator") {
                    self.unwrap(inner, source);
                }
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" => {
                if let Some(shape) = self.function.as_mut() {
                    shape.is_pointer = true;
                }
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "ms_call_modifier" {
                        self.calling_convention =
                            CallingConvention::from_spelling(text(child, source));
                    } else {
                        self.unwrap(child, source);
                    }
                }
            }
            "init_declarator" => {
                self.default_value = node
                    .child_by_field_name("value")
                    .map(|value| normalize_type(text(value, source)));
                if let Some(inner) = node.child_by_field_name("declarator") {
                    self.unwrap(inner, source);
                }
            }
            "attributed_declarator" => {
                if let Some(inner) = node.named_child(0) {
                    self.unwrap(inner, source);
                }
            }
            _ => {
                if self.name.is_empty() {
                    self.name = normalize_type(text(node, source));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("const  char *"), "const char*");
        assert_eq!(normalize_type("char [ 64 ]"), "char[64]");
        assert_eq!(normalize_type("std::map< int ,std::string >"), "std::map<int, std::string>");
        assert_eq!(normalize_type("unsigned\n  long"), "unsigned long");
        assert_eq!(normalize_type("char * const"), "char* const");
    }

    #[test]
    fn test_attribute_spellings() {
        assert_eq!(
            attribute_calling_convention("__attribute__((stdcall))"),
            Some(CallingConvention::StdCall)
        );
        assert_eq!(
            attribute_calling_convention("__attribute__((pcs(\"aapcs\")))"),
            Some(CallingConvention::Aapcs)
        );
        assert_eq!(attribute_calling_convention("__attribute__((noreturn))"), None);
        assert!(attribute_is_packed("__attribute__((__packed__))"));
        assert!(!attribute_is_packed("__attribute__((aligned(8)))"));
    }

    #[test]
    fn test_full_type_of_plain_declarator() {
        let info = DeclaratorInfo {
            indirection: "*".to_string(),
            array_suffix: "[2][3]".to_string(),
            ..DeclaratorInfo::default()
        };
        assert_eq!(info.full_type("int"), "int*[2][3]");
        assert!(!info.is_plain());
        assert!(DeclaratorInfo::default().is_plain());
    }

    #[test]
    fn test_full_type_of_function_pointer() {
        let info = DeclaratorInfo {
            function: Some(FunctionShape {
                parameters: vec![ParameterInfo {
                    name: "fd".to_string(),
                    data_type: "int".to_string(),
                    ..ParameterInfo::default()
                }],
                is_variadic: true,
                is_pointer: true,
                pointer_suffix: "*".to_string(),
                ..FunctionShape::default()
            }),
            ..DeclaratorInfo::default()
        };
        assert_eq!(info.full_type("void"), "void (*)(int, ...)");
    }
}
