//! 预处理条件求值
//!
//! 只覆盖头文件中常见的条件表达式：整数字面量、`defined X` / `defined(X)`、
//! 逻辑与算术运算以及值为数字的宏。无法确定的表达式返回 `None`，
//! 由调用方按“生效”处理。

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// 注释
static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment pattern is valid")
});

/// 连续空白
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// 条件表达式的词法单元
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"0[xX][0-9a-fA-F]+[uUlL]*|[0-9]+[uUlL]*|[A-Za-z_][A-Za-z0-9_]*|&&|\|\||==|!=|<=|>=|<<|>>|[!~()<>+\-*/%&|^?:,]",
    )
    .expect("token pattern is valid")
});

/// 宏展开的最大递归深度
const MAX_EXPANSION_DEPTH: usize = 16;

/// 去掉注释并压缩空白，用于条件块内容哈希与宏替换文本
pub(crate) fn normalize_source(text: &str) -> String {
    let without_comments = COMMENT.replace_all(text, " ");
    WHITESPACE
        .replace_all(&without_comments, " ")
        .trim()
        .to_string()
}

/// 解析过程中可见的宏定义
#[derive(Debug, Clone, Default)]
pub(crate) struct MacroTable {
    values: HashMap<String, String>,
}

impl MacroTable {
    pub(crate) fn new(predefined: &BTreeMap<String, String>) -> Self {
        Self {
            values: predefined
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    pub(crate) fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub(crate) fn undefine(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub(crate) fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 求值 `#if` / `#elif` 条件；`None` 表示无法确定
    pub(crate) fn evaluate(&self, expression: &str) -> Option<bool> {
        self.evaluate_value(expression, 0).map(|value| value != 0)
    }

    fn evaluate_value(&self, expression: &str, depth: usize) -> Option<i64> {
        if depth > MAX_EXPANSION_DEPTH {
            return None;
        }
        let cleaned = COMMENT.replace_all(expression, " ");
        let tokens = tokenize(&cleaned)?;
        if tokens.is_empty() {
            return None;
        }
        let mut evaluator = Evaluator {
            tokens,
            pos: 0,
            macros: self,
            depth,
        };
        let value = evaluator.conditional()?;
        // 有剩余词法单元说明表达式不完整
        (evaluator.pos == evaluator.tokens.len()).then_some(value)
    }

    fn expand(&self, name: &str, depth: usize) -> Option<i64> {
        match self.values.get(name) {
            None => Some(0),
            Some(value) if value.trim().is_empty() => None,
            Some(value) => self.evaluate_value(value, depth + 1),
        }
    }
}

/// 切分词法单元；出现无法识别的字符（如字符串字面量）时返回 `None`
fn tokenize(expression: &str) -> Option<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for found in TOKEN.find_iter(expression) {
        if !expression[last..found.start()].trim().is_empty() {
            return None;
        }
        tokens.push(found.as_str());
        last = found.end();
    }
    expression[last..].trim().is_empty().then_some(tokens)
}

pub(crate) fn parse_integer(token: &str) -> Option<i64> {
    let digits = token.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

fn binary_precedence(op: &str) -> Option<u8> {
    let precedence = match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    };
    Some(precedence)
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Option<i64> {
    let truth = |value: bool| i64::from(value);
    let value = match op {
        "||" => truth(lhs != 0 || rhs != 0),
        "&&" => truth(lhs != 0 && rhs != 0),
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => truth(lhs == rhs),
        "!=" => truth(lhs != rhs),
        "<" => truth(lhs < rhs),
        ">" => truth(lhs > rhs),
        "<=" => truth(lhs <= rhs),
        ">=" => truth(lhs >= rhs),
        "<<" => lhs.checked_shl(u32::try_from(rhs).ok()?)?,
        ">>" => lhs.checked_shr(u32::try_from(rhs).ok()?)?,
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" => lhs.checked_div(rhs)?,
        "%" => lhs.checked_rem(rhs)?,
        _ => return None,
    };
    Some(value)
}

struct Evaluator<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
    macros: &'a MacroTable,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &str) -> Option<()> {
        (self.next()? == expected).then_some(())
    }

    /// `cond ? a : b`
    fn conditional(&mut self) -> Option<i64> {
        let condition = self.binary(1)?;
        if self.peek() != Some("?") {
            return Some(condition);
        }
        self.pos += 1;
        let then_value = self.conditional()?;
        self.expect(":")?;
        let else_value = self.conditional()?;
        Some(if condition != 0 { then_value } else { else_value })
    }

    fn binary(&mut self, min_precedence: u8) -> Option<i64> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek() {
            let Some(precedence) = binary_precedence(op) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(precedence + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        let token = self.next()?;
        match token {
            "!" => Some(i64::from(self.unary()? == 0)),
            "-" => Some(self.unary()?.wrapping_neg()),
            "+" => self.unary(),
            "~" => Some(!self.unary()?),
            "(" => {
                let value = self.conditional()?;
                self.expect(")")?;
                Some(value)
            }
            "defined" => {
                let parenthesized = self.peek() == Some("(");
                if parenthesized {
                    self.pos += 1;
                }
                let name = self.next()?;
                if parenthesized {
                    self.expect(")")?;
                }
                Some(i64::from(self.macros.is_defined(name)))
            }
            "true" => Some(1),
            "false" => Some(0),
            _ if token.starts_with(|c: char| c.is_ascii_digit()) => parse_integer(token),
            _ if token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') => {
                // 函数式宏调用与 __has_include 等内建检查无法求值
                if self.peek() == Some("(") {
                    return None;
                }
                self.macros.expand(token, self.depth)
            }
            _ => None,
        }
    }
}
