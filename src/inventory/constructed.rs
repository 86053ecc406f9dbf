//! `compose`, `groups` and `keyed_groups` rules evaluated against host
//! variables.
//!
//! Expressions use a small Jinja-like subset: quoted strings, numbers,
//! `true`/`false`, variable paths (`host_data.platformId`, `serial_number.0`,
//! `host_data['role']`), the comparisons `==`, `!=`, `in`, `not in`, and the
//! boolean operators `not`, `and`, `or` with parentheses.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{InventoryError, InventoryModel};

/// A `keyed_groups` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyedGroup {
    /// Expression whose value(s) name the groups.
    pub key: String,

    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Group the generated groups are placed under.
    #[serde(default)]
    pub parent_group: Option<String>,

    /// Value used when the key evaluates to an empty string.
    #[serde(default)]
    pub default_value: Option<String>,

    /// Keep the separator after the prefix when the value is empty.
    #[serde(default = "default_true")]
    pub trailing_separator: bool,
}

fn default_separator() -> String {
    "_".to_string()
}

fn default_true() -> bool {
    true
}

/// All derived-attribute rules of an inventory source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConstructedRules {
    /// Variable name -> expression.
    #[serde(default)]
    pub compose: IndexMap<String, String>,

    /// Group name -> condition.
    #[serde(default)]
    pub groups: IndexMap<String, String>,

    #[serde(default)]
    pub keyed_groups: Vec<KeyedGroup>,

    /// Fail on undefined variables and bad expressions instead of skipping.
    #[serde(default)]
    pub strict: bool,
}

impl ConstructedRules {
    pub fn is_empty(&self) -> bool {
        self.compose.is_empty() && self.groups.is_empty() && self.keyed_groups.is_empty()
    }

    /// Applies every rule to `host`, in the order compose, groups,
    /// keyed groups. Composed variables are visible to the later rules.
    pub fn apply<I: InventoryModel>(&self, inventory: &mut I, host: &str) -> Result<(), InventoryError> {
        self.set_composite_vars(inventory, host)?;
        self.add_host_to_composed_groups(inventory, host)?;
        self.add_host_to_keyed_groups(inventory, host)
    }

    fn host_vars<I: InventoryModel>(inventory: &I, host: &str) -> Result<Map<String, Value>, InventoryError> {
        inventory
            .get_host(host)
            .map(|h| h.get_vars().clone())
            .ok_or_else(|| InventoryError::UnknownHost(host.to_string()))
    }

    /// Evaluates `expression`; outside strict mode failures become `None`.
    fn evaluate(&self, expression: &str, vars: &Map<String, Value>, host: &str) -> Result<Option<Value>, InventoryError> {
        match evaluate(expression, vars) {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!("Skipping rule {expression:?} for {host}: {e}");
                Ok(None)
            }
        }
    }

    fn set_composite_vars<I: InventoryModel>(&self, inventory: &mut I, host: &str) -> Result<(), InventoryError> {
        for (name, expression) in &self.compose {
            let vars = Self::host_vars(inventory, host)?;
            if let Some(value) = self.evaluate(expression, &vars, host)? {
                inventory.set_variable(host, name, value)?;
            }
        }
        Ok(())
    }

    fn add_host_to_composed_groups<I: InventoryModel>(&self, inventory: &mut I, host: &str) -> Result<(), InventoryError> {
        let vars = Self::host_vars(inventory, host)?;
        for (group, condition) in &self.groups {
            let matched = self
                .evaluate(condition, &vars, host)?
                .is_some_and(|value| is_truthy(&value));
            if matched {
                let group = inventory.add_group(&sanitize_group_name(group))?;
                inventory.add_host(host, Some(&group))?;
            }
        }
        Ok(())
    }

    fn add_host_to_keyed_groups<I: InventoryModel>(&self, inventory: &mut I, host: &str) -> Result<(), InventoryError> {
        let vars = Self::host_vars(inventory, host)?;
        for keyed in &self.keyed_groups {
            let Some(value) = self.evaluate(&keyed.key, &vars, host)? else {
                continue;
            };

            for name in keyed_group_names(keyed, &value) {
                let group = inventory.add_group(&sanitize_group_name(&name))?;
                inventory.add_host(host, Some(&group))?;

                if let Some(parent) = &keyed.parent_group {
                    let parent = inventory.add_group(&sanitize_group_name(parent))?;
                    inventory.add_child(&parent, &group)?;
                }
            }
        }
        Ok(())
    }
}

/// Group names a keyed group produces for one key value.
fn keyed_group_names(keyed: &KeyedGroup, value: &Value) -> Vec<String> {
    let raw_names: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}{}{}", keyed.separator, value_to_string(v)))
            .collect(),
        other => vec![value_to_string(other)],
    };

    raw_names
        .into_iter()
        .map(|raw| {
            let raw = if raw.is_empty() {
                keyed.default_value.clone().unwrap_or_default()
            } else {
                raw
            };
            if raw.is_empty() && !keyed.trailing_separator {
                keyed.prefix.clone()
            } else {
                format!("{}{}{raw}", keyed.prefix, keyed.separator)
            }
        })
        .collect()
}

/// Replaces every character a group name cannot hold with `_`.
/// A leading digit gets a `_` in front.
pub fn sanitize_group_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Jinja truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluates an expression against a set of variables.
pub fn evaluate(expression: &str, vars: &Map<String, Value>) -> Result<Value, InventoryError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        expression,
        tokens,
        pos: 0,
        vars,
    };
    let value = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Eq,
    Ne,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, InventoryError> {
    let invalid = |message: String| InventoryError::InvalidExpression {
        expression: expression.to_string(),
        message,
    };

    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        match c {
            c if c.is_whitespace() => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' | '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(invalid(format!("expected '=' after '{c}'")));
                }
                tokens.push(if c == '=' { Token::Eq } else { Token::Ne });
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated string".into())),
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                s.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while chars.get(i).is_some_and(char::is_ascii_digit) {
                    i += 1;
                }
                // Path segments like `serial_number.0.1` stay integers.
                let after_dot = tokens.last() == Some(&Token::Dot);
                let is_float = !after_dot
                    && chars.get(i) == Some(&'.')
                    && chars.get(i + 1).is_some_and(char::is_ascii_digit);
                if is_float {
                    i += 1;
                    while chars.get(i).is_some_and(char::is_ascii_digit) {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let token = if is_float {
                    text.parse().map(Token::Float).map_err(|e| invalid(format!("{e}")))?
                } else {
                    text.parse().map(Token::Int).map_err(|e| invalid(format!("{e}")))?
                };
                tokens.push(token);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while chars.get(i).is_some_and(|ch| ch.is_alphanumeric() || *ch == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    vars: &'a Map<String, Value>,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> InventoryError {
        InventoryError::InvalidExpression {
            expression: self.expression.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word == keyword)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), InventoryError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            _ => Err(self.error(&format!("expected {expected:?}"))),
        }
    }

    fn or_expr(&mut self) -> Result<Value, InventoryError> {
        let mut value = self.and_expr()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let rhs = self.and_expr()?;
            value = Value::Bool(is_truthy(&value) || is_truthy(&rhs));
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<Value, InventoryError> {
        let mut value = self.not_expr()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let rhs = self.not_expr()?;
            value = Value::Bool(is_truthy(&value) && is_truthy(&rhs));
        }
        Ok(value)
    }

    fn not_expr(&mut self) -> Result<Value, InventoryError> {
        if self.peek_keyword("not") {
            self.pos += 1;
            let value = self.not_expr()?;
            return Ok(Value::Bool(!is_truthy(&value)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Value, InventoryError> {
        let lhs = self.primary()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                let rhs = self.primary()?;
                Ok(Value::Bool(values_equal(&lhs, &rhs)))
            }
            Some(Token::Ne) => {
                self.pos += 1;
                let rhs = self.primary()?;
                Ok(Value::Bool(!values_equal(&lhs, &rhs)))
            }
            Some(Token::Ident(word)) if word == "in" => {
                self.pos += 1;
                let rhs = self.primary()?;
                Ok(Value::Bool(contains(&rhs, &lhs)))
            }
            Some(Token::Ident(word))
                if word == "not"
                    && matches!(self.tokens.get(self.pos + 1), Some(Token::Ident(w)) if w == "in") =>
            {
                self.pos += 2;
                let rhs = self.primary()?;
                Ok(Value::Bool(!contains(&rhs, &lhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn primary(&mut self) -> Result<Value, InventoryError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Int(n)) => Ok(Value::from(n)),
            Some(Token::Float(f)) => Ok(Value::from(f)),
            Some(Token::LParen) => {
                let value = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "true" | "True" => Ok(Value::Bool(true)),
                "false" | "False" => Ok(Value::Bool(false)),
                "none" | "None" => Ok(Value::Null),
                _ => self.path(word),
            },
            _ => Err(self.error("expected a value")),
        }
    }

    fn path(&mut self, root: String) -> Result<Value, InventoryError> {
        let vars = self.vars;
        let mut current = vars
            .get(&root)
            .ok_or_else(|| InventoryError::UndefinedVariable(root.clone()))?;
        let mut name = root;

        loop {
            let segment = match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(key)) => Segment::Key(key),
                        Some(Token::Int(index)) => Segment::Index(index),
                        _ => return Err(self.error("expected attribute after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let segment = match self.next() {
                        Some(Token::Str(key)) => Segment::Key(key),
                        Some(Token::Int(index)) => Segment::Index(index),
                        _ => return Err(self.error("expected string or integer subscript")),
                    };
                    self.expect(&Token::RBracket)?;
                    segment
                }
                _ => return Ok(current.clone()),
            };

            let next = match (&segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => {
                    usize::try_from(*index).ok().and_then(|i| items.get(i))
                }
                (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
                _ => None,
            };
            name = match &segment {
                Segment::Key(key) => format!("{name}.{key}"),
                Segment::Index(index) => format!("{name}[{index}]"),
            };
            current = next.ok_or_else(|| InventoryError::UndefinedVariable(name.clone()))?;
        }
    }
}

enum Segment {
    Key(String),
    Index(i64),
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(&value_to_string(needle)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::Object(map) => map.contains_key(&value_to_string(needle)),
        _ => false,
    }
}
