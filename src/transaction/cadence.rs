//! Cadence arguments and results
//!
//! Arguments travel as JSON-Cadence (`{"type": ..., "value": ...}`) and are
//! part of the signed payload, so encoding must be deterministic. Scripts are
//! scanned for their declared parameters so argument mistakes surface as
//! validation errors before anything is signed.

use crate::types::Address;
use crate::{Error, Result};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Largest UFix64 value: `u64::MAX` scaled by 10^8
const UFIX64_SCALE: u128 = 100_000_000;

/// A typed Cadence argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CadenceValue {
    String(String),
    Bool(bool),
    Address(Address),
    Int(i128),
    Int64(i64),
    UInt(u128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    /// Fixed-point with 8 decimals, stored in normalized text form
    UFix64(String),
    Optional(Option<Box<CadenceValue>>),
    Array(Vec<CadenceValue>),
}

/// Primitive type names whose values this module can construct
const KNOWN_TYPES: &[&str] = &[
    "String", "Bool", "Address", "Int", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64",
    "UFix64",
];

impl CadenceValue {
    pub fn string(value: impl Into<String>) -> Self {
        CadenceValue::String(value.into())
    }

    /// Parse a decimal like `12.5` into a normalized UFix64 (`12.50000000`)
    pub fn ufix64(value: &str) -> Result<Self> {
        let (whole, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), ""));
        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
            || fraction.len() > 8
        {
            return Err(Error::Encoding(format!("Invalid UFix64 value: {}", value)));
        }
        let whole_units: u128 = whole
            .parse()
            .map_err(|_| Error::Encoding(format!("UFix64 out of range: {}", value)))?;
        let padded = format!("{:0<8}", fraction);
        let fraction_units: u128 = padded.parse().unwrap_or(0);
        let scaled = whole_units
            .checked_mul(UFIX64_SCALE)
            .and_then(|w| w.checked_add(fraction_units))
            .filter(|total| *total <= u128::from(u64::MAX))
            .ok_or_else(|| Error::Encoding(format!("UFix64 out of range: {}", value)))?;
        Ok(CadenceValue::UFix64(format!(
            "{}.{:08}",
            scaled / UFIX64_SCALE,
            scaled % UFIX64_SCALE
        )))
    }

    pub fn type_id(&self) -> &'static str {
        match self {
            CadenceValue::String(_) => "String",
            CadenceValue::Bool(_) => "Bool",
            CadenceValue::Address(_) => "Address",
            CadenceValue::Int(_) => "Int",
            CadenceValue::Int64(_) => "Int64",
            CadenceValue::UInt(_) => "UInt",
            CadenceValue::UInt8(_) => "UInt8",
            CadenceValue::UInt16(_) => "UInt16",
            CadenceValue::UInt32(_) => "UInt32",
            CadenceValue::UInt64(_) => "UInt64",
            CadenceValue::UFix64(_) => "UFix64",
            CadenceValue::Optional(_) => "Optional",
            CadenceValue::Array(_) => "Array",
        }
    }

    /// JSON-Cadence representation
    pub fn to_json(&self) -> Value {
        let value = match self {
            CadenceValue::String(s) => Value::String(s.clone()),
            CadenceValue::Bool(b) => Value::Bool(*b),
            CadenceValue::Address(a) => Value::String(a.to_string()),
            CadenceValue::Int(v) => Value::String(v.to_string()),
            CadenceValue::Int64(v) => Value::String(v.to_string()),
            CadenceValue::UInt(v) => Value::String(v.to_string()),
            CadenceValue::UInt8(v) => Value::String(v.to_string()),
            CadenceValue::UInt16(v) => Value::String(v.to_string()),
            CadenceValue::UInt32(v) => Value::String(v.to_string()),
            CadenceValue::UInt64(v) => Value::String(v.to_string()),
            CadenceValue::UFix64(v) => Value::String(v.clone()),
            CadenceValue::Optional(None) => Value::Null,
            CadenceValue::Optional(Some(inner)) => inner.to_json(),
            CadenceValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        };
        json!({ "type": self.type_id(), "value": value })
    }

    /// Argument bytes as they appear in the transaction payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_json())?)
    }
}

/// Encode an ordered argument list
pub fn encode_arguments(arguments: &[CadenceValue]) -> Result<Vec<Vec<u8>>> {
    arguments.iter().map(CadenceValue::encode).collect()
}

/// A parameter type as declared in a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CadenceType {
    Named(String),
    Optional(Box<CadenceType>),
    Array(Box<CadenceType>),
    Dictionary(Box<CadenceType>, Box<CadenceType>),
    /// References, restricted and intersection types
    Other(String),
}

impl CadenceType {
    pub fn parse(declared: &str) -> Self {
        let s = declared.trim();
        if let Some(inner) = s.strip_suffix('?') {
            return CadenceType::Optional(Box::new(Self::parse(inner)));
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            // Constant-size arrays: [T; N]
            let element = split_top_level(inner, ';')
                .into_iter()
                .next()
                .unwrap_or_default();
            return CadenceType::Array(Box::new(Self::parse(&element)));
        }
        if let Some(inner) = s.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            if let Some((key, value)) = inner.split_once(':') {
                return CadenceType::Dictionary(
                    Box::new(Self::parse(key)),
                    Box::new(Self::parse(value)),
                );
            }
        }
        if s.starts_with('&') || s.contains('{') {
            return CadenceType::Other(s.to_string());
        }
        CadenceType::Named(s.to_string())
    }

    /// Whether `value` can be passed for a parameter of this type.
    ///
    /// Composite and unsupported types cannot be checked and are accepted.
    pub fn accepts(&self, value: &CadenceValue) -> bool {
        match (self, value) {
            (CadenceType::Optional(_), CadenceValue::Optional(None)) => true,
            (CadenceType::Optional(inner), CadenceValue::Optional(Some(v))) => inner.accepts(v),
            (CadenceType::Array(inner), CadenceValue::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (CadenceType::Named(name), value) if KNOWN_TYPES.contains(&name.as_str()) => {
                name == value.type_id()
            }
            (CadenceType::Named(_), _) | (CadenceType::Other(_), _) => true,
            _ => false,
        }
    }
}

/// One declared script or transaction parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub declared_type: CadenceType,
}

/// Parameters of `transaction(...)` or `fun main(...)`.
///
/// Returns `None` when neither header is found.
pub fn declared_parameters(script: &str) -> Option<Vec<Parameter>> {
    let code = strip_comments(script);
    let list = find_keyword_parameters(&code, "transaction", true)
        .or_else(|| find_keyword_parameters(&code, "fun main", false))?;
    Some(
        split_top_level(&list, ',')
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| match p.split_once(':') {
                Some((name, ty)) => Parameter {
                    name: name.trim().to_string(),
                    declared_type: CadenceType::parse(ty),
                },
                None => Parameter {
                    name: p.trim().to_string(),
                    declared_type: CadenceType::Other(String::new()),
                },
            })
            .collect(),
    )
}

/// Number of accounts a transaction's `prepare` block takes, if it has one
pub fn prepare_parameter_count(script: &str) -> Option<usize> {
    let code = strip_comments(script);
    let list = find_keyword_parameters(&code, "prepare", false)?;
    Some(
        split_top_level(&list, ',')
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .count(),
    )
}

/// Check argument count and types against the declared parameters
pub fn check_arguments(script: &str, arguments: &[CadenceValue]) -> Result<()> {
    let Some(parameters) = declared_parameters(script) else {
        if arguments.is_empty() {
            return Ok(());
        }
        return Err(Error::Validation(format!(
            "Script declares no parameters but {} argument(s) were given",
            arguments.len()
        )));
    };

    if parameters.len() != arguments.len() {
        return Err(Error::Validation(format!(
            "Script declares {} parameter(s) but {} argument(s) were given",
            parameters.len(),
            arguments.len()
        )));
    }

    for (parameter, argument) in parameters.iter().zip(arguments) {
        if !parameter.declared_type.accepts(argument) {
            return Err(Error::Validation(format!(
                "Argument '{}' expects {:?} but got {}",
                parameter.name,
                parameter.declared_type,
                argument.type_id()
            )));
        }
    }
    Ok(())
}

/// Replace contract aliases such as `0xProfile` in import statements.
///
/// Aliases are keyed with their `0x` prefix. An import that names neither a
/// hex address nor a known alias is a validation error.
pub fn resolve_imports(script: &str, aliases: &HashMap<String, Address>) -> Result<String> {
    let mut resolved = String::with_capacity(script.len());
    for line in script.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let Some((head, tail)) = trimmed
            .strip_prefix("import ")
            .and_then(|rest| rest.split_once(" from "))
        else {
            resolved.push_str(line);
            continue;
        };

        let target = tail.trim();
        let is_address = target
            .strip_prefix("0x")
            .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()))
            .unwrap_or(false);
        if is_address || !target.starts_with("0x") {
            resolved.push_str(line);
            continue;
        }

        let address = aliases
            .get(target)
            .ok_or_else(|| Error::Validation(format!("Unresolved contract alias {}", target)))?;
        let indent = &line[..line.len() - trimmed.len()];
        let newline = if line.ends_with('\n') { "\n" } else { "" };
        resolved.push_str(&format!(
            "{}import {} from {}{}",
            indent,
            head.trim(),
            address,
            newline
        ));
    }
    Ok(resolved)
}

/// Decode a JSON-Cadence value into plain JSON.
///
/// Small integers become numbers, wide integers and fixed-point values stay
/// strings, composites become objects keyed by field name.
pub fn decode(value: &Value) -> Result<Value> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Encoding(format!("Not a JSON-Cadence value: {}", value)))?;
    let type_id = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Encoding("JSON-Cadence value without type".to_string()))?;
    let inner = object.get("value").unwrap_or(&Value::Null);

    let decoded = match type_id {
        "Void" => Value::Null,
        "Optional" => {
            if inner.is_null() {
                Value::Null
            } else {
                decode(inner)?
            }
        }
        "Bool" | "String" | "Character" | "Address" => inner.clone(),
        "Int8" | "Int16" | "Int32" | "Int64" | "UInt8" | "UInt16" | "UInt32" | "UInt64"
        | "Word8" | "Word16" | "Word32" | "Word64" => {
            let text = inner.as_str().unwrap_or_default();
            if let Ok(n) = text.parse::<i64>() {
                json!(n)
            } else if let Ok(n) = text.parse::<u64>() {
                json!(n)
            } else {
                inner.clone()
            }
        }
        "Array" => Value::Array(
            inner
                .as_array()
                .map(|items| items.iter().map(decode).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default(),
        ),
        "Dictionary" => {
            let mut map = Map::new();
            for entry in inner.as_array().into_iter().flatten() {
                let key = decode(entry.get("key").unwrap_or(&Value::Null))?;
                let key = match key {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, decode(entry.get("value").unwrap_or(&Value::Null))?);
            }
            Value::Object(map)
        }
        "Struct" | "Resource" | "Event" | "Contract" | "Enum" => {
            let mut map = Map::new();
            for field in inner
                .get("fields")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let name = field
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                map.insert(name, decode(field.get("value").unwrap_or(&Value::Null))?);
            }
            Value::Object(map)
        }
        "Path" => json!(format!(
            "/{}/{}",
            inner.get("domain").and_then(Value::as_str).unwrap_or_default(),
            inner
                .get("identifier")
                .and_then(Value::as_str)
                .unwrap_or_default()
        )),
        // Int, UInt, 128/256-bit integers, Fix64, UFix64, Type, Capability
        _ => inner.clone(),
    };
    Ok(decoded)
}

fn strip_comments(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut chars = script.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Text between the parentheses following `keyword`.
///
/// With `optional_list`, a keyword directly followed by `{` yields an empty
/// list (`transaction { ... }`).
fn find_keyword_parameters(code: &str, keyword: &str, optional_list: bool) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = code[search_from..].find(keyword) {
        let start = search_from + offset;
        let end = start + keyword.len();
        search_from = end;

        let boundary_before = code[..start]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric() && c != '_')
            .unwrap_or(true);
        if !boundary_before {
            continue;
        }

        let rest = code[end..].trim_start();
        if rest.starts_with('(') {
            let mut depth = 0usize;
            for (i, c) in rest.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(rest[1..i].to_string());
                        }
                    }
                    _ => {}
                }
            }
            return None;
        }
        if optional_list && rest.starts_with('{') {
            return Some(String::new());
        }
    }
    None
}

fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in input.chars() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}
