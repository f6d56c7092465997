// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON side of the codec: an order-preserving input tree and the
//! JSON → binary walker.
//!
//! Object keys are kept in document order and duplicates are kept too, so
//! the struct encoder can enforce key order (strict mode) and reject
//! repeated keys in either mode.

use core::fmt;
use std::collections::{HashMap, HashSet};

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{AbiError, Result, ResultExt};
use crate::scalar;
use crate::types::{ResolvedAbi, StructType, TypeIndex, TypeNode, VariantType};
use crate::wire::Writer;

/// Deepest nesting of structs, arrays, optionals and variants the walkers
/// accept before failing with [`AbiError::RecursionLimit`].
pub const MAX_DEPTH: usize = 32;

/// How struct objects are matched against resolved field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Object keys must appear in field order.
    #[default]
    Strict,
    /// Object keys may appear in any order.
    Reorderable,
}

/// Key serde_json uses to hand a number's literal text to a visitor when
/// `arbitrary_precision` is on.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// JSON number as the parser produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNumber {
    /// Non-negative integer.
    Unsigned(u64),
    /// Negative integer.
    Signed(i64),
    /// Integer literal outside the 64-bit range, digits as written.
    Integer(String),
    /// Anything with a fraction or an exponent.
    Float(f64),
}

impl JsonNumber {
    /// Classify a number literal from its exact text.
    pub fn from_literal(text: &str) -> Result<Self> {
        if let Ok(n) = text.parse::<u64>() {
            return Ok(Self::Unsigned(n));
        }
        if let Ok(n) = text.parse::<i64>() {
            return Ok(match u64::try_from(n) {
                Ok(u) => Self::Unsigned(u),
                Err(_) => Self::Signed(n),
            });
        }
        let digits = text.strip_prefix('-').unwrap_or(text);
        if !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit()) {
            return Ok(Self::Integer(text.to_string()));
        }
        text.parse::<f64>()
            .map(Self::Float)
            .map_err(|_| AbiError::Json(format!("{text:?} is not a number")))
    }
}

/// Parsed JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any number.
    Number(JsonNumber),
    /// String.
    String(String),
    /// Array.
    Array(Vec<JsonValue>),
    /// Object entries in document order, duplicates included.
    Object(Vec<(String, JsonValue)>),
}

impl JsonValue {
    /// Parse JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| AbiError::Json(e.to_string()))
    }

    /// Short description of the value's JSON type, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Borrow as a string or fail naming what was expected.
    pub fn expect_str(&self, expected: &str) -> Result<&str> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(AbiError::invalid(format!(
                "expected {expected}, found {}",
                other.kind()
            ))),
        }
    }

    /// Value of an object key, first occurrence.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(JsonNumber::Unsigned(n)) => write!(f, "{n}"),
            Self::Number(JsonNumber::Signed(n)) => write!(f, "{n}"),
            Self::Number(JsonNumber::Integer(n)) => f.write_str(n),
            Self::Number(JsonNumber::Float(n)) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(items) => write!(f, "[{} items]", items.len()),
            Self::Object(entries) => write!(f, "{{{} keys}}", entries.len()),
        }
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<JsonValue, E> {
        Ok(match u64::try_from(v) {
            Ok(u) => JsonValue::Number(JsonNumber::Unsigned(u)),
            Err(_) => JsonValue::Number(JsonNumber::Signed(v)),
        })
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(JsonNumber::Unsigned(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(JsonNumber::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<JsonValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            if entries.is_empty() && key == NUMBER_TOKEN {
                let text: String = map.next_value()?;
                return JsonNumber::from_literal(&text)
                    .map(JsonValue::Number)
                    .map_err(de::Error::custom);
            }
            let value = map.next_value()?;
            entries.push((key, value));
        }
        Ok(JsonValue::Object(entries))
    }
}

impl ResolvedAbi {
    /// Encode JSON text as the binary form of `ty`.
    pub fn json_to_bin(&self, ty: TypeIndex, json: &str, mode: ConversionMode) -> Result<Vec<u8>> {
        let value = JsonValue::parse(json)?;
        self.json_value_to_bin(ty, &value, mode)
    }

    /// Encode an already parsed JSON tree as the binary form of `ty`.
    pub fn json_value_to_bin(
        &self,
        ty: TypeIndex,
        value: &JsonValue,
        mode: ConversionMode,
    ) -> Result<Vec<u8>> {
        trace!(ty = %self.describe(ty), ?mode, "json_to_bin");
        let mut writer = Writer::default();
        JsonEncoder { abi: self, mode }
            .encode(ty, value, &mut writer, 0)
            .context_with(|| format!("type \"{}\"", self.describe(ty)))?;
        Ok(writer.into_vec())
    }

    /// Encode JSON text for a type looked up by name.
    pub fn json_to_bin_by_name(
        &self,
        type_name: &str,
        json: &str,
        mode: ConversionMode,
    ) -> Result<Vec<u8>> {
        self.json_to_bin(self.get_type(type_name)?, json, mode)
    }
}

struct JsonEncoder<'a> {
    abi: &'a ResolvedAbi,
    mode: ConversionMode,
}

impl JsonEncoder<'_> {
    fn encode(&self, ty: TypeIndex, value: &JsonValue, w: &mut Writer, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(AbiError::RecursionLimit);
        }
        match self.abi.node(ty) {
            TypeNode::Builtin(b) => scalar::json_to_bin(*b, value, w),
            TypeNode::Struct(s) => self.encode_struct(s, value, w, depth),
            TypeNode::Variant(v) => self.encode_variant(v, value, w, depth),
            TypeNode::Array(inner) => {
                let JsonValue::Array(items) = value else {
                    return Err(AbiError::invalid(format!(
                        "expected array, found {}",
                        value.kind()
                    )));
                };
                let len = u32::try_from(items.len())
                    .map_err(|_| AbiError::NumericOverflow(format!("array length {}", items.len())))?;
                w.write_varuint32(len);
                for (i, item) in items.iter().enumerate() {
                    self.encode(*inner, item, w, depth + 1)
                        .context_with(|| format!("[{i}]"))?;
                }
                Ok(())
            }
            TypeNode::Optional(inner) => {
                if matches!(value, JsonValue::Null) {
                    w.write_u8(0);
                    Ok(())
                } else {
                    w.write_u8(1);
                    self.encode(*inner, value, w, depth + 1)
                }
            }
            TypeNode::Extension(inner) => self.encode(*inner, value, w, depth + 1),
        }
    }

    fn encode_struct(
        &self,
        s: &StructType,
        value: &JsonValue,
        w: &mut Writer,
        depth: usize,
    ) -> Result<()> {
        let JsonValue::Object(entries) = value else {
            return Err(AbiError::invalid(format!(
                "expected object for struct \"{}\", found {}",
                s.name,
                value.kind()
            )));
        };
        let mut seen = HashSet::with_capacity(entries.len());
        for (key, _) in entries {
            if !seen.insert(key.as_str()) {
                return Err(AbiError::DuplicateKey(key.clone()));
            }
        }
        let encoded = match self.mode {
            ConversionMode::Strict => self.encode_fields_strict(s, entries, w, depth),
            ConversionMode::Reorderable => self.encode_fields_reordered(s, entries, w, depth),
        };
        encoded.context_with(|| format!("struct \"{}\"", s.name))
    }

    fn encode_fields_strict(
        &self,
        s: &StructType,
        entries: &[(String, JsonValue)],
        w: &mut Writer,
        depth: usize,
    ) -> Result<()> {
        let mut cursor = 0;
        let mut omitted_extension: Option<&str> = None;
        for field in &s.fields {
            let node = self.abi.node(field.ty);
            match entries.get(cursor) {
                Some((key, value)) if *key == field.name => {
                    if let Some(omitted) = omitted_extension {
                        return Err(extension_gap(&field.name, omitted));
                    }
                    self.encode(field.ty, value, w, depth + 1)
                        .context_with(|| format!("field \"{}\"", field.name))?;
                    cursor += 1;
                }
                current => {
                    let later = entries[cursor..].iter().any(|(k, _)| *k == field.name);
                    match current {
                        Some((key, _)) if later => {
                            return Err(AbiError::FieldOrder {
                                expected: field.name.clone(),
                                found: key.clone(),
                            })
                        }
                        _ if node.is_extension() => {
                            omitted_extension.get_or_insert(field.name.as_str());
                        }
                        _ if node.is_optional() => w.write_u8(0),
                        Some((key, _)) if s.fields.iter().any(|f| f.name == *key) => {
                            return Err(AbiError::FieldOrder {
                                expected: field.name.clone(),
                                found: key.clone(),
                            })
                        }
                        Some((key, _)) => return Err(AbiError::UnknownField(key.clone())),
                        None => return Err(AbiError::MissingField(field.name.clone())),
                    }
                }
            }
        }
        match entries.get(cursor) {
            Some((key, _)) => Err(AbiError::UnknownField(key.clone())),
            None => Ok(()),
        }
    }

    fn encode_fields_reordered(
        &self,
        s: &StructType,
        entries: &[(String, JsonValue)],
        w: &mut Writer,
        depth: usize,
    ) -> Result<()> {
        let by_key: HashMap<&str, &JsonValue> =
            entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let mut used = 0;
        let mut omitted_extension: Option<&str> = None;
        for field in &s.fields {
            let node = self.abi.node(field.ty);
            match by_key.get(field.name.as_str()) {
                Some(value) => {
                    if let Some(omitted) = omitted_extension {
                        return Err(extension_gap(&field.name, omitted));
                    }
                    self.encode(field.ty, value, w, depth + 1)
                        .context_with(|| format!("field \"{}\"", field.name))?;
                    used += 1;
                }
                None if node.is_extension() => {
                    omitted_extension.get_or_insert(field.name.as_str());
                }
                None if node.is_optional() => w.write_u8(0),
                None => return Err(AbiError::MissingField(field.name.clone())),
            }
        }
        if used < entries.len() {
            if let Some((key, _)) = entries
                .iter()
                .find(|(k, _)| !s.fields.iter().any(|f| f.name == *k))
            {
                return Err(AbiError::UnknownField(key.clone()));
            }
        }
        Ok(())
    }

    fn encode_variant(
        &self,
        v: &VariantType,
        value: &JsonValue,
        w: &mut Writer,
        depth: usize,
    ) -> Result<()> {
        let [selector, inner] = match value {
            JsonValue::Array(items) if items.len() == 2 => [&items[0], &items[1]],
            other => {
                return Err(AbiError::invalid(format!(
                    "variant \"{}\" expects [alternative, value], found {}",
                    v.name,
                    other.kind()
                )))
            }
        };
        let tag = match selector {
            JsonValue::String(name) => v.tag_of(name),
            JsonValue::Number(JsonNumber::Unsigned(n)) => usize::try_from(*n)
                .ok()
                .filter(|t| *t < v.alternatives.len()),
            _ => None,
        }
        .ok_or_else(|| {
            AbiError::UnknownVariantAlternative(format!("{selector} of variant \"{}\"", v.name))
        })?;
        let alt = &v.alternatives[tag];
        let wire_tag = u32::try_from(tag)
            .map_err(|_| AbiError::NumericOverflow(format!("variant tag {tag}")))?;
        w.write_varuint32(wire_tag);
        self.encode(alt.ty, inner, w, depth + 1)
            .context_with(|| format!("variant \"{}\" alternative \"{}\"", v.name, alt.name))
    }
}

fn extension_gap(field: &str, omitted: &str) -> AbiError {
    AbiError::invalid(format!(
        "field \"{field}\" is present after omitted binary extension \"{omitted}\""
    ))
}
