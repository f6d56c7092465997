// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Binary → JSON walker.
//!
//! Array counts come from the input, so the walker keeps an element budget:
//! every element that occupies bytes uses at least one byte of its own,
//! which leaves [`MAX_EMPTY_ELEMENTS`] of slack for elements whose type can
//! take no bytes at all (empty structs, all-extension structs).

use std::cell::Cell;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{AbiError, Result, ResultExt};
use crate::json::MAX_DEPTH;
use crate::scalar;
use crate::types::{ResolvedAbi, StructType, TypeIndex, TypeNode, VariantType};
use crate::wire::Reader;

/// Array elements a single decode may produce beyond one per input byte.
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

impl ResolvedAbi {
    /// Decode the binary form of `ty` into compact JSON text.
    pub fn bin_to_json(&self, ty: TypeIndex, bytes: &[u8]) -> Result<String> {
        let value = self.bin_to_json_value(ty, bytes)?;
        serde_json::to_string(&value).map_err(|e| AbiError::Json(e.to_string()))
    }

    /// Decode the binary form of `ty` into a JSON tree.
    ///
    /// The whole input must be consumed; leftovers fail with
    /// [`AbiError::TrailingBytes`].
    pub fn bin_to_json_value(&self, ty: TypeIndex, bytes: &[u8]) -> Result<Value> {
        trace!(ty = %self.describe(ty), len = bytes.len(), "bin_to_json");
        let mut reader = Reader::new(bytes);
        let decoder = BinDecoder {
            abi: self,
            elements_left: Cell::new(bytes.len().saturating_add(MAX_EMPTY_ELEMENTS)),
        };
        let value = match self.node(ty) {
            // A bare extension is absent when there is nothing to read.
            TypeNode::Extension(_) if reader.is_empty() => Ok(Value::Null),
            _ => decoder.decode(ty, &mut reader, 0),
        }
        .context_with(|| format!("type \"{}\"", self.describe(ty)))?;
        reader.finish()?;
        Ok(value)
    }

    /// Decode bytes for a type looked up by name.
    pub fn bin_to_json_by_name(&self, type_name: &str, bytes: &[u8]) -> Result<String> {
        self.bin_to_json(self.get_type(type_name)?, bytes)
    }
}

struct BinDecoder<'a> {
    abi: &'a ResolvedAbi,
    elements_left: Cell<usize>,
}

impl BinDecoder<'_> {
    fn decode(&self, ty: TypeIndex, r: &mut Reader<'_>, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(AbiError::RecursionLimit);
        }
        match self.abi.node(ty) {
            TypeNode::Builtin(b) => scalar::bin_to_json(*b, r),
            TypeNode::Struct(s) => self.decode_struct(s, r, depth),
            TypeNode::Variant(v) => self.decode_variant(v, r, depth),
            TypeNode::Array(inner) => {
                let len = r.read_varuint32()?;
                self.take_elements(len)?;
                let mut items = Vec::new();
                for i in 0..len {
                    let item = self
                        .decode(*inner, r, depth + 1)
                        .context_with(|| format!("[{i}]"))?;
                    items.push(item);
                }
                Ok(Value::Array(items))
            }
            TypeNode::Optional(inner) => match r.read_u8()? {
                0 => Ok(Value::Null),
                1 => self.decode(*inner, r, depth + 1),
                other => Err(AbiError::invalid(format!("optional presence byte {other}"))),
            },
            TypeNode::Extension(inner) => self.decode(*inner, r, depth + 1),
        }
    }

    fn take_elements(&self, len: u32) -> Result<()> {
        let left = self.elements_left.get();
        match usize::try_from(len).ok().filter(|n| *n <= left) {
            Some(n) => {
                self.elements_left.set(left - n);
                Ok(())
            }
            None => Err(AbiError::invalid(format!(
                "array of {len} elements exceeds the {left} this input can hold"
            ))),
        }
    }

    fn decode_struct(&self, s: &StructType, r: &mut Reader<'_>, depth: usize) -> Result<Value> {
        let mut out = Map::new();
        for field in &s.fields {
            if r.is_empty() && self.abi.node(field.ty).is_extension() {
                break;
            }
            let value = self
                .decode(field.ty, r, depth + 1)
                .context_with(|| format!("struct \"{}\" field \"{}\"", s.name, field.name))?;
            out.insert(field.name.clone(), value);
        }
        Ok(Value::Object(out))
    }

    fn decode_variant(&self, v: &VariantType, r: &mut Reader<'_>, depth: usize) -> Result<Value> {
        let tag = r.read_varuint32()?;
        let alt = usize::try_from(tag)
            .ok()
            .and_then(|t| v.alternatives.get(t))
            .ok_or_else(|| {
                AbiError::UnknownVariantAlternative(format!("tag {tag} of variant \"{}\"", v.name))
            })?;
        let value = self
            .decode(alt.ty, r, depth + 1)
            .context_with(|| format!("variant \"{}\" alternative \"{}\"", v.name, alt.name))?;
        Ok(Value::Array(vec![Value::String(alt.name.clone()), value]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::abi::{AbiDef, FieldDef, StructDef, VariantDef};
    use crate::resolve::resolve;

    fn field(name: &str, ty: &str) -> FieldDef {
        FieldDef {
            name: name.into(),
            type_name: ty.into(),
        }
    }

    fn schema() -> ResolvedAbi {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs.push(StructDef {
            name: "pair".into(),
            base: None,
            fields: vec![field("flag", "bool?"), field("tags", "string[]")],
        });
        def.variants.push(VariantDef {
            name: "either".into(),
            types: vec!["uint8".into(), "pair".into()],
        });
        resolve(&def).unwrap()
    }

    #[test]
    fn optional_and_array() {
        let abi = schema();
        let ty = abi.get_type("pair").unwrap();
        let bytes = [1, 1, 2, 1, b'x', 0];
        assert_eq!(
            abi.bin_to_json(ty, &bytes).unwrap(),
            r#"{"flag":true,"tags":["x",""]}"#
        );
        let err = abi.bin_to_json(ty, &[2, 0]).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidValue(_)), "{err}");
    }

    #[test]
    fn variant_emits_name_and_value() {
        let abi = schema();
        let ty = abi.get_type("either").unwrap();
        assert_eq!(abi.bin_to_json(ty, &[0, 7]).unwrap(), r#"["uint8",7]"#);
        let err = abi.bin_to_json(ty, &[2, 7]).unwrap_err();
        assert!(matches!(err.root(), AbiError::UnknownVariantAlternative(_)));
    }

    #[test]
    fn truncated_and_trailing_input() {
        let abi = schema();
        let ty = abi.get_type("pair").unwrap();
        let err = abi.bin_to_json(ty, &[0, 3, 1]).unwrap_err();
        assert_eq!(err.root(), &AbiError::UnexpectedEnd);
        assert_eq!(
            abi.bin_to_json(ty, &[0, 0, 9]).unwrap_err(),
            AbiError::TrailingBytes(1)
        );
    }

    #[test]
    fn zero_width_elements_are_budgeted() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs.push(StructDef {
            name: "e".into(),
            base: None,
            fields: vec![],
        });
        def.structs.push(StructDef {
            name: "h".into(),
            base: None,
            fields: vec![field("xs", "e[]")],
        });
        let abi = resolve(&def).unwrap();
        let ty = abi.get_type("h").unwrap();

        let err = abi.bin_to_json(ty, &[0xff, 0xff, 0xff, 0x7f]).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidValue(_)), "{err}");

        let mut bytes = Vec::new();
        let mut n = u32::try_from(MAX_EMPTY_ELEMENTS).unwrap();
        while n >= 0x80 {
            bytes.push(u8::try_from(n & 0x7f).unwrap() | 0x80);
            n >>= 7;
        }
        bytes.push(u8::try_from(n).unwrap());
        let value = abi.bin_to_json_value(ty, &bytes).unwrap();
        assert_eq!(value["xs"].as_array().unwrap().len(), MAX_EMPTY_ELEMENTS);
    }

    #[test]
    fn bare_extension_may_be_empty() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs.push(StructDef {
            name: "s".into(),
            base: None,
            fields: vec![field("x", "uint8$")],
        });
        let abi = resolve(&def).unwrap();
        let ty = abi.get_type("uint8$").unwrap();
        assert_eq!(abi.bin_to_json(ty, &[]).unwrap(), "null");
        assert_eq!(abi.bin_to_json(ty, &[5]).unwrap(), "5");
    }
}
