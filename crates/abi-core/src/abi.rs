// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema model: the unresolved description of an ABI document.
//!
//! Field order of every struct here is its wire order. The last two members
//! of [`AbiDef`] are binary extensions: older documents end before them.

use crate::error::Result;
use crate::name::Name;
use crate::wire::{Decode, Encode, Reader, Writer};

/// Alias declaration `new_type_name = type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDef {
    /// Alias being introduced.
    pub new_type_name: String,
    /// Type it stands for.
    pub type_name: String,
}

/// One named, typed struct member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDef {
    /// Member name (JSON key).
    pub name: String,
    /// Member type name.
    pub type_name: String,
}

/// Struct declaration with an optional base whose fields come first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructDef {
    /// Struct name.
    pub name: String,
    /// Base struct, empty string on the wire when absent.
    pub base: Option<String>,
    /// Own fields in declaration order.
    pub fields: Vec<FieldDef>,
}

/// Action message: name to type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionDef {
    /// Action name.
    pub name: Name,
    /// Payload type name.
    pub type_name: String,
    /// Free-form contract text, carried but not interpreted.
    pub ricardian_contract: String,
}

/// Table message: name to row type plus index metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDef {
    /// Table name.
    pub name: Name,
    /// Primary index type, carried but not interpreted.
    pub index_type: String,
    /// Key column names.
    pub key_names: Vec<String>,
    /// Key column types.
    pub key_types: Vec<String>,
    /// Row type name.
    pub type_name: String,
}

/// Ricardian clause, carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClausePair {
    /// Clause id.
    pub id: String,
    /// Clause text.
    pub body: String,
}

/// Contract error message, carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Numeric error code.
    pub error_code: u64,
    /// Message text.
    pub error_msg: String,
}

/// Opaque tagged extension blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiExtension {
    /// Extension tag.
    pub tag: u16,
    /// Raw payload.
    pub value: Vec<u8>,
}

/// Variant declaration; the tag of an alternative is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantDef {
    /// Variant name.
    pub name: String,
    /// Alternative type names in tag order.
    pub types: Vec<String>,
}

/// Action result message: action name to return type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResultDef {
    /// Action name.
    pub name: Name,
    /// Return type name.
    pub result_type: String,
}

/// A complete schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiDef {
    /// Format version, e.g. `eosio::abi/1.1`.
    pub version: String,
    /// Aliases in declaration order.
    pub types: Vec<TypeDef>,
    /// Struct declarations.
    pub structs: Vec<StructDef>,
    /// Action messages.
    pub actions: Vec<ActionDef>,
    /// Table messages.
    pub tables: Vec<TableDef>,
    /// Ricardian clauses.
    pub ricardian_clauses: Vec<ClausePair>,
    /// Error messages.
    pub error_messages: Vec<ErrorMessage>,
    /// Opaque extensions.
    pub abi_extensions: Vec<AbiExtension>,
    /// Variant declarations (binary extension).
    pub variants: Vec<VariantDef>,
    /// Action result messages (binary extension).
    pub action_results: Vec<ActionResultDef>,
}

impl AbiDef {
    /// Empty document of the given version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

impl Encode for TypeDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.new_type_name)?;
        writer.write_string(&self.type_name)
    }
}

impl Decode for TypeDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            new_type_name: reader.read_string()?,
            type_name: reader.read_string()?,
        })
    }
}

impl Encode for FieldDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name)?;
        writer.write_string(&self.type_name)
    }
}

impl Decode for FieldDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: reader.read_string()?,
            type_name: reader.read_string()?,
        })
    }
}

impl Encode for StructDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name)?;
        writer.write_string(self.base.as_deref().unwrap_or(""))?;
        self.fields.encode(writer)
    }
}

impl Decode for StructDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let name = reader.read_string()?;
        let base = reader.read_string()?;
        Ok(Self {
            name,
            base: (!base.is_empty()).then_some(base),
            fields: Vec::decode(reader)?,
        })
    }
}

impl Encode for ActionDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.name.encode(writer)?;
        writer.write_string(&self.type_name)?;
        writer.write_string(&self.ricardian_contract)
    }
}

impl Decode for ActionDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: Decode::decode(reader)?,
            type_name: reader.read_string()?,
            ricardian_contract: reader.read_string()?,
        })
    }
}

impl Encode for TableDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.name.encode(writer)?;
        writer.write_string(&self.index_type)?;
        self.key_names.encode(writer)?;
        self.key_types.encode(writer)?;
        writer.write_string(&self.type_name)
    }
}

impl Decode for TableDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: Decode::decode(reader)?,
            index_type: reader.read_string()?,
            key_names: Vec::decode(reader)?,
            key_types: Vec::decode(reader)?,
            type_name: reader.read_string()?,
        })
    }
}

impl Encode for ClausePair {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.id)?;
        writer.write_string(&self.body)
    }
}

impl Decode for ClausePair {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            id: reader.read_string()?,
            body: reader.read_string()?,
        })
    }
}

impl Encode for ErrorMessage {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u64_le(self.error_code);
        writer.write_string(&self.error_msg)
    }
}

impl Decode for ErrorMessage {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            error_code: reader.read_u64_le()?,
            error_msg: reader.read_string()?,
        })
    }
}

impl Encode for AbiExtension {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u16_le(self.tag);
        writer.write_len_prefixed_bytes(&self.value)
    }
}

impl Decode for AbiExtension {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            tag: reader.read_u16_le()?,
            value: reader.read_len_prefixed_bytes()?.to_vec(),
        })
    }
}

impl Encode for VariantDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name)?;
        self.types.encode(writer)
    }
}

impl Decode for VariantDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: reader.read_string()?,
            types: Vec::decode(reader)?,
        })
    }
}

impl Encode for ActionResultDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.name.encode(writer)?;
        writer.write_string(&self.result_type)
    }
}

impl Decode for ActionResultDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: Decode::decode(reader)?,
            result_type: reader.read_string()?,
        })
    }
}

impl Encode for AbiDef {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.version)?;
        self.types.encode(writer)?;
        self.structs.encode(writer)?;
        self.actions.encode(writer)?;
        self.tables.encode(writer)?;
        self.ricardian_clauses.encode(writer)?;
        self.error_messages.encode(writer)?;
        self.abi_extensions.encode(writer)?;
        // Extensions are positional: a later one forces the earlier ones out.
        if !self.variants.is_empty() || !self.action_results.is_empty() {
            self.variants.encode(writer)?;
        }
        if !self.action_results.is_empty() {
            self.action_results.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for AbiDef {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let mut def = Self {
            version: reader.read_string()?,
            types: Vec::decode(reader)?,
            structs: Vec::decode(reader)?,
            actions: Vec::decode(reader)?,
            tables: Vec::decode(reader)?,
            ricardian_clauses: Vec::decode(reader)?,
            error_messages: Vec::decode(reader)?,
            abi_extensions: Vec::decode(reader)?,
            ..Self::default()
        };
        if !reader.is_empty() {
            def.variants = Vec::decode(reader)?;
        }
        if !reader.is_empty() {
            def.action_results = Vec::decode(reader)?;
        }
        Ok(def)
    }
}
