// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resolved type graph.
//!
//! Nodes live in an arena owned by [`ResolvedAbi`] and refer to each other
//! through [`TypeIndex`] handles. Aliases never get a node of their own: an
//! alias name maps straight to the node of its target. Struct nodes may
//! point back at themselves through field types (recursive data), so codecs
//! bound their walk depth instead of assuming a finite graph.
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use crate::error::{AbiError, Result};
use crate::name::Name;

/// Stable handle of a node in a [`ResolvedAbi`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub(crate) u32);

impl TypeIndex {
    /// Position in the arena.
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

macro_rules! builtins {
    ($($variant:ident => $name:literal,)*) => {
        /// Built-in scalar types, named by their wire type names.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl Builtin {
            /// Every built-in in declaration order.
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant,)*];

            /// Wire type name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name,)*
                }
            }

            /// Look a built-in up by its wire type name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Builtin::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

builtins! {
    Bool => "bool",
    Int8 => "int8",
    Uint8 => "uint8",
    Int16 => "int16",
    Uint16 => "uint16",
    Int32 => "int32",
    Uint32 => "uint32",
    Int64 => "int64",
    Uint64 => "uint64",
    Int128 => "int128",
    Uint128 => "uint128",
    VarInt32 => "varint32",
    VarUint32 => "varuint32",
    Float32 => "float32",
    Float64 => "float64",
    Float128 => "float128",
    TimePoint => "time_point",
    TimePointSec => "time_point_sec",
    BlockTimestamp => "block_timestamp_type",
    Name => "name",
    Bytes => "bytes",
    String => "string",
    Checksum160 => "checksum160",
    Checksum256 => "checksum256",
    Checksum512 => "checksum512",
    PublicKey => "public_key",
    PrivateKey => "private_key",
    Signature => "signature",
    Symbol => "symbol",
    SymbolCode => "symbol_code",
    Asset => "asset",
}

/// Struct member after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Member name (JSON key).
    pub name: String,
    /// Member type.
    pub ty: TypeIndex,
}

/// Resolved struct: base fields first, then own fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    /// Declared name.
    pub name: String,
    /// Resolved base, if any.
    pub base: Option<TypeIndex>,
    /// Complete field list in wire order.
    pub fields: Vec<Field>,
}

/// One alternative of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    /// Declared type name, used as the JSON selector.
    pub name: String,
    /// Resolved type.
    pub ty: TypeIndex,
}

/// Resolved variant; the tag of an alternative is its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantType {
    /// Declared name.
    pub name: String,
    /// Alternatives in tag order.
    pub alternatives: Vec<Alternative>,
}

impl VariantType {
    /// Tag of the alternative called `name`.
    #[must_use]
    pub fn tag_of(&self, name: &str) -> Option<usize> {
        self.alternatives.iter().position(|alt| alt.name == name)
    }
}

/// A node of the resolved graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// Built-in scalar.
    Builtin(Builtin),
    /// Struct with its flattened field list.
    Struct(StructType),
    /// Tagged union.
    Variant(VariantType),
    /// Variable-length sequence of the child.
    Array(TypeIndex),
    /// Nullable child.
    Optional(TypeIndex),
    /// Child that may be cut off at the end of a binary payload.
    Extension(TypeIndex),
}

impl TypeNode {
    /// Whether this node is a binary extension wrapper.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        matches!(self, Self::Extension(_))
    }

    /// Whether this node is an optional wrapper.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }
}

/// A message category's entry: declared type name and its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    /// Type name as written in the schema.
    pub type_name: String,
    /// Resolved node.
    pub ty: TypeIndex,
}

/// Resolved schema: the type arena, its name table and the three message
/// categories. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAbi {
    pub(crate) version: String,
    pub(crate) nodes: Vec<TypeNode>,
    pub(crate) names: HashMap<String, TypeIndex>,
    pub(crate) actions: HashMap<Name, MessageType>,
    pub(crate) tables: HashMap<Name, MessageType>,
    pub(crate) action_results: HashMap<Name, MessageType>,
}

impl ResolvedAbi {
    /// Schema format version the graph was loaded from.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Node behind a handle.
    ///
    /// Handles are only minted by the resolver for this arena, so every
    /// handle obtained from this graph is in range.
    #[must_use]
    pub fn node(&self, ty: TypeIndex) -> &TypeNode {
        &self.nodes[ty.as_usize()]
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve any type name known to the graph: built-ins, aliases,
    /// declarations and every wrapper spelling the schema used.
    pub fn get_type(&self, name: &str) -> Result<TypeIndex> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| AbiError::NotFound(format!("type \"{name}\"")))
    }

    /// Payload type of an action.
    pub fn get_action_type(&self, action: Name) -> Result<TypeIndex> {
        lookup(&self.actions, action, "action").map(|m| m.ty)
    }

    /// Row type of a table.
    pub fn get_table_type(&self, table: Name) -> Result<TypeIndex> {
        lookup(&self.tables, table, "table").map(|m| m.ty)
    }

    /// Return type of an action.
    pub fn get_action_result_type(&self, action: Name) -> Result<TypeIndex> {
        lookup(&self.action_results, action, "action result").map(|m| m.ty)
    }

    /// Declared payload type name of an action.
    pub fn action_type_name(&self, action: Name) -> Result<&str> {
        lookup(&self.actions, action, "action").map(|m| m.type_name.as_str())
    }

    /// Declared row type name of a table.
    pub fn table_type_name(&self, table: Name) -> Result<&str> {
        lookup(&self.tables, table, "table").map(|m| m.type_name.as_str())
    }

    /// Declared return type name of an action.
    pub fn action_result_type_name(&self, action: Name) -> Result<&str> {
        lookup(&self.action_results, action, "action result").map(|m| m.type_name.as_str())
    }

    /// All actions sorted by name.
    #[must_use]
    pub fn actions(&self) -> Vec<(Name, &MessageType)> {
        sorted(&self.actions)
    }

    /// All tables sorted by name.
    #[must_use]
    pub fn tables(&self) -> Vec<(Name, &MessageType)> {
        sorted(&self.tables)
    }

    /// All action results sorted by name.
    #[must_use]
    pub fn action_results(&self) -> Vec<(Name, &MessageType)> {
        sorted(&self.action_results)
    }

    /// Human readable name of a node, used in error context.
    #[must_use]
    pub fn describe(&self, ty: TypeIndex) -> String {
        match self.node(ty) {
            TypeNode::Builtin(b) => b.name().to_string(),
            TypeNode::Struct(s) => s.name.clone(),
            TypeNode::Variant(v) => v.name.clone(),
            TypeNode::Array(inner) => format!("{}[]", self.describe(*inner)),
            TypeNode::Optional(inner) => format!("{}?", self.describe(*inner)),
            TypeNode::Extension(inner) => format!("{}$", self.describe(*inner)),
        }
    }
}

fn lookup<'a>(
    map: &'a HashMap<Name, MessageType>,
    key: Name,
    what: &str,
) -> Result<&'a MessageType> {
    map.get(&key)
        .ok_or_else(|| AbiError::NotFound(format!("{what} \"{key}\"")))
}

fn sorted(map: &HashMap<Name, MessageType>) -> Vec<(Name, &MessageType)> {
    let mut out: Vec<_> = map.iter().map(|(k, v)| (*k, v)).collect();
    out.sort_by_key(|(k, _)| *k);
    out
}
