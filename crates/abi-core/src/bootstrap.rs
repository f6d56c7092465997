// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema documents as data: the `abi_def` type graph describing schema
//! documents themselves, and the loaders built on it.
//!
//! JSON schema text is pushed through the ordinary JSON → binary walker with
//! that graph, and the binary form is then read into an [`AbiDef`]. Going the
//! other way, an [`AbiDef`] is encoded and walked back out to JSON. Both
//! directions therefore accept and produce exactly what the codecs do for
//! any other type.

use std::sync::OnceLock;

use tracing::debug;

use crate::abi::{AbiDef, FieldDef, StructDef, TypeDef};
use crate::error::{AbiError, Result, ResultExt};
use crate::json::{ConversionMode, JsonValue};
use crate::resolve::resolve;
use crate::types::{ResolvedAbi, TypeIndex};
use crate::wire::{decode_from_bytes, encode_to_vec};

/// Schema format versions this crate can load.
pub const SUPPORTED_VERSIONS: [&str; 3] = ["eosio::abi/1.0", "eosio::abi/1.1", "eosio::abi/1.2"];

/// Version stamped on the bootstrap graph.
const BOOTSTRAP_VERSION: &str = "eosio::abi/1.2";

/// Name of the document type in the bootstrap graph.
pub const ABI_DEF_TYPE: &str = "abi_def";

/// Top-level members a JSON document may leave out; they default to `[]`.
/// The two binary-extension members are absent rather than empty.
const DEFAULTED_MEMBERS: [&str; 7] = [
    "types",
    "structs",
    "actions",
    "tables",
    "ricardian_clauses",
    "error_messages",
    "abi_extensions",
];

/// Where a schema document comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource<'a> {
    /// JSON text.
    Json(&'a str),
    /// Binary form.
    Binary(&'a [u8]),
}

/// Fail with [`AbiError::UnsupportedVersion`] unless `version` is in
/// [`SUPPORTED_VERSIONS`].
pub fn check_version(version: &str) -> Result<()> {
    if SUPPORTED_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(AbiError::UnsupportedVersion(version.to_string()))
    }
}

fn struct_def(name: &str, fields: &[(&str, &str)]) -> StructDef {
    StructDef {
        name: name.to_string(),
        base: None,
        fields: fields
            .iter()
            .map(|(name, ty)| FieldDef {
                name: (*name).to_string(),
                type_name: (*ty).to_string(),
            })
            .collect(),
    }
}

/// The schema of schema documents, as a document.
#[must_use]
pub fn bootstrap_def() -> AbiDef {
    let mut def = AbiDef::new(BOOTSTRAP_VERSION);
    def.types.push(TypeDef {
        new_type_name: "type_name".into(),
        type_name: "string".into(),
    });
    def.types.push(TypeDef {
        new_type_name: "field_name".into(),
        type_name: "string".into(),
    });
    def.structs = vec![
        struct_def("type_def", &[("new_type_name", "type_name"), ("type", "type_name")]),
        struct_def("field_def", &[("name", "field_name"), ("type", "type_name")]),
        struct_def(
            "struct_def",
            &[("name", "type_name"), ("base", "type_name"), ("fields", "field_def[]")],
        ),
        struct_def(
            "action_def",
            &[("name", "name"), ("type", "type_name"), ("ricardian_contract", "string")],
        ),
        struct_def(
            "table_def",
            &[
                ("name", "name"),
                ("index_type", "type_name"),
                ("key_names", "field_name[]"),
                ("key_types", "type_name[]"),
                ("type", "type_name"),
            ],
        ),
        struct_def("clause_pair", &[("id", "string"), ("body", "string")]),
        struct_def("error_message", &[("error_code", "uint64"), ("error_msg", "string")]),
        struct_def("extensions_entry", &[("tag", "uint16"), ("value", "bytes")]),
        struct_def("variant_def", &[("name", "type_name"), ("types", "type_name[]")]),
        struct_def("action_result_def", &[("name", "name"), ("result_type", "type_name")]),
        struct_def(
            ABI_DEF_TYPE,
            &[
                ("version", "string"),
                ("types", "type_def[]"),
                ("structs", "struct_def[]"),
                ("actions", "action_def[]"),
                ("tables", "table_def[]"),
                ("ricardian_clauses", "clause_pair[]"),
                ("error_messages", "error_message[]"),
                ("abi_extensions", "extensions_entry[]"),
                ("variants", "variant_def[]$"),
                ("action_results", "action_result_def[]$"),
            ],
        ),
    ];
    def
}

static BOOTSTRAP: OnceLock<Result<ResolvedAbi>> = OnceLock::new();

/// The resolved bootstrap graph, built on first use.
pub fn bootstrap_types() -> Result<&'static ResolvedAbi> {
    BOOTSTRAP
        .get_or_init(|| resolve(&bootstrap_def()))
        .as_ref()
        .map_err(Clone::clone)
}

fn abi_def_type() -> Result<(&'static ResolvedAbi, TypeIndex)> {
    let abi = bootstrap_types()?;
    Ok((abi, abi.get_type(ABI_DEF_TYPE)?))
}

fn with_defaulted_members(mut doc: JsonValue) -> JsonValue {
    if let JsonValue::Object(entries) = &mut doc {
        let has = |entries: &[(String, JsonValue)], member: &str| {
            entries.iter().any(|(k, _)| k == member)
        };
        for member in DEFAULTED_MEMBERS {
            if !has(entries, member) {
                entries.push((member.to_string(), JsonValue::Array(Vec::new())));
            }
        }
        // action_results sits behind variants on the wire
        if has(entries, "action_results") && !has(entries, "variants") {
            entries.push(("variants".to_string(), JsonValue::Array(Vec::new())));
        }
    }
    doc
}

/// Convert a JSON schema document to its binary form.
///
/// Members may appear in any order; missing top-level arrays are empty.
pub fn abi_json_to_bin(json: &str) -> Result<Vec<u8>> {
    let (abi, ty) = abi_def_type()?;
    let doc = with_defaulted_members(JsonValue::parse(json)?);
    abi.json_value_to_bin(ty, &doc, ConversionMode::Reorderable)
        .context_with(|| "schema document")
}

/// Convert a binary schema document to JSON text.
pub fn abi_bin_to_json(bytes: &[u8]) -> Result<String> {
    let (abi, ty) = abi_def_type()?;
    abi.bin_to_json(ty, bytes).context_with(|| "schema document")
}

/// Render a native document as JSON text.
pub fn abi_def_to_json(def: &AbiDef) -> Result<String> {
    abi_bin_to_json(&encode_to_vec(def)?)
}

/// Read a schema document into its native form without resolving it.
pub fn decode_abi_def(source: SchemaSource<'_>) -> Result<AbiDef> {
    match source {
        SchemaSource::Json(text) => decode_from_bytes(&abi_json_to_bin(text)?),
        SchemaSource::Binary(bytes) => decode_from_bytes(bytes),
    }
}

/// Load, version-check and resolve a schema document.
pub fn load_schema(source: SchemaSource<'_>) -> Result<ResolvedAbi> {
    let def = decode_abi_def(source)?;
    check_version(&def.version)?;
    debug!(
        version = %def.version,
        types = def.types.len(),
        structs = def.structs.len(),
        variants = def.variants.len(),
        "loading schema"
    );
    resolve(&def)
}
