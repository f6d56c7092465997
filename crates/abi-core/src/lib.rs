// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime ABI schemas for contract data.
//!
//! A schema document ([`AbiDef`]) declares aliases, structs, variants and
//! the message types of a contract's actions, tables and action results.
//! [`resolve`] compiles it into a [`ResolvedAbi`], a type graph that the
//! codecs walk to convert between a value's JSON form and its compact
//! binary form without generating any code per schema.
//!
//! ```
//! use abi_core::{load_schema, ConversionMode, SchemaSource};
//!
//! let abi = load_schema(SchemaSource::Json(
//!     r#"{"version":"eosio::abi/1.1","structs":[{"name":"hi","base":"","fields":[{"name":"user","type":"name"}]}]}"#,
//! ))?;
//! let ty = abi.get_type("hi")?;
//! let bytes = abi.json_to_bin(ty, r#"{"user":"alice"}"#, ConversionMode::Strict)?;
//! assert_eq!(abi.bin_to_json(ty, &bytes)?, r#"{"user":"alice"}"#);
//! # Ok::<(), abi_core::AbiError>(())
//! ```
//!
//! Layout:
//!
//! - [`name`]: 64-bit identifier codec.
//! - [`abi`]: the unresolved schema model and its binary form.
//! - [`resolve`](mod@resolve) / [`types`]: the resolved graph.
//! - [`json`] / [`bin`](mod@bin): the two conversion walkers.
//! - [`bootstrap`]: schema documents as data, and [`load_schema`].
//! - [`registry`]: contract name to shared schema.

pub mod abi;
pub mod bin;
pub mod bootstrap;
pub mod error;
pub mod json;
pub mod name;
pub mod registry;
pub mod resolve;
mod scalar;
pub mod types;
pub mod wire;

pub use abi::{
    AbiDef, AbiExtension, ActionDef, ActionResultDef, ClausePair, ErrorMessage, FieldDef,
    StructDef, TableDef, TypeDef, VariantDef,
};
pub use bin::MAX_EMPTY_ELEMENTS;
pub use bootstrap::{
    abi_bin_to_json, abi_def_to_json, abi_json_to_bin, bootstrap_types, check_version,
    decode_abi_def, load_schema, SchemaSource, SUPPORTED_VERSIONS,
};
pub use error::{AbiError, Result};
pub use json::{ConversionMode, JsonNumber, JsonValue, MAX_DEPTH};
pub use name::{name_to_string, string_to_name, Name};
pub use registry::ContractRegistry;
pub use resolve::{resolve, EXTENDED_ASSET};
pub use scalar::{BLOCK_INTERVAL_MS, BLOCK_TIMESTAMP_EPOCH_MS, MAX_SYMBOL_PRECISION};
pub use types::{Builtin, MessageType, ResolvedAbi, TypeIndex, TypeNode};
pub use wire::{Decode, Encode, Reader, Writer};
